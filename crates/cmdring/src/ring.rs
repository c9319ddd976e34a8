use crate::invariants::{
    debug_assert_bounded_occupancy, debug_assert_cursor_in_bounds, debug_assert_entry_nonempty,
    debug_assert_slot_occupied_before_overwrite,
};
use crate::StoreError;

/// Number of write commands the store retains at once.
pub const CAPACITY: usize = 10;

/// A single committed write command: an owned, non-empty byte slice.
///
/// Entries are immutable once committed. A `Ring` slot owns its entry
/// exclusively; the entry is destroyed exactly once, either when
/// overwritten by [`Ring::append`] or when the `Ring` itself is dropped.
pub type Entry = Box<[u8]>;

/// Fixed-capacity FIFO ring of variable-length byte entries.
///
/// Appending past capacity overwrites the oldest entry (`out`) and advances
/// both cursors, preserving the most recent `capacity` entries. The ring
/// exposes the concatenation of its valid entries as a single linear byte
/// address space (§3 in the accompanying design notes): byte 0 is the first
/// byte of the oldest surviving entry.
pub struct Ring {
    capacity: usize,
    slots: Vec<Option<Entry>>,
    /// Next slot to write.
    r#in: usize,
    /// Oldest valid slot.
    out: usize,
    full: bool,
}

impl Ring {
    /// Creates an empty ring with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(CAPACITY)
    }

    /// Creates an empty ring with a custom capacity (used by tests to
    /// exercise small rings cheaply; production code always uses
    /// [`CAPACITY`]).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be non-zero");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            capacity,
            slots,
            r#in: 0,
            out: 0,
            full: false,
        }
    }

    /// Returns the ring's fixed capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of currently valid entries.
    #[inline]
    #[must_use]
    pub fn valid_count(&self) -> usize {
        if self.full {
            self.capacity
        } else {
            (self.r#in + self.capacity - self.out) % self.capacity
        }
    }

    /// Returns `true` if the ring holds no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.full && self.r#in == self.out
    }

    /// Returns `true` if the ring is at capacity (the next append will
    /// overwrite the oldest entry).
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Appends a new entry, taking ownership of it.
    ///
    /// If the ring is full, the slot about to be reused is released first
    /// and returned here so the caller can observe (or simply drop) the
    /// evicted bytes — this is the "exactly-once release of the overwritten
    /// bytes" contract.
    ///
    /// # Panics
    ///
    /// Panics if `entry` is empty; every committed packet must include at
    /// least its terminating newline, so a zero-length append indicates a
    /// caller bug, not a runtime condition to recover from.
    pub fn append(&mut self, entry: Entry) -> Option<Entry> {
        debug_assert_entry_nonempty!(entry.len());
        assert!(!entry.is_empty(), "cannot append an empty entry");

        let idx = self.r#in;
        debug_assert_cursor_in_bounds!("in", idx, self.capacity);
        debug_assert_slot_occupied_before_overwrite!(self.full, self.slots[idx].is_some());

        let evicted = self.slots[idx].replace(entry);

        self.r#in = (self.r#in + 1) % self.capacity;
        if self.full {
            self.out = (self.out + 1) % self.capacity;
        } else if self.r#in == self.out {
            self.full = true;
        }

        debug_assert_bounded_occupancy!(self.valid_count(), self.capacity);
        evicted
    }

    /// Total number of bytes across all valid entries.
    #[must_use]
    pub fn total_size(&self) -> usize {
        let mut total = 0;
        self.iterate(|entry| total += entry.len());
        total
    }

    /// Locates the entry containing linear byte offset `offset`.
    ///
    /// Returns the entry and the residual (intra-entry) offset, or `None`
    /// if `offset >= total_size()` (end of stream).
    #[must_use]
    pub fn find_for_fpos(&self, offset: usize) -> Option<(&[u8], usize)> {
        let mut remaining = offset;
        for i in 0..self.valid_count() {
            let idx = (self.out + i) % self.capacity;
            let entry = self.slots[idx].as_ref().expect("valid slot holds an entry");
            if remaining < entry.len() {
                return Some((entry, remaining));
            }
            remaining -= entry.len();
        }
        None
    }

    /// Computes the absolute linear offset of `(command_index, byte_offset)`.
    ///
    /// Fails with [`StoreError::Invalid`] if `command_index` is out of
    /// range, `byte_offset` is at or past the end of that command, or a
    /// traversed entry is degenerate.
    pub fn absolute_offset(&self, command_index: u32, byte_offset: u32) -> Result<usize, StoreError> {
        let command_index = command_index as usize;
        let byte_offset = byte_offset as usize;

        if command_index >= self.valid_count() {
            return Err(StoreError::Invalid);
        }

        let mut accumulated = 0usize;
        for i in 0..self.valid_count() {
            let idx = (self.out + i) % self.capacity;
            let entry = match self.slots[idx].as_ref() {
                Some(entry) if !entry.is_empty() => entry,
                _ => return Err(StoreError::Invalid),
            };

            if i == command_index {
                if byte_offset >= entry.len() {
                    return Err(StoreError::Invalid);
                }
                return Ok(accumulated + byte_offset);
            }
            accumulated += entry.len();
        }

        Err(StoreError::Invalid)
    }

    /// Visits every valid entry in FIFO order (oldest first).
    pub fn iterate<F: FnMut(&[u8])>(&self, mut visitor: F) {
        for i in 0..self.valid_count() {
            let idx = (self.out + i) % self.capacity;
            let entry = self.slots[idx].as_ref().expect("valid slot holds an entry");
            visitor(entry);
        }
    }
}

impl Default for Ring {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(bytes: &[u8]) -> Entry {
        Vec::from(bytes).into_boxed_slice()
    }

    #[test]
    fn empty_ring_reports_zero() {
        let ring = Ring::new();
        assert!(ring.is_empty());
        assert_eq!(ring.total_size(), 0);
        assert_eq!(ring.valid_count(), 0);
        assert!(ring.find_for_fpos(0).is_none());
    }

    #[test]
    fn append_and_read_back_in_fifo_order() {
        let mut ring = Ring::new();
        ring.append(entry(b"alpha\n"));
        ring.append(entry(b"beta\n"));

        assert_eq!(ring.valid_count(), 2);
        assert_eq!(ring.total_size(), 11);

        let (e, off) = ring.find_for_fpos(0).unwrap();
        assert_eq!(e, b"alpha\n");
        assert_eq!(off, 0);

        let (e, off) = ring.find_for_fpos(6).unwrap();
        assert_eq!(e, b"beta\n");
        assert_eq!(off, 0);

        assert!(ring.find_for_fpos(11).is_none());
    }

    #[test]
    fn overwrite_evicts_oldest_and_releases_its_bytes_exactly_once() {
        let mut ring = Ring::with_capacity(10);
        for i in 0..11u32 {
            let evicted = ring.append(entry(format!("p{i:02}\n").as_bytes()));
            if i < 10 {
                assert!(evicted.is_none());
            } else {
                assert_eq!(evicted.as_deref(), Some(b"p00\n".as_slice()));
            }
        }

        assert_eq!(ring.valid_count(), 10);
        assert_eq!(ring.total_size(), 40);
        let (first, _) = ring.find_for_fpos(0).unwrap();
        assert_eq!(first, b"p01\n");
    }

    #[test]
    fn absolute_offset_matches_concatenation_law() {
        let mut ring = Ring::new();
        ring.append(entry(b"alpha\n")); // 6 bytes
        ring.append(entry(b"beta\n")); // 5 bytes

        assert_eq!(ring.absolute_offset(0, 0).unwrap(), 0);
        assert_eq!(ring.absolute_offset(1, 2).unwrap(), 6 + 2);
        assert_eq!(ring.absolute_offset(1, 4), Err(StoreError::Invalid)); // off == len
        assert_eq!(ring.absolute_offset(2, 0), Err(StoreError::Invalid)); // index == valid_count
    }

    #[test]
    fn read_at_total_size_is_eof_not_error() {
        let mut ring = Ring::new();
        ring.append(entry(b"x\n"));
        assert!(ring.find_for_fpos(ring.total_size()).is_none());
    }
}
