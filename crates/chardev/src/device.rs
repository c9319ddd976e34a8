use crate::lock::{InterruptFlag, InterruptibleMutex};
use crate::DeviceError;
use cmdring::{Reassembler, Ring};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

struct DeviceInner {
    ring: Ring,
    reassembler: Reassembler,
}

/// The character-device instance: a ring store plus its own reassembly
/// buffer, guarded by one interruptible mutex.
///
/// Per the design notes on reassembly-buffer scoping, this buffer is
/// per-device (shared across every open handle), unlike the TCP server's
/// per-connection reassemblers — a single device has exactly one writer
/// critical section at a time.
pub struct Device {
    inner: InterruptibleMutex<DeviceInner>,
}

impl Device {
    /// Creates a fresh, empty device.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: InterruptibleMutex::new(DeviceInner {
                ring: Ring::new(),
                reassembler: Reassembler::new(),
            }),
        }
    }

    /// Total bytes currently addressable across all valid entries.
    pub fn total_size(&self, interrupt: &InterruptFlag) -> Result<usize, DeviceError> {
        let guard = self.inner.lock(interrupt)?;
        Ok(guard.ring.total_size())
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}

/// A handle bound to a [`Device`], carrying its own file position.
///
/// `open` binds the handle to the device; no other per-open state exists.
/// Multiple handles may be open concurrently — each has an independent
/// `pos`, all reading and writing through the same underlying store.
pub struct OpenFile {
    device: Arc<Device>,
    pos: usize,
    interrupt: InterruptFlag,
}

impl OpenFile {
    /// Opens a handle onto `device` using `interrupt` as the signal through
    /// which a blocked lock acquisition can be woken up early.
    #[must_use]
    pub fn open(device: Arc<Device>, interrupt: InterruptFlag) -> Self {
        Self { device, pos: 0, interrupt }
    }

    /// Current file position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// `ioctl(SEEK_TO)`: repositions to the start of write command
    /// `command_index` plus `byte_offset` bytes within it.
    ///
    /// On failure the handle's position is left untouched.
    pub fn ioctl_seek_to(&mut self, command_index: u32, byte_offset: u32) -> Result<(), DeviceError> {
        let guard = self.device.inner.lock(&self.interrupt)?;
        let new_pos = guard.ring.absolute_offset(command_index, byte_offset)?;
        drop(guard);
        self.pos = new_pos;
        Ok(())
    }
}

impl Read for OpenFile {
    /// Reads from the current position. Never crosses an entry boundary —
    /// a caller wanting more re-reads.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let guard = self.device.inner.lock(&self.interrupt)?;
        let Some((entry, intra)) = guard.ring.find_for_fpos(self.pos) else {
            return Ok(0); // EOF
        };
        let available = entry.len() - intra;
        let n = available.min(buf.len());
        buf[..n].copy_from_slice(&entry[intra..intra + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for OpenFile {
    /// Appends `buf` to the device's reassembly buffer, committing every
    /// whole packet produced into the ring, then advances the position by
    /// the full length of `buf` regardless of how many packets committed.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.device.inner.lock(&self.interrupt)?;
        let packets = guard.reassembler.ingest(buf);
        for packet in packets {
            guard.ring.append(packet.into_boxed_slice());
        }
        drop(guard);
        self.pos += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for OpenFile {
    /// Standard three-mode positioning; `End` is `total_size()` at the
    /// moment of the call.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let guard = self.device.inner.lock(&self.interrupt)?;
        let end = guard.ring.total_size() as i64;
        drop(guard);

        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => end + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };

        if new_pos < 0 {
            return Err(DeviceError::Invalid.into());
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }
}
