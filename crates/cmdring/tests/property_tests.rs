//! Property-based tests for the quantified invariants of the circular store.

use cmdring::Ring;
use proptest::prelude::*;

fn entry(bytes: &[u8]) -> Box<[u8]> {
    Vec::from(bytes).into_boxed_slice()
}

proptest! {
    /// INV-RING-01: for any append sequence of length k <= capacity, all k
    /// entries are retrievable in FIFO order and total_size is their sum.
    #[test]
    fn prop_no_overflow_retains_everything(lengths in prop::collection::vec(1usize..20, 0..=10)) {
        let mut ring = Ring::with_capacity(10);
        let mut expected = Vec::new();
        for len in &lengths {
            let mut bytes = vec![b'a'; *len - 1];
            bytes.push(b'\n');
            ring.append(entry(&bytes));
            expected.push(bytes);
        }

        prop_assert_eq!(ring.valid_count(), expected.len());
        prop_assert_eq!(ring.total_size(), expected.iter().map(Vec::len).sum::<usize>());

        let mut pos = 0;
        for want in &expected {
            let (got, off) = ring.find_for_fpos(pos).unwrap();
            prop_assert_eq!(off, 0);
            prop_assert_eq!(got, want.as_slice());
            pos += want.len();
        }
        prop_assert!(ring.find_for_fpos(pos).is_none());
    }

    /// INV-RING-01/03: for k > capacity, exactly the last `capacity` entries
    /// survive, in FIFO order, and every eviction releases its bytes.
    #[test]
    fn prop_overflow_keeps_only_most_recent_capacity(count in 11usize..40) {
        let mut ring = Ring::with_capacity(10);
        let all: Vec<Vec<u8>> = (0..count)
            .map(|i| format!("cmd{i:04}\n").into_bytes())
            .collect();

        for packet in &all {
            ring.append(entry(packet));
        }

        let expected_tail = &all[all.len() - 10..];
        prop_assert_eq!(ring.valid_count(), 10);

        let mut pos = 0;
        for want in expected_tail {
            let (got, off) = ring.find_for_fpos(pos).unwrap();
            prop_assert_eq!(off, 0);
            prop_assert_eq!(got, want.as_slice());
            pos += want.len();
        }
    }

    /// INV-RING-02: find_for_fpos satisfies the concatenation law for every
    /// valid position.
    #[test]
    fn prop_find_for_fpos_concatenation_law(lengths in prop::collection::vec(1usize..15, 1..=10)) {
        let mut ring = Ring::with_capacity(10);
        for len in &lengths {
            let mut bytes = vec![b'b'; *len - 1];
            bytes.push(b'\n');
            ring.append(entry(&bytes));
        }

        let total = ring.total_size();
        for p in 0..total {
            let (_entry, residual) = ring.find_for_fpos(p).unwrap();
            let mut earlier_len = 0usize;
            let mut found = false;
            ring.iterate(|e| {
                if !found {
                    if p < earlier_len + e.len() {
                        found = true;
                    } else {
                        earlier_len += e.len();
                    }
                }
            });
            prop_assert_eq!(earlier_len + residual, p);
        }
    }

    /// Seek idempotence: seeking to a position and reading is independent of
    /// prior reads, as long as there is no intervening write.
    #[test]
    fn prop_seek_idempotent(lengths in prop::collection::vec(1usize..10, 2..=8), probe in 0usize..200) {
        let mut ring = Ring::with_capacity(10);
        for len in &lengths {
            let mut bytes = vec![b'c'; *len - 1];
            bytes.push(b'\n');
            ring.append(entry(&bytes));
        }

        let total = ring.total_size();
        let pos = probe % (total + 1);
        let first = ring.find_for_fpos(pos);
        let second = ring.find_for_fpos(pos);
        prop_assert_eq!(first.map(|(e, o)| (e.to_vec(), o)), second.map(|(e, o)| (e.to_vec(), o)));
    }
}

#[test]
fn scenario_two_writes_one_read_back() {
    let mut ring = Ring::with_capacity(10);
    ring.append(entry(b"alpha\n"));
    ring.append(entry(b"beta\n"));

    let (e, off) = ring.find_for_fpos(0).unwrap();
    assert_eq!((e, off), (b"alpha\n".as_slice(), 0));
    let (e, off) = ring.find_for_fpos(6).unwrap();
    assert_eq!((e, off), (b"beta\n".as_slice(), 0));
    assert!(ring.find_for_fpos(11).is_none());
}

#[test]
fn scenario_seek_by_command_index() {
    let mut ring = Ring::with_capacity(10);
    ring.append(entry(b"alpha\n"));
    ring.append(entry(b"beta\n"));

    let pos = ring.absolute_offset(1, 2).unwrap();
    assert_eq!(pos, 8);
    let (e, off) = ring.find_for_fpos(pos).unwrap();
    assert_eq!(&e[off..], b"ta\n");
}
