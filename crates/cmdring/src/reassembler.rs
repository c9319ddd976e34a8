/// Reframes an arbitrary stream of byte chunks into newline-terminated
/// packets.
///
/// Holds exactly the bytes received since the last committed packet. The
/// newline terminator is considered part of the packet and is retained in
/// the emitted bytes.
#[derive(Debug, Default)]
pub struct Reassembler {
    acc: Vec<u8>,
}

impl Reassembler {
    /// Creates an empty reassembler.
    #[must_use]
    pub fn new() -> Self {
        Self { acc: Vec::new() }
    }

    /// Appends `chunk` to the accumulator and extracts every whole packet
    /// now available, in order. The trailing partial bytes (if any) remain
    /// buffered for the next call.
    ///
    /// Invariant after this call: the buffered tail contains no `'\n'`.
    pub fn ingest(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.acc.extend_from_slice(chunk);

        let mut packets = Vec::new();
        let mut start = 0;
        while let Some(rel) = self.acc[start..].iter().position(|&b| b == b'\n') {
            let end = start + rel + 1; // newline inclusive
            packets.push(self.acc[start..end].to_vec());
            start = end;
        }

        if start > 0 {
            self.acc.drain(0..start);
        }

        packets
    }

    /// Returns the number of bytes currently buffered since the last
    /// committed packet.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.acc.len()
    }

    /// Discards any leftover partial bytes on connection close. They were
    /// never newline-terminated, so they are not — and never were — a
    /// committed packet.
    pub fn drain_on_close(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.acc)
    }
}
