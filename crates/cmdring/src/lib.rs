//! Bounded circular command store and packet reassembler.
//!
//! `cmdring` is the pure data-structure layer beneath the character-device
//! and TCP-server surfaces: a fixed-capacity FIFO of variable-length byte
//! entries ([`Ring`]) addressable either by linear byte offset or by
//! command index, and a newline-framing accumulator ([`Reassembler`]) that
//! turns arbitrarily fragmented writes into whole packets.
//!
//! This crate does no I/O and holds no locks — callers that need
//! concurrent access (the device surface, the TCP server) own the
//! synchronization themselves.

mod invariants;
mod reassembler;
mod ring;

pub use reassembler::Reassembler;
pub use ring::{Entry, Ring, CAPACITY};

use thiserror::Error;

/// Errors raised by `cmdring` operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The requested command index or byte offset is out of range.
    #[error("invalid command index or byte offset")]
    Invalid,
}
