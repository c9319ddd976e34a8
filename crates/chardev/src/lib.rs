//! Simulated character-device surface.
//!
//! `chardev` wraps a [`cmdring::Ring`] and [`cmdring::Reassembler`] behind
//! an interruptible mutex and exposes them through an `open`/`read`/
//! `write`/`seek`/`ioctl` contract modeled on a Linux char driver: a
//! [`Device`] is the shared backing store, and each [`OpenFile`] is an
//! independent handle with its own position, implementing the standard
//! `std::io` traits so callers can use it like any other stream.

mod device;
mod error;
mod lock;

pub use device::{Device, OpenFile};
pub use error::DeviceError;
pub use lock::{InterruptFlag, InterruptibleMutex};
