//! Newline-framed packet accumulator: TCP server core and connection
//! workers over the bounded [`cmdring`] command store, optionally routed
//! through a [`chardev`] device instead of a flat file.

pub mod backing_store;
pub mod config;
pub mod daemon;
pub mod error;
pub mod server;
pub mod signals;
pub mod worker;

pub use backing_store::{BackingStore, DeviceBackingStore, FileBackingStore};
pub use config::{BackingMode, ServerConfig};
pub use error::ServerError;
pub use server::Server;
pub use signals::StopFlag;
