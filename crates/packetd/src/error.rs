use thiserror::Error;

/// Errors surfaced by the server core and its backing stores.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Bad arguments, an out-of-range seek, or a malformed control packet.
    #[error("invalid argument")]
    Invalid,

    /// A signal arrived while blocked acquiring a lock.
    #[error("interrupted")]
    Interrupted,

    /// The ioctl/control code is not recognized by the backing store.
    #[error("operation not supported by this backing store")]
    NotTty,

    /// Transport or filesystem failure, including an orderly peer close.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Binding the listening socket failed; the process must abort.
    #[error("failed to bind {addr}: {source}")]
    BindFailed {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

impl From<chardev::DeviceError> for ServerError {
    fn from(err: chardev::DeviceError) -> Self {
        match err {
            chardev::DeviceError::Invalid => Self::Invalid,
            chardev::DeviceError::Interrupted => Self::Interrupted,
            chardev::DeviceError::NotTty => Self::NotTty,
            chardev::DeviceError::Fault
            | chardev::DeviceError::Io
            | chardev::DeviceError::OutOfMemory => Self::Io(std::io::Error::from(err)),
        }
    }
}

impl ServerError {
    /// Whether a worker or the acceptor should simply retry the operation
    /// that produced this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Interrupted)
            || matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::Interrupted)
    }
}
