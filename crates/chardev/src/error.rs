//! Error taxonomy for device-surface operations.

use cmdring::StoreError;
use std::io;
use thiserror::Error;

/// Errors a device operation can fail with.
///
/// These mirror the abstract error kinds a real character device reports
/// through negative-`errno` return values: `Invalid` ~ `-EINVAL`,
/// `Interrupted` ~ `-ERESTARTSYS`, `Fault` ~ `-EFAULT`, `OutOfMemory` ~
/// `-ENOMEM`, `NotTty` ~ `-ENOTTY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// Bad arguments, out-of-range seek, or a malformed control request.
    #[error("invalid argument")]
    Invalid,

    /// A signal arrived while blocked acquiring the device lock.
    #[error("interrupted system call")]
    Interrupted,

    /// Copying to or from caller-supplied memory failed.
    #[error("bad address")]
    Fault,

    /// An allocation needed to service the request failed.
    #[error("out of memory")]
    OutOfMemory,

    /// The ioctl code is not recognized by this device.
    #[error("inappropriate ioctl for device")]
    NotTty,

    /// A generic transport/filesystem failure.
    #[error("i/o error")]
    Io,
}

impl DeviceError {
    /// Returns `true` if retrying the same operation later is meaningful
    /// (i.e. nothing about the device's own state caused the failure).
    #[must_use]
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

impl From<StoreError> for DeviceError {
    fn from(_: StoreError) -> Self {
        Self::Invalid
    }
}

impl From<DeviceError> for io::Error {
    fn from(err: DeviceError) -> Self {
        let kind = match err {
            DeviceError::Invalid => io::ErrorKind::InvalidInput,
            DeviceError::Interrupted => io::ErrorKind::Interrupted,
            DeviceError::Fault | DeviceError::Io => io::ErrorKind::Other,
            DeviceError::OutOfMemory => io::ErrorKind::OutOfMemory,
            DeviceError::NotTty => io::ErrorKind::Unsupported,
        };
        io::Error::new(kind, err)
    }
}
