//! The two interchangeable backing stores a connection worker can write
//! packets into and read the current store back from: a flat file
//! (default) or a [`chardev::Device`] (the same device surface the
//! character-device embodiment of this system exposes to local readers).
//!
//! The trait method [`BackingStore::commit_and_echo`] bundles append and
//! full-store read into a single call because the two backends hold their
//! internal lock for different spans of that operation — file mode keeps
//! its mutex across both steps, device mode releases it after the append
//! and reads unlocked, since the device serializes internally. Splitting
//! this into two trait methods would force every caller to reproduce that
//! per-mode distinction instead of the store itself owning it.
//! [`BackingStore::echo`] is the append-free half of the same read, used
//! after a seek control packet that must still be answered but must never
//! be stored.

use crate::error::ServerError;
use async_trait::async_trait;
use chardev::{Device, InterruptFlag, OpenFile};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex as AsyncMutex;

#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Appends `packet` (newline included) and returns the full current
    /// store contents, observed at a single consistent point.
    async fn commit_and_echo(&self, packet: &[u8]) -> Result<Vec<u8>, ServerError>;

    /// Returns the full current store contents without appending anything.
    ///
    /// Used after a seek control packet: §4.E streams the entire store back
    /// to the client regardless of which branch handled the packet, but the
    /// seek command itself is never stored.
    async fn echo(&self) -> Result<Vec<u8>, ServerError>;

    /// Repositions the store's read cursor to the start of write command
    /// `command_index` plus `byte_offset` bytes within it.
    ///
    /// Only meaningful for device-backed stores; file-backed stores have
    /// no addressable cursor and reject every call with `NotTty`.
    async fn seek_to(&self, command_index: u32, byte_offset: u32) -> Result<(), ServerError>;

    /// Whether the inline `AESDCHAR_IOCSEEKTO:` control packet should be
    /// interpreted as a seek request for this store, per §6.
    fn interprets_seek_commands(&self) -> bool;
}

/// Appends committed packets to a flat file, created on demand.
pub struct FileBackingStore {
    path: PathBuf,
    mutex: AsyncMutex<()>,
}

impl FileBackingStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path, mutex: AsyncMutex::new(()) }
    }
}

#[async_trait]
impl BackingStore for FileBackingStore {
    async fn commit_and_echo(&self, packet: &[u8]) -> Result<Vec<u8>, ServerError> {
        let _guard = self.mutex.lock().await;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(packet).await?;
        file.flush().await?;
        drop(file);

        let contents = tokio::fs::read(&self.path).await?;
        Ok(contents)
    }

    async fn echo(&self) -> Result<Vec<u8>, ServerError> {
        let _guard = self.mutex.lock().await;
        match tokio::fs::read(&self.path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn seek_to(&self, _command_index: u32, _byte_offset: u32) -> Result<(), ServerError> {
        Err(ServerError::NotTty)
    }

    fn interprets_seek_commands(&self) -> bool {
        false
    }
}

/// Routes committed packets through a [`chardev::Device`] instead of a
/// flat file. The device's own interruptible mutex serializes the append;
/// the subsequent full-store read is not additionally guarded, per the
/// design note on per-mode locking granularity.
pub struct DeviceBackingStore {
    device: Arc<Device>,
    handle: AsyncMutex<OpenFile>,
    interrupt: InterruptFlag,
}

impl DeviceBackingStore {
    #[must_use]
    pub fn new(device: Arc<Device>) -> Self {
        let interrupt = InterruptFlag::new();
        let handle = OpenFile::open(Arc::clone(&device), interrupt.clone());
        Self { device, handle: AsyncMutex::new(handle), interrupt }
    }
}

impl DeviceBackingStore {
    /// Reads the device from the start to its current end, on a blocking
    /// task of its own since `chardev::Device` is a synchronous `std::io`
    /// surface.
    async fn read_all(&self) -> Result<Vec<u8>, ServerError> {
        let device = Arc::clone(&self.device);
        let interrupt = self.interrupt.clone();
        let contents = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<u8>> {
            let mut reader = OpenFile::open(device, interrupt);
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf)?;
            Ok(buf)
        })
        .await
        .map_err(|e| ServerError::Io(std::io::Error::other(e)))??;

        Ok(contents)
    }
}

#[async_trait]
impl BackingStore for DeviceBackingStore {
    async fn commit_and_echo(&self, packet: &[u8]) -> Result<Vec<u8>, ServerError> {
        {
            let mut handle = self.handle.lock().await;
            let packet = packet.to_vec();
            tokio::task::block_in_place(|| handle.write_all(&packet))?;
        }

        self.read_all().await
    }

    async fn echo(&self) -> Result<Vec<u8>, ServerError> {
        self.read_all().await
    }

    async fn seek_to(&self, command_index: u32, byte_offset: u32) -> Result<(), ServerError> {
        let mut handle = self.handle.lock().await;
        tokio::task::block_in_place(|| handle.ioctl_seek_to(command_index, byte_offset))?;
        Ok(())
    }

    fn interprets_seek_commands(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_store_appends_and_echoes_full_contents() {
        let dir = std::env::temp_dir().join(format!("packetd-test-{}", std::process::id()));
        let store = FileBackingStore::new(dir.clone());

        let echo = store.commit_and_echo(b"alpha\n").await.unwrap();
        assert_eq!(echo, b"alpha\n");

        let echo = store.commit_and_echo(b"beta\n").await.unwrap();
        assert_eq!(echo, b"alpha\nbeta\n");

        let _ = tokio::fs::remove_file(&dir).await;
    }

    #[tokio::test]
    async fn file_store_rejects_seek() {
        let dir = std::env::temp_dir().join(format!("packetd-test-seek-{}", std::process::id()));
        let store = FileBackingStore::new(dir.clone());
        assert!(!store.interprets_seek_commands());
        let err = store.seek_to(0, 0).await.unwrap_err();
        assert!(matches!(err, ServerError::NotTty));
    }

    #[tokio::test]
    async fn file_store_echo_reflects_current_contents_without_appending() {
        let dir = std::env::temp_dir().join(format!("packetd-test-echo-{}", std::process::id()));
        let store = FileBackingStore::new(dir.clone());

        assert_eq!(store.echo().await.unwrap(), Vec::<u8>::new());

        store.commit_and_echo(b"alpha\n").await.unwrap();
        assert_eq!(store.echo().await.unwrap(), b"alpha\n");
        // Calling echo again must not change the contents.
        assert_eq!(store.echo().await.unwrap(), b"alpha\n");

        let _ = tokio::fs::remove_file(&dir).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn device_store_appends_and_echoes_full_contents() {
        let store = DeviceBackingStore::new(Arc::new(Device::new()));
        assert!(store.interprets_seek_commands());

        let echo = store.commit_and_echo(b"alpha\n").await.unwrap();
        assert_eq!(echo, b"alpha\n");

        let echo = store.commit_and_echo(b"beta\n").await.unwrap();
        assert_eq!(echo, b"alpha\nbeta\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn device_store_echo_returns_current_contents_without_appending() {
        let store = DeviceBackingStore::new(Arc::new(Device::new()));
        assert_eq!(store.echo().await.unwrap(), Vec::<u8>::new());

        store.commit_and_echo(b"alpha\n").await.unwrap();
        assert_eq!(store.echo().await.unwrap(), b"alpha\n");
        // A second echo with no intervening commit sees the same bytes.
        assert_eq!(store.echo().await.unwrap(), b"alpha\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn device_store_seek_then_echo_is_unaffected_by_cursor_state() {
        let store = DeviceBackingStore::new(Arc::new(Device::new()));
        store.commit_and_echo(b"alpha\n").await.unwrap();
        store.commit_and_echo(b"beta\n").await.unwrap();

        store.seek_to(1, 2).await.unwrap();

        // commit_and_echo always observes the full store from the start,
        // independent of any outstanding seek cursor.
        let echo = store.commit_and_echo(b"gamma\n").await.unwrap();
        assert_eq!(echo, b"alpha\nbeta\ngamma\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn device_store_seek_out_of_range_is_invalid() {
        let store = DeviceBackingStore::new(Arc::new(Device::new()));
        store.commit_and_echo(b"alpha\n").await.unwrap();

        let err = store.seek_to(5, 0).await.unwrap_err();
        assert!(matches!(err, ServerError::Invalid));
    }
}
