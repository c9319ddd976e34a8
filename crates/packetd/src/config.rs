use std::path::PathBuf;
use std::time::Duration;

/// Storage backend selection for a running server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackingMode {
    /// Append whole packets to `/var/tmp/aesdsocketdata` (or `data_path`).
    File,
    /// Route packets through a [`chardev::Device`] instead of a flat file.
    Device,
}

/// Runtime configuration for the packet server.
///
/// Mirrors the shape of a builder-populated config struct: every field has
/// a sensible default from §6/§8 of the accompanying design notes, and
/// tests construct variants with `..ServerConfig::default()`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on.
    pub port: u16,
    /// `listen()` backlog.
    pub backlog: i32,
    /// Per-`recv` chunk size.
    pub rx_chunk: usize,
    /// Where file-backed mode persists committed packets.
    pub data_path: PathBuf,
    /// Which backing store a connection worker writes through.
    pub backing_mode: BackingMode,
    /// Daemonize after a successful bind (`-d`).
    pub daemonize: bool,
    /// How often the acceptor polls for a spurious wakeup before retrying
    /// `accept` when interrupted for a reason other than shutdown.
    pub accept_retry_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9000,
            backlog: 10,
            rx_chunk: 1024,
            data_path: PathBuf::from("/var/tmp/aesdsocketdata"),
            backing_mode: BackingMode::File,
            daemonize: false,
            accept_retry_delay: Duration::from_millis(10),
        }
    }
}

impl ServerConfig {
    /// Parses the single supported CLI flag, `-d`.
    ///
    /// No argument-parsing crate is introduced here; the server's entire
    /// surface is one boolean switch, same as the binary this config is
    /// modeled after.
    #[must_use]
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Self {
        let daemonize = args.into_iter().any(|a| a == "-d");
        Self { daemonize, ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_surface() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 9000);
        assert_eq!(config.backlog, 10);
        assert_eq!(config.rx_chunk, 1024);
        assert_eq!(config.backing_mode, BackingMode::File);
        assert!(!config.daemonize);
    }

    #[test]
    fn dash_d_enables_daemonize_and_nothing_else_does() {
        let config = ServerConfig::from_args(["packetd".to_string(), "-d".to_string()]);
        assert!(config.daemonize);

        let config = ServerConfig::from_args(["packetd".to_string()]);
        assert!(!config.daemonize);

        let config = ServerConfig::from_args(["packetd".to_string(), "--daemonize".to_string()]);
        assert!(!config.daemonize);
    }
}
