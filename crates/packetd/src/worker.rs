//! Per-connection handling: §4.E.

use crate::backing_store::BackingStore;
use crate::error::ServerError;
use cmdring::Reassembler;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Exact textual prefix of the inline seek control command. Length-checked
/// against the whole packet, not just the prefix, so a truncated or
/// extended variant falls through to ordinary storage/ignoring rather than
/// being partially parsed.
const SEEK_PREFIX: &str = "AESDCHAR_IOCSEEKTO:";

/// Parses `AESDCHAR_IOCSEEKTO:<u32>,<u32>\n`. Returns `None` for anything
/// that doesn't match exactly — malformed variants are silently ignored
/// per §9, never reported as a protocol error.
fn parse_seek_command(packet: &[u8]) -> Option<(u32, u32)> {
    let text = std::str::from_utf8(packet).ok()?;
    let rest = text.strip_prefix(SEEK_PREFIX)?;
    let rest = rest.strip_suffix('\n')?;
    let (cmd, offset) = rest.split_once(',')?;
    let command_index: u32 = cmd.parse().ok()?;
    let byte_offset: u32 = offset.parse().ok()?;
    Some((command_index, byte_offset))
}

/// Runs one client connection to completion: receive, reassemble, commit,
/// echo, repeat, until the peer closes or a fatal I/O error occurs.
///
/// Never returns an error — every failure path is already terminal for
/// this connection and is logged at the call site instead of propagated,
/// matching the "abort worker, main loop unaffected" contract of §7.
pub async fn run(
    mut stream: TcpStream,
    peer: std::net::SocketAddr,
    store: Arc<dyn BackingStore>,
    rx_chunk: usize,
) {
    tracing::info!("Accepted connection from {peer}");

    let mut reassembler = Reassembler::new();
    let mut buf = vec![0u8; rx_chunk];

    'conn: loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => break 'conn, // peer closed
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue 'conn,
            Err(_) => break 'conn,
        };

        for packet in reassembler.ingest(&buf[..n]) {
            let seek_command = store.interprets_seek_commands().then(|| parse_seek_command(&packet)).flatten();

            let echo = if let Some((command_index, byte_offset)) = seek_command {
                if let Err(err) = store.seek_to(command_index, byte_offset).await {
                    tracing::debug!(%peer, ?err, "seek command rejected");
                }
                // Not stored, but §4.E requires streaming the store back
                // regardless of which branch handled the packet.
                store.echo().await
            } else {
                store.commit_and_echo(&packet).await
            };

            let echo = match echo {
                Ok(echo) => echo,
                Err(err) => {
                    tracing::warn!(%peer, ?err, "backing store access failed, closing connection");
                    break 'conn;
                }
            };

            if let Err(e) = stream.write_all(&echo).await {
                tracing::debug!(%peer, %e, "echo write failed, closing connection");
                break 'conn;
            }
        }
    }

    let _ = stream.shutdown().await;
    tracing::info!("Closed connection from {peer}");
}

/// Maps a lower-level I/O error observed outside `run`'s own try/catch
/// sites (e.g. at accept time) into the abstract taxonomy used elsewhere
/// in this crate.
pub fn classify_accept_error(err: &std::io::Error) -> ServerError {
    if err.kind() == std::io::ErrorKind::Interrupted {
        ServerError::Interrupted
    } else {
        ServerError::Io(std::io::Error::new(err.kind(), err.to_string()))
    }
}
