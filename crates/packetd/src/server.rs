//! §4.D: bind, accept loop, worker reaping, cooperative shutdown.

use crate::backing_store::{BackingStore, DeviceBackingStore, FileBackingStore};
use crate::config::{BackingMode, ServerConfig};
use crate::error::ServerError;
use crate::signals::{wait_for_shutdown_signal, StopFlag};
use crate::worker;
use chardev::Device;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;

/// Owns the listening socket, the shared backing store, and the set of
/// live connection-worker tasks.
///
/// Per the design note on worker-list ownership, only the acceptor task
/// ever touches `workers` — connection tasks signal completion simply by
/// returning, and `JoinSet` reaps them without any descriptor the workers
/// themselves need to reach into.
pub struct Server {
    listener: TcpListener,
    store: Arc<dyn BackingStore>,
    stop: StopFlag,
    rx_chunk: usize,
    backing_mode: BackingMode,
    data_path: PathBuf,
}

impl Server {
    /// Binds and listens on the configured port synchronously, before any
    /// async runtime exists.
    ///
    /// This is deliberately not async: daemonization (`-d`) forks the
    /// process after a successful bind but before the accept loop starts,
    /// and `fork()` is only safe while the process is still single-
    /// threaded. A multi-threaded Tokio runtime must not be running yet
    /// when that happens, so binding has to be a plain blocking syscall
    /// sequence the caller can do ahead of ever starting one. See
    /// [`Self::from_std`] for the async half that resumes after the fork.
    pub fn bind_std(config: &ServerConfig) -> Result<std::net::TcpListener, ServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        bind_reusable_blocking(addr, config.backlog).map_err(|source| ServerError::BindFailed { addr, source })
    }

    /// Takes ownership of an already-bound, already-listening socket and
    /// wraps it for the accept loop. Must be called from within a Tokio
    /// runtime.
    pub async fn from_std(listener: std::net::TcpListener, config: &ServerConfig) -> Result<Self, ServerError> {
        let addr = listener.local_addr().unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], config.port)));
        listener.set_nonblocking(true).map_err(|source| ServerError::BindFailed { addr, source })?;
        let listener = TcpListener::from_std(listener).map_err(|source| ServerError::BindFailed { addr, source })?;

        let store: Arc<dyn BackingStore> = match config.backing_mode {
            BackingMode::File => Arc::new(FileBackingStore::new(config.data_path.clone())),
            BackingMode::Device => Arc::new(DeviceBackingStore::new(Arc::new(Device::new()))),
        };

        Ok(Self {
            listener,
            store,
            stop: StopFlag::new(),
            rx_chunk: config.rx_chunk,
            backing_mode: config.backing_mode,
            data_path: config.data_path.clone(),
        })
    }

    /// Convenience for callers that never daemonize: binds and wraps in
    /// one step. Tests and the non-daemonizing path use this; the `-d`
    /// path in `main` uses [`Self::bind_std`] and [`Self::from_std`]
    /// separately so it can fork in between.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let listener = Self::bind_std(config)?;
        Self::from_std(listener, config).await
    }

    /// The local address actually bound, useful when `ServerConfig::port`
    /// is `0` and the OS assigns an ephemeral port.
    #[must_use]
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// A cloneable handle that can trigger the same shutdown path a
    /// SIGINT/SIGTERM would.
    #[must_use]
    pub fn stop_handle(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Runs the accept loop until the stop flag is set, then joins every
    /// outstanding worker before returning.
    pub async fn run(self) {
        let stop = self.stop.clone();
        let signal_task = tokio::spawn(wait_for_shutdown_signal(stop.clone()));

        let mut workers: JoinSet<()> = JoinSet::new();

        while !self.stop.is_set() {
            tokio::select! {
                biased;

                () = wait_for_stop(&self.stop) => {
                    break;
                }

                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let store = Arc::clone(&self.store);
                            let rx_chunk = self.rx_chunk;
                            workers.spawn(async move {
                                worker::run(stream, peer, store, rx_chunk).await;
                            });
                        }
                        Err(e) => match worker::classify_accept_error(&e) {
                            ServerError::Interrupted if self.stop.is_set() => break,
                            ServerError::Interrupted => continue,
                            other => tracing::warn!(%other, "accept failed"),
                        },
                    }
                }

                // Opportunistically reap workers that have already
                // finished; this is the JoinSet analogue of the SLIST
                // "skip descriptors whose done flag is set" reaping pass.
                Some(result) = workers.join_next(), if !workers.is_empty() => {
                    if let Err(e) = result {
                        tracing::warn!(%e, "connection worker panicked");
                    }
                }
            }
        }

        // Drain the rest: join every outstanding worker before returning.
        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::warn!(%e, "connection worker panicked during shutdown");
            }
        }

        // File-backed mode never truncates the data file except here:
        // unlink it on shutdown, treating "already gone" as success.
        if self.backing_mode == BackingMode::File {
            if let Err(e) = tokio::fs::remove_file(&self.data_path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(%e, path = %self.data_path.display(), "failed to remove backing data file");
                }
            }
        }

        signal_task.abort();
    }
}

async fn wait_for_stop(stop: &StopFlag) {
    while !stop.is_set() {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}

/// Plain blocking `socket()`/`setsockopt()`/`bind()`/`listen()`, matching
/// `open_listen_socket()` in the original server: `SO_REUSEADDR` and
/// `SO_REUSEPORT` are set before `bind` so a restarted server doesn't wait
/// out `TIME_WAIT` on the previous listener.
#[cfg(unix)]
fn bind_reusable_blocking(addr: SocketAddr, backlog: i32) -> std::io::Result<std::net::TcpListener> {
    use std::os::unix::io::FromRawFd;

    // SAFETY: every libc call below is checked for a negative (error)
    // return before the fd is trusted; `sockaddr_in` is a plain-old-data
    // struct fully initialized before `bind`.
    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0);
        if fd < 0 {
            return Err(std::io::Error::last_os_error());
        }

        let reuse: libc::c_int = 1;
        let opt_len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
        if libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            std::ptr::addr_of!(reuse).cast(),
            opt_len,
        ) < 0
        {
            let err = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }
        // Best-effort: not every platform's libc exposes SO_REUSEPORT, and
        // an unsupported option must not be fatal to startup.
        libc::setsockopt(fd, libc::SOL_SOCKET, libc::SO_REUSEPORT, std::ptr::addr_of!(reuse).cast(), opt_len);

        let sockaddr = libc::sockaddr_in {
            sin_family: libc::AF_INET as libc::sa_family_t,
            sin_port: addr.port().to_be(),
            sin_addr: libc::in_addr { s_addr: 0 }, // INADDR_ANY
            sin_zero: [0; 8],
        };

        let bind_result = libc::bind(
            fd,
            std::ptr::addr_of!(sockaddr).cast(),
            std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        );
        if bind_result < 0 {
            let err = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }

        if libc::listen(fd, backlog) < 0 {
            let err = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }

        Ok(std::net::TcpListener::from_raw_fd(fd))
    }
}

#[cfg(not(unix))]
fn bind_reusable_blocking(addr: SocketAddr, _backlog: i32) -> std::io::Result<std::net::TcpListener> {
    let socket = std::net::TcpListener::bind(addr)?;
    Ok(socket)
}
