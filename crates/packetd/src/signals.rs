//! SIGINT/SIGTERM handling: set the stop flag, then let the acceptor's own
//! `tokio::select!` over the listener unblock. All other signals keep
//! their default disposition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide stop flag, set exactly once by the signal task.
#[derive(Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Waits for SIGINT or SIGTERM, then sets `stop`.
///
/// Intended to be spawned once as its own task; returns after the first
/// signal of either kind, having already set the flag.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal(stop: StopFlag) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }

    tracing::info!("Caught signal, exiting");
    stop.set();
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal(stop: StopFlag) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Caught signal, exiting");
    stop.set();
}
