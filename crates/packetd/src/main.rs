use packetd::{Server, ServerConfig};

/// Not `#[tokio::main]`: binding and, when `-d` is given, forking must both
/// happen before the multi-threaded Tokio runtime starts (see
/// [`Server::bind_std`]), so the runtime is built explicitly after that's
/// settled rather than ambiently by a macro.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::from_args(std::env::args().skip(1));

    let listener = match Server::bind_std(&config) {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%e, "failed to bind listening socket");
            std::process::exit(1);
        }
    };

    if config.daemonize {
        if let Err(e) = packetd::daemon::daemonize() {
            tracing::error!(%e, "failed to daemonize");
            std::process::exit(1);
        }
        tracing::info!("daemon mode enabled");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(%e, "failed to start async runtime");
            std::process::exit(1);
        }
    };

    runtime.block_on(async move {
        let server = match Server::from_std(listener, &config).await {
            Ok(server) => server,
            Err(e) => {
                tracing::error!(%e, "failed to take over bound listener");
                std::process::exit(1);
            }
        };
        server.run().await;
    });
}
