use main_error::MainResult;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod collector;
mod config;
mod publisher;
mod scheduler;
mod service;
mod source;
mod storage;
#[cfg(test)]
mod testing;
mod topology;
mod weather;

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "unable to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }

    cancel.cancel();
}

#[tokio::main]
async fn main() -> MainResult {
    tracing_subscriber::fmt::init();

    let config_file = std::env::args()
        .nth(1)
        .ok_or("usage: weather-collector config_file.toml")?;
    let topology = config::read(config_file)?;

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    topology::run(topology, cancel).await?;

    Ok(())
}
