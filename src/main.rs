use anyhow::{anyhow, Context, Result};
use dotenv::dotenv;
use keepalived_checker::server::{self, LISTEN_PORT};
use keepalived_checker::{Config, Metrics, SystemInterfaces, Updater};
use log::{info, warn, LevelFilter};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Time in-flight scrapes get to finish once a shutdown signal arrives.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_logging();

    let config = Config::from_env().context("invalid configuration")?;
    info!("Using config:");
    info!("\tInterval : {:?}", config.interval);
    info!("\tVIP      : {}", config.vip);

    let metrics = Arc::new(Metrics::new().context("failed to build metrics registry")?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let updater = Updater::new(config, metrics.master(), Arc::new(SystemInterfaces));
    let updater_handle = updater.spawn(shutdown_rx.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], LISTEN_PORT));
    let mut server_shutdown = shutdown_rx.clone();
    let (local_addr, server) = server::bind(addr, metrics, async move {
        let _ = server_shutdown.wait_for(|stop| *stop).await;
    })?;
    info!("Starting web server on {}", local_addr);
    let mut server_handle = tokio::spawn(server);

    tokio::select! {
        signal = wait_for_signal() => signal?,
        finished = &mut server_handle => {
            let _ = shutdown_tx.send(true);
            return match finished {
                Ok(Ok(())) => Err(anyhow!("web server stopped unexpectedly")),
                Ok(Err(e)) => Err(e.into()),
                Err(e) => Err(e).context("web server task failed"),
            };
        }
    }

    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(SHUTDOWN_GRACE, server_handle).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!("Web server exited with error: {}", e),
        Ok(Err(e)) => warn!("Web server task failed: {}", e),
        Err(_) => warn!("Web server did not drain within {:?}, forcing shutdown", SHUTDOWN_GRACE),
    }
    if let Err(e) = updater_handle.await {
        warn!("Updater task failed: {}", e);
    }

    info!("Shutting down");
    Ok(())
}

fn init_logging() {
    let mut builder = pretty_env_logger::formatted_builder();
    match env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.filter_level(LevelFilter::Info),
    };
    builder.init();
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;
    let mut terminate = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    tokio::select! {
        _ = interrupt.recv() => info!("Received SIGINT"),
        _ = terminate.recv() => info!("Received SIGTERM"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("Received interrupt");
    Ok(())
}
