use keepalived_checker::server::{bind, ServerError};
use keepalived_checker::Metrics;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;

fn localhost() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}

#[tokio::test]
async fn test_serves_metrics_and_shuts_down() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let metrics = Arc::new(Metrics::new()?);
    metrics.master().set_master(true);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let (addr, server) = bind(localhost(), Arc::clone(&metrics), async move {
        let _ = stop_rx.await;
    })?;
    let handle = tokio::spawn(server);

    let body = reqwest::get(format!("http://{}/metrics", addr)).await?.text().await?;
    assert!(body.contains("\nis_master 1\n"));

    let page = reqwest::get(format!("http://{}/", addr)).await?;
    assert_eq!(page.status(), reqwest::StatusCode::OK);
    assert!(page.text().await?.contains("Keepalived-IPVS Checker"));

    stop_tx.send(()).unwrap();
    timeout(Duration::from_secs(10), handle).await???;
    Ok(())
}

#[tokio::test]
async fn test_bind_conflict_is_reported() {
    let metrics = Arc::new(Metrics::new().unwrap());
    let (addr, _server) = bind(localhost(), Arc::clone(&metrics), std::future::pending::<()>()).unwrap();

    match bind(addr, metrics, std::future::pending::<()>()) {
        Err(ServerError::Bind { addr: failed, .. }) => assert_eq!(failed, addr),
        Err(other) => panic!("expected bind error, got {}", other),
        Ok(_) => panic!("second bind on {} succeeded", addr),
    }
}
