//! HTTP exporter: a landing page and the Prometheus scrape endpoint.

use crate::metrics::Metrics;
use hyper::service::make_service_fn;
use log::error;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

/// Port the exporter listens on.
pub const LISTEN_PORT: u16 = 8080;
/// Time allowed for a client to send its request headers.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);
/// Time allowed for producing a response body.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub const LANDING_PAGE: &str = r#"<html>
<head><title>Keepalived-IPVS Checker</title></head>
<body>
<h1>Keepalived-IPVS Checker</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>"#;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: hyper::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] hyper::Error),
}

/// `/` and `/metrics`, answered for any method.
pub fn routes(
    metrics: Arc<Metrics>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone + Send + Sync + 'static {
    let index = warp::path::end().map(|| warp::reply::html(LANDING_PAGE));

    let scrape = warp::path("metrics")
        .and(warp::path::end())
        .and(with_metrics(metrics))
        .and_then(metrics_handler);

    index.or(scrape)
}

fn with_metrics(
    metrics: Arc<Metrics>,
) -> impl Filter<Extract = (Arc<Metrics>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&metrics))
}

async fn metrics_handler(metrics: Arc<Metrics>) -> Result<Response, Infallible> {
    let rendered = tokio::time::timeout(
        WRITE_TIMEOUT,
        tokio::task::spawn_blocking(move || metrics.gather()),
    )
    .await;

    let response = match rendered {
        Ok(Ok(Ok(body))) => {
            warp::reply::with_header(body, "content-type", METRICS_CONTENT_TYPE).into_response()
        }
        Ok(Ok(Err(e))) => {
            error!("Failed to render metrics: {}", e);
            internal_error()
        }
        Ok(Err(e)) => {
            error!("Metrics task failed: {}", e);
            internal_error()
        }
        Err(_) => {
            error!("Rendering metrics took longer than {:?}", WRITE_TIMEOUT);
            internal_error()
        }
    };
    Ok(response)
}

fn internal_error() -> Response {
    warp::reply::with_status("failed to render metrics", StatusCode::INTERNAL_SERVER_ERROR)
        .into_response()
}

/// Bind the exporter to `addr`.
///
/// Returns the bound address and a future that serves requests until
/// `shutdown` resolves, then waits for in-flight requests to finish.
/// Binding happens before this returns, so a taken port is reported here.
pub fn bind<F>(
    addr: SocketAddr,
    metrics: Arc<Metrics>,
    shutdown: F,
) -> Result<(SocketAddr, impl Future<Output = Result<(), ServerError>>), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let service = warp::service(routes(metrics));
    let make_service = make_service_fn(move |_| {
        let service = service.clone();
        async move { Ok::<_, Infallible>(service) }
    });

    let server = hyper::Server::try_bind(&addr)
        .map_err(|source| ServerError::Bind { addr, source })?
        .http1_header_read_timeout(READ_TIMEOUT)
        .serve(make_service);
    let local_addr = server.local_addr();
    let graceful = server.with_graceful_shutdown(shutdown);

    Ok((local_addr, async move { graceful.await.map_err(ServerError::Serve) }))
}
