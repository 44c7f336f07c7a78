use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use http_body_util::Full;
use hyper::{Request, Response, body::Bytes, body::Incoming, header::CONTENT_TYPE, service::service_fn};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::net::TcpListener;

async fn serve_req(
    _req: Request<Incoming>,
    registry: Arc<Registry>,
) -> Result<Response<Full<Bytes>>, hyper::http::Error> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut result = Vec::new();
    match encoder.encode(&metric_families, &mut result) {
        Ok(_) => Response::builder()
            .status(200)
            .header(CONTENT_TYPE, encoder.format_type())
            .body(Full::new(Bytes::from(result))),
        Err(e) => {
            error!("{}", e);
            Response::builder().status(500).body(Full::default())
        }
    }
}

/// Serves the registry on `addr` until the process shuts down. A failed
/// bind is returned to the caller, an unreachable metrics endpoint must
/// abort startup instead of leaving the controller silently unobserved.
pub(crate) async fn start_prometheus_metrics_server(
    addr: SocketAddr,
    registry: Registry,
) -> anyhow::Result<()> {
    let registry = Arc::new(registry);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind metrics endpoint {}", addr))?;
    debug!("Listening on http://{}", addr);
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req| serve_req(req, registry.clone()));
                    if let Err(e) = hyper::server::conn::http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        debug!("metrics connection error: {}", e);
                    }
                });
            }
            Err(e) => error!("metrics server accept error: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_failure_is_an_error() {
        let occupied = TcpListener::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
            .await
            .unwrap();
        let addr = occupied.local_addr().unwrap();
        let result = start_prometheus_metrics_server(addr, Registry::new()).await;
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains(&format!("failed to bind metrics endpoint {}", addr)));
    }
}
