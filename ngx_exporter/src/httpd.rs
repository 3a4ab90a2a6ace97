//! The exposition listener.
//!
//! Every request on the metrics path runs one collection cycle, publishes
//! the snapshot into a Prometheus recorder and renders it. Collection is
//! driven entirely by whoever polls this listener.

use std::{convert::Infallible, future::Future, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode, header};
use http_body_util::Full;
use hyper::{body::Incoming, service::service_fn};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
};
use metrics_exporter_prometheus::PrometheusRecorder;
use tokio::{net::TcpListener, pin, task::JoinSet};
use tracing::{debug, error, info};

use crate::collector::Collector;

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`run`]
pub enum Error {
    /// Wrapper for [`std::io::Error`].
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

struct Context {
    metrics_path: String,
    landing_page: Bytes,
    collector: Arc<Collector>,
    recorder: Arc<PrometheusRecorder>,
}

fn landing_page(metrics_path: &str) -> Bytes {
    Bytes::from(format!(
        "<html>\n\
         <head>\n<title>nginx exporter</title>\n</head>\n\
         <body>\n<h1>nginx exporter</h1>\n\
         <p><a href=\"{metrics_path}\">Metrics</a></p>\n\
         </body>\n\
         </html>"
    ))
}

/// Bind `addr` and serve until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if `addr` cannot be bound.
pub async fn run<F>(
    addr: SocketAddr,
    metrics_path: String,
    collector: Arc<Collector>,
    recorder: Arc<PrometheusRecorder>,
    shutdown: F,
) -> Result<(), Error>
where
    F: Future<Output = ()>,
{
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {addr}, metrics at {metrics_path}");
    serve(listener, metrics_path, collector, recorder, shutdown).await;
    Ok(())
}

/// Serve on an already bound `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    metrics_path: String,
    collector: Arc<Collector>,
    recorder: Arc<PrometheusRecorder>,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    let ctx = Arc::new(Context {
        landing_page: landing_page(&metrics_path),
        metrics_path,
        collector,
        recorder,
    });
    let mut join_set = JoinSet::new();

    pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("Shutdown signal received, stopping accept loop.");
                break;
            }

            incoming = listener.accept() => {
                let (stream, addr) = match incoming {
                    Ok(sa) => sa,
                    Err(e) => {
                        error!("Error accepting connection: {e}");
                        continue;
                    }
                };
                debug!("Accepted connection from {addr}");

                let ctx = Arc::clone(&ctx);
                join_set.spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let ctx = Arc::clone(&ctx);
                        let method = req.method().clone();
                        let path = req.uri().path().to_string();
                        async move { Ok::<_, Infallible>(respond(&ctx, &method, &path).await) }
                    });
                    let builder = auto::Builder::new(TokioExecutor::new());
                    if let Err(e) = builder
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        error!("Error serving {addr}: {e}");
                    }
                });
            }
        }
    }

    drop(listener);
    while join_set.join_next().await.is_some() {}
}

async fn respond(ctx: &Context, method: &Method, path: &str) -> Response<Full<Bytes>> {
    if method != Method::GET {
        return plain(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
    }

    if path == ctx.metrics_path {
        let snapshot = ctx.collector.collect().await;
        metrics::with_local_recorder(ctx.recorder.as_ref(), || snapshot.expose());
        let body = ctx.recorder.handle().render();
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)
            .body(Full::new(Bytes::from(body)))
            .unwrap_or_else(|_| plain(StatusCode::INTERNAL_SERVER_ERROR, "render failed"))
    } else if path == "/" {
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
            .body(Full::new(ctx.landing_page.clone()))
            .unwrap_or_else(|_| plain(StatusCode::INTERNAL_SERVER_ERROR, "render failed"))
    } else {
        plain(StatusCode::NOT_FOUND, "not found")
    }
}

fn plain(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *resp.status_mut() = status;
    resp
}
