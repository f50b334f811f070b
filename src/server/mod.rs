// Server module - hyper HTTP/1 service exposing the watermark compositor

pub mod handlers;

use bytes::Bytes;
use http::{HeaderValue, Request, Response};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::error::Error as StdError;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::config::Config;
use crate::error::ServiceError;
use crate::hosting::{ImageHost, ImgbbHost};
use crate::metrics::WatermarkMetrics;
use crate::security::UploadLimits;
use crate::watermark::{SourceFetcher, WatermarkProcessor};
use handlers::{error_response, route_name, ResponseBody};

/// Shared, immutable state behind every connection
pub struct AppState {
    pub(crate) processor: WatermarkProcessor,
    pub(crate) limits: UploadLimits,
    pub(crate) fetcher: SourceFetcher,
    pub(crate) host: Option<Arc<dyn ImageHost>>,
    pub(crate) jobs: Arc<Semaphore>,
    pub(crate) request_timeout: Duration,
}

impl AppState {
    /// Build the state from validated configuration
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let processor = WatermarkProcessor::new(config.watermark.clone())?;
        let fetcher = SourceFetcher::new(&config.fetch)?;

        let host: Option<Arc<dyn ImageHost>> = match &config.hosting {
            Some(hosting) => Some(Arc::new(ImgbbHost::new(hosting)?)),
            None => None,
        };

        Ok(Self {
            processor,
            limits: config.limits.clone(),
            fetcher,
            host,
            jobs: Arc::new(Semaphore::new(config.server.max_concurrent_jobs)),
            request_timeout: Duration::from_secs(config.server.request_timeout),
        })
    }

    /// Replace the image host (e.g. with an in-memory host in tests)
    pub fn with_host(mut self, host: Arc<dyn ImageHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn processor(&self) -> &WatermarkProcessor {
        &self.processor
    }
}

/// Handle one request end to end: timeout, routing, logging and metrics
pub async fn handle_request<B>(state: Arc<AppState>, req: Request<B>) -> Response<ResponseBody>
where
    B: Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let request_id = uuid::Uuid::new_v4().to_string();
    let method = req.method().clone();
    let endpoint = route_name(req.uri().path());
    let started = Instant::now();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %req.uri().path(),
    );

    let timeout = state.request_timeout;
    let result = match tokio::time::timeout(timeout, handlers::route(state, req))
        .instrument(span.clone())
        .await
    {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout(timeout.as_secs())),
    };

    let mut response = match result {
        Ok(response) => {
            WatermarkMetrics::global().record_request(endpoint, "ok");
            response
        }
        Err(error) => {
            WatermarkMetrics::global().record_request(endpoint, error.kind());
            let status = error.status_code();
            span.in_scope(|| {
                if status.is_server_error() {
                    tracing::error!(status = status.as_u16(), error = %error, "Request failed");
                } else {
                    tracing::warn!(status = status.as_u16(), error = %error, "Request rejected");
                }
            });
            error_response(&error)
        }
    };

    span.in_scope(|| {
        tracing::info!(
            status = response.status().as_u16(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Request completed"
        );
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Bound listener plus the state it serves
pub struct WatermarkServer {
    listener: TcpListener,
    state: Arc<AppState>,
}

impl WatermarkServer {
    /// Bind `addr` (use port 0 for an ephemeral port)
    pub async fn bind(addr: &str, state: AppState) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            state: Arc::new(state),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the process exits
    pub async fn run(self) -> std::io::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        tracing::info!(address = %addr, "Watermark server listening");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };
                    self.spawn_connection(stream, peer);
                }
            }
        }
    }

    fn spawn_connection(&self, stream: tokio::net::TcpStream, peer: SocketAddr) {
        let state = self.state.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(handle_request(state, req).await) }
            });

            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(peer = %peer, error = %e, "Connection closed with error");
            }
        });
    }
}

/// Bind per configuration and serve until ctrl-c
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let server = WatermarkServer::bind(&config.server.listen_addr(), state).await?;

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
