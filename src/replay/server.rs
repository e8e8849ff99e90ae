//! Local HTTP server answering from a mapping set

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{
    HeaderName, HeaderValue, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::mappings::MappingSet;
use crate::network::http::{error_response, read_body, text_response};
use crate::network::{OutboundRequest, MAX_BODY_SIZE};
use crate::recording::ResponseModel;
use crate::{MockwireError, Result};

/// Grace period for in-flight connections on shutdown
const SHUTDOWN_TIMEOUT_MS: u64 = 5000;

/// Stand-in for one upstream service, bound to an ephemeral local port
pub struct StandInServer {
    addr: SocketAddr,
    mappings: Arc<MappingSet>,
    shutdown_tx: broadcast::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl StandInServer {
    /// Bind to `127.0.0.1:0` and start serving `mappings`
    ///
    /// # Errors
    ///
    /// Returns error if the listener cannot be bound
    pub async fn start(mappings: Arc<MappingSet>) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, _) = broadcast::channel(1);

        let task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&mappings),
            shutdown_tx.subscribe(),
        ));

        info!("Stand-in server listening on {}", addr);

        Ok(Self {
            addr,
            mappings,
            shutdown_tx,
            task: Some(task),
        })
    }

    /// Bound address
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL, e.g. `http://127.0.0.1:38211`
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Mappings served by this server
    #[must_use]
    pub fn mappings(&self) -> &Arc<MappingSet> {
        &self.mappings
    }

    /// Stop accepting connections and wait for the accept loop to exit
    pub async fn shutdown(mut self) {
        self.shutdown_tx.send(()).ok();

        if let Some(task) = self.task.take() {
            let timeout = Duration::from_millis(SHUTDOWN_TIMEOUT_MS);
            if tokio::time::timeout(timeout, task).await.is_err() {
                warn!("Stand-in server {} did not stop in time", self.addr);
            }
        }
    }
}

impl Drop for StandInServer {
    fn drop(&mut self) {
        self.shutdown_tx.send(()).ok();
    }
}

async fn accept_loop(
    listener: TcpListener,
    mappings: Arc<MappingSet>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer_addr)) => {
                        let io = TokioIo::new(stream);
                        let mappings = Arc::clone(&mappings);

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let mappings = Arc::clone(&mappings);
                                async move { handle(req, &mappings).await }
                            });

                            let served = http1::Builder::new().serve_connection(io, service).await;
                            if let Err(e) = served {
                                if !e.is_incomplete_message() {
                                    warn!("Connection error from {}: {}", peer_addr, e);
                                }
                            }
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                debug!("Stand-in server shutting down");
                break;
            }
        }
    }
}

async fn handle(
    req: Request<Incoming>,
    mappings: &MappingSet,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match read_body(body, MAX_BODY_SIZE).await {
        Ok(body) => body,
        Err(e) => return Ok(error_response(&e)),
    };

    let request = OutboundRequest {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body,
    };

    let Some(model) = mappings.find(&request).await else {
        warn!("No mapping matches {} {}", request.method, request.uri);
        return Ok(text_response(
            StatusCode::NOT_FOUND,
            &format!("No mapping matches {} {}", request.method, request.uri),
        ));
    };

    debug!("Replaying {} for {} {}", model.status_code, request.method, request.uri);

    Ok(into_response(&model).unwrap_or_else(|e| error_response(&e)))
}

/// Build the replayed response; framing headers are recomputed
fn into_response(model: &ResponseModel) -> Result<Response<Full<Bytes>>> {
    let status = StatusCode::from_u16(model.status_code).map_err(|e| {
        MockwireError::Other(format!("Invalid status code {}: {e}", model.status_code))
    })?;

    let mut builder = Response::builder().status(status);
    for (name, values) in &model.headers {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            warn!("Skipping invalid header name {:?}", name);
            continue;
        };
        if name == CONTENT_LENGTH || name == TRANSFER_ENCODING || name == CONNECTION {
            continue;
        }
        for value in values {
            match HeaderValue::from_str(value) {
                Ok(value) => builder = builder.header(&name, value),
                Err(_) => warn!("Skipping invalid value for header {}", name),
            }
        }
    }

    let body = match &model.body_as_json {
        Some(json) if model.body_as_json_indented.unwrap_or(false) => {
            serde_json::to_string_pretty(json)?
        }
        Some(json) => serde_json::to_string(json)?,
        None => String::new(),
    };

    if model.body_as_json.is_some()
        && !builder
            .headers_ref()
            .is_some_and(|h| h.contains_key(CONTENT_TYPE))
    {
        builder = builder.header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    builder
        .body(Full::new(Bytes::from(body)))
        .map_err(|e| MockwireError::Other(format!("Failed to build response: {e}")))
}
