//! HTTP registration API
//!
//! Small surface for the surrounding application:
//!
//! - `POST /register-vault` - `{"wallet_id": ...}`; registers the wallet for
//!   monitoring and triggers an immediate out-of-band check
//! - `GET  /vaults`  - list of watched identities
//! - `GET  /health`  - liveness probe

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::error::AgentError;
use crate::watchlist::Watchlist;

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    wallet_id: String,
}

/// HTTP server state
pub struct HttpApi {
    watchlist: Arc<Watchlist>,
    nudge_tx: mpsc::Sender<String>,
    bind_addr: SocketAddr,
}

impl HttpApi {
    pub fn new(
        watchlist: Arc<Watchlist>,
        nudge_tx: mpsc::Sender<String>,
        bind_addr: SocketAddr,
    ) -> Self {
        Self {
            watchlist,
            nudge_tx,
            bind_addr,
        }
    }

    /// Serve until shutdown.
    pub async fn run(
        self: Arc<Self>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), AgentError> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        info!(addr = %self.bind_addr, "Agent HTTP API listening");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("HTTP API shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, remote_addr) = accepted?;
                    let io = TokioIo::new(stream);
                    let api = self.clone();

                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let api = api.clone();
                            async move { api.handle_request(req).await }
                        });

                        if let Err(err) = http1::Builder::new()
                            .serve_connection(io, service)
                            .await
                        {
                            warn!(addr = %remote_addr, error = %err, "Connection error");
                        }
                    });
                }
            }
        }
    }

    /// Route requests to handlers
    async fn handle_request(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let path = req.uri().path().to_string();
        let method = req.method().clone();
        debug!(method = %method, path = %path, "Incoming request");

        match (method, path.as_str()) {
            (Method::GET, "/health") => Ok(json_response(
                StatusCode::OK,
                &serde_json::json!({ "status": "ok" }),
            )),

            (Method::GET, "/vaults") => {
                let vaults = self.watchlist.watched().await;
                Ok(json_response(
                    StatusCode::OK,
                    &serde_json::json!({ "vaults": vaults }),
                ))
            }

            (Method::POST, "/register-vault") => {
                let body = req.into_body().collect().await?.to_bytes();
                self.handle_register(&body).await
            }

            _ => Ok(json_response(
                StatusCode::NOT_FOUND,
                &serde_json::json!({ "error": "not found" }),
            )),
        }
    }

    async fn handle_register(
        &self,
        body: &[u8],
    ) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let request: RegisterRequest = match serde_json::from_slice(body) {
            Ok(r) => r,
            Err(e) => {
                return Ok(json_response(
                    StatusCode::BAD_REQUEST,
                    &serde_json::json!({ "error": format!("invalid body: {e}") }),
                ));
            }
        };
        if request.wallet_id.is_empty() {
            return Ok(json_response(
                StatusCode::BAD_REQUEST,
                &serde_json::json!({ "error": "wallet_id required" }),
            ));
        }

        let added = self.watchlist.register(&request.wallet_id).await;

        // Immediate out-of-band check; dropped only if the monitor is
        // saturated, in which case the next cycle covers it anyway.
        if let Err(e) = self.nudge_tx.try_send(request.wallet_id.clone()) {
            debug!(wallet = %request.wallet_id, error = %e, "Nudge channel full; next cycle will pick it up");
        }

        Ok(json_response(
            StatusCode::OK,
            &serde_json::json!({ "registered": request.wallet_id, "added": added }),
        ))
    }
}

fn json_response(status: StatusCode, value: &serde_json::Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(value.to_string())))
        .unwrap()
}
