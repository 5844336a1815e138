//! Notification ingress server lifecycle and handler.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use proxyfleet_core::CompletionReport;

/// Errors from the ingress lifecycle.
#[derive(Debug, Error)]
pub enum IngressError {
    #[error("failed to bind ingress on {0}: {1}")]
    Bind(SocketAddr, String),
}

/// Wire request: the report travels as a JSON string inside the envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct NotifyRequest {
    pub message: String,
}

/// Wire response.
#[derive(Debug, Serialize, Deserialize)]
pub struct NotifyResponse {
    pub received: bool,
}

#[derive(Clone)]
struct IngressState {
    reports: mpsc::Sender<CompletionReport>,
}

/// The notification ingress service.
///
/// Two lifecycle states: stopped and running. [`start`](Self::start)
/// binds the listening socket and returns once the port accepts
/// connections; [`stop`](Self::stop) is idempotent and safe to call
/// when never started.
pub struct NotifyIngress {
    bind_addr: SocketAddr,
    reports: mpsc::Sender<CompletionReport>,
    shutdown: Option<watch::Sender<bool>>,
    serve_task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl NotifyIngress {
    /// Create a stopped ingress that will bind `0.0.0.0:port`
    /// (`port = 0` picks an ephemeral port).
    pub fn new(port: u16, reports: mpsc::Sender<CompletionReport>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            reports,
            shutdown: None,
            serve_task: None,
            local_addr: None,
        }
    }

    /// Bind and start serving. Returns the bound address; by the time
    /// this returns the socket is accepting connections.
    pub async fn start(&mut self) -> Result<SocketAddr, IngressError> {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .map_err(|e| IngressError::Bind(self.bind_addr, e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| IngressError::Bind(self.bind_addr, e.to_string()))?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let router = build_router(self.reports.clone());

        let serve_task = tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            });
            if let Err(e) = server.await {
                error!(error = %e, "notification ingress serve error");
            }
        });

        self.shutdown = Some(shutdown_tx);
        self.serve_task = Some(serve_task);
        self.local_addr = Some(addr);
        info!(%addr, "notification ingress listening");
        Ok(addr)
    }

    /// Address the ingress is bound to, if running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.serve_task.is_some()
    }

    /// Stop serving and close the listening port. Graceful shutdown is
    /// given a short grace period; handlers still blocked on a full
    /// report channel are aborted after it.
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(mut task) = self.serve_task.take() {
            if tokio::time::timeout(Duration::from_secs(5), &mut task)
                .await
                .is_err()
            {
                task.abort();
                let _ = task.await;
            }
            info!("notification ingress stopped");
        }
        self.local_addr = None;
    }
}

fn build_router(reports: mpsc::Sender<CompletionReport>) -> Router {
    Router::new()
        .route("/notify", post(notify))
        .with_state(IngressState { reports })
}

/// POST /notify
async fn notify(
    State(state): State<IngressState>,
    Json(req): Json<NotifyRequest>,
) -> (StatusCode, Json<NotifyResponse>) {
    let report: CompletionReport = match serde_json::from_str(&req.message) {
        Ok(report) => report,
        Err(e) => {
            warn!(error = %e, "discarding malformed completion report");
            return (StatusCode::BAD_REQUEST, Json(NotifyResponse { received: false }));
        }
    };

    // Blocks the caller while the channel is full; the aggregator is the
    // only consumer.
    if state.reports.send(report).await.is_err() {
        warn!("report channel closed, no publish in flight");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(NotifyResponse { received: false }),
        );
    }

    (StatusCode::OK, Json(NotifyResponse { received: true }))
}
