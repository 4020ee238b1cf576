//! Loopback HTTP server polled by the in-Nuke client.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ActionsQueue;
use nuke_openjd_types::PathMappingRules;

/// Environment variable carrying the server address for the client process.
pub const SOCKET_PATH_ENV: &str = "NUKE_ADAPTOR_SOCKET_PATH";

struct ServerState {
    queue: ActionsQueue,
    path_mapping_rules: PathMappingRules,
}

/// Host configuration for the adaptor IPC server.
///
/// The client inside Nuke polls `GET /action` for the next sticky-session
/// command and fetches `GET /path_mapping_rules` once at startup.
pub struct AdaptorServer {
    state: Arc<ServerState>,
}

impl AdaptorServer {
    /// Create a server for the given queue and rule set. The server only
    /// ever binds a loopback ephemeral port; the actions feed is strictly
    /// host-local.
    pub fn new(queue: ActionsQueue, path_mapping_rules: PathMappingRules) -> Self {
        Self {
            state: Arc::new(ServerState {
                queue,
                path_mapping_rules,
            }),
        }
    }

    /// Start serving and return a handle for inspection and shutdown.
    pub async fn start(self) -> Result<RunningAdaptorServer> {
        let bind_address = SocketAddr::from(([127, 0, 0, 1], 0));
        let router = Router::new()
            .route("/action", get(next_action))
            .route("/path_mapping_rules", get(path_mapping_rules))
            .with_state(Arc::clone(&self.state));

        let listener = tokio::net::TcpListener::bind(bind_address).await?;
        let bound_address = listener.local_addr()?;
        debug!(address = %bound_address, "adaptor server listening");

        let cancellation_token = CancellationToken::new();
        let server_handle = tokio::spawn({
            let shutdown = cancellation_token.child_token();
            async move {
                let _ = axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        shutdown.cancelled().await;
                    })
                    .await;
            }
        });

        Ok(RunningAdaptorServer {
            bound_address,
            cancellation_token,
            server_handle,
        })
    }
}

/// Runtime handle for a running adaptor server.
#[derive(Debug)]
pub struct RunningAdaptorServer {
    bound_address: SocketAddr,
    cancellation_token: CancellationToken,
    server_handle: JoinHandle<()>,
}

impl RunningAdaptorServer {
    /// The bound socket address, exported to the client through
    /// [`SOCKET_PATH_ENV`].
    pub fn bound_address(&self) -> SocketAddr {
        self.bound_address
    }

    /// Stop the server and wait for the serve task to finish.
    pub async fn stop(self) -> Result<()> {
        self.cancellation_token.cancel();
        self.server_handle
            .await
            .map_err(|error| anyhow!("adaptor server task failed: {error}"))?;
        Ok(())
    }
}

async fn next_action(State(state): State<Arc<ServerState>>) -> Response {
    match state.queue.dequeue() {
        Some(action) => {
            debug!(action = %action.name, "handing action to client");
            Json(action).into_response()
        }
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn path_mapping_rules(State(state): State<Arc<ServerState>>) -> Response {
    Json(serde_json::json!({
        "path_mapping_rules": state.path_mapping_rules,
    }))
    .into_response()
}
