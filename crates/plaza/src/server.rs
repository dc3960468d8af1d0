//! `PlazaServer` builder and server loop.
//!
//! This is the entry point for running a Plaza server. It ties together
//! all the layers: transport → protocol → session → room.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use plaza_protocol::{Codec, ConnectParams, JsonCodec};
use plaza_session::SessionConfig;
use plaza_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{PlazaError, SessionController};

/// Address used when the builder is not given one.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) controller: SessionController,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Plaza server.
///
/// # Example
///
/// ```rust,no_run
/// use plaza::prelude::*;
///
/// # async fn start() -> Result<(), PlazaError> {
/// let server = PlazaServer::builder()
///     .bind("0.0.0.0:8000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct PlazaServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
}

impl PlazaServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            session_config: SessionConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets how long a dropped client keeps its place.
    pub fn reconnect_grace(mut self, grace: Duration) -> Self {
        self.session_config.reconnect_grace = grace;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`. Upgrades whose query lacks
    /// `client_id` or `room_id` are refused with HTTP 400 before a
    /// connection ever exists.
    pub async fn build(self) -> Result<PlazaServer<JsonCodec>, PlazaError> {
        let transport =
            WebSocketTransport::bind_with_filter(&self.bind_addr, |query| {
                ConnectParams::from_query(query)
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            })
            .await?;

        let state = Arc::new(ServerState {
            controller: SessionController::new(self.session_config),
            codec: JsonCodec,
        });

        Ok(PlazaServer { transport, state })
    }
}

impl Default for PlazaServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Plaza server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct PlazaServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl PlazaServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> PlazaServerBuilder {
        PlazaServerBuilder::new()
    }
}

impl<C: Codec> PlazaServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// A handle on the server's session state, for inspection.
    pub fn controller(&self) -> SessionController {
        self.state.controller.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), PlazaError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves.
    ///
    /// Connections already being handled are not waited for.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), PlazaError> {
        tracing::info!(addr = %self.local_addr(), "plaza server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested, no longer accepting");
                    self.transport.shutdown().await?;
                    return Ok(());
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "listener stopped");
                        return Err(e.into());
                    }
                },
            }
        }
    }
}
