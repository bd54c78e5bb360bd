//! Server configuration, bind, and accept loop.
//!
//! This ties the layers together: transport → protocol → lobby/sessions.
//! One lobby is spawned at bind time and its handle is passed to every
//! connection bridge; there is no global state.

use voltgrid_lobby::{spawn_lobby, LobbyConfig, LobbyHandle};
use voltgrid_transport::{Transport, WebSocketTransport};

use crate::bridge;
use crate::ServerError;

/// Default listen port when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8080;

/// Top-level server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// Settings handed to the lobby (and through it, to sessions).
    pub lobby: LobbyConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            lobby: LobbyConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Builds a config from the environment: `PORT` selects the listen
    /// port. An unparsable value falls back to the default with a
    /// warning.
    pub fn from_env() -> Self {
        let port = match std::env::var("PORT") {
            Ok(raw) => match raw.parse::<u16>() {
                Ok(port) => port,
                Err(_) => {
                    tracing::warn!(
                        %raw,
                        "unparsable PORT, falling back to {DEFAULT_PORT}"
                    );
                    DEFAULT_PORT
                }
            },
            Err(_) => DEFAULT_PORT,
        };
        Self {
            bind_addr: format!("0.0.0.0:{port}"),
            ..Self::default()
        }
    }
}

/// A running Voltgrid server.
pub struct Server {
    transport: WebSocketTransport,
    lobby: LobbyHandle,
}

impl Server {
    /// Binds the listener and spawns the lobby.
    ///
    /// # Errors
    /// Returns the bind failure, the only error in the system the
    /// binary treats as fatal.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let transport = WebSocketTransport::bind(&config.bind_addr).await?;
        let lobby = spawn_lobby(config.lobby);
        Ok(Self { transport, lobby })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop: one bridge per connection, until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), ServerError> {
        tracing::info!("voltgrid server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    tokio::spawn(bridge::run_connection(
                        conn,
                        self.lobby.clone(),
                    ));
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
