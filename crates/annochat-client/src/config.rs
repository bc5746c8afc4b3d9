//! Client configuration.

use std::time::Duration;

/// Default matchmaking server.
pub const DEFAULT_SERVER_URL: &str = "https://muntajir.me";

/// Default Socket.IO endpoint path.
pub const DEFAULT_SOCKET_PATH: &str = "/socket.io";

/// Default presence namespace.
pub const DEFAULT_PRESENCE_NAMESPACE: &str = "/presence";

/// Default token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "http://localhost:3000/api/get-socket-token";

/// Default time allowed for a WebSocket or token request to complete.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how the client connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Matchmaking server base URL (`http(s)://host[:port]`).
    pub server_url: String,
    /// Socket.IO endpoint path on the server.
    pub socket_path: String,
    /// Namespace of the presence feed.
    pub presence_namespace: String,
    /// Token endpoint URL.
    pub token_url: String,
    /// Timeout for opening a socket or fetching a token.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_owned(),
            socket_path: DEFAULT_SOCKET_PATH.to_owned(),
            presence_namespace: DEFAULT_PRESENCE_NAMESPACE.to_owned(),
            token_url: DEFAULT_TOKEN_URL.to_owned(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// WebSocket URL of the Engine.IO endpoint.
    ///
    /// Maps `https` to `wss` and `http` to `ws`. `None` for any other scheme.
    pub fn socket_url(&self) -> Option<String> {
        let base = self.server_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else if base.starts_with("wss://") || base.starts_with("ws://") {
            base.to_owned()
        } else {
            return None;
        };

        let path = self.socket_path.trim_matches('/');
        Some(format!("{base}/{path}/?EIO=4&transport=websocket"))
    }
}
