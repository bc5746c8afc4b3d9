//! Command-line arguments.

use std::path::PathBuf;

use annochat_client::{
    ClientConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PRESENCE_NAMESPACE, DEFAULT_SERVER_URL,
    DEFAULT_SOCKET_PATH, DEFAULT_TOKEN_URL,
};
use clap::Parser;

/// AnnoChat terminal client
#[derive(Parser, Debug)]
#[command(name = "annochat")]
#[command(about = "Anonymous one-on-one chat with a random stranger")]
#[command(version)]
pub struct Args {
    /// Matchmaking server base URL
    #[arg(short, long, env = "ANNOCHAT_SERVER", default_value = DEFAULT_SERVER_URL)]
    pub server: String,

    /// Socket.IO endpoint path on the server
    #[arg(long, env = "ANNOCHAT_SOCKET_PATH", default_value = DEFAULT_SOCKET_PATH)]
    pub socket_path: String,

    /// Namespace of the online-user feed
    #[arg(long, env = "ANNOCHAT_PRESENCE_NAMESPACE", default_value = DEFAULT_PRESENCE_NAMESPACE)]
    pub presence_namespace: String,

    /// Endpoint issuing chat tokens
    #[arg(long, env = "ANNOCHAT_TOKEN_URL", default_value = DEFAULT_TOKEN_URL)]
    pub token_url: String,

    /// Write logs to this file
    ///
    /// The terminal belongs to the UI, so nothing is logged without it.
    #[arg(long, env = "ANNOCHAT_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log filter when `RUST_LOG` is unset
    #[arg(long, env = "ANNOCHAT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Client configuration from the arguments.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            server_url: self.server.clone(),
            socket_path: self.socket_path.clone(),
            presence_namespace: self.presence_namespace.clone(),
            token_url: self.token_url.clone(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_client_config() {
        let args = Args::try_parse_from(["annochat"]).unwrap();
        assert_eq!(args.client_config(), ClientConfig::default());
        assert_eq!(args.log_file, None);
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "annochat",
            "--server",
            "http://localhost:3001",
            "--token-url",
            "http://localhost:3000/token",
            "--log-file",
            "/tmp/annochat.log",
        ])
        .unwrap();

        let config = args.client_config();
        assert_eq!(config.server_url, "http://localhost:3001");
        assert_eq!(config.token_url, "http://localhost:3000/token");
        assert_eq!(config.socket_url().as_deref(), Some("ws://localhost:3001/socket.io/?EIO=4&transport=websocket"));
        assert_eq!(args.log_file, Some(PathBuf::from("/tmp/annochat.log")));
    }
}
