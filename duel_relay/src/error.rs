// Error types for starting and configuring the relay.
//
// Per-connection failures (handshake errors, socket errors, malformed frames)
// never surface here: they end that one connection and are logged. Only
// failures that stop the relay from running at all become a `RelayError`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },

    #[error("WebSocket path must start with '/': {0:?}")]
    InvalidPath(String),

    #[error("max_frame_bytes must be greater than zero")]
    InvalidFrameLimit,
}
