// Relay configuration: defaults, TOML file, and command-line overrides.
//
// Settings come from three layers, lowest priority first: built-in defaults,
// an optional TOML file (`--config`), and command-line overrides. The merged
// `RelayConfig` is what `server::start_relay` consumes.
//
// Example file:
//
// ```toml
// listen_addr = "0.0.0.0:8081"
// ws_path = "/ws"
// max_frame_bytes = 65536
//
// [logging]
// level = "info"
// json_format = false
// ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Command-line arguments for the `relay` binary.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Two-slot realtime WebSocket relay", long_about = None)]
pub struct Args {
    /// TOML configuration file. Missing files fall back to defaults.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen address, e.g. "0.0.0.0:8081". Overrides the config file.
    #[arg(short, long)]
    pub listen: Option<SocketAddr>,

    /// WebSocket endpoint path. Overrides the config file.
    #[arg(short, long)]
    pub path: Option<String>,

    /// Enable debug logging.
    #[arg(short, long)]
    pub debug: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}

/// Settings for one relay instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address to bind. Port 0 lets the OS pick (useful in tests).
    pub listen_addr: SocketAddr,
    /// Only WebSocket upgrades for this path are accepted.
    pub ws_path: String,
    /// Largest accepted WebSocket message, in bytes.
    pub max_frame_bytes: usize,
    pub logging: LoggingSettings,
}

/// Logging output settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter used when `RUST_LOG` is not set: "trace", "debug", "info", ...
    pub level: String,
    /// Emit structured JSON instead of human-readable lines.
    pub json_format: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8081)),
            ws_path: "/ws".into(),
            max_frame_bytes: duel_protocol::MAX_FRAME_BYTES,
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json_format: false,
        }
    }
}

impl RelayConfig {
    /// Read a TOML config file. A missing file yields the defaults; an
    /// unreadable or malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, RelayError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(RelayError::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&text).map_err(|source| RelayError::ConfigParse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    /// Apply command-line overrides on top of this config.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(listen) = args.listen {
            self.listen_addr = listen;
        }
        if let Some(path) = &args.path {
            self.ws_path = path.clone();
        }
        if args.debug {
            self.logging.level = "debug".into();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), RelayError> {
        if !self.ws_path.starts_with('/') {
            return Err(RelayError::InvalidPath(self.ws_path.clone()));
        }
        if self.max_frame_bytes == 0 {
            return Err(RelayError::InvalidFrameLimit);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_original_relay() {
        let config = RelayConfig::default();
        assert_eq!(config.listen_addr.port(), 8081);
        assert_eq!(config.ws_path, "/ws");
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ws_path = \"/duel\"\n[logging]\njson_format = true").unwrap();

        let config = RelayConfig::load(file.path()).unwrap();
        assert_eq!(config.ws_path, "/duel");
        assert!(config.logging.json_format);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.listen_addr, RelayConfig::default().listen_addr);
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = RelayConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "listen_addr = 12").unwrap();
        assert!(matches!(
            RelayConfig::load(file.path()),
            Err(RelayError::ConfigParse { .. })
        ));
    }

    #[test]
    fn args_override_file() {
        let mut config = RelayConfig::default();
        let args = Args::parse_from([
            "relay",
            "--listen",
            "0.0.0.0:9000",
            "--path",
            "/arena",
            "--debug",
        ]);
        config.apply_args(&args);
        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.ws_path, "/arena");
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.json_format);
    }

    #[test]
    fn validate_rejects_relative_path() {
        let config = RelayConfig {
            ws_path: "ws".into(),
            ..RelayConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RelayError::InvalidPath(path)) if path == "ws"
        ));
    }
}
