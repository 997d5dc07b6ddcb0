//! Runtime options that do not come from the config document.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default maximum request body size (2 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Process-level settings, usually filled from the command line.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerOptions {
    /// Path of the JSON configuration document.
    pub config_path: PathBuf,

    /// Host the listener binds to.
    pub bind_host: String,

    /// Overrides `result.httpPort` when set. `Some(0)` picks an ephemeral port.
    pub port: Option<u16>,

    /// How often the config file's modification time is checked.
    #[serde(with = "duration_ms")]
    pub poll_interval: Duration,

    pub max_body_size: usize,

    /// Directory for the control channel sockets; disabled when absent.
    pub control_dir: Option<PathBuf>,

    /// Prometheus exporter address; disabled when absent.
    pub metrics_address: Option<SocketAddr>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("./apimocker.json"),
            bind_host: "0.0.0.0".to_string(),
            port: None,
            poll_interval: Duration::from_secs(1),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            control_dir: None,
            metrics_address: None,
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let options: ServerOptions = serde_json::from_str(r#"{"port": 0, "pollInterval": 5}"#).unwrap();
        assert_eq!(options.port, Some(0));
        assert_eq!(options.max_body_size, DEFAULT_MAX_BODY_SIZE);
        assert_eq!(options.config_path, PathBuf::from("./apimocker.json"));
        // field names are snake_case; unknown keys are ignored
        assert_eq!(options.poll_interval, Duration::from_secs(1));

        let options: ServerOptions = serde_json::from_str(r#"{"poll_interval": 250}"#).unwrap();
        assert_eq!(options.poll_interval, Duration::from_millis(250));
    }
}
