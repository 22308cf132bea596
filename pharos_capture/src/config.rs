// pharos_capture/src/config.rs

//! Capture configuration, loaded from a TOML file over built-in
//! defaults.
//!
//! ```toml
//! [serial]
//! port = "/dev/serial0"
//! baud = 115200
//!
//! [orientation]
//! feed = "orientation.jsonl"
//! rate_hz = 30.0
//!
//! [fusion]
//! offset_m = [0.0, 0.0, 0.0]
//!
//! [sink]
//! path = "points.jsonl"
//!
//! [sink.forward]
//! backend = "udp"
//! addr = "192.168.0.198:5005"
//! ```

use std::path::{Path, PathBuf};

use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub serial: SerialConfig,
    pub orientation: OrientationConfig,
    pub fusion: FusionConfig,
    pub sink: SinkConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            orientation: OrientationConfig::default(),
            fusion: FusionConfig::default(),
            sink: SinkConfig::default(),
        }
    }
}

impl CaptureConfig {
    /// Loads the config file, falling back to defaults for anything the
    /// file does not set. A missing file yields the full defaults.
    pub fn load(path: &Path) -> Result<Self, CaptureError> {
        let config = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .extract()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial port path.
    pub port: String,
    /// Baud rate.
    pub baud: u32,
    /// Read timeout in seconds; expiry surfaces as an empty read.
    pub timeout_s: f64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/serial0".into(),
            baud: 115_200,
            timeout_s: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// NDJSON orientation feed to poll. Without one the capture loop
    /// never becomes ready and every range frame is skipped.
    pub feed: Option<PathBuf>,
    /// Poll rate for the orientation source.
    pub rate_hz: f64,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            feed: None,
            rate_hz: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Body-frame position of the rangefinder emitter relative to the
    /// orientation sensor origin, meters.
    pub offset_m: [f64; 3],
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            offset_m: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// NDJSON file the fused point records are appended to.
    pub path: PathBuf,
    pub forward: ForwardConfig,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("points.jsonl"),
            forward: ForwardConfig::Off,
        }
    }
}

/// Where fused point records are forwarded, in addition to the output
/// file. One enum rather than per-backend tool variants.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum ForwardConfig {
    /// File output only.
    #[default]
    Off,
    /// Send each record as a UDP datagram to `addr`.
    Udp { addr: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(raw: &str) -> CaptureConfig {
        Figment::from(Serialized::defaults(CaptureConfig::default()))
            .merge(Toml::string(raw))
            .extract()
            .unwrap()
    }

    #[test]
    fn defaults_are_sensible() {
        let config = CaptureConfig::default();
        assert_eq!(config.serial.port, "/dev/serial0");
        assert_eq!(config.serial.baud, 115_200);
        assert_eq!(config.fusion.offset_m, [0.0, 0.0, 0.0]);
        assert_eq!(config.sink.forward, ForwardConfig::Off);
    }

    #[test]
    fn file_values_override_defaults() {
        let config = from_toml(
            r#"
            [serial]
            port = "/dev/ttyUSB0"

            [fusion]
            offset_m = [0.0, 0.05, -0.01]
            "#,
        );
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        // Unset fields keep their defaults.
        assert_eq!(config.serial.baud, 115_200);
        assert_eq!(config.fusion.offset_m, [0.0, 0.05, -0.01]);
    }

    #[test]
    fn udp_forward_backend_parses() {
        let config = from_toml(
            r#"
            [sink.forward]
            backend = "udp"
            addr = "127.0.0.1:5005"
            "#,
        );
        assert_eq!(
            config.sink.forward,
            ForwardConfig::Udp {
                addr: "127.0.0.1:5005".into()
            }
        );
    }

    #[test]
    fn off_backend_parses() {
        let config = from_toml(
            r#"
            [sink.forward]
            backend = "off"
            "#,
        );
        assert_eq!(config.sink.forward, ForwardConfig::Off);
    }
}
