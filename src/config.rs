//! Process configuration, read once at start-up.
//!
//! ```toml
//! [host]
//! port = "/dev/ttyACM0"
//! baud_rate = 115200
//! state_file = "states.json"
//!
//! [device]
//! variant = "mirrored"
//! settle_delay_ms = 100
//! wave_repeats = 5
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    controller::DEFAULT_SETTLE_DELAY_MS, device::std::DEFAULT_BAUD_RATE,
    gait::DEFAULT_WAVE_REPEATS, host::store::DEFAULT_STATE_FILE, joint::Variant,
};

pub const DEFAULT_CONFIG_FILE: &str = "quadruped.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot load the config file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Cannot parse the config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: HostConfig,
    pub device: DeviceConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Serial port the device is attached to.
    pub port: String,
    pub baud_rate: u32,
    pub state_file: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            port: "COM6".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial port to read commands from; standard input when unset.
    pub port: Option<String>,
    pub baud_rate: u32,
    pub variant: Variant,
    pub settle_delay_ms: u32,
    pub wave_repeats: u8,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            variant: Variant::default(),
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            wave_repeats: DEFAULT_WAVE_REPEATS,
        }
    }
}

impl Config {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path().join("quadruped.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.host.baud_rate, 115_200);
        assert_eq!(config.device.settle_delay_ms, 100);
        assert_eq!(config.device.wave_repeats, 5);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::parse(
            r#"
            [host]
            port = "/dev/ttyACM0"

            [device]
            variant = "mirrored"
            "#,
        )
        .unwrap();
        assert_eq!(config.host.port, "/dev/ttyACM0");
        assert_eq!(config.host.state_file, PathBuf::from("states.json"));
        assert_eq!(config.device.variant, Variant::Mirrored);
        assert_eq!(config.device.port, None);
    }

    #[test]
    fn bad_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quadruped.toml");
        fs::write(&path, "[device]\nvariant = \"hexapod\"\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }
}
