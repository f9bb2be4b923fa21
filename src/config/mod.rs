//! Configuration management for the mesh gateway

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::removal::DEFAULT_PROBE_DELAY;
use crate::{Error, Result};

/// Default emulated EEPROM size (64 KiB)
pub const DEFAULT_EEPROM_SIZE: u64 = 64 * 1024;

/// Mesh gateway configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Device removal configuration
    pub removal: RemovalConfig,

    /// Persistent store configuration
    pub storage: StorageConfig,

    /// Path to data directory
    pub data_dir: PathBuf,
}

/// Device removal configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalConfig {
    /// Delay between a reset notification and the probe
    pub probe_delay: Duration,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            probe_delay: DEFAULT_PROBE_DELAY,
        }
    }
}

/// Persistent store configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Backing file for the emulated EEPROM
    pub eeprom_path: PathBuf,

    /// EEPROM size in bytes
    pub eeprom_size: u64,
}

/// Return the data directory: `~/.local/share/meshgw` on Linux
pub fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map_or_else(|| PathBuf::from("."), |d| d.data_dir().join("meshgw"))
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// `config_path` overrides the standard config file location.
    ///
    /// # Errors
    ///
    /// Returns error if the resolved settings are unusable
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(config_path);
        Self::resolve(fc, default_data_dir(), |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with environment lookups
    ///
    /// # Errors
    ///
    /// Returns error if the EEPROM size is zero
    pub fn resolve(
        fc: file::GatewayConfigFile,
        data_dir: PathBuf,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let probe_delay = env("MESHGW_PROBE_DELAY_MS")
            .and_then(|s| s.parse().ok())
            .or(fc.removal.probe_delay_ms)
            .map_or(DEFAULT_PROBE_DELAY, Duration::from_millis);

        let eeprom_path = env("MESHGW_EEPROM_PATH")
            .or(fc.storage.eeprom_path)
            .map_or_else(|| data_dir.join("eeprom.dat"), PathBuf::from);

        let eeprom_size = env("MESHGW_EEPROM_SIZE")
            .and_then(|s| s.parse().ok())
            .or(fc.storage.eeprom_size)
            .unwrap_or(DEFAULT_EEPROM_SIZE);

        if eeprom_size == 0 {
            return Err(Error::Config("storage.eeprom_size must be non-zero".to_string()));
        }

        tracing::debug!(
            probe_delay_ms = probe_delay.as_millis(),
            eeprom = %eeprom_path.display(),
            eeprom_size,
            "configuration resolved"
        );

        Ok(Self {
            removal: RemovalConfig { probe_delay },
            storage: StorageConfig {
                eeprom_path,
                eeprom_size,
            },
            data_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::resolve(
            file::GatewayConfigFile::default(),
            PathBuf::from("/data"),
            env(&[]),
        )
        .unwrap();

        assert_eq!(config.removal.probe_delay, Duration::from_millis(2));
        assert_eq!(config.storage.eeprom_path, PathBuf::from("/data/eeprom.dat"));
        assert_eq!(config.storage.eeprom_size, DEFAULT_EEPROM_SIZE);
    }

    #[test]
    fn file_overrides_default() {
        let fc = file::parse("[removal]\nprobe_delay_ms = 25\n[storage]\neeprom_size = 4096\n").unwrap();
        let config = Config::resolve(fc, PathBuf::from("/data"), env(&[])).unwrap();

        assert_eq!(config.removal.probe_delay, Duration::from_millis(25));
        assert_eq!(config.storage.eeprom_size, 4096);
    }

    #[test]
    fn env_overrides_file() {
        let fc = file::parse("[removal]\nprobe_delay_ms = 25\n[storage]\neeprom_path = \"/a\"\n").unwrap();
        let config = Config::resolve(
            fc,
            PathBuf::from("/data"),
            env(&[("MESHGW_PROBE_DELAY_MS", "7"), ("MESHGW_EEPROM_PATH", "/b")]),
        )
        .unwrap();

        assert_eq!(config.removal.probe_delay, Duration::from_millis(7));
        assert_eq!(config.storage.eeprom_path, PathBuf::from("/b"));
    }

    #[test]
    fn unparsable_env_falls_through() {
        let fc = file::parse("[removal]\nprobe_delay_ms = 25\n").unwrap();
        let config = Config::resolve(
            fc,
            PathBuf::from("/data"),
            env(&[("MESHGW_PROBE_DELAY_MS", "soon")]),
        )
        .unwrap();

        assert_eq!(config.removal.probe_delay, Duration::from_millis(25));
    }

    #[test]
    fn zero_eeprom_size_rejected() {
        let result = Config::resolve(
            file::GatewayConfigFile::default(),
            PathBuf::from("/data"),
            env(&[("MESHGW_EEPROM_SIZE", "0")]),
        );

        assert!(matches!(result, Err(Error::Config(_))));
    }
}
