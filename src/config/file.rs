//! TOML configuration file loading
//!
//! Supports `~/.config/meshgw/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct GatewayConfigFile {
    /// Device removal settings
    #[serde(default)]
    pub removal: RemovalFileConfig,

    /// Persistent store settings
    #[serde(default)]
    pub storage: StorageFileConfig,
}

/// Device removal configuration
#[derive(Debug, Default, Deserialize)]
pub struct RemovalFileConfig {
    /// Delay between a reset notification and the probe, in milliseconds
    pub probe_delay_ms: Option<u64>,
}

/// Persistent store configuration
#[derive(Debug, Default, Deserialize)]
pub struct StorageFileConfig {
    /// Backing file for the emulated EEPROM
    pub eeprom_path: Option<String>,

    /// EEPROM size in bytes
    pub eeprom_size: Option<u64>,
}

/// Load the TOML config file from `path`, or the standard path if `None`
///
/// Returns `GatewayConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file(path: Option<&Path>) -> GatewayConfigFile {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return GatewayConfigFile::default();
    };

    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file");
        return GatewayConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                GatewayConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            GatewayConfigFile::default()
        }
    }
}

/// Parse config file contents
///
/// # Errors
///
/// Returns error if `content` is not valid TOML for the schema
pub fn parse(content: &str) -> crate::Result<GatewayConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Return the config file path: `~/.config/meshgw/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("meshgw").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let fc = parse("").unwrap();
        assert!(fc.removal.probe_delay_ms.is_none());
        assert!(fc.storage.eeprom_path.is_none());
    }

    #[test]
    fn partial_sections() {
        let fc = parse("[removal]\nprobe_delay_ms = 50\n").unwrap();
        assert_eq!(fc.removal.probe_delay_ms, Some(50));
        assert!(fc.storage.eeprom_size.is_none());
    }

    #[test]
    fn wrong_type_is_rejected() {
        assert!(parse("[storage]\neeprom_size = \"big\"\n").is_err());
    }

    #[test]
    fn unreadable_path_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        let fc = load_config_file(Some(&path));
        assert!(fc.removal.probe_delay_ms.is_none());
    }

    #[test]
    fn explicit_path_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gw.toml");
        std::fs::write(&path, "[storage]\neeprom_path = \"/tmp/x.dat\"\n").unwrap();

        let fc = load_config_file(Some(&path));
        assert_eq!(fc.storage.eeprom_path.as_deref(), Some("/tmp/x.dat"));
    }
}
