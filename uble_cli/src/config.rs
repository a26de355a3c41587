use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::debug;
use uble_channel::ChannelConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CliConfig {
    pub channel: ChannelConfig,
}

impl CliConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("could not read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("could not parse config file {}", path.display()))
    }

    /// Like [`CliConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[channel]\nmessage_channel_suffix = \"left\"\n").unwrap();

        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.channel, ChannelConfig::with_suffix("left"));
    }

    #[test]
    fn test_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert_eq!(CliConfig::load_or_default(&path).unwrap(), CliConfig::default());
        assert!(CliConfig::load(&path).is_err());
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "channel = 3").unwrap();

        let err = CliConfig::load_or_default(&path).unwrap_err();
        assert!(err.to_string().starts_with("could not parse config file"));
    }
}
