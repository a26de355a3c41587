use serde::{Deserialize, Serialize};

/// Prefix shared by every channel of the plugin.
pub const CHANNEL_NAMESPACE: &str = "dev.flutter.pigeon.universal_ble";

/// Channel naming for one instance of the plugin APIs.
///
/// Several instances can share a messenger by giving each its own suffix;
/// the suffix is appended to every channel name after a `.`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChannelConfig {
    pub message_channel_suffix: String,
}

impl ChannelConfig {
    pub fn with_suffix(suffix: impl Into<String>) -> Self {
        Self {
            message_channel_suffix: suffix.into(),
        }
    }

    /// Full channel name for `method` of `api`.
    pub fn channel_name(&self, api: &str, method: &str) -> String {
        let mut name = format!("{CHANNEL_NAMESPACE}.{api}.{method}");
        if !self.message_channel_suffix.is_empty() {
            name.push('.');
            name.push_str(&self.message_channel_suffix);
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_name_without_suffix() {
        let config = ChannelConfig::default();
        assert_eq!(
            config.channel_name("UniversalBlePlatformChannel", "startScan"),
            "dev.flutter.pigeon.universal_ble.UniversalBlePlatformChannel.startScan"
        );
    }

    #[test]
    fn test_channel_name_with_suffix() {
        let config = ChannelConfig::with_suffix("left");
        assert_eq!(
            config.channel_name("UniversalBleCallbackChannel", "onScanResult"),
            "dev.flutter.pigeon.universal_ble.UniversalBleCallbackChannel.onScanResult.left"
        );
    }

    #[test]
    fn test_config_from_toml() {
        let config: ChannelConfig = toml::from_str("message_channel_suffix = \"left\"").unwrap();
        assert_eq!(config, ChannelConfig::with_suffix("left"));

        let config: ChannelConfig = toml::from_str("").unwrap();
        assert_eq!(config, ChannelConfig::default());
    }
}
