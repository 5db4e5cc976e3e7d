use clap::Parser;
use serde::Deserialize;
use tracing::warn;

/// Arguments the host passes when it starts the plugin
#[derive(Debug, Clone, Parser)]
#[command(name = "webquery-plugin", version, about = "Web query action for Stream Deck")]
pub struct LaunchArgs {
    /// Port of the host's local WebSocket server
    #[arg(long)]
    pub port: u16,

    /// Identifier of this plugin instance, sent back on registration
    #[arg(long = "pluginUUID")]
    pub plugin_uuid: String,

    /// Event name to register with
    #[arg(long = "registerEvent")]
    pub register_event: String,

    /// JSON describing the host application and connected devices
    #[arg(long, default_value = "{}")]
    pub info: String,
}

impl LaunchArgs {
    /// Parse the host's single-dash launch flags (`-port 28196 -pluginUUID ...`)
    pub fn parse_from_host<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    pub fn host_info(&self) -> HostInfo {
        serde_json::from_str(&self.info).unwrap_or_else(|e| {
            warn!(error = %e, "Unreadable -info argument");
            HostInfo::default()
        })
    }
}

/// Rewrite `-name` flags as `--name` so clap treats them as long options.
/// Values and already-long flags pass through untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            let mut chars = arg.chars();
            let is_single_dash_word = chars.next() == Some('-')
                && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.next().is_some();
            if is_single_dash_word {
                format!("-{}", arg)
            } else {
                arg
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostInfo {
    #[serde(default)]
    pub application: ApplicationInfo,
    #[serde(default)]
    pub plugin: PluginInfo,
    #[serde(default)]
    pub devices: Vec<DeviceInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationInfo {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginInfo {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{assert, let_assert};

    #[test]
    fn test_normalize_args() {
        let args = normalize_args(["plugin", "-port", "28196", "--info", "{}", "-x", "-"]);
        assert!(args == vec!["plugin", "--port", "28196", "--info", "{}", "-x", "-"]);
    }

    #[test]
    fn test_parse_host_launch_flags() {
        let info = r#"{"application":{"version":"6.5.0","platform":"mac","language":"en"},
            "plugin":{"uuid":"org.inventivetalent.webquery","version":"1.0"},
            "devices":[{"id":"DEV","name":"Stream Deck","type":0}]}"#;

        let_assert!(Ok(args) = LaunchArgs::parse_from_host([
            "webquery-plugin",
            "-port",
            "28196",
            "-pluginUUID",
            "ABC123",
            "-registerEvent",
            "registerPlugin",
            "-info",
            info,
        ]));

        assert!(args.port == 28196);
        assert!(args.plugin_uuid == "ABC123");
        assert!(args.register_event == "registerPlugin");

        let host = args.host_info();
        assert!(host.application.platform == "mac");
        assert!(host.plugin.uuid == "org.inventivetalent.webquery");
        assert!(host.devices.len() == 1);
        assert!(host.devices[0].name == "Stream Deck");
    }

    #[test]
    fn test_missing_port_is_rejected() {
        let result = LaunchArgs::parse_from_host(["webquery-plugin", "-pluginUUID", "A", "-registerEvent", "r"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_info_falls_back_to_defaults() {
        let_assert!(Ok(args) = LaunchArgs::parse_from_host([
            "webquery-plugin", "-port", "1", "-pluginUUID", "A", "-registerEvent", "r", "-info", "not json",
        ]));
        assert!(args.host_info().devices.is_empty());
    }
}
