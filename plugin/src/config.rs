use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_URL: &str = "http://localhost";

/// Plugin-wide configuration, shared by every button
#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Target used when a button has no URL configured
    pub default_url: String,
    pub request_timeout_secs: u64,
    /// Floor applied to the per-button refresh interval
    pub min_interval_ms: u64,
    /// TTF/OTF file to draw with instead of the embedded face
    pub font_path: Option<PathBuf>,
    pub font_size: f32,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            default_url: DEFAULT_URL.to_string(),
            request_timeout_secs: 30,
            min_interval_ms: 100,
            font_path: None,
            font_size: 20.0,
        }
    }
}

macro_rules! env_or_default {
    ($config:expr, $field:ident, $env_var:expr) => {
        if let Ok(val) = std::env::var($env_var)
            && let Ok(parsed) = val.trim().parse()
        {
            $config.$field = parsed;
        }
    };
}

impl PluginConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        env_or_default!(config, default_url, "WEBQUERY_DEFAULT_URL");
        env_or_default!(config, request_timeout_secs, "WEBQUERY_REQUEST_TIMEOUT_SECS");
        env_or_default!(config, min_interval_ms, "WEBQUERY_MIN_INTERVAL_MS");
        env_or_default!(config, font_size, "WEBQUERY_FONT_SIZE");

        if let Ok(path) = std::env::var("WEBQUERY_FONT_PATH")
            && !path.trim().is_empty()
        {
            config.font_path = Some(PathBuf::from(path.trim()));
        }

        config
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}
