use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

/// Per-button settings as persisted by the host.
///
/// The property inspector writes every field as text, but older profiles may
/// hold numbers, so scalar fields are read leniently. Keys this plugin does
/// not know about are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Raw multi-line `key: value` text
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub headers: Option<String>,
    /// Dotted path into the response body
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "lenient_interval", skip_serializing_if = "Option::is_none")]
    pub interval: Option<IntervalSetting>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Refresh interval in seconds, kept in whichever form the host stored it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IntervalSetting {
    Seconds(f64),
    Text(String),
}

impl IntervalSetting {
    pub fn seconds(&self) -> Option<f64> {
        match self {
            IntervalSetting::Seconds(secs) => Some(*secs),
            IntervalSetting::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl Settings {
    /// URL to query, or `None` when the field is unset or blank
    pub fn url(&self) -> Option<&str> {
        non_blank(&self.url)
    }

    pub fn method(&self) -> Option<&str> {
        non_blank(&self.method)
    }

    pub fn path(&self) -> &str {
        self.path.as_deref().map(str::trim).unwrap_or("")
    }

    pub fn request_headers(&self) -> Vec<(String, String)> {
        self.headers.as_deref().map(parse_headers).unwrap_or_default()
    }

    /// Refresh period, or `None` when no positive interval is configured.
    /// Periods too long to schedule from the current instant count as unset.
    pub fn interval_period(&self) -> Option<Duration> {
        let secs = self.interval.as_ref()?.seconds()?;
        if secs <= 0.0 {
            return None;
        }
        let period = Duration::try_from_secs_f64(secs).ok()?;
        Instant::now().checked_add(period).map(|_| period)
    }

    /// Apply one `{key, value}` pair sent by the property inspector.
    /// Returns false when the value is empty and nothing changed.
    pub fn apply(&mut self, key: &str, value: Value) -> bool {
        if is_empty_value(&value) {
            return false;
        }

        match key {
            "url" => self.url = scalar_to_string(value),
            "method" => self.method = scalar_to_string(value),
            "headers" => self.headers = scalar_to_string(value),
            "path" => self.path = scalar_to_string(value),
            "interval" => self.interval = interval_from_value(value),
            _ => {
                self.extra.insert(key.to_string(), value);
            }
        }
        true
    }
}

/// Parse newline-separated `key: value` lines into header pairs.
///
/// Each line is split on its first colon and both sides are trimmed. Lines
/// without a colon or with an empty name are skipped.
pub fn parse_headers(raw: &str) -> Vec<(String, String)> {
    raw.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn interval_from_value(value: Value) -> Option<IntervalSetting> {
    match value {
        Value::Number(n) => n.as_f64().map(IntervalSetting::Seconds),
        Value::String(s) => Some(IntervalSetting::Text(s)),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_to_string(Value::deserialize(deserializer)?))
}

fn lenient_interval<'de, D>(deserializer: D) -> Result<Option<IntervalSetting>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(interval_from_value(Value::deserialize(deserializer)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{assert, let_assert};
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_parse_headers_splits_on_first_colon() {
        let headers = parse_headers("Authorization: Bearer xyz\nAccept: application/json");

        assert!(
            headers
                == vec![
                    ("Authorization".to_string(), "Bearer xyz".to_string()),
                    ("Accept".to_string(), "application/json".to_string()),
                ]
        );
    }

    #[test]
    fn test_parse_headers_keeps_colons_in_value() {
        let headers = parse_headers("X-Forwarded-Host:  example.com:8080  \r\n");
        assert!(headers == vec![("X-Forwarded-Host".to_string(), "example.com:8080".to_string())]);
    }

    #[test]
    fn test_parse_headers_skips_malformed_lines() {
        let headers = parse_headers("\nno colon here\n: empty name\nX-Ok: 1\n");
        assert!(headers == vec![("X-Ok".to_string(), "1".to_string())]);
    }

    #[rstest]
    #[case(json!(5), Some(Duration::from_secs(5)))]
    #[case(json!("10"), Some(Duration::from_secs(10)))]
    #[case(json!(" 2.5 "), Some(Duration::from_millis(2500)))]
    #[case(json!(0), None)]
    #[case(json!(-3), None)]
    #[case(json!("0"), None)]
    #[case(json!(""), None)]
    #[case(json!("soon"), None)]
    #[case(json!(null), None)]
    #[case(json!(true), None)]
    #[case(json!("1e19"), None)]
    #[case(json!(1e300), None)]
    fn test_interval_period(#[case] interval: Value, #[case] expected: Option<Duration>) {
        let_assert!(Ok(settings) = serde_json::from_value::<Settings>(json!({ "interval": interval })));
        assert!(settings.interval_period() == expected);
    }

    #[test]
    fn test_missing_interval_has_no_period() {
        let settings = Settings::default();
        assert!(settings.interval_period().is_none());
    }

    #[test]
    fn test_deserialize_keeps_unknown_keys() {
        let raw = json!({
            "url": "https://example.com/api",
            "path": "data.temp",
            "interval": "30",
            "theme": "dark"
        });

        let_assert!(Ok(settings) = serde_json::from_value::<Settings>(raw.clone()));
        assert!(settings.url() == Some("https://example.com/api"));
        assert!(settings.path() == "data.temp");
        assert!(settings.extra.get("theme") == Some(&json!("dark")));

        let_assert!(Ok(round_tripped) = serde_json::to_value(&settings));
        assert!(round_tripped == raw);
    }

    #[test]
    fn test_blank_fields_read_as_unset() {
        let_assert!(Ok(settings) = serde_json::from_value::<Settings>(json!({
            "url": "   ",
            "method": "",
            "port": 8080
        })));

        assert!(settings.url().is_none());
        assert!(settings.method().is_none());
        assert!(settings.path() == "");
    }

    #[test]
    fn test_numeric_fields_are_read_as_text() {
        let_assert!(Ok(settings) = serde_json::from_value::<Settings>(json!({ "path": 3 })));
        assert!(settings.path() == "3");
    }

    #[test]
    fn test_apply_known_and_unknown_keys() {
        let mut settings = Settings::default();

        assert!(settings.apply("url", json!("http://127.0.0.1:9000")));
        assert!(settings.apply("interval", json!(15)));
        assert!(settings.apply("color", json!("#fff")));

        assert!(settings.url() == Some("http://127.0.0.1:9000"));
        assert!(settings.interval_period() == Some(Duration::from_secs(15)));
        assert!(settings.extra.get("color") == Some(&json!("#fff")));
    }

    #[test]
    fn test_apply_ignores_empty_values() {
        let mut settings = Settings {
            path: Some("a.b".to_string()),
            ..Default::default()
        };

        assert!(!settings.apply("path", json!("")));
        assert!(!settings.apply("path", Value::Null));
        assert!(settings.path() == "a.b");
    }
}
