use crate::error::FetchError;
use crate::settings::Settings;
use serde_json::{Number, Value};
use std::fmt;
use std::time::Duration;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};

/// What a key currently shows
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DisplayValue {
    /// Nothing fetched yet
    #[default]
    Empty,
    Text(String),
    Number(Number),
    /// The dotted path did not resolve
    Missing,
    /// Marker for a failed fetch (status code, `ERR`, `JSON`)
    Failed(String),
}

impl DisplayValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => DisplayValue::Text(s.clone()),
            Value::Number(n) => DisplayValue::Number(n.clone()),
            other => DisplayValue::Text(other.to_string()),
        }
    }

    pub fn from_error(error: &FetchError) -> Self {
        DisplayValue::Failed(error.marker())
    }
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayValue::Empty => Ok(()),
            DisplayValue::Text(text) => f.write_str(text),
            DisplayValue::Number(n) => write!(f, "{}", n),
            DisplayValue::Missing => f.write_str("?"),
            DisplayValue::Failed(marker) => f.write_str(marker),
        }
    }
}

/// Walk `path` (dot-separated) through nested objects and arrays.
///
/// Array segments must be decimal indices. An empty path selects the whole
/// document; any segment that does not resolve yields `Missing`.
pub fn extract(body: &Value, path: &str) -> DisplayValue {
    if path.is_empty() {
        return DisplayValue::from_json(body);
    }

    let mut current = body;
    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return DisplayValue::Missing,
        }
    }

    DisplayValue::from_json(current)
}

pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

fn request_method(settings: &Settings) -> Result<Method, FetchError> {
    match settings.method() {
        Some(method) => Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|e| FetchError::InvalidRequest(format!("Invalid method {:?}: {}", method, e))),
        None => Ok(Method::GET),
    }
}

fn request_headers(settings: &Settings) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();
    for (name, value) in settings.request_headers() {
        headers.append(
            HeaderName::from_bytes(name.as_bytes())?,
            HeaderValue::from_str(&value)?,
        );
    }
    Ok(headers)
}

/// Run one query for a button and extract the configured field
pub async fn fetch_display_value(
    client: &Client,
    settings: &Settings,
    default_url: &str,
) -> Result<DisplayValue, FetchError> {
    let url = settings.url().unwrap_or(default_url);
    let method = request_method(settings)?;
    let headers = request_headers(settings)?;

    let response = client
        .request(method, url)
        .headers(headers)
        .send()
        .await
        .map_err(|e| FetchError::Network(format!("Failed to send request: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let response_text = response
        .text()
        .await
        .map_err(|e| FetchError::Network(format!("Failed to read response: {}", e)))?;

    let body = serde_json::from_str::<Value>(&response_text)
        .map_err(|e| FetchError::Parse(format!("Failed to parse response: {}", e)))?;

    Ok(extract(&body, settings.path()))
}
