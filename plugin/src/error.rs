use thiserror::Error;

/// Failure of a single refresh. None of these are fatal to the button.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The request could not be built (bad method token, header name or value)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// Connect, DNS, timeout or body-read failure
    #[error("Network error: {0}")]
    Network(String),
    /// The endpoint answered with a non-2xx status
    #[error("HTTP status {0}")]
    Status(u16),
    /// The body was not valid JSON
    #[error("Parse error: {0}")]
    Parse(String),
}

impl FetchError {
    /// Text drawn on the key face in place of a value
    pub fn marker(&self) -> String {
        match self {
            FetchError::Status(code) => code.to_string(),
            FetchError::Parse(_) => "JSON".to_string(),
            FetchError::InvalidRequest(_) | FetchError::Network(_) => "ERR".to_string(),
        }
    }

    /// Short category used in log fields
    pub fn category(&self) -> &'static str {
        match self {
            FetchError::InvalidRequest(_) => "Invalid Request",
            FetchError::Network(_) => "Offline",
            FetchError::Status(_) => "HTTP Error",
            FetchError::Parse(_) => "Parse Error",
        }
    }
}

impl From<reqwest::header::InvalidHeaderValue> for FetchError {
    fn from(e: reqwest::header::InvalidHeaderValue) -> Self {
        FetchError::InvalidRequest(format!("Invalid header value: {}", e))
    }
}

impl From<reqwest::header::InvalidHeaderName> for FetchError {
    fn from(e: reqwest::header::InvalidHeaderName) -> Self {
        FetchError::InvalidRequest(format!("Invalid header name: {}", e))
    }
}

/// Failure while drawing or encoding a key face
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to read font file {path}: {source}")]
    FontRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid font data: {0}")]
    InvalidFont(String),
    #[error("Failed to encode key image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Failure of the plugin process itself
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("Failed to encode host message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}
