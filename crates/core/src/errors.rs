use thiserror::Error;

/// 遥测采集错误类型定义
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("No successful GET request: {url}")]
    NoSuccessfulRequest { url: String },

    #[error("Could not start new session: {0}")]
    SessionRefresh(String),

    #[error("Unexpected device response: {0}")]
    UnexpectedResponse(String),

    #[error("Unknown DeviceType: {0}")]
    UnknownDeviceType(String),

    #[error("Invalid management endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Index is read-only: {0}")]
    ReadOnlyIndex(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for TelemetryError {
    fn from(err: reqwest::Error) -> Self {
        TelemetryError::Network(err.to_string())
    }
}

/// 统一的Result类型
pub type TelemetryResult<T> = std::result::Result<T, TelemetryError>;
