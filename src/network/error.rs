// src/network/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Unreachable(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl NetworkError {
    /// True for failures below the JSON layer (no usable response).
    pub fn is_transport(&self) -> bool {
        !matches!(self, NetworkError::Decode(_))
    }

    /// Fixed user-facing text per failure family.
    pub fn user_message(&self) -> String {
        match self {
            NetworkError::Status(404) => "Resource not found".to_string(),
            NetworkError::Status(401) => "Unauthorized request".to_string(),
            NetworkError::Status(408) | NetworkError::Timeout => {
                "Request timeout. Please try again.".to_string()
            }
            NetworkError::Status(code) if (500..600).contains(code) => {
                "Server error. Try again later.".to_string()
            }
            NetworkError::Status(code) => format!("Network error: {}", code),
            NetworkError::Unreachable(_) => "No internet connection.".to_string(),
            NetworkError::Request(e) => format!("Network error: {}", e),
            NetworkError::Decode(_) => "Unexpected response from server".to_string(),
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            NetworkError::Timeout
        } else if e.is_connect() {
            NetworkError::Unreachable(e.to_string())
        } else if e.is_decode() {
            NetworkError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            NetworkError::Status(status.as_u16())
        } else {
            NetworkError::Request(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, NetworkError>;
