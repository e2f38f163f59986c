//! Errors from the remote marketplace backend

use std::fmt;

/// Errors that can occur when calling the marketplace backend
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// 401/403 - session token missing, invalid or expired
    Unauthorized { endpoint: String },
    /// 404 - the requested product, service or receipt does not exist
    NotFound { endpoint: String },
    /// Connection, DNS or timeout error
    NetworkError { endpoint: String, message: String },
    /// Other non-2xx responses
    HttpError {
        endpoint: String,
        status: u16,
        message: String,
    },
    /// 2xx response carrying `success: false`
    RemoteFailure { endpoint: String, message: String },
    /// Response body did not match the expected shape
    DecodeError { endpoint: String, message: String },
}

impl ApiError {
    pub fn unauthorized(endpoint: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            endpoint: endpoint.into(),
        }
    }

    pub fn not_found(endpoint: impl Into<String>) -> Self {
        ApiError::NotFound {
            endpoint: endpoint.into(),
        }
    }

    pub fn network(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::NetworkError {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn http(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        ApiError::HttpError {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    pub fn remote(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::RemoteFailure {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn decode(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::DecodeError {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Map a non-success HTTP status to an error
    pub fn from_status(endpoint: impl Into<String>, status: u16, body: String) -> Self {
        match status {
            401 | 403 => ApiError::unauthorized(endpoint),
            404 => ApiError::not_found(endpoint),
            _ => ApiError::http(endpoint, status, body),
        }
    }

    /// Whether this is a missing-resource error (rendered as a "not found" view)
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Get the endpoint this error came from
    pub fn endpoint(&self) -> &str {
        match self {
            ApiError::Unauthorized { endpoint }
            | ApiError::NotFound { endpoint }
            | ApiError::NetworkError { endpoint, .. }
            | ApiError::HttpError { endpoint, .. }
            | ApiError::RemoteFailure { endpoint, .. }
            | ApiError::DecodeError { endpoint, .. } => endpoint,
        }
    }

    /// Generic message suitable for an end-user notification
    pub fn user_message(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "We couldn't find what you were looking for.",
            ApiError::Unauthorized { .. } => "Please sign in again and retry.",
            _ => "There was a problem, please try again.",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized { endpoint } => {
                write!(f, "{}: Unauthorized", endpoint)
            }
            ApiError::NotFound { endpoint } => write!(f, "{}: Not found", endpoint),
            ApiError::NetworkError { endpoint, message } => {
                write!(f, "{}: Network error - {}", endpoint, message)
            }
            ApiError::HttpError {
                endpoint,
                status,
                message,
            } => {
                write!(f, "{}: HTTP {} - {}", endpoint, status, message)
            }
            ApiError::RemoteFailure { endpoint, message } => {
                write!(f, "{}: Request rejected - {}", endpoint, message)
            }
            ApiError::DecodeError { endpoint, message } => {
                write!(f, "{}: Unexpected response - {}", endpoint, message)
            }
        }
    }
}

impl std::error::Error for ApiError {}
