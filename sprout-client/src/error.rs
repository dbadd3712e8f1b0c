use sprout_proto::{ErrorKind, ValidationError};

use crate::store::StoreError;

/// The API call an error came from. Picks the fallback alert texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Login,
    Register,
    CreatePlant,
}

impl Operation {
    fn default_message(&self) -> &'static str {
        match self {
            Operation::Login => "Login failed. Please try again.",
            Operation::Register => "Registration failed. Please try again.",
            Operation::CreatePlant => "An error occurred. Please try again.",
        }
    }

    fn unauthorized_message(&self) -> &'static str {
        match self {
            Operation::Login => "Invalid email or password.",
            Operation::Register => "Cannot register. Please check your credentials.",
            Operation::CreatePlant => "Unauthorized. Please log in again.",
        }
    }

    fn conflict_message(&self) -> &'static str {
        match self {
            Operation::Register => "Email already in use. Please use a different email.",
            _ => "Conflict with current state. Resource may already exist.",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Operation::Login => "login",
            Operation::Register => "registration",
            Operation::CreatePlant => "plant creation",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status
    #[error("{operation} failed with HTTP {status}")]
    Status {
        operation: Operation,
        status: u16,
        /// `message` from the JSON error body, when there was one
        message: Option<String>,
    },
    #[error("{operation} failed, no response from server: {source}")]
    Network {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} timed out")]
    Timeout {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} returned an unexpected body: {source}")]
    Decode {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub(crate) fn from_reqwest(operation: Operation, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ApiError::Timeout { operation, source }
        } else {
            ApiError::Network { operation, source }
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Status { status: 401, .. } => ErrorKind::Unauthorized,
            ApiError::Status { status: 409, .. } => ErrorKind::Conflict,
            ApiError::Status { status, .. } if *status >= 500 => ErrorKind::ServerError,
            ApiError::Status { .. } => ErrorKind::Rejected,
            ApiError::Network { .. } => ErrorKind::NetworkError,
            ApiError::Timeout { .. } => ErrorKind::TimeoutError,
            ApiError::Decode { .. } => ErrorKind::ServerError,
        }
    }

    /// Alert text. A message sent by the server wins over the fixed texts.
    pub fn user_message(&self) -> String {
        let (operation, status, message) = match self {
            ApiError::Status {
                operation,
                status,
                message,
            } => (operation, *status, message),
            ApiError::Network { .. } => {
                return "Network error. Please check your connection.".to_string();
            }
            ApiError::Timeout { .. } => return "Request timed out. Please try again.".to_string(),
            ApiError::Decode { operation, .. } => return operation.default_message().to_string(),
        };

        if let Some(message) = message.as_deref().filter(|m| !m.trim().is_empty()) {
            return message.to_string();
        }

        match status {
            400 => "Bad request. Please check your input.",
            401 => operation.unauthorized_message(),
            403 => "Access denied. You do not have permission to perform this action.",
            404 => "Resource not found.",
            409 => operation.conflict_message(),
            422 => "Validation error. Please check your input.",
            429 => "Too many requests. Please try again later.",
            500..=599 => "Server error. Please try again later.",
            _ => operation.default_message(),
        }
        .to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("credential storage failed: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation(_) => ErrorKind::ValidationError,
            AuthError::Api(e) => e.kind(),
            AuthError::Store(_) => ErrorKind::Storage,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            AuthError::Validation(e) => e
                .errors()
                .first()
                .map(|f| f.message.clone())
                .unwrap_or_else(|| e.to_string()),
            AuthError::Api(e) => e.user_message(),
            AuthError::Store(_) => {
                "Could not access saved credentials. Please try again.".to_string()
            }
        }
    }
}
