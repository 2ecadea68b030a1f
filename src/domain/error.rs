use std::fmt;

/// Errors surfaced by the generation pipeline.
///
/// Provider failures (`ConnectionFailure`, `DependencyMissing`,
/// `AuthorizationFailure`) always propagate to the caller. Parse problems never
/// show up here: they degrade to fewer artifacts instead.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Connection failure: {0}")]
    ConnectionFailure(String),
    #[error("Missing dependency: {0}")]
    DependencyMissing(String),
    #[error("Authorization failure: {0}")]
    AuthorizationFailure(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl AppError {
    /// The message without its category prefix, suitable for showing to a user as-is.
    pub fn user_message(&self) -> &str {
        match self {
            AppError::ConnectionFailure(msg)
            | AppError::DependencyMissing(msg)
            | AppError::AuthorizationFailure(msg)
            | AppError::ValidationError(msg)
            | AppError::ConfigError(msg)
            | AppError::Internal(msg)
            | AppError::IoError(msg) => msg,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ConnectionFailure(_) => ErrorKind::ConnectionFailure,
            AppError::DependencyMissing(_) => ErrorKind::DependencyMissing,
            AppError::AuthorizationFailure(_) => ErrorKind::AuthorizationFailure,
            AppError::ValidationError(_) => ErrorKind::Validation,
            AppError::ConfigError(_) => ErrorKind::Config,
            AppError::Internal(_) => ErrorKind::Internal,
            AppError::IoError(_) => ErrorKind::Io,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConnectionFailure,
    DependencyMissing,
    AuthorizationFailure,
    Validation,
    Config,
    Internal,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailure => write!(f, "connection_failure"),
            Self::DependencyMissing => write!(f, "dependency_missing"),
            Self::AuthorizationFailure => write!(f, "authorization_failure"),
            Self::Validation => write!(f, "validation"),
            Self::Config => write!(f, "config"),
            Self::Internal => write!(f, "internal"),
            Self::Io => write!(f, "io"),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(err: figment::Error) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
