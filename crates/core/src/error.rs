//! Unified error types for the reports service.
//!
//! Error codes:
//! - AUTH_001-002: Authentication and identity errors
//! - WINDOW_001-003: Report window errors
//! - SOURCE_001: Malformed source records
//! - DB_001: Analytical store errors

use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Authentication error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    /// AUTH_001: Missing, invalid or expired credential
    Unauthenticated,
    /// AUTH_002: Verified credential carries no email, username or subject
    IdentityUnresolved,
}

impl AuthErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "AUTH_001",
            Self::IdentityUnresolved => "AUTH_002",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::IdentityUnresolved => 400,
        }
    }
}

/// Report window error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowErrorCode {
    /// WINDOW_001: from_date is after to_date
    InvertedRange,
    /// WINDOW_002: to_date is after the most recent report date
    BeyondAvailable,
    /// WINDOW_003: a bound is not a YYYY-MM-DD date
    Unparseable,
}

impl WindowErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvertedRange => "WINDOW_001",
            Self::BeyondAvailable => "WINDOW_002",
            Self::Unparseable => "WINDOW_003",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        422
    }
}

/// Unified error type for the reports service.
#[derive(Debug, Error)]
pub enum Error {
    /// Authentication error with code.
    #[error("[{code}] {message}")]
    Auth {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Report window error with code.
    #[error("[{code}] {message}")]
    Window {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    #[error("[SOURCE_001] {source_name} line {line}: {message}")]
    Source {
        source_name: String,
        line: u64,
        message: String,
    },

    #[error("[DB_001] {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an authentication error.
    pub fn auth(code: AuthErrorCode, msg: impl Into<String>) -> Self {
        Self::Auth {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Credential was missing, malformed, expired or rejected by the provider.
    ///
    /// The message is fixed so callers cannot learn which check failed.
    pub fn unauthenticated() -> Self {
        Self::auth(
            AuthErrorCode::Unauthenticated,
            "Invalid authentication credentials",
        )
    }

    pub fn identity_unresolved() -> Self {
        Self::auth(
            AuthErrorCode::IdentityUnresolved,
            "Unable to identify user (no email/username in token)",
        )
    }

    /// Create a report window error.
    pub fn window(code: WindowErrorCode, msg: impl Into<String>) -> Self {
        Self::Window {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    pub fn inverted_window() -> Self {
        Self::window(
            WindowErrorCode::InvertedRange,
            "from_date must be less than or equal to to_date",
        )
    }

    pub fn window_unavailable(max_report_date: NaiveDate) -> Self {
        Self::window(
            WindowErrorCode::BeyondAvailable,
            format!(
                "Data for the requested period is not fully available yet. \
                 Max available date is {}.",
                max_report_date.format("%Y-%m-%d")
            ),
        )
    }

    pub fn source(source_name: impl Into<String>, line: u64, msg: impl Into<String>) -> Self {
        Self::Source {
            source_name: source_name.into(),
            line,
            message: msg.into(),
        }
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Auth { http_status, .. } => *http_status,
            Self::Window { http_status, .. } => *http_status,
            Self::Source { .. } => 500,
            Self::Database(_) => 500,
            Self::Serialization(_) => 500,
            Self::Io(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Auth { code, .. } => Some(code),
            Self::Window { code, .. } => Some(code),
            Self::Source { .. } => Some("SOURCE_001"),
            Self::Database(_) => Some("DB_001"),
            _ => None,
        }
    }

    /// Whether this error is an expected, client-facing rejection.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::Window { .. })
    }
}
