//! Error types for routine
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, bad date, bad config)
//! - 4: Operation failed (io, remote store, lock contention)
//!
//! Backend failures are normally contained by the record store and never
//! reach the exit code; they surface here only when a caller asks for them.

use std::path::PathBuf;
use thiserror::Error;

use crate::datekey::DateKey;

/// Exit codes for the routine CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for routine operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid date key '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Streak engine
    #[error("Inconsistent state: last logged {last_logged} is after today {today}")]
    InconsistentState { last_logged: DateKey, today: DateKey },

    // Operation failures (exit code 4)
    #[error("Remote read failed on {table}: {reason}")]
    RemoteRead { table: String, reason: String },

    #[error("Remote write failed on {table}: {reason}")]
    RemoteWrite { table: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidDate(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::InconsistentState { .. } => exit_codes::USER_ERROR,

            Error::RemoteRead { .. }
            | Error::RemoteWrite { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Short machine-readable kind for JSON output.
    pub fn kind(&self) -> &'static str {
        match self.exit_code() {
            exit_codes::USER_ERROR => "user_error",
            _ => "operation_failed",
        }
    }
}

/// Result type alias for routine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        let details = match err {
            Error::InconsistentState { last_logged, today } => Some(serde_json::json!({
                "last_logged_date": last_logged.to_string(),
                "today": today.to_string(),
            })),
            Error::RemoteRead { table, .. } | Error::RemoteWrite { table, .. } => {
                Some(serde_json::json!({ "table": table }))
            }
            _ => None,
        };
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_map_correctly() {
        assert_eq!(
            Error::InvalidDate("2024-13-01".to_string()).exit_code(),
            exit_codes::USER_ERROR
        );
        assert_eq!(
            Error::RemoteWrite {
                table: "schedule_logs".to_string(),
                reason: "offline".to_string(),
            }
            .exit_code(),
            exit_codes::OPERATION_FAILED
        );
    }

    #[test]
    fn json_error_carries_inconsistent_dates() {
        let err = Error::InconsistentState {
            last_logged: "2024-01-05".parse().expect("date"),
            today: "2024-01-04".parse().expect("date"),
        };
        let json = JsonError::from(&err);
        assert_eq!(json.code, exit_codes::USER_ERROR);
        let details = json.details.expect("details");
        assert_eq!(details["last_logged_date"], "2024-01-05");
        assert_eq!(details["today"], "2024-01-04");
    }
}
