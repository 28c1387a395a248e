//! Errors raised by warehouse jobs

use datalake2bq_core::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WarehouseError {
    /// Table or column name rejected before any request was sent
    #[error("[{code}] Invalid identifier '{identifier}': {reason}")]
    InvalidIdentifier {
        code: &'static str,
        identifier: String,
        reason: String,
    },

    /// Job could not be inserted or polled
    #[error("[{code}] Submitting job for '{table}' failed: {reason}")]
    JobSubmit {
        code: &'static str,
        table: String,
        reason: String,
    },

    /// Job finished with a job-level error or row errors
    #[error("[{code}] Job '{job_id}' for '{table}' failed: {reason}")]
    JobFailed {
        code: &'static str,
        table: String,
        job_id: String,
        reason: String,
    },

    /// Job did not reach DONE within the maximum wait
    #[error("[{code}] Job '{job_id}' for '{table}' still running after {waited_secs}s")]
    JobTimeout {
        code: &'static str,
        table: String,
        job_id: String,
        waited_secs: u64,
    },

    /// No usable access token
    #[error("[{code}] Warehouse access token unavailable: {reason}\n\nTroubleshooting:\n  • Set DATALAKE2BQ_BIGQUERY_ACCESS_TOKEN, or\n  • Run with a service account attached (metadata server)")]
    Token { code: &'static str, reason: String },
}

impl WarehouseError {
    pub fn invalid_identifier(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            code: ErrorCode::E009InvalidIdentifier.as_str(),
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    pub fn job_submit(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::JobSubmit {
            code: ErrorCode::E010JobSubmit.as_str(),
            table: table.into(),
            reason: reason.into(),
        }
    }

    pub fn job_failed(
        table: impl Into<String>,
        job_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::JobFailed {
            code: ErrorCode::E011JobFailed.as_str(),
            table: table.into(),
            job_id: job_id.into(),
            reason: reason.into(),
        }
    }

    pub fn job_timeout(
        table: impl Into<String>,
        job_id: impl Into<String>,
        waited_secs: u64,
    ) -> Self {
        Self::JobTimeout {
            code: ErrorCode::E012JobTimeout.as_str(),
            table: table.into(),
            job_id: job_id.into(),
            waited_secs,
        }
    }

    pub fn token(reason: impl Into<String>) -> Self {
        Self::Token {
            code: ErrorCode::E013TokenUnavailable.as_str(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidIdentifier { .. } => ErrorCode::E009InvalidIdentifier,
            Self::JobSubmit { .. } => ErrorCode::E010JobSubmit,
            Self::JobFailed { .. } => ErrorCode::E011JobFailed,
            Self::JobTimeout { .. } => ErrorCode::E012JobTimeout,
            Self::Token { .. } => ErrorCode::E013TokenUnavailable,
        }
    }
}

/// Result type alias for WarehouseError
pub type Result<T> = std::result::Result<T, WarehouseError>;
