//! Errors raised while talking to the analytics API

use datalake2bq_core::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// Client-credentials exchange failed
    #[error("[{code}] Authentication against '{endpoint}' failed: {reason}\n\nTroubleshooting:\n  • Check CLIENT_ID and SECRET belong to an OAuth client-credentials grant\n  • Check REGION matches the organization's region")]
    Auth {
        code: &'static str,
        endpoint: String,
        reason: String,
    },

    /// Metadata or bulk request failed
    #[error("[{code}] Request to '{endpoint}' failed: {reason}")]
    Request {
        code: &'static str,
        endpoint: String,
        reason: String,
    },

    /// Bulk resolve called with more ids than one request accepts
    #[error("[{code}] Bulk resolve accepts at most {max} ids, got {requested}")]
    BatchTooLarge {
        code: &'static str,
        requested: usize,
        max: usize,
    },
}

impl SourceError {
    pub fn auth(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Auth {
            code: ErrorCode::E002AuthFailed.as_str(),
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    pub fn request(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Request {
            code: ErrorCode::E003RequestFailed.as_str(),
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    pub fn batch_too_large(requested: usize, max: usize) -> Self {
        Self::BatchTooLarge {
            code: ErrorCode::E004BatchTooLarge.as_str(),
            requested,
            max,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Auth { .. } => ErrorCode::E002AuthFailed,
            Self::Request { .. } => ErrorCode::E003RequestFailed,
            Self::BatchTooLarge { .. } => ErrorCode::E004BatchTooLarge,
        }
    }
}

/// Result type alias for SourceError
pub type Result<T> = std::result::Result<T, SourceError>;
