//! Error types for staging writes and purges

use datalake2bq_core::ErrorCode;
use thiserror::Error;

/// Why a single export did not reach the staging bucket
#[derive(Debug, Error)]
pub enum TransferError {
    /// Signed URL could not be fetched
    #[error("[{code}] Download of export '{export_id}' failed: {reason}")]
    Fetch {
        code: &'static str,
        export_id: String,
        reason: String,
    },

    /// Signed URL answered with a non-success status
    #[error("[{code}] Download of export '{export_id}' returned HTTP {status}")]
    Status {
        code: &'static str,
        export_id: String,
        status: u16,
    },

    /// Payload is not a readable Parquet file
    #[error("[{code}] Export '{export_id}' is not a valid Parquet file: {reason}")]
    InvalidPayload {
        code: &'static str,
        export_id: String,
        reason: String,
    },

    /// Staging write failed or was refused
    #[error("[{code}] Write of '{path}' failed: {reason}")]
    Write {
        code: &'static str,
        path: String,
        reason: String,
    },
}

impl TransferError {
    pub fn fetch(export_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            code: ErrorCode::E005FetchFailed.as_str(),
            export_id: export_id.into(),
            reason: reason.into(),
        }
    }

    pub fn status(export_id: impl Into<String>, status: u16) -> Self {
        Self::Status {
            code: ErrorCode::E006UnexpectedStatus.as_str(),
            export_id: export_id.into(),
            status,
        }
    }

    pub fn invalid_payload(export_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            code: ErrorCode::E007InvalidPayload.as_str(),
            export_id: export_id.into(),
            reason: reason.into(),
        }
    }

    pub fn write(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Write {
            code: ErrorCode::E008WriteFailed.as_str(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Fetch { .. } => ErrorCode::E005FetchFailed,
            Self::Status { .. } => ErrorCode::E006UnexpectedStatus,
            Self::InvalidPayload { .. } => ErrorCode::E007InvalidPayload,
            Self::Write { .. } => ErrorCode::E008WriteFailed,
        }
    }
}

/// Why a staging prefix could not be emptied
#[derive(Debug, Error)]
pub enum ReclaimError {
    #[error("[{code}] Listing '{prefix}' failed: {reason}")]
    List {
        code: &'static str,
        prefix: String,
        reason: String,
    },

    #[error("[{code}] Deleting '{path}' failed after {deleted} deletions: {reason}")]
    Delete {
        code: &'static str,
        path: String,
        deleted: usize,
        reason: String,
    },
}

impl ReclaimError {
    pub fn list(prefix: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::List {
            code: ErrorCode::E014ListFailed.as_str(),
            prefix: prefix.into(),
            reason: reason.into(),
        }
    }

    pub fn delete(path: impl Into<String>, deleted: usize, reason: impl Into<String>) -> Self {
        Self::Delete {
            code: ErrorCode::E015DeleteFailed.as_str(),
            path: path.into(),
            deleted,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::List { .. } => ErrorCode::E014ListFailed,
            Self::Delete { .. } => ErrorCode::E015DeleteFailed,
        }
    }
}
