//! Error codes shared by every pipeline crate

use std::fmt;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// E001: Required setting missing or invalid
    E001InvalidConfig,
    /// E002: Token exchange with the analytics API failed
    E002AuthFailed,
    /// E003: Analytics API request failed
    E003RequestFailed,
    /// E004: Bulk resolve called with more ids than one request accepts
    E004BatchTooLarge,
    /// E005: Signed URL could not be fetched
    E005FetchFailed,
    /// E006: Signed URL answered with a non-success status
    E006UnexpectedStatus,
    /// E007: Downloaded payload is not a Parquet file
    E007InvalidPayload,
    /// E008: Staging write failed
    E008WriteFailed,
    /// E009: Table or column identifier rejected
    E009InvalidIdentifier,
    /// E010: Warehouse job could not be submitted or polled
    E010JobSubmit,
    /// E011: Warehouse job finished with errors
    E011JobFailed,
    /// E012: Warehouse job did not finish in time
    E012JobTimeout,
    /// E013: Warehouse access token unavailable
    E013TokenUnavailable,
    /// E014: Staging prefix listing failed
    E014ListFailed,
    /// E015: Staged object delete failed
    E015DeleteFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E001InvalidConfig => "E001",
            Self::E002AuthFailed => "E002",
            Self::E003RequestFailed => "E003",
            Self::E004BatchTooLarge => "E004",
            Self::E005FetchFailed => "E005",
            Self::E006UnexpectedStatus => "E006",
            Self::E007InvalidPayload => "E007",
            Self::E008WriteFailed => "E008",
            Self::E009InvalidIdentifier => "E009",
            Self::E010JobSubmit => "E010",
            Self::E011JobFailed => "E011",
            Self::E012JobTimeout => "E012",
            Self::E013TokenUnavailable => "E013",
            Self::E014ListFailed => "E014",
            Self::E015DeleteFailed => "E015",
        }
    }

    /// Failures that stop the run before or instead of any phase work
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::E001InvalidConfig | Self::E002AuthFailed | Self::E013TokenUnavailable
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
