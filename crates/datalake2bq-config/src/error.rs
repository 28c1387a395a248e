//! Configuration errors

use datalake2bq_core::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required settings are absent
    #[error("[{code}] Missing required configuration: {}\n\nSet each variable (bare or with the DATALAKE2BQ_ prefix) or provide it in the config file.", .variables.join(", "))]
    Missing {
        code: &'static str,
        variables: Vec<&'static str>,
    },

    /// A setting is present but unusable
    #[error("[{code}] Invalid configuration for '{setting}': {reason}")]
    Invalid {
        code: &'static str,
        setting: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn missing(variables: Vec<&'static str>) -> Self {
        Self::Missing {
            code: ErrorCode::E001InvalidConfig.as_str(),
            variables,
        }
    }

    pub fn invalid(setting: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            code: ErrorCode::E001InvalidConfig.as_str(),
            setting: setting.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        ErrorCode::E001InvalidConfig
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_names_every_variable() {
        let err = ConfigError::missing(vec!["REGION", "SECRET"]);
        let rendered = err.to_string();
        assert!(rendered.starts_with("[E001]"));
        assert!(rendered.contains("REGION, SECRET"));
    }
}
