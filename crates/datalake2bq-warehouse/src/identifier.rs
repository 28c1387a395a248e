//! Validated warehouse identifiers
//!
//! Every name that reaches SQL text or a job reference passes through here
//! first, so quoting with backticks is always sufficient.

use crate::error::{Result, WarehouseError};
use std::fmt;

const MAX_IDENTIFIER_LEN: usize = 1024;

/// Table or column name matching `[A-Za-z_][A-Za-z0-9_]*`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(WarehouseError::invalid_identifier(value, "empty"));
        }
        if value.len() > MAX_IDENTIFIER_LEN {
            return Err(WarehouseError::invalid_identifier(
                value,
                format!("longer than {} characters", MAX_IDENTIFIER_LEN),
            ));
        }

        let mut chars = value.chars();
        let first_ok = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !first_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(WarehouseError::invalid_identifier(
                value,
                "must match [A-Za-z_][A-Za-z0-9_]*",
            ));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Backtick-quoted form for SQL text
    pub fn quoted(&self) -> String {
        format!("`{}`", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully qualified `project.dataset.table`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    project: String,
    dataset: Identifier,
    table: Identifier,
}

impl TableRef {
    pub fn new(project: &str, dataset: &str, table: &str) -> Result<Self> {
        Ok(Self {
            project: validate_project(project)?,
            dataset: Identifier::new(dataset)?,
            table: Identifier::new(table)?,
        })
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn dataset(&self) -> &Identifier {
        &self.dataset
    }

    pub fn table(&self) -> &Identifier {
        &self.table
    }

    /// `` `project.dataset.table` ``
    pub fn quoted(&self) -> String {
        format!("`{}.{}.{}`", self.project, self.dataset, self.table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// Project ids allow hyphens and an optional `domain:` prefix
pub fn validate_project(project: &str) -> Result<String> {
    let ok = !project.is_empty()
        && project.len() <= MAX_IDENTIFIER_LEN
        && project
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
        && project
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));

    if ok {
        Ok(project.to_string())
    } else {
        Err(WarehouseError::invalid_identifier(
            project,
            "project id must start with a letter and contain only letters, digits, '-', '_', '.', ':'",
        ))
    }
}
