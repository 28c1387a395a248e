//! Explicit load schemas
//!
//! Most schema types are loaded with schema auto-detection from the Parquet
//! files. `conversations` carries repeated string columns that auto-detection
//! maps to nested records, so its table schema is pinned here.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    String,
    Timestamp,
    Boolean,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    Nullable,
    Repeated,
}

/// One column of a load schema, serialized in BigQuery's `TableFieldSchema` shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchemaField {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub mode: FieldMode,
}

const fn field(name: &'static str, field_type: FieldType) -> SchemaField {
    SchemaField {
        name,
        field_type,
        mode: FieldMode::Nullable,
    }
}

const fn repeated(name: &'static str, field_type: FieldType) -> SchemaField {
    SchemaField {
        name,
        field_type,
        mode: FieldMode::Repeated,
    }
}

pub const CONVERSATIONS_SCHEMA: &[SchemaField] = &[
    field("organizationId", FieldType::String),
    field("conversationId", FieldType::String),
    field("updateTimestamp", FieldType::Timestamp),
    field("conversationStart", FieldType::Timestamp),
    field("conversationEnd", FieldType::Timestamp),
    field("conferenceStart", FieldType::Timestamp),
    field("conversationInitiator", FieldType::String),
    field("customerParticipation", FieldType::Boolean),
    repeated("divisionIds", FieldType::String),
    field("externalTag", FieldType::String),
    repeated("knowledgeBaseIds", FieldType::String),
    field("mediaStatsMinConversationMos", FieldType::Float),
    field("mediaStatsMinConversationRFactor", FieldType::Float),
    field("originatingDirection", FieldType::String),
    field("originatingSocialMediaPublic", FieldType::Boolean),
    field("selfServed", FieldType::Boolean),
    field("inactivityTimeout", FieldType::Timestamp),
];

/// Explicit schema for a schema type, if one is pinned
pub fn explicit_schema(schema_type: &str) -> Option<&'static [SchemaField]> {
    match schema_type {
        "conversations" => Some(CONVERSATIONS_SCHEMA),
        _ => None,
    }
}
