//! Export descriptors, signed transfers and staged objects
//!
//! Field names follow the analytics API wire format so the listing and
//! bulk-resolve responses deserialize straight into these types.

use crate::SchemaType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One downloadable artifact as listed by the metadata endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDescriptor {
    pub id: String,

    #[serde(rename = "dataSchema")]
    pub schema_type: SchemaType,

    #[serde(rename = "dateCreated", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(rename = "dateExpires", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// One page of the metadata listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPage {
    #[serde(rename = "entities", default)]
    pub descriptors: Vec<ExportDescriptor>,

    /// Host-relative continuation URI; absent or empty on the last page
    #[serde(rename = "nextUri", default, skip_serializing_if = "Option::is_none")]
    pub next_uri: Option<String>,

    #[serde(rename = "enabledDataSchemas", default)]
    pub enabled_schemas: Vec<String>,
}

impl ExportPage {
    /// Continuation URI, treating an empty string as "no more pages"
    pub fn continuation(&self) -> Option<&str> {
        self.next_uri.as_deref().filter(|uri| !uri.trim().is_empty())
    }

    pub fn ids(&self) -> Vec<String> {
        self.descriptors.iter().map(|d| d.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Export id to schema type, as listed on this page
    pub fn schema_index(&self) -> HashMap<&str, &SchemaType> {
        self.descriptors
            .iter()
            .map(|d| (d.id.as_str(), &d.schema_type))
            .collect()
    }
}

/// Time-limited download location for one export
///
/// Must be consumed promptly after resolution; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransfer {
    pub id: String,

    #[serde(rename = "signedUrl")]
    pub url: String,
}

/// An artifact written to the staging bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedObject {
    pub schema_type: SchemaType,
    pub object_path: String,
    pub size_bytes: u64,
    /// Row count read from the Parquet footer
    pub row_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_deserializes_wire_format() {
        let json = r#"{
            "entities": [
                {"id": "a1", "dataSchema": "conversations",
                 "dateCreated": "2024-03-01T02:00:00.000Z", "dateExpires": "2024-03-08T02:00:00.000Z"},
                {"id": "b2", "dataSchema": "segments"}
            ],
            "nextUri": "/api/v2/analytics/dataextraction/downloads/metadata?cursor=xyz",
            "enabledDataSchemas": ["conversations", "segments"]
        }"#;

        let page: ExportPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page.descriptors[0].schema_type.as_str(), "conversations");
        assert!(page.descriptors[0].created_at.is_some());
        assert!(page.descriptors[1].expires_at.is_none());
        assert_eq!(
            page.continuation(),
            Some("/api/v2/analytics/dataextraction/downloads/metadata?cursor=xyz")
        );
        assert_eq!(page.ids(), vec!["a1".to_string(), "b2".to_string()]);

        let index = page.schema_index();
        assert_eq!(index["b2"].as_str(), "segments");
    }

    #[test]
    fn test_empty_next_uri_ends_listing() {
        let page: ExportPage = serde_json::from_str(r#"{"entities": [], "nextUri": ""}"#).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.continuation(), None);
    }

    #[test]
    fn test_signed_transfer_wire_format() {
        let transfer: SignedTransfer =
            serde_json::from_str(r#"{"id": "a1", "signedUrl": "https://files.example/a1"}"#)
                .unwrap();
        assert_eq!(transfer.id, "a1");
        assert_eq!(transfer.url, "https://files.example/a1");
    }
}
