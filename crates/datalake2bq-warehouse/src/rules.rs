//! Deduplication rules per schema type

/// Natural key and recency column for one schema type's table
#[derive(Debug, PartialEq, Eq)]
pub struct DedupRule {
    pub schema_type: &'static str,
    /// Columns that identify one logical record
    pub natural_key: &'static [&'static str],
    /// Only rows where this column is NULL are superseded
    pub open_interval: Option<&'static str>,
    /// Timestamp column; the most recent row has the greatest value
    pub recency: &'static str,
}

const UPDATE_TIMESTAMP: &str = "updateTimestamp";

pub static DEDUP_RULES: &[DedupRule] = &[
    DedupRule {
        schema_type: "conversations",
        natural_key: &["conversationId"],
        open_interval: None,
        recency: UPDATE_TIMESTAMP,
    },
    DedupRule {
        schema_type: "participants",
        natural_key: &["conversationId", "participantId"],
        open_interval: None,
        recency: UPDATE_TIMESTAMP,
    },
    DedupRule {
        schema_type: "sessions",
        natural_key: &["conversationId", "sessionId"],
        open_interval: None,
        recency: UPDATE_TIMESTAMP,
    },
    DedupRule {
        schema_type: "segments",
        natural_key: &["conversationId", "sessionId", "segmentStart"],
        open_interval: None,
        recency: UPDATE_TIMESTAMP,
    },
    DedupRule {
        schema_type: "sessionMetrics",
        natural_key: &["conversationId", "sessionId", "name"],
        open_interval: None,
        recency: UPDATE_TIMESTAMP,
    },
    DedupRule {
        schema_type: "userPresence",
        natural_key: &["userId", "sessionId", "startTime"],
        open_interval: Some("endTime"),
        recency: UPDATE_TIMESTAMP,
    },
    DedupRule {
        schema_type: "userRoutingStatus",
        natural_key: &["userId", "sessionId", "startTime"],
        open_interval: Some("endTime"),
        recency: UPDATE_TIMESTAMP,
    },
];

/// Rule for a schema type, if it is deduplicated at all
pub fn rule_for(schema_type: &str) -> Option<&'static DedupRule> {
    DEDUP_RULES.iter().find(|rule| rule.schema_type == schema_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;

    #[test]
    fn test_lookup() {
        assert_eq!(
            rule_for("segments").unwrap().natural_key,
            &["conversationId", "sessionId", "segmentStart"]
        );
        assert_eq!(rule_for("userPresence").unwrap().open_interval, Some("endTime"));
        assert!(rule_for("NOT_FOUND").is_none());
        assert!(rule_for("flows").is_none());
    }

    #[test]
    fn test_every_rule_is_made_of_valid_identifiers() {
        for rule in DEDUP_RULES {
            assert!(!rule.natural_key.is_empty(), "{}", rule.schema_type);
            for column in rule
                .natural_key
                .iter()
                .chain(rule.open_interval.iter())
                .chain(std::iter::once(&rule.recency))
            {
                Identifier::new(*column).unwrap();
            }
            Identifier::new(format!("{}_parquet", rule.schema_type)).unwrap();
        }
    }

    #[test]
    fn test_schema_types_are_unique() {
        let mut names: Vec<&str> = DEDUP_RULES.iter().map(|r| r.schema_type).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), DEDUP_RULES.len());
    }
}
