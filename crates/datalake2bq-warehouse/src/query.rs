//! Deduplication DML generation
//!
//! The statement is rendered from a fixed template. Placeholders are filled
//! only with backtick-quoted [`Identifier`]s from a compiled-in [`DedupRule`]
//! plus integer and literal values computed here.

use crate::error::{Result, WarehouseError};
use crate::identifier::{Identifier, TableRef};
use crate::rules::DedupRule;

/// Delete superseded rows within the most recent `window_offset + 1` rows.
///
/// A row is superseded when another row with the same natural key has a
/// strictly greater recency value. Rows older than the window floor are never
/// touched; when the table is smaller than the window the floor is the epoch.
const DEDUP_TEMPLATE: &str = "\
DELETE FROM {{table}} AS t
WHERE t.{{recency}} >= IFNULL(
    (SELECT {{recency}} FROM {{table}} ORDER BY {{recency}} DESC LIMIT 1 OFFSET {{window_offset}}),
    {{floor}})
  AND EXISTS (
    SELECT 1 FROM {{table}} AS newer
    WHERE {{key_predicate}}
      AND newer.{{recency}} > t.{{recency}})";

/// Window floor when the table holds fewer rows than the window
const RECENCY_FLOOR: &str = "TIMESTAMP_SECONDS(0)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupQuery {
    pub table: TableRef,
    pub sql: String,
}

/// Build the deduplication statement for one table.
///
/// Only rules from the static mapping are accepted, so no caller-supplied
/// column name can reach the SQL text.
pub fn build_dedup_query(
    project: &str,
    dataset: &str,
    rule: &'static DedupRule,
    window_rows: u32,
) -> Result<DedupQuery> {
    let table = TableRef::new(project, dataset, &format!("{}_parquet", rule.schema_type))?;
    let recency = Identifier::new(rule.recency)?;

    let mut conditions = rule
        .natural_key
        .iter()
        .map(|column| -> Result<String> {
            let column = Identifier::new(*column)?.quoted();
            Ok(format!("newer.{column} = t.{column}"))
        })
        .collect::<Result<Vec<String>>>()?;
    if conditions.is_empty() {
        return Err(WarehouseError::invalid_identifier(
            rule.schema_type,
            "deduplication rule has no natural key",
        ));
    }
    if let Some(column) = rule.open_interval {
        conditions.push(format!("t.{} IS NULL", Identifier::new(column)?.quoted()));
    }

    let window_offset = window_rows.max(1) - 1;
    let sql = render(
        DEDUP_TEMPLATE,
        &[
            ("table", table.quoted()),
            ("recency", recency.quoted()),
            ("key_predicate", conditions.join("\n      AND ")),
            ("window_offset", window_offset.to_string()),
            ("floor", RECENCY_FLOOR.to_string()),
        ],
    );

    Ok(DedupQuery { table, sql })
}

fn render(template: &str, values: &[(&str, String)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |sql, (name, value)| {
            sql.replace(&format!("{{{{{}}}}}", name), value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::rule_for;

    #[test]
    fn test_conversations_query() {
        let rule = rule_for("conversations").unwrap();
        let query = build_dedup_query("proj", "genesys", rule, 5_000).unwrap();

        assert_eq!(query.table.to_string(), "proj.genesys.conversations_parquet");
        assert_eq!(
            query.sql,
            "\
DELETE FROM `proj.genesys.conversations_parquet` AS t
WHERE t.`updateTimestamp` >= IFNULL(
    (SELECT `updateTimestamp` FROM `proj.genesys.conversations_parquet` ORDER BY `updateTimestamp` DESC LIMIT 1 OFFSET 4999),
    TIMESTAMP_SECONDS(0))
  AND EXISTS (
    SELECT 1 FROM `proj.genesys.conversations_parquet` AS newer
    WHERE newer.`conversationId` = t.`conversationId`
      AND newer.`updateTimestamp` > t.`updateTimestamp`)"
        );
    }

    #[test]
    fn test_composite_key_and_open_interval() {
        let query =
            build_dedup_query("proj", "ds", rule_for("userPresence").unwrap(), 5_000).unwrap();

        assert!(query.sql.contains("newer.`userId` = t.`userId`"));
        assert!(query.sql.contains("AND newer.`sessionId` = t.`sessionId`"));
        assert!(query.sql.contains("AND newer.`startTime` = t.`startTime`"));
        assert!(query.sql.contains("AND t.`endTime` IS NULL"));
        assert!(!query.sql.contains("{{"));
    }

    #[test]
    fn test_window_size_sets_offset() {
        let rule = rule_for("segments").unwrap();
        let query = build_dedup_query("proj", "ds", rule, 100).unwrap();
        assert!(query.sql.contains("LIMIT 1 OFFSET 99)"));

        let query = build_dedup_query("proj", "ds", rule, 1).unwrap();
        assert!(query.sql.contains("LIMIT 1 OFFSET 0)"));
    }

    #[test]
    fn test_invalid_dataset_rejected_before_rendering() {
        let rule = rule_for("sessions").unwrap();
        let err = build_dedup_query("proj", "bad`ds", rule, 10).unwrap_err();
        assert!(matches!(err, WarehouseError::InvalidIdentifier { .. }));
    }

    /// Row model mirroring the DML predicate, used to check its intended effect
    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        key: &'static str,
        recency: i64,
        open: bool,
    }

    fn reference_delete(rows: &[Row], window: usize, open_interval: bool) -> Vec<Row> {
        let mut recencies: Vec<i64> = rows.iter().map(|r| r.recency).collect();
        recencies.sort_unstable_by(|a, b| b.cmp(a));
        let floor = recencies.get(window - 1).copied().unwrap_or(0);

        rows.iter()
            .filter(|t| {
                t.recency >= floor
                    && (!open_interval || t.open)
                    && rows
                        .iter()
                        .any(|newer| newer.key == t.key && newer.recency > t.recency)
            })
            .cloned()
            .collect()
    }

    fn row(key: &'static str, recency: i64) -> Row {
        Row {
            key,
            recency,
            open: true,
        }
    }

    #[test]
    fn test_smaller_recency_duplicate_inside_window_is_deleted() {
        let rows = vec![row("a", 10), row("a", 20), row("b", 15)];
        assert_eq!(reference_delete(&rows, 5_000, false), vec![row("a", 10)]);
    }

    #[test]
    fn test_rows_outside_window_untouched() {
        // Window of 2 most recent rows: floor = 40
        let rows = vec![row("a", 10), row("a", 50), row("b", 40), row("b", 30)];
        assert!(reference_delete(&rows, 2, false).is_empty());

        let rows = vec![row("a", 40), row("a", 50), row("b", 10)];
        assert_eq!(reference_delete(&rows, 2, false), vec![row("a", 40)]);
    }

    #[test]
    fn test_equal_recency_is_not_a_duplicate() {
        let rows = vec![row("a", 10), row("a", 10)];
        assert!(reference_delete(&rows, 10, false).is_empty());
    }

    #[test]
    fn test_closed_intervals_survive() {
        let closed = Row {
            key: "a",
            recency: 10,
            open: false,
        };
        let rows = vec![closed, row("a", 5), row("a", 20)];
        assert_eq!(reference_delete(&rows, 10, true), vec![row("a", 5)]);
    }
}
