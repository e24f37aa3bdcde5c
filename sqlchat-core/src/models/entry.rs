use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of an entry, unique and increasing within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

/// Discriminant of [`EntryContent`], for callers that only need the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryVariant {
    Plain,
    Sql,
    Explanation,
    Table,
    Unknown,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("ragged table: row {row} has {actual} cells, expected {expected}")]
pub struct TableShapeError {
    pub row: usize,
    pub expected: usize,
    pub actual: usize,
}

/// Result rows of a query. Every row has the same number of cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<String>>", into = "Vec<Vec<String>>")]
pub struct TableRows(Vec<Vec<String>>);

impl TableRows {
    pub fn new(rows: Vec<Vec<String>>) -> Result<Self, TableShapeError> {
        if let Some(first) = rows.first() {
            let expected = first.len();
            if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
                return Err(TableShapeError {
                    row,
                    expected,
                    actual: r.len(),
                });
            }
        }
        Ok(Self(rows))
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Cell count of each row; zero for an empty table.
    pub fn column_count(&self) -> usize {
        self.0.first().map_or(0, Vec::len)
    }
}

impl TryFrom<Vec<Vec<String>>> for TableRows {
    type Error = TableShapeError;

    fn try_from(rows: Vec<Vec<String>>) -> Result<Self, Self::Error> {
        Self::new(rows)
    }
}

impl From<TableRows> for Vec<Vec<String>> {
    fn from(rows: TableRows) -> Self {
        rows.0
    }
}

/// Variant-tagged payload of an entry. A payload can only exist alongside
/// its own variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum EntryContent {
    Plain,
    Sql {
        sql: String,
    },
    Explanation {
        explanation: String,
    },
    Table {
        rows: TableRows,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        columns: Option<Vec<String>>,
    },
    /// Tag written by a newer version of the transcript format.
    #[serde(other)]
    Unknown,
}

impl EntryContent {
    pub fn variant(&self) -> EntryVariant {
        match self {
            EntryContent::Plain => EntryVariant::Plain,
            EntryContent::Sql { .. } => EntryVariant::Sql,
            EntryContent::Explanation { .. } => EntryVariant::Explanation,
            EntryContent::Table { .. } => EntryVariant::Table,
            EntryContent::Unknown => EntryVariant::Unknown,
        }
    }
}

/// One logged message. Only [`crate::log::MessageLog`] creates entries, and
/// nothing mutates them afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    id: EntryId,
    sender: Sender,
    text: String,
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    content: EntryContent,
}

impl ConversationEntry {
    pub(crate) fn new(id: EntryId, timestamp: DateTime<Utc>, draft: EntryDraft) -> Self {
        Self {
            id,
            sender: draft.sender,
            text: draft.text,
            timestamp,
            content: draft.content,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn content(&self) -> &EntryContent {
        &self.content
    }

    pub fn variant(&self) -> EntryVariant {
        self.content.variant()
    }
}

/// An entry before the log has assigned its id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub sender: Sender,
    pub text: String,
    pub content: EntryContent,
}

impl EntryDraft {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            content: EntryContent::Plain,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
            content: EntryContent::Plain,
        }
    }

    pub fn assistant_with(text: impl Into<String>, content: EntryContent) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_table_rows_accepts_uniform_rows() {
        let rows = TableRows::new(vec![row(&["1", "Alice"]), row(&["2", "Bob"])]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.column_count(), 2);
    }

    #[test]
    fn test_table_rows_rejects_ragged_rows() {
        let err = TableRows::new(vec![row(&["1", "Alice"]), row(&["2"])]).unwrap_err();
        assert_eq!(
            err,
            TableShapeError {
                row: 1,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_empty_table_has_no_columns() {
        let rows = TableRows::new(vec![]).unwrap();
        assert!(rows.is_empty());
        assert_eq!(rows.column_count(), 0);
    }

    #[test]
    fn test_ragged_rows_fail_to_deserialize() {
        let result: Result<TableRows, _> = serde_json::from_str(r#"[["a","b"],["c"]]"#);
        assert!(result.is_err(), "ragged rows must not deserialize");
    }

    #[test]
    fn test_entry_serializes_with_variant_tag() {
        let entry = ConversationEntry::new(
            EntryId(3),
            Utc::now(),
            EntryDraft::assistant_with(
                "Here's the SQL query for your question:",
                EntryContent::Sql {
                    sql: "SELECT 1".to_string(),
                },
            ),
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["sender"], "assistant");
        assert_eq!(json["variant"], "sql");
        assert_eq!(json["sql"], "SELECT 1");
    }

    #[test]
    fn test_unrecognized_variant_deserializes_as_unknown() {
        let json = r#"{
            "id": 9,
            "sender": "assistant",
            "text": "A chart",
            "timestamp": "2026-01-08T10:00:00Z",
            "variant": "chart"
        }"#;
        let entry: ConversationEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.variant(), EntryVariant::Unknown);
        assert_eq!(entry.text(), "A chart");
    }
}
