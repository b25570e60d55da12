//! Write actions

use serde::Serialize;
use serde_json::{json, Value};

/// Fixed allowance for the per-action metadata line
const METADATA_BYTES: usize = 64;

/// Metadata line of a bulk request entry
#[derive(Debug, Serialize)]
struct BulkMeta<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
}

/// One write against the backend
#[derive(Debug, Clone, PartialEq)]
pub enum WriteAction {
    Index {
        index: String,
        id: Option<String>,
        document: Value,
    },
    Update {
        index: String,
        id: String,
        document: Value,
        upsert: bool,
    },
    Delete {
        index: String,
        id: String,
    },
}

impl WriteAction {
    pub fn index(index: impl Into<String>, document: Value) -> Self {
        WriteAction::Index {
            index: index.into(),
            id: None,
            document,
        }
    }

    pub fn index_with_id(index: impl Into<String>, id: impl Into<String>, document: Value) -> Self {
        WriteAction::Index {
            index: index.into(),
            id: Some(id.into()),
            document,
        }
    }

    pub fn upsert(index: impl Into<String>, id: impl Into<String>, document: Value) -> Self {
        WriteAction::Update {
            index: index.into(),
            id: id.into(),
            document,
            upsert: true,
        }
    }

    pub fn delete(index: impl Into<String>, id: impl Into<String>) -> Self {
        WriteAction::Delete {
            index: index.into(),
            id: id.into(),
        }
    }

    pub fn target_index(&self) -> &str {
        match self {
            WriteAction::Index { index, .. }
            | WriteAction::Update { index, .. }
            | WriteAction::Delete { index, .. } => index,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            WriteAction::Index { id, .. } => id.as_deref(),
            WriteAction::Update { id, .. } | WriteAction::Delete { id, .. } => Some(id),
        }
    }

    /// Estimated request size in bytes
    pub fn size_bytes(&self) -> usize {
        let document = match self {
            WriteAction::Index { document, .. } | WriteAction::Update { document, .. } => {
                document.to_string().len()
            }
            WriteAction::Delete { .. } => 0,
        };
        METADATA_BYTES + self.target_index().len() + self.id().map_or(0, str::len) + document
    }

    /// Bulk API lines for this action: the metadata line, then the
    /// document line for index and update.
    pub fn bulk_lines(&self) -> Result<Vec<String>, serde_json::Error> {
        let meta = BulkMeta {
            index: self.target_index(),
            id: self.id(),
        };
        let mut lines = Vec::with_capacity(2);
        match self {
            WriteAction::Index { document, .. } => {
                lines.push(serde_json::to_string(&json!({ "index": meta }))?);
                lines.push(serde_json::to_string(document)?);
            }
            WriteAction::Update {
                document, upsert, ..
            } => {
                lines.push(serde_json::to_string(&json!({ "update": meta }))?);
                lines.push(serde_json::to_string(
                    &json!({ "doc": document, "doc_as_upsert": upsert }),
                )?);
            }
            WriteAction::Delete { .. } => {
                lines.push(serde_json::to_string(&json!({ "delete": meta }))?);
            }
        }
        Ok(lines)
    }
}

/// Newline-delimited bulk request body for a batch
pub fn bulk_body(actions: &[WriteAction]) -> Result<String, serde_json::Error> {
    let mut body = String::new();
    for action in actions {
        for line in action.bulk_lines()? {
            body.push_str(&line);
            body.push('\n');
        }
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors() {
        let action = WriteAction::index_with_id("logs", "42", json!({"msg": "hi"}));
        assert_eq!(action.target_index(), "logs");
        assert_eq!(action.id(), Some("42"));
        assert_eq!(WriteAction::index("logs", json!({})).id(), None);
    }

    #[test]
    fn test_size_grows_with_document() {
        let small = WriteAction::index("logs", json!({"a": 1}));
        let large = WriteAction::index("logs", json!({"a": "x".repeat(1000)}));
        assert!(large.size_bytes() > small.size_bytes() + 900);
        assert!(WriteAction::delete("logs", "1").size_bytes() < small.size_bytes());
    }

    #[test]
    fn test_bulk_body() {
        let body = bulk_body(&[
            WriteAction::index("logs", json!({"msg": "hi"})),
            WriteAction::upsert("logs", "7", json!({"n": 1})),
            WriteAction::delete("logs", "8"),
        ])
        .unwrap();

        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], r#"{"index":{"_index":"logs"}}"#);
        assert_eq!(lines[1], r#"{"msg":"hi"}"#);
        assert_eq!(lines[2], r#"{"update":{"_id":"7","_index":"logs"}}"#);
        assert_eq!(lines[3], r#"{"doc":{"n":1},"doc_as_upsert":true}"#);
        assert_eq!(lines[4], r#"{"delete":{"_id":"8","_index":"logs"}}"#);
        assert!(body.ends_with('\n'));
    }
}
