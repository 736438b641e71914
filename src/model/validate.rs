//! Import-time validation of persisted Nova documents.
//!
//! Validation is structural: required top-level fields, per-variant block
//! shape, id uniqueness across the whole tree and the non-empty list rule.
//! Content semantics (dead links, empty headings) are never errors here.

use super::{Block, Document, Metadata, Theme, walk_blocks};
use serde_json::{Map, Value};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("invalid JSON: {0}")]
    Syntax(String),
    #[error("document is missing `version`")]
    MissingVersion,
    #[error("document is missing `metadata`")]
    MissingMetadata,
    #[error("document is missing `content`")]
    MissingContent,
    #[error("malformed `{field}`: {reason}")]
    MalformedField { field: &'static str, reason: String },
    #[error("malformed block{}: {reason}", .id.as_ref().map(|id| format!(" `{id}`")).unwrap_or_default())]
    MalformedBlock { id: Option<String>, reason: String },
    #[error("duplicate block id `{0}`")]
    DuplicateBlockId(String),
    #[error("list `{id}` has no items")]
    EmptyList { id: String },
}

pub fn parse(raw: &str) -> Result<Document, FormatError> {
    let value: Value = serde_json::from_str(raw).map_err(|err| {
        tracing::debug!(error = %err, "rejecting document: not valid JSON");
        FormatError::Syntax(err.to_string())
    })?;
    from_value(value)
}

pub fn from_value(value: Value) -> Result<Document, FormatError> {
    let Value::Object(mut map) = value else {
        return Err(FormatError::Syntax(
            "top-level value is not an object".to_string(),
        ));
    };

    let version = match map.remove("version") {
        None | Some(Value::Null) => return Err(FormatError::MissingVersion),
        Some(Value::String(version)) => version,
        Some(other) => {
            return Err(FormatError::MalformedField {
                field: "version",
                reason: format!("expected a string, found {}", json_kind(&other)),
            });
        }
    };

    let metadata = match map.remove("metadata") {
        None | Some(Value::Null) => return Err(FormatError::MissingMetadata),
        Some(raw) => serde_json::from_value::<Metadata>(raw).map_err(|err| {
            FormatError::MalformedField {
                field: "metadata",
                reason: err.to_string(),
            }
        })?,
    };

    let theme = match map.remove("theme") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(serde_json::from_value::<Theme>(raw).map_err(|err| {
            FormatError::MalformedField {
                field: "theme",
                reason: err.to_string(),
            }
        })?),
    };

    let raw_blocks = match map.remove("content") {
        None | Some(Value::Null) => return Err(FormatError::MissingContent),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(FormatError::MalformedField {
                field: "content",
                reason: format!("expected an array, found {}", json_kind(&other)),
            });
        }
    };

    let content = raw_blocks
        .into_iter()
        .map(parse_block)
        .collect::<Result<Vec<_>, _>>()?;
    audit(&content)?;

    let document = Document {
        version,
        metadata,
        theme,
        content,
    };
    tracing::debug!(
        title = %document.metadata.title,
        blocks = document.content.len(),
        "parsed document"
    );
    Ok(document)
}

/// Decodes one block value, reporting the innermost malformed block.
pub fn parse_block(value: Value) -> Result<Block, FormatError> {
    match Block::from_value(value.clone()) {
        Ok(block) => Ok(block),
        Err(err) => Err(locate_malformed(&value).unwrap_or_else(|| FormatError::MalformedBlock {
            id: value.get("id").and_then(Value::as_str).map(str::to_owned),
            reason: err.to_string(),
        })),
    }
}

fn locate_malformed(value: &Value) -> Option<FormatError> {
    nested_block_values(value)
        .into_iter()
        .find_map(|nested| parse_block(nested.clone()).err())
}

fn nested_block_values(value: &Value) -> Vec<&Value> {
    let mut nested = Vec::new();
    let Some(object) = value.as_object() else {
        return nested;
    };
    match object.get("type").and_then(Value::as_str) {
        Some("list") => {
            for item in array_field(object, "items") {
                if let Some(item) = item.as_object() {
                    nested.extend(array_field(item, "children"));
                }
            }
        }
        Some("layout") => {
            for column in array_field(object, "columns") {
                if let Some(column) = column.as_object() {
                    nested.extend(array_field(column, "content"));
                }
            }
        }
        _ => {}
    }
    nested
}

fn array_field<'a>(object: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Checks the tree-wide invariants: unique ids and non-empty lists.
pub fn audit(blocks: &[Block]) -> Result<(), FormatError> {
    let mut seen = HashSet::new();
    for block in walk_blocks(blocks) {
        if let Some(id) = block.id()
            && !seen.insert(id)
        {
            return Err(FormatError::DuplicateBlockId(id.to_string()));
        }
        if let Block::List(list) = block
            && list.items.is_empty()
        {
            return Err(FormatError::EmptyList {
                id: list.id.clone(),
            });
        }
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
