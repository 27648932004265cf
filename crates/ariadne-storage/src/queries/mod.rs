//! Table-level query modules. Free functions over `&Connection`; the
//! `GraphStore` facade routes them through the pool.

pub mod anti_patterns;
pub mod constraints;
pub mod dependencies;
pub mod edges;
pub mod entry_points;
pub mod glossary;
pub mod metadata;
pub mod summaries;
pub mod symbols;
pub mod traversal;

use ariadne_core::StorageError;

use crate::sqe;

/// Encode a string list as a JSON text column (NULL when empty).
pub(crate) fn encode_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        serde_json::to_string(items).ok()
    }
}

/// Decode a JSON text column into a string list (empty on NULL/garbage).
pub(crate) fn decode_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok()).unwrap_or_default()
}

/// Collect mapped rows into a Vec, translating row errors.
pub(crate) fn collect_rows<T>(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>>,
) -> Result<Vec<T>, StorageError> {
    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(sqe)?);
    }
    Ok(result)
}

/// Build an `?,?,?` placeholder list for an IN clause.
pub(crate) fn placeholders(count: usize) -> String {
    let mut s = String::with_capacity(count * 2);
    for i in 0..count {
        if i > 0 {
            s.push(',');
        }
        s.push('?');
    }
    s
}
