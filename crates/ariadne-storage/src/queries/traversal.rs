//! Recursive CTE traversals over the `calls` edges.
//!
//! Cycles are tolerated: `SELECT DISTINCT` plus the depth cap bound the
//! recursion, and the Rust side deduplicates over
//! `(from_fqn, to_fqn, relation)` — not the full row — keeping the
//! shallowest depth for each tuple.

use std::collections::HashSet;

use rusqlite::{params, Connection};

use ariadne_core::models::TraversalRow;
use ariadne_core::StorageError;

use crate::sqe;

use super::collect_rows;

/// Forward call chain from `start_fqn`. Rows at depth 0 are direct
/// outgoing calls; each recursion level adds one hop while
/// `depth < max_depth`. `max_depth = 0` yields an empty chain.
pub fn get_call_chain(
    conn: &Connection,
    start_fqn: &str,
    max_depth: i64,
) -> Result<Vec<TraversalRow>, StorageError> {
    if max_depth <= 0 {
        return Ok(Vec::new());
    }

    let mut stmt = conn
        .prepare_cached(
            "
            WITH RECURSIVE call_chain(depth, from_fqn, to_fqn, relation) AS (
                SELECT 0, from_fqn, to_fqn, relation
                FROM edges
                WHERE from_fqn = ?1 AND relation = 'calls'

                UNION

                SELECT cc.depth + 1, e.from_fqn, e.to_fqn, e.relation
                FROM edges e
                JOIN call_chain cc ON e.from_fqn = cc.to_fqn
                WHERE cc.depth < ?2 AND e.relation = 'calls'
            )
            SELECT DISTINCT depth, from_fqn, to_fqn, relation
            FROM call_chain ORDER BY depth
            ",
        )
        .map_err(sqe)?;

    let rows = stmt
        .query_map(params![start_fqn, max_depth], map_traversal_row)
        .map_err(sqe)?;
    Ok(dedup_by_edge(collect_rows(rows)?))
}

/// Reverse caller set of `target_fqn`: mirror of `get_call_chain`,
/// following edges backward.
pub fn get_reverse_callers(
    conn: &Connection,
    target_fqn: &str,
    max_depth: i64,
) -> Result<Vec<TraversalRow>, StorageError> {
    if max_depth <= 0 {
        return Ok(Vec::new());
    }

    let mut stmt = conn
        .prepare_cached(
            "
            WITH RECURSIVE callers(depth, from_fqn, to_fqn, relation) AS (
                SELECT 0, from_fqn, to_fqn, relation
                FROM edges
                WHERE to_fqn = ?1 AND relation = 'calls'

                UNION

                SELECT c.depth + 1, e.from_fqn, e.to_fqn, e.relation
                FROM edges e
                JOIN callers c ON e.to_fqn = c.from_fqn
                WHERE c.depth < ?2 AND e.relation = 'calls'
            )
            SELECT DISTINCT depth, from_fqn, to_fqn, relation
            FROM callers ORDER BY depth
            ",
        )
        .map_err(sqe)?;

    let rows = stmt
        .query_map(params![target_fqn, max_depth], map_traversal_row)
        .map_err(sqe)?;
    Ok(dedup_by_edge(collect_rows(rows)?))
}

fn map_traversal_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TraversalRow> {
    Ok(TraversalRow {
        depth: row.get(0)?,
        from_fqn: row.get(1)?,
        to_fqn: row.get(2)?,
        relation: row.get(3)?,
    })
}

/// A cycle revisits the same edge at a deeper depth; rows arrive
/// depth-ordered, so keeping first occurrences keeps the shallowest.
fn dedup_by_edge(rows: Vec<TraversalRow>) -> Vec<TraversalRow> {
    let mut seen: HashSet<(String, String, String)> = HashSet::new();
    rows.into_iter()
        .filter(|r| {
            seen.insert((r.from_fqn.clone(), r.to_fqn.clone(), r.relation.clone()))
        })
        .collect()
}
