//! edges table queries. Edges are non-unique plain inserts; referential
//! cleanup is the job of the cascade triggers on symbols.

use rusqlite::{params, Connection};

use ariadne_core::models::{Edge, Relation};
use ariadne_core::StorageError;

use crate::sqe;

use super::collect_rows;

/// An edge row as stored.
#[derive(Debug, Clone)]
pub struct EdgeRecord {
    pub id: i64,
    pub from_fqn: String,
    pub to_fqn: String,
    pub relation: String,
    pub metadata: Option<String>,
}

/// Batched insert. Single transaction; returns the number inserted.
pub fn insert_edges(conn: &Connection, edges: &[Edge]) -> Result<usize, StorageError> {
    if edges.is_empty() {
        return Ok(0);
    }

    let tx = conn.unchecked_transaction().map_err(sqe)?;
    {
        let mut stmt = tx
            .prepare_cached(
                "INSERT INTO edges (from_fqn, to_fqn, relation, metadata) VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(sqe)?;
        for e in edges {
            let metadata = e
                .metadata
                .as_ref()
                .and_then(|m| serde_json::to_string(m).ok());
            stmt.execute(params![e.from_fqn, e.to_fqn, e.relation.as_str(), metadata])
                .map_err(sqe)?;
        }
    }
    tx.commit().map_err(sqe)?;
    Ok(edges.len())
}

fn map_edge_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EdgeRecord> {
    Ok(EdgeRecord {
        id: row.get(0)?,
        from_fqn: row.get(1)?,
        to_fqn: row.get(2)?,
        relation: row.get(3)?,
        metadata: row.get(4)?,
    })
}

/// Outgoing edges from a symbol, optional relation filter.
pub fn get_edges_from(
    conn: &Connection,
    fqn: &str,
    relation: Option<Relation>,
) -> Result<Vec<EdgeRecord>, StorageError> {
    match relation {
        Some(rel) => {
            let mut stmt = conn
                .prepare_cached(
                    "SELECT id, from_fqn, to_fqn, relation, metadata
                     FROM edges WHERE from_fqn = ?1 AND relation = ?2",
                )
                .map_err(sqe)?;
            let rows = stmt
                .query_map(params![fqn, rel.as_str()], map_edge_row)
                .map_err(sqe)?;
            collect_rows(rows)
        }
        None => {
            let mut stmt = conn
                .prepare_cached(
                    "SELECT id, from_fqn, to_fqn, relation, metadata
                     FROM edges WHERE from_fqn = ?1",
                )
                .map_err(sqe)?;
            let rows = stmt.query_map(params![fqn], map_edge_row).map_err(sqe)?;
            collect_rows(rows)
        }
    }
}

/// Incoming edges to a symbol, optional relation filter.
pub fn get_edges_to(
    conn: &Connection,
    fqn: &str,
    relation: Option<Relation>,
) -> Result<Vec<EdgeRecord>, StorageError> {
    match relation {
        Some(rel) => {
            let mut stmt = conn
                .prepare_cached(
                    "SELECT id, from_fqn, to_fqn, relation, metadata
                     FROM edges WHERE to_fqn = ?1 AND relation = ?2",
                )
                .map_err(sqe)?;
            let rows = stmt
                .query_map(params![fqn, rel.as_str()], map_edge_row)
                .map_err(sqe)?;
            collect_rows(rows)
        }
        None => {
            let mut stmt = conn
                .prepare_cached(
                    "SELECT id, from_fqn, to_fqn, relation, metadata
                     FROM edges WHERE to_fqn = ?1",
                )
                .map_err(sqe)?;
            let rows = stmt.query_map(params![fqn], map_edge_row).map_err(sqe)?;
            collect_rows(rows)
        }
    }
}

/// Total edge count.
pub fn count_edges(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))
        .map_err(sqe)
}

/// Edge count touching a given FQN on either side.
pub fn count_edges_touching(conn: &Connection, fqn: &str) -> Result<i64, StorageError> {
    conn.query_row(
        "SELECT COUNT(*) FROM edges WHERE from_fqn = ?1 OR to_fqn = ?1",
        params![fqn],
        |row| row.get(0),
    )
    .map_err(sqe)
}
