//! Dual-write coordinator for the relational and vector planes.
//!
//! A summary's text lives in SQLite; its embedding lives in the vector
//! store. Writing them naively in sequence diverges on crash or partial
//! failure, so creation is a local two-phase commit: the SQLite transaction
//! commits only after the vector plane has durably accepted the embedding,
//! and a vector-plane failure rolls the whole transaction back while an
//! orphan-tracking row is written on a separate connection. Deletion is the
//! mirror image with the vector plane best-effort — a leaked vector is
//! recoverable, a missing user-visible row is not.

use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use ariadne_core::models::{Summary, VectorOp};
use ariadne_core::{AriadneError, AriadneResult, StorageError};

use crate::sqe;
use crate::store::GraphStore;
use crate::vector::{Collection, VectorStore};

/// Pending ops give up after this many attempts.
const MAX_OP_RETRIES: i64 = 5;

/// Pending ops and sync rows older than this many seconds count as stale
/// in orphan detection.
const STALE_THRESHOLD_SECS: i64 = 300;

/// Counts from one `detect_orphans` pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrphanReport {
    /// SQLite rows whose `vector_id` points at a missing vector entry.
    pub rows_missing_vector: usize,
    /// Vector entries with no owning SQLite row.
    pub vectors_missing_row: usize,
    /// Pending vector ops older than the staleness threshold.
    pub stale_pending_ops: usize,
    /// Sync-state rows stuck in `pending`.
    pub stalled_sync_rows: usize,
}

impl OrphanReport {
    pub fn is_clean(&self) -> bool {
        self.rows_missing_vector == 0
            && self.vectors_missing_row == 0
            && self.stale_pending_ops == 0
            && self.stalled_sync_rows == 0
    }
}

/// Counts from one `recover_orphans` pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecoveryReport {
    pub orphan_vectors_deleted: usize,
    pub sync_rows_cleared: usize,
    pub ops_retried: usize,
    pub ops_succeeded: usize,
    pub ops_abandoned: usize,
}

/// Serialized payload of a pending `create` op, enough to replay it.
#[derive(Debug, Serialize, serde::Deserialize)]
struct CreateOpPayload {
    target_fqn: String,
    document: String,
    embedding: Option<Vec<f32>>,
    metadata: Option<serde_json::Value>,
}

pub struct DualWriteCoordinator {
    store: Arc<GraphStore>,
}

impl DualWriteCoordinator {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    /// Create (or refresh) a summary together with its vector.
    ///
    /// The SQLite transaction inserts the row without `vector_id`, pushes
    /// the embedding to the vector plane, then sets `vector_id` and the
    /// sync-state row — all before commit. If the vector plane rejects the
    /// write, the transaction rolls back and a `PendingVectorOp` is recorded
    /// through a separate connection so the rollback cannot erase it.
    ///
    /// Returns the vector id when an embedding was stored.
    pub fn create_summary_with_vector(
        &self,
        summary: &Summary,
        embedding: Option<&[f32]>,
        vector_store: &VectorStore,
    ) -> AriadneResult<Option<String>> {
        match self.create_inner(summary, embedding, vector_store)? {
            Ok(vector_id) => Ok(vector_id),
            Err(vector_err) => {
                warn!(
                    target_fqn = %summary.target_fqn,
                    error = %vector_err,
                    "Vector write failed; summary transaction rolled back"
                );
                self.record_pending_create(summary, embedding)?;
                Err(AriadneError::Storage(vector_err))
            }
        }
    }

    /// The two-phase body shared by the public create path and pending-op
    /// replay. The inner `Err` carries a vector-plane failure after the
    /// SQLite transaction has rolled back.
    fn create_inner(
        &self,
        summary: &Summary,
        embedding: Option<&[f32]>,
        vector_store: &VectorStore,
    ) -> AriadneResult<Result<Option<String>, StorageError>> {
        let metadata = serde_json::json!({
            "fqn": summary.target_fqn,
            "level": summary.level.as_str(),
        });

        let outcome = self.store.with_writer(|conn| {
            let tx = conn.unchecked_transaction().map_err(sqe)?;

            let row_id: i64 = tx
                .query_row(
                    "INSERT INTO summaries (target_fqn, level, summary, is_stale)
                     VALUES (?1, ?2, ?3, 0)
                     ON CONFLICT(target_fqn) DO UPDATE SET
                     level = excluded.level,
                     summary = excluded.summary,
                     is_stale = 0,
                     updated_at = CURRENT_TIMESTAMP
                     RETURNING id",
                    params![summary.target_fqn, summary.level.as_str(), summary.summary],
                    |row| row.get(0),
                )
                .map_err(sqe)?;

            let Some(embedding) = embedding else {
                tx.commit().map_err(sqe)?;
                return Ok(Ok(None));
            };

            let vector_id = row_id.to_string();
            // Regeneration and crash replay may find the id already present
            // in the vector plane; route those through update.
            let vector_result = (|| -> Result<(), StorageError> {
                let exists = vector_store.get(Collection::Summaries, &vector_id)?.is_some();
                if exists {
                    vector_store.update(
                        Collection::Summaries,
                        &vector_id,
                        Some(&summary.summary),
                        Some(embedding),
                        Some(&metadata),
                    )
                } else {
                    vector_store.add(
                        Collection::Summaries,
                        &vector_id,
                        &summary.summary,
                        Some(embedding),
                        Some(&metadata),
                    )
                }
            })();

            match vector_result {
                Ok(()) => {
                    tx.execute(
                        "UPDATE summaries SET vector_id = ?1 WHERE id = ?2",
                        params![vector_id, row_id],
                    )
                    .map_err(sqe)?;
                    tx.execute(
                        "INSERT INTO vector_sync_state
                         (vector_id, table_name, record_fqn, sync_status, attempt_count)
                         VALUES (?1, 'summaries', ?2, 'synced', 1)
                         ON CONFLICT(table_name, vector_id) DO UPDATE SET
                         sync_status = 'synced',
                         attempt_count = attempt_count + 1,
                         last_attempt_at = CURRENT_TIMESTAMP",
                        params![vector_id, summary.target_fqn],
                    )
                    .map_err(sqe)?;
                    tx.commit().map_err(sqe)?;
                    Ok(Ok(Some(vector_id)))
                }
                Err(vector_err) => {
                    // Dropping the transaction rolls back the SQLite insert.
                    drop(tx);
                    Ok(Err(vector_err))
                }
            }
        })?;

        Ok(outcome)
    }

    /// Record the failed create on a connection-scoped transaction separate
    /// from the main writer, so the earlier rollback cannot erase it.
    fn record_pending_create(
        &self,
        summary: &Summary,
        embedding: Option<&[f32]>,
    ) -> AriadneResult<()> {
        let payload = serde_json::to_string(&CreateOpPayload {
            target_fqn: summary.target_fqn.clone(),
            document: summary.summary.clone(),
            embedding: embedding.map(|e| e.to_vec()),
            metadata: Some(serde_json::json!({
                "fqn": summary.target_fqn,
                "level": summary.level.as_str(),
            })),
        })?;
        let temp_id = Uuid::new_v4().to_string();

        let insert = |conn: &Connection| -> Result<(), StorageError> {
            conn.execute(
                "INSERT INTO pending_vector_ops (temp_id, op, table_name, payload)
                 VALUES (?1, 'create', 'summaries', ?2)",
                params![temp_id, payload],
            )
            .map_err(sqe)?;
            Ok(())
        };

        match self.store.open_aux_connection()? {
            Some(conn) => insert(&conn)?,
            // In-memory store: no second connection exists; the main
            // transaction has already rolled back, so this is safe.
            None => self.store.with_writer(|conn| insert(conn))?,
        }
        Ok(())
    }

    /// Delete a summary from both planes.
    ///
    /// The vector delete is best-effort: a failure leaves an orphan vector
    /// for reconciliation, never a broken user-visible state, so the delete
    /// path does not abort. Returns false if the summary did not exist.
    pub fn delete_summary_cascade(
        &self,
        target_fqn: &str,
        vector_store: &VectorStore,
    ) -> AriadneResult<bool> {
        let vector_id: Option<Option<String>> = self.store.with_reader(|conn| {
            conn.query_row(
                "SELECT vector_id FROM summaries WHERE target_fqn = ?1",
                params![target_fqn],
                |row| row.get(0),
            )
            .optional()
            .map_err(sqe)
        })?;

        let Some(vector_id) = vector_id else {
            return Ok(false);
        };

        if let Some(vector_id) = &vector_id {
            if let Err(e) = vector_store.delete(Collection::Summaries, &[vector_id.clone()]) {
                warn!(
                    vector_id = %vector_id,
                    error = %e,
                    "Vector delete failed (continuing; reconciliation will clean up)"
                );
            }
        }

        self.store.with_writer(|conn| {
            let tx = conn.unchecked_transaction().map_err(sqe)?;
            tx.execute(
                "DELETE FROM summaries WHERE target_fqn = ?1",
                params![target_fqn],
            )
            .map_err(sqe)?;
            tx.execute(
                "DELETE FROM vector_sync_state
                 WHERE table_name = 'summaries' AND record_fqn = ?1",
                params![target_fqn],
            )
            .map_err(sqe)?;
            tx.commit().map_err(sqe)
        })?;

        Ok(true)
    }

    /// Mark stale, in one transaction: every summary whose target is a
    /// symbol in `file_path`, and every summary whose target is the parent
    /// of such a symbol (class summaries invalidate when a method changes).
    pub fn mark_summaries_stale_by_file(&self, file_path: &str) -> AriadneResult<usize> {
        let count = self.store.with_writer(|conn| {
            let tx = conn.unchecked_transaction().map_err(sqe)?;

            let direct = tx
                .execute(
                    "UPDATE summaries SET is_stale = 1, updated_at = CURRENT_TIMESTAMP
                     WHERE target_fqn IN (SELECT fqn FROM symbols WHERE file_path = ?1)",
                    params![file_path],
                )
                .map_err(sqe)?;

            let parents = tx
                .execute(
                    "UPDATE summaries SET is_stale = 1, updated_at = CURRENT_TIMESTAMP
                     WHERE target_fqn IN (
                         SELECT DISTINCT s.parent_fqn FROM symbols s
                         WHERE s.file_path = ?1 AND s.parent_fqn IS NOT NULL
                     )",
                    params![file_path],
                )
                .map_err(sqe)?;

            tx.commit().map_err(sqe)?;
            Ok(direct + parents)
        })?;
        Ok(count)
    }

    /// Count the four divergence classes between the planes.
    pub fn detect_orphans(&self, vector_store: &VectorStore) -> AriadneResult<OrphanReport> {
        let sql_vectors: Vec<(String, String)> = self
            .store
            .with_reader(crate::queries::summaries::summaries_with_vectors)?;
        let vector_ids = vector_store.list_ids(Collection::Summaries)?;
        let vector_id_set: std::collections::HashSet<&str> =
            vector_ids.iter().map(String::as_str).collect();
        let sql_id_set: std::collections::HashSet<&str> =
            sql_vectors.iter().map(|(_, id)| id.as_str()).collect();

        let rows_missing_vector = sql_vectors
            .iter()
            .filter(|(_, id)| !vector_id_set.contains(id.as_str()))
            .count();
        let vectors_missing_row = vector_ids
            .iter()
            .filter(|id| !sql_id_set.contains(id.as_str()))
            .count();

        let (stale_pending_ops, stalled_sync_rows) = self.store.with_reader(|conn| {
            let ops: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM pending_vector_ops
                     WHERE created_at < datetime('now', ?1)",
                    params![format!("-{STALE_THRESHOLD_SECS} seconds")],
                    |row| row.get(0),
                )
                .map_err(sqe)?;
            let stalled: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM vector_sync_state WHERE sync_status = 'pending'",
                    [],
                    |row| row.get(0),
                )
                .map_err(sqe)?;
            Ok((ops as usize, stalled as usize))
        })?;

        Ok(OrphanReport {
            rows_missing_vector,
            vectors_missing_row,
            stale_pending_ops,
            stalled_sync_rows,
        })
    }

    /// Repair divergence: delete vector entries with no owning row, clear
    /// sync rows that point at nothing, and replay pending ops with a
    /// retry-count cap. A no-op when there are no orphans.
    pub fn recover_orphans(&self, vector_store: &VectorStore) -> AriadneResult<RecoveryReport> {
        let mut report = RecoveryReport::default();

        // 1. Vector entries without an owning SQLite row.
        let sql_vectors: Vec<(String, String)> = self
            .store
            .with_reader(crate::queries::summaries::summaries_with_vectors)?;
        let sql_id_set: std::collections::HashSet<&str> =
            sql_vectors.iter().map(|(_, id)| id.as_str()).collect();
        let orphan_vector_ids: Vec<String> = vector_store
            .list_ids(Collection::Summaries)?
            .into_iter()
            .filter(|id| !sql_id_set.contains(id.as_str()))
            .collect();
        if !orphan_vector_ids.is_empty() {
            report.orphan_vectors_deleted =
                vector_store.delete(Collection::Summaries, &orphan_vector_ids)?;
        }

        // 2. Sync rows whose summary no longer exists, plus pending rows
        //    that exhausted their attempts.
        report.sync_rows_cleared = self.store.with_writer(|conn| {
            let dangling = conn
                .execute(
                    "DELETE FROM vector_sync_state
                     WHERE table_name = 'summaries'
                     AND record_fqn NOT IN (SELECT target_fqn FROM summaries)",
                    [],
                )
                .map_err(sqe)?;
            let exhausted = conn
                .execute(
                    "UPDATE vector_sync_state SET sync_status = 'stalled'
                     WHERE sync_status = 'pending' AND attempt_count >= ?1",
                    params![MAX_OP_RETRIES],
                )
                .map_err(sqe)?;
            Ok(dangling + exhausted)
        })?;

        // 3. Replay pending ops.
        let ops: Vec<(String, String, String)> = self.store.with_reader(|conn| {
            let mut stmt = conn
                .prepare_cached(
                    "SELECT temp_id, op, payload FROM pending_vector_ops
                     WHERE retry_count < ?1 ORDER BY created_at ASC",
                )
                .map_err(sqe)?;
            let rows = stmt
                .query_map(params![MAX_OP_RETRIES], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })
                .map_err(sqe)?;
            crate::queries::collect_rows(rows)
        })?;

        for (temp_id, op_str, payload) in ops {
            let op = VectorOp::parse(&op_str);
            report.ops_retried += 1;
            let applied = match op {
                Some(VectorOp::Create) | Some(VectorOp::Update) => {
                    self.replay_create(&payload, vector_store)
                }
                Some(VectorOp::Delete) => self.replay_delete(&payload, vector_store),
                None => Err(AriadneError::InvalidArgument(format!(
                    "unknown pending op kind: {op_str}"
                ))),
            };

            match applied {
                Ok(()) => {
                    report.ops_succeeded += 1;
                    self.store.with_writer(|conn| {
                        conn.execute(
                            "DELETE FROM pending_vector_ops WHERE temp_id = ?1",
                            params![temp_id],
                        )
                        .map_err(sqe)?;
                        Ok(())
                    })?;
                }
                Err(e) => {
                    warn!(temp_id = %temp_id, error = %e, "Pending vector op retry failed");
                    let abandoned = self.store.with_writer(|conn| {
                        conn.execute(
                            "UPDATE pending_vector_ops SET retry_count = retry_count + 1
                             WHERE temp_id = ?1",
                            params![temp_id],
                        )
                        .map_err(sqe)?;
                        let retries: i64 = conn
                            .query_row(
                                "SELECT retry_count FROM pending_vector_ops WHERE temp_id = ?1",
                                params![temp_id],
                                |row| row.get(0),
                            )
                            .map_err(sqe)?;
                        Ok(retries >= MAX_OP_RETRIES)
                    })?;
                    if abandoned {
                        report.ops_abandoned += 1;
                    }
                }
            }
        }

        if report.ops_retried > 0 || report.orphan_vectors_deleted > 0 {
            info!(
                vectors_deleted = report.orphan_vectors_deleted,
                sync_cleared = report.sync_rows_cleared,
                retried = report.ops_retried,
                succeeded = report.ops_succeeded,
                "Orphan recovery pass complete"
            );
        }
        Ok(report)
    }

    /// Replay a `create`: the summary row may have been rolled back with
    /// the original transaction, so re-create the whole pair.
    fn replay_create(&self, payload: &str, vector_store: &VectorStore) -> AriadneResult<()> {
        let parsed: CreateOpPayload = serde_json::from_str(payload)?;
        let level = parsed
            .metadata
            .as_ref()
            .and_then(|m| m.get("level"))
            .and_then(|l| l.as_str())
            .and_then(ariadne_core::models::SummaryLevel::parse)
            .unwrap_or(ariadne_core::models::SummaryLevel::Method);

        let summary = Summary {
            target_fqn: parsed.target_fqn,
            level,
            summary: parsed.document,
            vector_id: None,
            is_stale: false,
        };
        // Replay does not re-record a pending op on failure: the existing
        // op's retry counter is the backoff mechanism.
        self.create_inner(&summary, parsed.embedding.as_deref(), vector_store)?
            .map(|_| ())
            .map_err(AriadneError::Storage)
    }

    fn replay_delete(&self, payload: &str, vector_store: &VectorStore) -> AriadneResult<()> {
        let parsed: serde_json::Value = serde_json::from_str(payload)?;
        let ids: Vec<String> = parsed
            .get("vector_ids")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        vector_store.delete(Collection::Summaries, &ids)?;
        Ok(())
    }
}
