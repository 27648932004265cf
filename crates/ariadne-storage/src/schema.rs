//! Schema SQL constants. Used by migrations and by the shadow rebuilder
//! when materializing a fresh database file.

/// Core graph tables: symbols and edges.
///
/// Edges carry NO foreign-key constraint: a `to_fqn` (or, transiently,
/// `from_fqn`) may reference a symbol outside the indexed codebase.
/// Cascade triggers below keep internal references clean instead.
pub const SCHEMA_GRAPH: &str = "
    CREATE TABLE IF NOT EXISTS symbols (
        id INTEGER PRIMARY KEY,
        fqn TEXT NOT NULL UNIQUE,
        kind TEXT NOT NULL,
        name TEXT NOT NULL,
        file_path TEXT,
        line_number INTEGER,
        modifiers TEXT,
        signature TEXT,
        parent_fqn TEXT,
        annotations TEXT,
        file_hash TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_symbols_fqn ON symbols(fqn);
    CREATE INDEX IF NOT EXISTS idx_symbols_kind ON symbols(kind);
    CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_path);
    CREATE INDEX IF NOT EXISTS idx_symbols_parent ON symbols(parent_fqn);

    CREATE TABLE IF NOT EXISTS edges (
        id INTEGER PRIMARY KEY,
        from_fqn TEXT NOT NULL,
        to_fqn TEXT NOT NULL,
        relation TEXT NOT NULL,
        metadata TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_fqn);
    CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_fqn);
    CREATE INDEX IF NOT EXISTS idx_edges_from_relation ON edges(from_fqn, relation);
    CREATE INDEX IF NOT EXISTS idx_edges_to_relation ON edges(to_fqn, relation);

    CREATE TABLE IF NOT EXISTS index_metadata (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

/// Cascade triggers for the edge table (no declared FK, see above).
/// Idempotent; recreated by every startup migration pass.
pub const SCHEMA_EDGE_TRIGGERS: &str = "
    CREATE TRIGGER IF NOT EXISTS edges_delete_outgoing_on_symbol_delete
        AFTER DELETE ON symbols
        FOR EACH ROW
        WHEN EXISTS (SELECT 1 FROM edges WHERE from_fqn = OLD.fqn)
    BEGIN
        DELETE FROM edges WHERE from_fqn = OLD.fqn;
    END;

    CREATE TRIGGER IF NOT EXISTS edges_delete_incoming_on_symbol_delete
        AFTER DELETE ON symbols
        FOR EACH ROW
        WHEN EXISTS (SELECT 1 FROM edges WHERE to_fqn = OLD.fqn)
    BEGIN
        DELETE FROM edges WHERE to_fqn = OLD.fqn;
    END;
";

/// Architecture-layer tables: entry points, external dependencies,
/// anti-pattern detections. Declared cascading foreign keys onto symbols.
pub const SCHEMA_ARCHITECTURE: &str = "
    CREATE TABLE IF NOT EXISTS entry_points (
        id INTEGER PRIMARY KEY,
        symbol_fqn TEXT NOT NULL UNIQUE,
        entry_type TEXT NOT NULL,
        http_method TEXT,
        http_path TEXT,
        cron_expression TEXT,
        mq_queue TEXT,
        FOREIGN KEY (symbol_fqn) REFERENCES symbols(fqn) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS external_dependencies (
        id INTEGER PRIMARY KEY,
        caller_fqn TEXT NOT NULL,
        dependency_type TEXT NOT NULL,
        target TEXT,
        strength TEXT DEFAULT 'strong',
        FOREIGN KEY (caller_fqn) REFERENCES symbols(fqn) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS anti_patterns (
        id INTEGER PRIMARY KEY,
        rule_id TEXT NOT NULL,
        from_fqn TEXT NOT NULL,
        to_fqn TEXT,
        severity TEXT NOT NULL CHECK(severity IN ('error', 'warning', 'info')),
        message TEXT NOT NULL,
        detected_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (from_fqn) REFERENCES symbols(fqn) ON DELETE CASCADE
    );
";

/// Business-layer tables: summaries, glossary, constraints.
/// Summary text lives here; the embedding lives in the companion vector
/// store, joined by `vector_id`.
pub const SCHEMA_BUSINESS: &str = "
    CREATE TABLE IF NOT EXISTS summaries (
        id INTEGER PRIMARY KEY,
        target_fqn TEXT NOT NULL UNIQUE,
        level TEXT NOT NULL CHECK(level IN ('method', 'class', 'package', 'module')),
        summary TEXT NOT NULL,
        vector_id TEXT,
        is_stale BOOLEAN DEFAULT FALSE,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (target_fqn) REFERENCES symbols(fqn) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_summaries_target_fqn ON summaries(target_fqn);
    CREATE INDEX IF NOT EXISTS idx_summaries_stale ON summaries(is_stale);
    CREATE INDEX IF NOT EXISTS idx_summaries_target_stale ON summaries(target_fqn, is_stale);
    CREATE INDEX IF NOT EXISTS idx_summaries_vector_id ON summaries(vector_id);

    CREATE TABLE IF NOT EXISTS glossary (
        id INTEGER PRIMARY KEY,
        code_term TEXT NOT NULL UNIQUE,
        business_meaning TEXT NOT NULL,
        synonyms TEXT,
        source_fqn TEXT,
        vector_id TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (source_fqn) REFERENCES symbols(fqn) ON DELETE SET NULL
    );

    CREATE INDEX IF NOT EXISTS idx_glossary_code_term ON glossary(code_term);
    CREATE INDEX IF NOT EXISTS idx_glossary_source_fqn ON glossary(source_fqn);

    CREATE TABLE IF NOT EXISTS constraints (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL,
        source_fqn TEXT,
        source_line INTEGER,
        constraint_type TEXT,
        vector_id TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (source_fqn) REFERENCES symbols(fqn) ON DELETE SET NULL
    );

    CREATE INDEX IF NOT EXISTS idx_constraints_name ON constraints(name);
    CREATE INDEX IF NOT EXISTS idx_constraints_type ON constraints(constraint_type);
";

/// Job queue table. The database, not any in-memory lock, is the arbiter
/// of the single-running-job invariant.
pub const SCHEMA_JOBS: &str = "
    CREATE TABLE IF NOT EXISTS impact_jobs (
        id INTEGER PRIMARY KEY,
        job_id TEXT NOT NULL UNIQUE,
        mode TEXT NOT NULL CHECK(mode IN ('full', 'incremental')),
        status TEXT NOT NULL CHECK(status IN ('pending', 'running', 'complete', 'failed')),
        progress INTEGER DEFAULT 0,
        total_files INTEGER DEFAULT 0,
        processed_files INTEGER DEFAULT 0,
        target_paths TEXT,
        started_at TIMESTAMP,
        completed_at TIMESTAMP,
        error_message TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_impact_jobs_job_id ON impact_jobs(job_id);
    CREATE INDEX IF NOT EXISTS idx_impact_jobs_status ON impact_jobs(status);
    CREATE INDEX IF NOT EXISTS idx_impact_jobs_created ON impact_jobs(created_at);

    CREATE TABLE IF NOT EXISTS job_metadata (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

/// Dual-write coordinator bookkeeping: vector sync states and the reliable
/// queue of vector-plane operations still to apply.
pub const SCHEMA_VECTOR_SYNC: &str = "
    CREATE TABLE IF NOT EXISTS vector_sync_state (
        id INTEGER PRIMARY KEY,
        vector_id TEXT NOT NULL,
        table_name TEXT NOT NULL,
        record_fqn TEXT NOT NULL,
        sync_status TEXT NOT NULL CHECK(sync_status IN ('synced', 'pending', 'stalled')),
        attempt_count INTEGER DEFAULT 0,
        last_attempt_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(table_name, vector_id)
    );

    CREATE INDEX IF NOT EXISTS idx_vector_sync_status ON vector_sync_state(sync_status);

    CREATE TABLE IF NOT EXISTS pending_vector_ops (
        id INTEGER PRIMARY KEY,
        temp_id TEXT NOT NULL UNIQUE,
        op TEXT NOT NULL CHECK(op IN ('create', 'delete', 'update')),
        table_name TEXT NOT NULL,
        payload TEXT NOT NULL,
        retry_count INTEGER DEFAULT 0,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );
";

/// All schema blocks in application order.
pub const ALL_SCHEMAS: [&str; 6] = [
    SCHEMA_GRAPH,
    SCHEMA_EDGE_TRIGGERS,
    SCHEMA_ARCHITECTURE,
    SCHEMA_BUSINESS,
    SCHEMA_JOBS,
    SCHEMA_VECTOR_SYNC,
];

/// Tables dropped (reverse dependency order) by a full schema rebuild.
pub const ALL_TABLE_NAMES: [&str; 13] = [
    "pending_vector_ops",
    "vector_sync_state",
    "job_metadata",
    "impact_jobs",
    "constraints",
    "glossary",
    "summaries",
    "anti_patterns",
    "external_dependencies",
    "entry_points",
    "edges",
    "symbols",
    "index_metadata",
];
