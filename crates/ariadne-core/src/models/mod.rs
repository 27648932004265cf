//! Entity model for the knowledge graph.
//!
//! FQNs are the universal join key: textual, stable across rebuilds.
//! Enum string forms match the values persisted in SQLite columns.

pub mod ingest;

use serde::{Deserialize, Serialize};

// ─── Symbols ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Class,
    Interface,
    Method,
    Field,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Method => "method",
            Self::Field => "field",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "class" => Some(Self::Class),
            "interface" => Some(Self::Interface),
            "method" => Some(Self::Method),
            "field" => Some(Self::Field),
            _ => None,
        }
    }
}

/// A symbol (class, interface, method, field) in the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub fqn: String,
    pub kind: SymbolKind,
    pub name: String,
    pub file_path: Option<String>,
    pub line_number: Option<i64>,
    pub modifiers: Vec<String>,
    pub signature: Option<String>,
    pub parent_fqn: Option<String>,
    pub annotations: Vec<String>,
}

impl Symbol {
    pub fn new(fqn: impl Into<String>, kind: SymbolKind, name: impl Into<String>) -> Self {
        Self {
            fqn: fqn.into(),
            kind,
            name: name.into(),
            file_path: None,
            line_number: None,
            modifiers: Vec::new(),
            signature: None,
            parent_fqn: None,
            annotations: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent_fqn: impl Into<String>) -> Self {
        self.parent_fqn = Some(parent_fqn.into());
        self
    }

    pub fn with_file(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    pub fn with_annotations(mut self, annotations: Vec<String>) -> Self {
        self.annotations = annotations;
        self
    }
}

/// A symbol row as read back from the store, with timestamps
/// (SQLite `CURRENT_TIMESTAMP` strings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolRecord {
    #[serde(flatten)]
    pub symbol: Symbol,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

// ─── Edges ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Calls,
    Inherits,
    Implements,
    Instantiates,
    Injects,
    MemberOf,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calls => "calls",
            Self::Inherits => "inherits",
            Self::Implements => "implements",
            Self::Instantiates => "instantiates",
            Self::Injects => "injects",
            Self::MemberOf => "member_of",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "calls" => Some(Self::Calls),
            "inherits" => Some(Self::Inherits),
            "implements" => Some(Self::Implements),
            "instantiates" => Some(Self::Instantiates),
            "injects" => Some(Self::Injects),
            "member_of" => Some(Self::MemberOf),
            _ => None,
        }
    }
}

/// A directed labeled relation between two FQNs. The `to_fqn` side may
/// reference a symbol outside the indexed codebase (third-party calls).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from_fqn: String,
    pub to_fqn: String,
    pub relation: Relation,
    pub metadata: Option<serde_json::Value>,
}

impl Edge {
    pub fn new(
        from_fqn: impl Into<String>,
        to_fqn: impl Into<String>,
        relation: Relation,
    ) -> Self {
        Self {
            from_fqn: from_fqn.into(),
            to_fqn: to_fqn.into(),
            relation,
            metadata: None,
        }
    }
}

/// One hop of a recursive traversal: `(depth, from, to, relation)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalRow {
    pub depth: i64,
    pub from_fqn: String,
    pub to_fqn: String,
    pub relation: String,
}

// ─── Entry points ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    HttpApi,
    Scheduled,
    MqConsumer,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HttpApi => "http_api",
            Self::Scheduled => "scheduled",
            Self::MqConsumer => "mq_consumer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "http_api" => Some(Self::HttpApi),
            "scheduled" => Some(Self::Scheduled),
            "mq_consumer" => Some(Self::MqConsumer),
            _ => None,
        }
    }
}

/// A symbol reachable from outside the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPoint {
    pub symbol_fqn: String,
    pub entry_type: EntryType,
    pub http_method: Option<String>,
    pub http_path: Option<String>,
    pub cron_expression: Option<String>,
    pub mq_queue: Option<String>,
}

// ─── External dependencies ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    Mysql,
    Redis,
    Mq,
    Http,
    Rpc,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Redis => "redis",
            Self::Mq => "mq",
            Self::Http => "http",
            Self::Rpc => "rpc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mysql" => Some(Self::Mysql),
            "redis" => Some(Self::Redis),
            "mq" => Some(Self::Mq),
            "http" => Some(Self::Http),
            "rpc" => Some(Self::Rpc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStrength {
    Strong,
    Weak,
}

impl DependencyStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Weak => "weak",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "weak" => Self::Weak,
            _ => Self::Strong,
        }
    }
}

/// A call from an internal symbol to a well-known infrastructure component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalDependency {
    pub caller_fqn: String,
    pub dependency_type: DependencyType,
    pub target: String,
    pub strength: DependencyStrength,
}

// ─── Summaries ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryLevel {
    Method,
    Class,
    Package,
    Module,
}

impl SummaryLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Method => "method",
            Self::Class => "class",
            Self::Package => "package",
            Self::Module => "module",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "method" => Some(Self::Method),
            "class" => Some(Self::Class),
            "package" => Some(Self::Package),
            "module" => Some(Self::Module),
            _ => None,
        }
    }

    /// Level a freshly generated summary gets for a symbol of this kind.
    pub fn for_kind(kind: SymbolKind) -> Self {
        match kind {
            SymbolKind::Class | SymbolKind::Interface => Self::Class,
            _ => Self::Method,
        }
    }
}

/// A business summary for a symbol. `is_stale=true` means the text is absent
/// or known to disagree with current code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub target_fqn: String,
    pub level: SummaryLevel,
    pub summary: String,
    pub vector_id: Option<String>,
    pub is_stale: bool,
}

impl Summary {
    pub fn fresh(
        target_fqn: impl Into<String>,
        level: SummaryLevel,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            target_fqn: target_fqn.into(),
            level,
            summary: summary.into(),
            vector_id: None,
            is_stale: false,
        }
    }
}

// ─── Glossary & constraints ─────────────────────────────────────────────────

/// Domain vocabulary: one code term mapped to its business meaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossaryEntry {
    pub code_term: String,
    pub business_meaning: String,
    pub synonyms: Vec<String>,
    pub source_fqn: Option<String>,
    pub vector_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    Validation,
    BusinessRule,
    Invariant,
}

impl ConstraintType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::BusinessRule => "business_rule",
            Self::Invariant => "invariant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "validation" => Some(Self::Validation),
            "business_rule" => Some(Self::BusinessRule),
            "invariant" => Some(Self::Invariant),
            _ => None,
        }
    }
}

/// A business constraint extracted from code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintEntry {
    pub name: String,
    pub description: String,
    pub source_fqn: Option<String>,
    pub source_line: Option<i64>,
    pub constraint_type: ConstraintType,
    pub vector_id: Option<String>,
}

// ─── Anti-patterns ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "info" => Some(Self::Info),
            _ => None,
        }
    }
}

/// A detected architecture violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntiPattern {
    pub rule_id: String,
    pub from_fqn: String,
    pub to_fqn: Option<String>,
    pub severity: Severity,
    pub message: String,
}

// ─── Jobs ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    Full,
    Incremental,
}

impl JobMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "full" => Some(Self::Full),
            "incremental" => Some(Self::Incremental),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "complete" => Some(Self::Complete),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal jobs are never reopened.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// A rebuild job. Append-only: once terminal it is never reopened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub mode: JobMode,
    pub status: JobStatus,
    pub progress: i64,
    pub total_files: i64,
    pub processed_files: i64,
    pub target_paths: Option<Vec<String>>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
}

// ─── Dual-write coordinator internals ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    Pending,
    Stalled,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Pending => "pending",
            Self::Stalled => "stalled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "synced" => Some(Self::Synced),
            "pending" => Some(Self::Pending),
            "stalled" => Some(Self::Stalled),
            _ => None,
        }
    }
}

/// Tracks whether a relational row's vector counterpart is in sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSyncState {
    pub vector_id: String,
    pub table_name: String,
    pub record_fqn: String,
    pub sync_status: SyncStatus,
    pub attempt_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorOp {
    Create,
    Delete,
    Update,
}

impl VectorOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Update => "update",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Self::Create),
            "delete" => Some(Self::Delete),
            "update" => Some(Self::Update),
            _ => None,
        }
    }
}

/// A vector-plane operation that still must be applied or retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingVectorOp {
    pub temp_id: String,
    pub op: VectorOp,
    pub table_name: String,
    pub payload: serde_json::Value,
    pub retry_count: i64,
}
