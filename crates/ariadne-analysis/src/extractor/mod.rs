//! Extraction: turn the analysis service's class records into graph rows.
//!
//! Finds compiled class directories, ships them to the remote analyzer,
//! and materializes symbols, edges, entry points, and external
//! dependencies. Unchanged modules are skipped via a stat-based content
//! hash kept in `index_metadata`.

pub mod client;
pub mod dependency_analyzer;
pub mod entry_detector;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use ariadne_core::models::ingest::ClassRecord;
use ariadne_core::models::{Edge, Relation, Symbol, SymbolKind};
use ariadne_core::{AriadneError, AriadneResult};
use ariadne_storage::GraphStore;

pub use client::AsmClient;
pub use dependency_analyzer::ExternalDependencyAnalyzer;
pub use entry_detector::EntryDetector;

/// Framework packages never indexed as call targets.
pub const EXTERNAL_PREFIXES: [&str; 16] = [
    "java.",
    "javax.",
    "jdk.",
    "sun.",
    "com.sun.",
    "org.w3c.",
    "org.xml.",
    "org.omg.",
    "org.ietf.",
    "org.slf4j.",
    "org.apache.",
    "org.springframework.",
    "com.fasterxml.",
    "com.google.",
    "org.hibernate.",
    "kotlin.",
];

/// Outcome of extracting a project.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub success: bool,
    pub total_symbols: usize,
    pub total_edges: usize,
    pub total_entries: usize,
    pub total_deps: usize,
    pub modules: usize,
    pub errors: Vec<String>,
}

pub struct Extractor {
    store: Arc<GraphStore>,
    client: AsmClient,
}

impl Extractor {
    pub fn new(store: Arc<GraphStore>, client: AsmClient) -> Self {
        Self { store, client }
    }

    /// Extract symbols and relationships for every module under
    /// `project_root` that has compiled classes. Modules whose stat hash is
    /// unchanged are skipped.
    pub fn extract_project(
        &self,
        project_root: &Path,
        domains: Option<&[String]>,
    ) -> AriadneResult<ExtractionResult> {
        if !project_root.exists() {
            return Err(AriadneError::NotFound {
                kind: "project",
                id: project_root.display().to_string(),
            });
        }

        let class_dirs = find_class_dirs(project_root);
        if class_dirs.is_empty() {
            return Ok(ExtractionResult {
                success: false,
                errors: vec![
                    "No compiled classes found. Build the project first.".to_string(),
                ],
                ..Default::default()
            });
        }

        info!(modules = class_dirs.len(), root = %project_root.display(), "Extracting project");

        let source_index = build_source_index(project_root);
        let mut result = ExtractionResult {
            modules: class_dirs.len(),
            ..Default::default()
        };

        for (classes_dir, module_name) in &class_dirs {
            match self.process_module(classes_dir, module_name, &source_index, domains) {
                Ok(stats) => {
                    result.total_symbols += stats.0;
                    result.total_edges += stats.1;
                    result.total_entries += stats.2;
                    result.total_deps += stats.3;
                }
                Err(e) => {
                    warn!(module = %module_name, error = %e, "Module extraction failed");
                    result.errors.push(format!("{module_name}: {e}"));
                }
            }
        }

        result.success = result.errors.is_empty();
        info!(
            symbols = result.total_symbols,
            edges = result.total_edges,
            entries = result.total_entries,
            deps = result.total_deps,
            "Extraction complete"
        );
        Ok(result)
    }

    fn process_module(
        &self,
        classes_dir: &Path,
        module_name: &str,
        source_index: &HashMap<String, PathBuf>,
        domains: Option<&[String]>,
    ) -> AriadneResult<(usize, usize, usize, usize)> {
        let hash_key = format!("hash:{module_name}");
        let current_hash = compute_module_hash(classes_dir);
        if self.store.get_metadata(&hash_key)?.as_deref() == Some(current_hash.as_str()) {
            info!(module = %module_name, "Skipped (unchanged)");
            return Ok((0, 0, 0, 0));
        }

        let class_files = find_class_files(classes_dir);
        if class_files.is_empty() {
            return Ok((0, 0, 0, 0));
        }

        let response = self.client.analyze_classes(
            class_files
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            domains.map(|d| d.to_vec()),
        )?;
        if !response.success {
            return Err(AriadneError::Unavailable {
                service: "asm",
                reason: format!("analysis failed for module {module_name}"),
            });
        }

        let (symbols, edges) = process_classes(&response.classes, source_index);
        let entries = EntryDetector::detect_entries(&response.classes);
        let deps = ExternalDependencyAnalyzer::analyze(&response.classes);

        self.store.insert_symbols(&symbols)?;
        self.store.insert_edges(&edges)?;
        self.store.insert_entry_points(&entries)?;
        self.store.insert_external_dependencies(&deps)?;
        self.store.set_metadata(&hash_key, &current_hash)?;

        info!(
            module = %module_name,
            symbols = symbols.len(),
            edges = edges.len(),
            "Module indexed"
        );
        Ok((symbols.len(), edges.len(), entries.len(), deps.len()))
    }
}

/// Convert analyzer class records into symbols and edges.
///
/// Calls into well-known framework packages are dropped; inheritance
/// becomes `inherits`/`implements` edges; fields become child symbols.
pub fn process_classes(
    classes: &[ClassRecord],
    source_index: &HashMap<String, PathBuf>,
) -> (Vec<Symbol>, Vec<Edge>) {
    let mut symbols = Vec::new();
    let mut edges = Vec::new();

    for class in classes {
        let class_fqn = &class.fqn;
        let class_name = class_fqn.rsplit('.').next().unwrap_or(class_fqn);
        let source_path = find_source_file(source_index, class_fqn);

        let kind = if class.class_type.as_deref() == Some("interface") {
            SymbolKind::Interface
        } else {
            SymbolKind::Class
        };
        let mut class_symbol = Symbol::new(class_fqn.clone(), kind, class_name);
        class_symbol.file_path = source_path.clone();
        class_symbol.line_number = class.line;
        class_symbol.modifiers = class.modifiers.clone();
        class_symbol.annotations = class.annotations.clone();
        symbols.push(class_symbol);

        for inheritance in &class.inheritance {
            let relation = match inheritance.kind.as_deref() {
                Some("implements") => Relation::Implements,
                _ => Relation::Inherits,
            };
            edges.push(Edge::new(class_fqn.clone(), inheritance.fqn.clone(), relation));
        }

        for method in &class.methods {
            let method_fqn = &method.fqn;
            let method_name = method_fqn
                .rsplit('.')
                .next()
                .unwrap_or(method_fqn)
                .split('(')
                .next()
                .unwrap_or(method_fqn);

            let mut method_symbol =
                Symbol::new(method_fqn.clone(), SymbolKind::Method, method_name);
            method_symbol.file_path = source_path.clone();
            method_symbol.line_number = method.line;
            method_symbol.modifiers = method.modifiers.clone();
            method_symbol.signature = method.signature.clone();
            method_symbol.parent_fqn = Some(class_fqn.clone());
            method_symbol.annotations = method.annotations.clone();
            symbols.push(method_symbol);

            for call in &method.calls {
                if call.to_fqn.is_empty() || is_external(&call.to_fqn) {
                    continue;
                }
                let mut edge = Edge::new(method_fqn.clone(), call.to_fqn.clone(), Relation::Calls);
                edge.metadata = Some(serde_json::json!({
                    "line": call.line,
                    "kind": call.kind,
                }));
                edges.push(edge);
            }
        }

        for field in &class.fields {
            if field.name.is_empty() {
                continue;
            }
            let field_fqn = format!("{class_fqn}.{}", field.name);
            let mut field_symbol = Symbol::new(field_fqn, SymbolKind::Field, field.name.clone());
            field_symbol.file_path = source_path.clone();
            field_symbol.modifiers = field.modifiers.clone();
            field_symbol.signature = field.field_type.clone();
            field_symbol.parent_fqn = Some(class_fqn.clone());
            field_symbol.annotations = field.annotations.clone();
            symbols.push(field_symbol);
        }
    }

    (symbols, edges)
}

fn is_external(fqn: &str) -> bool {
    EXTERNAL_PREFIXES.iter().any(|prefix| fqn.starts_with(prefix))
}

/// One-pass source index: FQN key (`com.example.Foo`) to its `.java` file.
pub fn build_source_index(project_root: &Path) -> HashMap<String, PathBuf> {
    let mut index = HashMap::new();
    for src_dir in ["src/main/java", "src/java", "src"] {
        let src_path = project_root.join(src_dir);
        if src_path.exists() {
            index_java_files(&src_path, &src_path, &mut index);
        }
    }
    index
}

fn index_java_files(root: &Path, dir: &Path, index: &mut HashMap<String, PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            index_java_files(root, &path, index);
        } else if path.extension().is_some_and(|ext| ext == "java") {
            if let Ok(relative) = path.strip_prefix(root) {
                let fqn_key = relative
                    .with_extension("")
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join(".");
                index.insert(fqn_key, path);
            }
        }
    }
}

/// O(1) source lookup; inner classes (`Outer$Inner`) resolve to the outer
/// class's file.
fn find_source_file(index: &HashMap<String, PathBuf>, class_fqn: &str) -> Option<String> {
    let base_fqn = class_fqn.split('$').next().unwrap_or(class_fqn);
    index.get(base_fqn).map(|p| p.display().to_string())
}

/// Compiled class directories: Maven `target/classes` and Gradle
/// `build/classes/java/main`, labeled by module name.
pub fn find_class_dirs(project_root: &Path) -> Vec<(PathBuf, String)> {
    let mut dirs = Vec::new();
    collect_class_dirs(project_root, &mut dirs, 0);
    dirs
}

fn collect_class_dirs(dir: &Path, out: &mut Vec<(PathBuf, String)>, depth: usize) {
    // Deep trees are build output, not module roots.
    if depth > 6 {
        return;
    }

    let maven = dir.join("target/classes");
    if maven.is_dir() {
        let module = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string());
        out.push((maven, module));
    }
    let gradle = dir.join("build/classes/java/main");
    if gradle.is_dir() {
        let module = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string());
        out.push((gradle, module));
    }

    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name == "target" || name == "build" || name.starts_with('.') {
                continue;
            }
            collect_class_dirs(&path, out, depth + 1);
        }
    }
}

fn find_class_files(classes_dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    collect_class_files(classes_dir, &mut files);
    files.sort();
    files
}

fn collect_class_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_class_files(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "class") {
            out.push(path);
        }
    }
}

/// Stat-based module hash (name + mtime + size per class file); avoids
/// reading file contents just to detect staleness.
pub fn compute_module_hash(classes_dir: &Path) -> String {
    let mut hasher = blake3::Hasher::new();
    for class_file in find_class_files(classes_dir) {
        if let Some(name) = class_file.file_name() {
            hasher.update(name.to_string_lossy().as_bytes());
        }
        if let Ok(stat) = std::fs::metadata(&class_file) {
            if let Ok(modified) = stat.modified() {
                if let Ok(since_epoch) = modified.duration_since(std::time::UNIX_EPOCH) {
                    hasher.update(&since_epoch.as_nanos().to_le_bytes());
                }
            }
            hasher.update(&stat.len().to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ariadne_core::models::ingest::{CallRecord, InheritanceRecord, MethodRecord};

    #[test]
    fn framework_calls_are_dropped() {
        let classes = [ClassRecord {
            fqn: "com.example.OrderService".into(),
            methods: vec![MethodRecord {
                fqn: "com.example.OrderService.create(Order)".into(),
                calls: vec![
                    CallRecord {
                        to_fqn: "java.util.List.add(Object)".into(),
                        ..Default::default()
                    },
                    CallRecord {
                        to_fqn: "org.springframework.util.Assert.notNull(Object)".into(),
                        ..Default::default()
                    },
                    CallRecord {
                        to_fqn: "com.example.OrderValidator.validate(Order)".into(),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        }];

        let (symbols, edges) = process_classes(&classes, &HashMap::new());
        assert_eq!(symbols.len(), 2); // class + method
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].to_fqn, "com.example.OrderValidator.validate(Order)");
    }

    #[test]
    fn inheritance_becomes_typed_edges() {
        let classes = [ClassRecord {
            fqn: "com.example.AdminUser".into(),
            inheritance: vec![
                InheritanceRecord {
                    fqn: "com.example.User".into(),
                    kind: Some("extends".into()),
                },
                InheritanceRecord {
                    fqn: "com.example.Auditable".into(),
                    kind: Some("implements".into()),
                },
            ],
            ..Default::default()
        }];

        let (_, edges) = process_classes(&classes, &HashMap::new());
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].relation, Relation::Inherits);
        assert_eq!(edges[1].relation, Relation::Implements);
    }

    #[test]
    fn methods_carry_parent_and_trimmed_name() {
        let classes = [ClassRecord {
            fqn: "com.example.Order".into(),
            methods: vec![MethodRecord {
                fqn: "com.example.Order.total(List)".into(),
                ..Default::default()
            }],
            ..Default::default()
        }];

        let (symbols, _) = process_classes(&classes, &HashMap::new());
        let method = symbols.iter().find(|s| s.kind == SymbolKind::Method).unwrap();
        assert_eq!(method.name, "total");
        assert_eq!(method.parent_fqn.as_deref(), Some("com.example.Order"));
    }

    #[test]
    fn interface_kind_is_detected() {
        let classes = [ClassRecord {
            fqn: "com.example.Repository".into(),
            class_type: Some("interface".into()),
            ..Default::default()
        }];
        let (symbols, _) = process_classes(&classes, &HashMap::new());
        assert_eq!(symbols[0].kind, SymbolKind::Interface);
    }
}
