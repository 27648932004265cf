//! Source-to-test mapping by Maven Surefire naming conventions.
//!
//! Pure filesystem-plus-regex: `…/main/java/…/X.java` maps to
//! `…/test/java/…/X{Test,Tests,IT}.java`, and test methods are extracted
//! from `@Test` annotations or `test*` method names.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Serialize;

use ariadne_core::AriadneResult;
use ariadne_storage::GraphStore;

/// One mapped test file and the symbols it covers.
#[derive(Debug, Clone, Serialize)]
pub struct TestMapping {
    pub path: String,
    pub covers: Vec<String>,
    pub additional_tests: Vec<String>,
}

/// One candidate test path with existence and extracted methods.
#[derive(Debug, Clone, Serialize)]
pub struct TestCandidate {
    pub test_file: String,
    pub test_exists: bool,
    pub test_pattern: String,
    pub test_methods: Vec<String>,
}

fn test_annotation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"@Test\s+(?:public\s+)?(?:static\s+)?(?:\w+\s+)+(\w+)\s*\(")
            .expect("static regex")
    })
}

fn test_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)(?:public|protected|private)?\s+(?:static\s+)?(?:\w+\s+)+test(\w+)\s*\(")
            .expect("static regex")
    })
}

pub struct TestMapper {
    store: Arc<GraphStore>,
}

impl TestMapper {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    /// Find existing test files for a symbol, or None when the symbol has
    /// no file path or no test file exists.
    pub fn find_tests_for_symbol(&self, fqn: &str) -> AriadneResult<Option<TestMapping>> {
        let Some(record) = self.store.get_symbol(fqn)? else {
            return Ok(None);
        };
        let Some(file_path) = record.symbol.file_path else {
            return Ok(None);
        };

        Ok(find_tests_for_file(&file_path, vec![fqn.to_string()]))
    }

    /// Optimized variant: one filesystem probe for all symbols sharing a
    /// source file.
    pub fn find_tests_for_file_path(
        &self,
        file_path: &str,
        fqns: Vec<String>,
    ) -> Option<TestMapping> {
        find_tests_for_file(file_path, fqns)
    }

    /// Full candidate listing (existence + extracted methods) for a symbol.
    pub fn get_test_mapping(&self, fqn: &str) -> AriadneResult<Vec<TestCandidate>> {
        let Some(record) = self.store.get_symbol(fqn)? else {
            return Ok(Vec::new());
        };
        let Some(file_path) = record.symbol.file_path else {
            return Ok(Vec::new());
        };

        let candidates = generate_test_paths(Path::new(&file_path))
            .into_iter()
            .map(|test_path| {
                let test_exists = test_path.exists();
                let test_methods = if test_exists {
                    extract_test_methods(&test_path)
                } else {
                    Vec::new()
                };
                TestCandidate {
                    test_pattern: test_path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    test_file: test_path.display().to_string(),
                    test_exists,
                    test_methods,
                }
            })
            .collect();
        Ok(candidates)
    }
}

fn find_tests_for_file(file_path: &str, covers: Vec<String>) -> Option<TestMapping> {
    let existing: Vec<PathBuf> = generate_test_paths(Path::new(file_path))
        .into_iter()
        .filter(|p| p.exists())
        .collect();

    let (first, rest) = existing.split_first()?;
    Some(TestMapping {
        path: first.display().to_string(),
        covers,
        additional_tests: rest.iter().map(|p| p.display().to_string()).collect(),
    })
}

/// Candidate test paths for a source file under the Maven layout.
/// Returns empty when the path has no `main/java` segment.
pub fn generate_test_paths(source_path: &Path) -> Vec<PathBuf> {
    let path_str = source_path.to_string_lossy();

    let test_base = if path_str.contains("/main/java/") {
        path_str.replace("/main/java/", "/test/java/")
    } else if path_str.contains("\\main\\java\\") {
        path_str.replace("\\main\\java\\", "\\test\\java\\")
    } else {
        return Vec::new();
    };

    let test_base = test_base.strip_suffix(".java").unwrap_or(&test_base);

    ["Test", "Tests", "IT"]
        .iter()
        .map(|suffix| PathBuf::from(format!("{test_base}{suffix}.java")))
        .collect()
}

/// Test method names from a test file: `@Test`-annotated methods plus
/// methods whose name starts with `test`.
pub fn extract_test_methods(test_file: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(test_file) else {
        return Vec::new();
    };
    extract_test_methods_from_source(&content)
}

pub fn extract_test_methods_from_source(content: &str) -> Vec<String> {
    let mut methods: Vec<String> = Vec::new();

    for capture in test_annotation_pattern().captures_iter(content) {
        methods.push(capture[1].to_string());
    }
    for capture in test_name_pattern().captures_iter(content) {
        let name = format!("test{}", &capture[1]);
        if !methods.contains(&name) {
            methods.push(name);
        }
    }
    methods
}

/// Path-pattern heuristic for "is this file a test file".
pub fn is_test_file(file_path: &str) -> bool {
    if file_path.is_empty() {
        return false;
    }
    let lower = file_path.to_lowercase();
    if lower.contains("/test/") || lower.contains("\\test\\") {
        return true;
    }
    let file_name = Path::new(file_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    file_name.starts_with("Test")
        || file_name.ends_with("Test.java")
        || file_name.ends_with("Tests.java")
        || file_name.ends_with("IT.java")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maven_path_convention() {
        let paths = generate_test_paths(Path::new(
            "/repo/src/main/java/com/example/OrderService.java",
        ));
        let rendered: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "/repo/src/test/java/com/example/OrderServiceTest.java",
                "/repo/src/test/java/com/example/OrderServiceTests.java",
                "/repo/src/test/java/com/example/OrderServiceIT.java",
            ]
        );
    }

    #[test]
    fn non_maven_layout_yields_nothing() {
        assert!(generate_test_paths(Path::new("/repo/lib/Foo.java")).is_empty());
    }

    #[test]
    fn extracts_annotated_and_named_tests() {
        let source = r#"
            public class OrderServiceTest {
                @Test
                public void createsOrder() { }

                public void testRejectsEmptyCart() { }

                private int helper() { return 1; }
            }
        "#;
        let methods = extract_test_methods_from_source(source);
        assert!(methods.contains(&"createsOrder".to_string()));
        assert!(methods.contains(&"testRejectsEmptyCart".to_string()));
        assert!(!methods.iter().any(|m| m.contains("helper")));
    }

    #[test]
    fn test_file_heuristics() {
        assert!(is_test_file("/repo/src/test/java/com/example/FooTest.java"));
        assert!(is_test_file("/x/FooTests.java"));
        assert!(is_test_file("/x/FooIT.java"));
        assert!(!is_test_file("/repo/src/main/java/com/example/Foo.java"));
        assert!(!is_test_file(""));
    }
}
