//! Business constraint extraction from method code.
//!
//! Three sources: validation annotations (explicit), assert statements
//! (explicit), and control-flow patterns the LLM reads as implicit rules.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use ariadne_core::models::{ConstraintEntry, ConstraintType, Symbol};
use ariadne_core::AriadneResult;
use ariadne_llm::prompts::CONSTRAINT_EXTRACTION_PROMPT;
use ariadne_llm::LlmClient;

const VALIDATION_ANNOTATIONS: [&str; 10] = [
    "@NotNull", "@NotEmpty", "@NotBlank", "@Min(", "@Max(", "@Size(", "@Pattern(", "@Email",
    "@Positive", "@Negative",
];

fn assert_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"assert\s+(.+?)\s*:\s*["'](.+?)["']"#).expect("static regex")
    })
}

pub struct ConstraintExtractor<'a> {
    llm: Option<&'a LlmClient>,
}

impl<'a> ConstraintExtractor<'a> {
    /// Extractor with LLM-backed implicit constraint detection.
    pub fn new(llm: &'a LlmClient) -> Self {
        Self { llm: Some(llm) }
    }

    /// Pattern-only extractor (annotations and asserts, no LLM calls).
    pub fn pattern_only() -> Self {
        Self { llm: None }
    }

    /// Extract all constraints a method enforces.
    pub fn extract_from_method(
        &self,
        method: &Symbol,
        source_code: &str,
        class_name: &str,
    ) -> AriadneResult<Vec<ConstraintEntry>> {
        let mut constraints = extract_from_annotations(method);
        constraints.extend(extract_from_asserts(method, source_code));

        if let Some(llm) = self.llm {
            constraints.extend(self.extract_implicit(llm, method, source_code, class_name)?);
        }

        Ok(constraints)
    }

    fn extract_implicit(
        &self,
        llm: &LlmClient,
        method: &Symbol,
        source_code: &str,
        class_name: &str,
    ) -> AriadneResult<Vec<ConstraintEntry>> {
        let prompt = format!(
            "Class: {class_name}\nMethod: {}\n\n```java\n{source_code}\n```",
            method.name
        );

        let response =
            match llm.generate_structured_response(&prompt, Some(CONSTRAINT_EXTRACTION_PROMPT)) {
                Ok(v) => v,
                Err(e) => {
                    warn!(fqn = %method.fqn, error = %e, "Implicit constraint extraction failed");
                    return Ok(Vec::new());
                }
            };

        let Some(items) = response.as_array() else {
            return Ok(Vec::new());
        };

        let mut constraints = Vec::new();
        for item in items {
            let Some(name) = item.get("name").and_then(|n| n.as_str()) else {
                continue;
            };
            let Some(description) = item.get("description").and_then(|d| d.as_str()) else {
                continue;
            };
            let constraint_type = item
                .get("type")
                .and_then(|t| t.as_str())
                .and_then(ConstraintType::parse)
                .unwrap_or(ConstraintType::BusinessRule);

            constraints.push(ConstraintEntry {
                name: format!("{}_{name}", method.name),
                description: description.to_string(),
                source_fqn: Some(method.fqn.clone()),
                source_line: method.line_number,
                constraint_type,
                vector_id: None,
            });
        }
        Ok(constraints)
    }
}

/// Validation constraints from the method's annotations.
fn extract_from_annotations(method: &Symbol) -> Vec<ConstraintEntry> {
    let mut constraints = Vec::new();

    for annotation in &method.annotations {
        for validation in VALIDATION_ANNOTATIONS {
            if !annotation.starts_with(validation) {
                continue;
            }
            let suffix = validation.trim_start_matches('@').trim_end_matches('(');
            let constraint_type = match validation {
                "@NotNull" | "@NotEmpty" | "@NotBlank" => ConstraintType::Validation,
                _ => ConstraintType::Validation,
            };
            constraints.push(ConstraintEntry {
                name: format!("{}_{suffix}", method.name),
                description: format!("Parameter validation: {annotation}"),
                source_fqn: Some(method.fqn.clone()),
                source_line: method.line_number,
                constraint_type,
                vector_id: None,
            });
        }
    }
    constraints
}

/// Explicit constraints from `assert condition : "message"` statements.
fn extract_from_asserts(method: &Symbol, source_code: &str) -> Vec<ConstraintEntry> {
    assert_pattern()
        .captures_iter(source_code)
        .enumerate()
        .map(|(i, capture)| ConstraintEntry {
            name: format!("{}_assert_{i}", method.name),
            description: format!("Assertion: {} ({})", &capture[2], &capture[1]),
            source_fqn: Some(method.fqn.clone()),
            source_line: method.line_number,
            constraint_type: ConstraintType::Invariant,
            vector_id: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ariadne_core::models::SymbolKind;

    fn method_with_annotations(annotations: &[&str]) -> Symbol {
        Symbol::new("com.example.OrderService.create(Order)", SymbolKind::Method, "create")
            .with_annotations(annotations.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn validation_annotations_become_constraints() {
        let method = method_with_annotations(&["@NotNull", "@Min(1)"]);
        let constraints = extract_from_annotations(&method);
        assert_eq!(constraints.len(), 2);
        assert_eq!(constraints[0].name, "create_NotNull");
        assert_eq!(constraints[0].constraint_type, ConstraintType::Validation);
        assert_eq!(constraints[1].name, "create_Min");
    }

    #[test]
    fn asserts_become_invariants() {
        let method = method_with_annotations(&[]);
        let source = r#"assert total >= 0 : "total must not be negative";"#;
        let constraints = extract_from_asserts(&method, source);
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].constraint_type, ConstraintType::Invariant);
        assert!(constraints[0].description.contains("total must not be negative"));
    }

    #[test]
    fn pattern_only_extractor_skips_llm() {
        let extractor = ConstraintExtractor::pattern_only();
        let method = method_with_annotations(&["@NotBlank"]);
        let constraints = extractor
            .extract_from_method(&method, "return name;", "OrderService")
            .unwrap();
        assert_eq!(constraints.len(), 1);
    }
}
