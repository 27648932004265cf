//! Domain vocabulary extraction: map code terms to business meanings.
//!
//! Pattern gates pick the symbols worth asking about (data-model and layer
//! classes, business-operation methods); the LLM supplies the meaning.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use ariadne_core::models::{GlossaryEntry, Symbol, SymbolKind};
use ariadne_core::AriadneResult;
use ariadne_llm::prompts::GLOSSARY_TERM_PROMPT;
use ariadne_llm::LlmClient;

fn domain_class_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?:Entity|DTO|VO|Model|Service|Repository|Controller|Manager|Handler|Processor)$",
        )
        .expect("static regex")
    })
}

fn accessor_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:get|set|is)[A-Z]|^(?:has|contains|equals|hashCode|toString)$")
            .expect("static regex")
    })
}

pub struct GlossaryExtractor<'a> {
    llm: &'a LlmClient,
}

impl<'a> GlossaryExtractor<'a> {
    pub fn new(llm: &'a LlmClient) -> Self {
        Self { llm }
    }

    /// Extract glossary entries for a class and its members. Symbols the
    /// pattern gates reject never reach the LLM.
    pub fn extract_terms_from_class(
        &self,
        class: &Symbol,
        methods: &[Symbol],
        fields: &[Symbol],
    ) -> AriadneResult<Vec<GlossaryEntry>> {
        let mut entries = Vec::new();

        if let Some(term) = extract_class_term(&class.name) {
            if let Some(entry) = self.generate_meaning(&term, &class.name, "", &class.fqn)? {
                entries.push(entry);
            }
        }

        for method in methods {
            if method.kind != SymbolKind::Method || !is_domain_relevant_method(&method.name) {
                continue;
            }
            let term = humanize_camel_case(&method.name);
            if let Some(entry) =
                self.generate_meaning(&term, &class.name, &method.name, &method.fqn)?
            {
                entries.push(entry);
            }
        }

        for field in fields {
            if field.kind != SymbolKind::Field || field.name.len() < 3 {
                continue;
            }
            let term = humanize_camel_case(&field.name);
            if let Some(entry) = self.generate_meaning(&term, &class.name, "", &field.fqn)? {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    fn generate_meaning(
        &self,
        term: &str,
        class_name: &str,
        method_name: &str,
        source_fqn: &str,
    ) -> AriadneResult<Option<GlossaryEntry>> {
        let prompt = format!(
            "Term: {term}\nClass: {class_name}\nMethod: {method_name}"
        );

        let response = match self
            .llm
            .generate_structured_response(&prompt, Some(GLOSSARY_TERM_PROMPT))
        {
            Ok(v) => v,
            Err(e) => {
                warn!(term = %term, error = %e, "Glossary meaning generation failed");
                return Ok(None);
            }
        };

        let Some(meaning) = response.get("meaning").and_then(|m| m.as_str()) else {
            debug!(term = %term, "No meaning in LLM response");
            return Ok(None);
        };
        let synonyms: Vec<String> = response
            .get("synonyms")
            .and_then(|s| serde_json::from_value(s.clone()).ok())
            .unwrap_or_default();

        Ok(Some(GlossaryEntry {
            code_term: term.to_string(),
            business_meaning: meaning.to_string(),
            synonyms,
            source_fqn: Some(source_fqn.to_string()),
            vector_id: None,
        }))
    }
}

/// Strip layer/model suffixes off a domain class name; None when the name
/// is not a domain concept.
pub fn extract_class_term(class_name: &str) -> Option<String> {
    if !domain_class_pattern().is_match(class_name) {
        // Bare nouns (Order, Invoice) still make good terms when long
        // enough to be meaningful.
        if class_name.len() >= 4 && class_name.chars().next().is_some_and(char::is_uppercase) {
            return Some(humanize_camel_case(class_name));
        }
        return None;
    }

    let stripped = domain_class_pattern().replace(class_name, "");
    if stripped.is_empty() {
        return None;
    }
    Some(humanize_camel_case(&stripped))
}

/// Business operations only: accessors and object plumbing are excluded.
pub fn is_domain_relevant_method(name: &str) -> bool {
    !accessor_pattern().is_match(name)
}

/// `calculateOrderTotal` -> `calculate order total`.
pub fn humanize_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() && i > 0 {
            out.push(' ');
        }
        out.extend(c.to_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_terms_strip_suffixes() {
        assert_eq!(extract_class_term("OrderService"), Some("order".into()));
        assert_eq!(
            extract_class_term("PaymentRecordEntity"),
            Some("payment record".into())
        );
        assert_eq!(extract_class_term("Order"), Some("order".into()));
        assert_eq!(extract_class_term("Dto"), None);
    }

    #[test]
    fn accessors_are_not_domain_relevant() {
        assert!(!is_domain_relevant_method("getName"));
        assert!(!is_domain_relevant_method("setTotal"));
        assert!(!is_domain_relevant_method("isActive"));
        assert!(!is_domain_relevant_method("hashCode"));
        assert!(is_domain_relevant_method("cancelOrder"));
        assert!(is_domain_relevant_method("applyDiscount"));
    }

    #[test]
    fn camel_case_humanizes() {
        assert_eq!(humanize_camel_case("calculateOrderTotal"), "calculate order total");
        assert_eq!(humanize_camel_case("Order"), "order");
    }
}
