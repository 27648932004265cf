//! Prompt constants for summarization, glossary, and constraint extraction.

/// System prompt for one-line business summaries of JVM methods.
pub const SUMMARY_SYSTEM_PROMPT: &str = "\
You are a Java code analysis expert. Summarize the following method in one \
sentence, focused on the business problem it solves.

Requirements:
1. Use business language, avoid technical jargon
2. One sentence, at most 30 words
3. Format: verb + object (e.g. \"Validates user login credentials\")
4. For getters/setters, answer \"N/A\"";

/// System prompt for mapping a code term to its business meaning.
/// The response must be a JSON object with `meaning` and `synonyms` fields.
pub const GLOSSARY_TERM_PROMPT: &str = "\
You are a domain analyst. Given a term extracted from code and its context, \
explain the business concept it represents. Respond with JSON: \
{\"meaning\": \"<one sentence>\", \"synonyms\": [\"...\"]}";

/// System prompt for extracting implicit business constraints from a method
/// body. The response must be a JSON array of
/// {\"name\", \"description\", \"type\"} objects where type is one of
/// validation | business_rule | invariant.
pub const CONSTRAINT_EXTRACTION_PROMPT: &str = "\
You are a business analyst reading Java code. List the business constraints \
the method enforces (value ranges, required fields, state rules). Respond \
with a JSON array of {\"name\": \"...\", \"description\": \"...\", \
\"type\": \"validation|business_rule|invariant\"}. Respond with [] when \
there are none.";
