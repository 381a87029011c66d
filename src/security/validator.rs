//! Lexical SQL authorization filter.
//!
//! # Responsibilities
//! - Reject multi-statement, commented, and deny-listed queries
//! - Require an allow-listed leading verb
//! - Screen for injection signatures and known attack shapes
//!
//! # Design Decisions
//! - Checks run in a fixed order; the first match wins and its reason is
//!   surfaced to the caller
//! - Purely lexical: no SQL parsing, matching on the upper-cased text
//!   with newlines folded to spaces

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum accepted query length in characters.
const MAX_QUERY_LEN: usize = 5000;

/// Keywords rejected anywhere in the query, matched on word boundaries.
const DENY_KEYWORDS: &[&str] = &[
    "DROP", "DELETE", "TRUNCATE", "ALTER", "RENAME", "MODIFY", "SHUTDOWN", "GRANT", "REVOKE",
    "ROLE", "BACKUP", "RESTORE", "CREATE TABLE",
];

/// Verbs a query may start with.
const ALLOWED_VERBS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "CREATE", "SHOW", "DESCRIBE", "EXPLAIN", "USE",
];

/// Substrings that indicate injection attempts. Checked in order so the
/// reported signature is stable.
const INJECTION_SIGNATURES: &[&str] = &[
    "UNION", "SLEEP", "WAITFOR", "DELAY", "IF(", "WHEN", "@@", "@",
];

static DENY_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    DENY_KEYWORDS
        .iter()
        .map(|kw| {
            let pattern = format!(r"\b{}\b", kw.replace(' ', r"\s+"));
            (*kw, Regex::new(&pattern).expect("deny keyword pattern"))
        })
        .collect()
});

static ATTACK_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Numeric tautology: OR 1=1
        Regex::new(r"\bOR\s+\d+\s*=\s*\d+").expect("attack pattern"),
        // String tautology: OR 'a'='a'
        Regex::new(r#"\bOR\s+['"][^'"]*['"]\s*=\s*['"]"#).expect("attack pattern"),
        // Schema probing
        Regex::new(r"(INFORMATION_SCHEMA|SYS)\.").expect("attack pattern"),
        // Stored procedure abuse
        Regex::new(r"\bEXEC\b|\bXP_\w+").expect("attack pattern"),
    ]
});

/// Stateless lexical SQL screen. One instance per Gatekeeper process.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryValidator;

impl QueryValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a query, returning the rejection reason on failure.
    /// Checks run in a fixed order; the first match wins.
    pub fn validate(&self, query: &str) -> Result<(), String> {
        if query.is_empty() {
            return Err("Empty query".to_string());
        }

        if query.chars().count() > MAX_QUERY_LEN {
            return Err("Query exceeds maximum length".to_string());
        }

        // A semicolon is only tolerated as the very last character.
        let last_idx = query.char_indices().last().map(|(i, _)| i).unwrap_or(0);
        if query
            .char_indices()
            .any(|(i, c)| c == ';' && i != last_idx)
        {
            return Err("Multiple statements are not allowed".to_string());
        }

        if query.contains("--") || query.contains("/*") {
            return Err("Comments are not allowed in queries".to_string());
        }

        let normalized = query.to_uppercase().replace('\n', " ");
        let trimmed = normalized.trim();

        for (keyword, pattern) in DENY_PATTERNS.iter() {
            if pattern.is_match(&normalized) {
                return Err(format!("Query contains forbidden keyword: {}", keyword));
            }
        }

        if !ALLOWED_VERBS.iter().any(|verb| trimmed.starts_with(verb)) {
            return Err("Query must start with a valid SQL command".to_string());
        }

        for signature in INJECTION_SIGNATURES {
            if normalized.contains(signature) {
                return Err(format!("Query contains suspicious pattern: {}", signature));
            }
        }

        for pattern in ATTACK_PATTERNS.iter() {
            if pattern.is_match(&normalized) {
                return Err("Query contains suspicious pattern".to_string());
            }
        }

        Ok(())
    }
}
