//! Best-effort secret scrubbing applied before a raw payload is logged.
//!
//! This never runs on the routing path — handlers and the pipeline always
//! see the true bytes. It exists solely so that `tracing` output doesn't
//! leak credentials that happened to be embedded in an XML attribute value.

use anyhow::{Context, Result};
use regex::{Regex, RegexSet};
use std::sync::LazyLock;

/// Definition of a secret pattern, kept in one table so the regex list and
/// its documentation never drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretPatternDef {
    pub id: &'static str,
    pub regex: &'static str,
}

/// Patterns relevant to credentials that end up embedded in XML attribute
/// values or text content: bearer/API tokens, basic auth, AWS-style keys,
/// and PEM key markers. Trimmed from a much larger table down to the
/// categories a message bus payload can plausibly carry.
static DEFAULT_SECRET_PATTERNS: &[SecretPatternDef] = &[
    SecretPatternDef { id: "aws_access_key", regex: r"AKIA[0-9A-Z]{16}" },
    SecretPatternDef {
        id: "aws_secret_key_value",
        regex: r"(?i)(?:aws_secret|secret_access_key)[=:][A-Za-z0-9/+=]{40}",
    },
    SecretPatternDef { id: "bearer_token", regex: r"Bearer [A-Za-z0-9._-]{20,}" },
    SecretPatternDef { id: "authorization_basic", regex: r"Basic [A-Za-z0-9+/=]{20,}" },
    SecretPatternDef {
        id: "api_key_header",
        regex: r"(?i)(?:x-api-key|api-key|apikey)[=:][A-Za-z0-9_-]{20,}",
    },
    SecretPatternDef {
        id: "oauth_token",
        regex: r"(?i)(?:access_token|refresh_token)[=:][A-Za-z0-9._-]{20,}",
    },
    SecretPatternDef {
        id: "jwt_token",
        regex: r"eyJ[A-Za-z0-9_-]*\.eyJ[A-Za-z0-9_-]*\.[A-Za-z0-9_-]*",
    },
    SecretPatternDef {
        id: "private_key_marker",
        regex: r"-----BEGIN (?:OPENSSH |DSA |EC |RSA )?PRIVATE KEY-----",
    },
    SecretPatternDef {
        id: "generic_db_url",
        regex: r"(?:postgres(?:ql)?|mysql|mongodb(?:\+srv)?|rediss?)://[^:]+:[^@]+@[^\s<>\"]+",
    },
];

/// Returns the canonical list of default secret pattern definitions.
pub fn default_pattern_defs() -> &'static [SecretPatternDef] {
    DEFAULT_SECRET_PATTERNS
}

/// Compiles [`default_pattern_defs`] once per process.
static COMPILED: LazyLock<Result<(RegexSet, Vec<(&'static str, Regex)>), String>> =
    LazyLock::new(|| {
        let mut linear = Vec::with_capacity(DEFAULT_SECRET_PATTERNS.len());
        let mut patterns = Vec::with_capacity(DEFAULT_SECRET_PATTERNS.len());
        for def in DEFAULT_SECRET_PATTERNS {
            let regex = Regex::new(def.regex).map_err(|e| format!("{}: {e}", def.id))?;
            patterns.push(def.regex);
            linear.push((def.id, regex));
        }
        let set = RegexSet::new(&patterns).map_err(|e| e.to_string())?;
        Ok((set, linear))
    });

/// Scrubs secret-shaped substrings out of text headed for a log line.
#[derive(Debug, Clone, Default)]
pub struct SecretRedactor {
    _private: (),
}

impl SecretRedactor {
    /// Builds a redactor backed by the default pattern table.
    ///
    /// # Errors
    /// Returns an error if the built-in patterns fail to compile, which
    /// should never happen in practice.
    pub fn new() -> Result<Self> {
        COMPILED.as_ref().map_err(|e| anyhow::anyhow!(e.clone())).context("compiling secret patterns")?;
        Ok(Self { _private: () })
    }

    /// Replaces every secret-shaped substring of `text` with `***`.
    pub fn redact(&self, text: &str) -> String {
        let (set, linear) = match COMPILED.as_ref() {
            Ok(v) => v,
            Err(_) => return text.to_string(),
        };
        let matches = set.matches(text);
        if !matches.matched_any() {
            return text.to_string();
        }
        let mut redacted = text.to_string();
        for index in matches.iter() {
            if let Some((_, regex)) = linear.get(index) {
                redacted = regex.replace_all(&redacted, "***").to_string();
            }
        }
        redacted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_bearer_token() {
        let redactor = SecretRedactor::new().unwrap();
        let out = redactor.redact(r#"<auth token="Bearer abcdefghijklmnopqrstuvwx"/>"#);
        assert!(!out.contains("abcdefghijklmnopqrstuvwx"));
        assert!(out.contains("***"));
    }

    #[test]
    fn leaves_plain_text_untouched() {
        let redactor = SecretRedactor::new().unwrap();
        let out = redactor.redact("<cad-task version=\"1.0\">hello</cad-task>");
        assert_eq!(out, "<cad-task version=\"1.0\">hello</cad-task>");
    }
}
