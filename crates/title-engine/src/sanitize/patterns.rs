//! Fixed catalogue of dangerous patterns stripped from untrusted input.
//!
//! The catalogue is compiled once and reused; compilation failure of a
//! built-in pattern is a bug, not a runtime condition.

use once_cell::sync::Lazy;
use regex::Regex;

/// One entry of the dangerous-pattern catalogue.
#[derive(Debug)]
pub(crate) struct DangerousPattern {
    /// Human-readable label recorded as an issue when the pattern matches.
    pub label: &'static str,
    pub regex: Regex,
}

/// Elements whose opening tag, content, and closing tag are all stripped.
const CONTAINER_ELEMENTS: &[&str] =
    &["script", "style", "iframe", "object", "embed", "applet", "form", "textarea", "select"];

fn pattern(label: &'static str, source: &str) -> DangerousPattern {
    let regex =
        Regex::new(source).expect("built-in dangerous pattern should compile - this is a bug");
    DangerousPattern { label, regex }
}

pub(crate) static DANGEROUS_PATTERNS: Lazy<Vec<DangerousPattern>> = Lazy::new(|| {
    let mut patterns = Vec::new();

    for element in CONTAINER_ELEMENTS {
        // Paired form with content, then any stray opening/closing tags the
        // paired form missed (unclosed or orphaned).
        patterns.push(pattern(
            "dangerous element",
            &format!(r"(?is)<{element}\b[^>]*>.*?</\s*{element}\s*>"),
        ));
        patterns.push(pattern("dangerous tag", &format!(r"(?i)</?\s*{element}\b[^>]*>")));
    }

    patterns.push(pattern("input element", r"(?i)<input\b[^>]*>"));
    patterns.push(pattern("javascript scheme", r"(?i)javascript\s*:"));
    patterns.push(pattern("vbscript scheme", r"(?i)vbscript\s*:"));
    patterns.push(pattern("data html scheme", r"(?i)data\s*:\s*text/html"));
    patterns.push(pattern("data base64 scheme", r"(?i)data\s*:[^,<>]*;\s*base64"));
    patterns.push(pattern("event handler attribute", r"(?i)\bon\w+\s*="));
    patterns.push(pattern(
        "script call construct",
        r"(?i)\b(?:eval|expression|setTimeout|setInterval)\s*\(",
    ));

    patterns
});

/// Labels of catalogue patterns matching `input`, in catalogue order.
pub(crate) fn matching_labels(input: &str) -> Vec<&'static str> {
    let mut labels = Vec::new();
    for entry in DANGEROUS_PATTERNS.iter() {
        if entry.regex.is_match(input) && !labels.contains(&entry.label) {
            labels.push(entry.label);
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_compiles() {
        assert!(!DANGEROUS_PATTERNS.is_empty());
    }

    #[test]
    fn script_elements_match_case_insensitively() {
        let labels = matching_labels("<SCRIPT>alert(1)</SCRIPT>");
        assert!(labels.contains(&"dangerous element"));
    }

    #[test]
    fn schemes_match_with_internal_whitespace() {
        assert!(matching_labels("javascript :alert(1)").contains(&"javascript scheme"));
        assert!(matching_labels("data: text/html,x").contains(&"data html scheme"));
    }

    #[test]
    fn event_handlers_and_call_constructs_match() {
        assert!(matching_labels("x onload=doit()").contains(&"event handler attribute"));
        assert!(matching_labels("setTimeout(fire)").contains(&"script call construct"));
    }

    #[test]
    fn plain_text_matches_nothing() {
        assert!(matching_labels("Dashboard - Linke User Portal").is_empty());
    }
}
