//! Integration tests for the sanitization pipeline
//!
//! Exercises the full staged pipeline through the public API: dangerous
//! pattern removal, entity decoding, tag stripping, control characters,
//! whitelist filtering, whitespace normalization, and truncation.

use linke_title_engine::{
    truncate_with_suffix, validate_title, SanitizeOptions, Sanitizer, TitleConfig,
};
use regex::Regex;

/// Validates that executable content is removed in its entirety, not just
/// de-tagged.
///
/// Script and style containers must disappear together with their inner
/// text; leaving `alert('xss')` behind as plain text would still leak
/// attacker-controlled content into the visible title.
#[test]
fn test_dangerous_containers_removed_with_contents() {
    let sanitizer = Sanitizer::default();

    assert_eq!(sanitizer.sanitize("Hello <script>alert('xss')</script>World"), "Hello World");
    assert_eq!(sanitizer.sanitize("<style>body{display:none}</style>Reports"), "Reports");
    assert_eq!(
        sanitizer.sanitize("Safe <iframe src='https://evil.example'></iframe>Page"),
        "Safe Page"
    );
}

/// Validates that the pipeline output is a fixpoint of the pipeline.
///
/// Nested obfuscation like `<scr<script>ipt>` reassembles a dangerous tag
/// after one removal pass; a single-pass sanitizer would emit a string
/// that fails its own sanitization. The pipeline must iterate until the
/// output stops changing.
#[test]
fn test_nested_obfuscation_converges_to_fixpoint() {
    let sanitizer = Sanitizer::default();

    let once = sanitizer.sanitize("<scr<script>ipt>alert(1)</scr</script>ipt>Safe");
    assert!(!once.to_lowercase().contains("script"));
    assert!(!once.contains("alert"));

    let twice = sanitizer.sanitize(&once);
    assert_eq!(once, twice, "sanitization must be idempotent");
}

/// Validates that schemes assembled from HTML entities are caught.
///
/// `&#106;avascript:` decodes to `javascript:`; the dangerous-pattern
/// stage must re-run after each decode pass so entity-encoded payloads
/// cannot slip through as inert text.
#[test]
fn test_entity_encoded_scheme_is_stripped() {
    let sanitizer = Sanitizer::default();

    let result = sanitizer.sanitize("&#106;avascript:alert(1) Dashboard");
    assert!(!result.to_lowercase().contains("javascript"));
    assert!(result.contains("Dashboard"));
}

/// Validates the scheme guarantee against split-and-rejoin payloads: a
/// character the later stages delete must not be usable as a wedge that
/// hides `javascript:` from the pattern catalogue.
#[test]
fn test_scheme_split_by_deleted_characters_is_stripped() {
    let sanitizer = Sanitizer::default();

    for input in ["java\u{a4}script:alert(1)", "java\u{b}script:alert(1)"] {
        let out = sanitizer.sanitize(input);
        assert!(!out.to_lowercase().contains("javascript:"), "survived {input:?}: {out:?}");
        assert_eq!(sanitizer.sanitize(&out), out, "unstable for {input:?}");
    }
}

#[test]
fn test_event_handlers_and_schemes_are_stripped() {
    let sanitizer = Sanitizer::default();

    let result = sanitizer.sanitize("Page onload=steal() javascript:alert(1)");
    assert!(!result.contains("onload"));
    assert!(!result.to_lowercase().contains("javascript:"));
    assert!(result.starts_with("Page"));
}

#[test]
fn test_named_entities_decode_to_text() {
    let sanitizer = Sanitizer::default();
    assert_eq!(sanitizer.sanitize("Fish &amp; Chips"), "Fish & Chips");
    assert_eq!(sanitizer.sanitize("&quot;Quoted&quot;"), "\"Quoted\"");
}

#[test]
fn test_control_characters_removed_whitespace_collapsed() {
    let sanitizer = Sanitizer::default();
    assert_eq!(sanitizer.sanitize("A\u{0000}B\u{0007}C"), "ABC");
    assert_eq!(sanitizer.sanitize("  Too   many\t\nspaces  "), "Too many spaces");
}

/// Validates the default whitelist: international letters and emoji stay,
/// stray angle brackets go.
#[test]
fn test_unicode_letters_and_emoji_survive() {
    let sanitizer = Sanitizer::default();
    assert_eq!(sanitizer.sanitize("Café Münchner Straße"), "Café Münchner Straße");
    assert_eq!(sanitizer.sanitize("Inbox 📬 (3)"), "Inbox 📬 (3)");
    // Anything between angle brackets reads as a tag and is dropped whole.
    assert_eq!(sanitizer.sanitize("a < b > c"), "a c");
    assert_eq!(sanitizer.sanitize("1 < 2"), "1 2");
}

#[test]
fn test_custom_whitelist_replaces_default() {
    let options = SanitizeOptions {
        custom_whitelist: Some(Regex::new(r"[a-z ]").expect("whitelist regex")),
        ..SanitizeOptions::default()
    };
    let sanitizer = Sanitizer::new(options);
    assert_eq!(sanitizer.sanitize("Hello World 123!"), "ello orld");
}

/// Validates word-boundary-aware truncation through the standalone
/// helper.
///
/// # Test Steps
/// 1. A string whose budget lands on a space truncates at the word
///    boundary: `"This is a test title"` with limit 12 gives
///    `"This is a..."`.
/// 2. When no space falls within the final fifth of the budget the cut is
///    hard.
/// 3. Input within the limit passes through untouched.
#[test]
fn test_truncation_prefers_word_boundaries() {
    assert_eq!(truncate_with_suffix("This is a test title", 12, "..."), "This is a...");
    assert_eq!(truncate_with_suffix("Supercalifragilistic", 10, "..."), "Superca...");
    assert_eq!(truncate_with_suffix("Short", 12, "..."), "Short");
}

#[test]
fn test_truncated_output_never_exceeds_budget() {
    for limit in 4..40 {
        let out = truncate_with_suffix("The quick brown fox jumps over the lazy dog", limit, "...");
        assert!(out.chars().count() <= limit, "limit {limit} produced {out:?}");
    }
}

#[test]
fn test_detailed_result_reports_stages() {
    let sanitizer = Sanitizer::default();
    let details = sanitizer.sanitize_with_details("<script>x</script>Hello &amp; bye");

    assert_eq!(details.sanitized, "Hello & bye");
    assert!(details.was_modified);
    assert!(!details.issues.is_empty());
    assert!(details.original_length > details.final_length);
}

#[test]
fn test_clean_input_is_untouched() {
    let sanitizer = Sanitizer::default();
    let details = sanitizer.sanitize_with_details("Dashboard");
    assert_eq!(details.sanitized, "Dashboard");
    assert!(!details.was_modified);
    assert!(details.issues.is_empty());
}

/// Validates the non-mutating validator: it reports findings without
/// rewriting anything.
#[test]
fn test_validate_title_reports_without_mutating() {
    let config = TitleConfig::default();

    let clean = validate_title("Orders - Linke User Portal", &config);
    assert!(clean.is_valid);
    assert!(clean.errors.is_empty());

    let dirty = validate_title("<script>alert(1)</script>", &config);
    assert!(!dirty.is_valid);
    assert!(!dirty.errors.is_empty());

    let long = validate_title(&"x".repeat(500), &config);
    assert!(!long.is_valid);
}
