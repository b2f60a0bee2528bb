//! Multi-stage sanitization of untrusted title fragments.
//!
//! Page names and usernames arrive from callers and session state and are
//! treated as attacker-controlled. [`Sanitizer`] runs a fixed pipeline:
//!
//! 1. strip the dangerous-pattern catalogue (iterated to a fixpoint so
//!    re-assembling forms like `<scr<script>ipt>` cannot survive),
//! 2. decode HTML entities (named, decimal, hex; bounded to valid code
//!    points) and re-strip anything the decode uncovered,
//! 3. strip residual tag-like sequences and bare angle brackets,
//! 4. strip C0/C1 control characters,
//! 5. apply the character whitelist,
//! 6. collapse whitespace runs (unless preservation is configured),
//! 7. enforce the length budget with word-boundary truncation.
//!
//! The output never contains `<` or `>`, never carries a bare
//! `javascript:`/`vbscript:` prefix, never exceeds the configured maximum
//! length, and is stable under a second pass.

mod entities;
mod patterns;
mod truncate;

pub use truncate::truncate_with_suffix;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::TitleConfig;
use entities::{contains_entities, decode_entities};
use patterns::{matching_labels, DANGEROUS_PATTERNS};

/// Upper bound on fixpoint passes; real input converges in one or two.
const MAX_STRIP_PASSES: usize = 8;
const MAX_DECODE_PASSES: usize = 5;

/// Always-allowed punctuation in the default whitelist.
const COMMON_PUNCTUATION: &str = ".,!?'\"-_";
/// Additional fixed punctuation set admitted by the default whitelist.
const EXTRA_PUNCTUATION: &str = "@#$%&*()+=:;/\\|[]{}~`";

static TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag regex should compile - this is a bug"));

static WHITESPACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex should compile - this is a bug"));

// \p{Emoji} covers the pictographs; ZWJ and VS-16 keep composed emoji
// sequences intact through the per-character filter.
static EMOJI_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{Emoji}\u{200d}\u{fe0f}]").expect("emoji regex should compile - this is a bug")
});

/// Options controlling the whitelist and length stages.
#[derive(Debug, Clone)]
pub struct SanitizeOptions {
    /// Character budget enforced by the final stage.
    pub max_length: usize,
    /// Suffix appended when the budget forces truncation.
    pub truncation_suffix: String,
    /// Admit Unicode letters beyond ASCII.
    pub allow_unicode_letters: bool,
    /// Admit Unicode digits beyond ASCII.
    pub allow_unicode_digits: bool,
    /// Admit emoji graphemes.
    pub allow_emoji: bool,
    /// Keep whitespace exactly as supplied instead of collapsing runs.
    pub preserve_whitespace: bool,
    /// Caller-supplied whitelist matching *allowed* characters; replaces
    /// the default whitelist entirely.
    pub custom_whitelist: Option<Regex>,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            max_length: 200,
            truncation_suffix: "...".to_string(),
            allow_unicode_letters: true,
            allow_unicode_digits: true,
            allow_emoji: true,
            preserve_whitespace: false,
            custom_whitelist: None,
        }
    }
}

/// Outcome of a detailed sanitization run.
///
/// Used both for production sanitization and for test/audit visibility;
/// `issues` lists every stage that changed the string, in pipeline order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizationResult {
    /// The safe output string.
    pub sanitized: String,
    /// Whether any stage changed the input.
    pub was_modified: bool,
    /// Human-readable descriptions of what each stage removed or rewrote.
    pub issues: Vec<String>,
    /// Input length in characters.
    pub original_length: usize,
    /// Output length in characters.
    pub final_length: usize,
}

/// Non-mutating validation verdict from [`validate_title`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleValidation {
    /// True when no findings were recorded.
    pub is_valid: bool,
    /// Findings, in scan order.
    pub errors: Vec<String>,
}

/// Staged sanitizer for untrusted title fragments.
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    options: SanitizeOptions,
}

impl Sanitizer {
    /// Create a sanitizer with explicit options.
    pub fn new(options: SanitizeOptions) -> Self {
        Self { options }
    }

    /// Create a sanitizer whose length stage matches the engine config.
    pub fn from_config(config: &TitleConfig) -> Self {
        Self::new(SanitizeOptions {
            max_length: config.max_length,
            truncation_suffix: config.truncation_suffix.clone(),
            ..SanitizeOptions::default()
        })
    }

    /// Options this sanitizer was built with.
    pub fn options(&self) -> &SanitizeOptions {
        &self.options
    }

    /// Sanitize `input`, returning only the safe string.
    pub fn sanitize(&self, input: &str) -> String {
        self.sanitize_with_details(input).sanitized
    }

    /// Sanitize an optional input; `None` yields `""` without error.
    pub fn sanitize_optional(&self, input: Option<&str>) -> String {
        input.map_or_else(String::new, |text| self.sanitize(text))
    }

    /// Run the full pipeline and report everything it changed.
    pub fn sanitize_with_details(&self, input: &str) -> SanitizationResult {
        let original_length = input.chars().count();
        let mut issues = Vec::new();
        let mut text = input.to_string();

        if text.contains('\0') {
            warn!(length = original_length, "suspicious input contains NUL bytes");
        }

        // Stage 1: dangerous pattern catalogue.
        text = strip_dangerous(&text, &mut issues);

        // Stage 2: entity decoding, bounded, with re-strip after each pass
        // so decoded markup cannot bypass stage 1.
        for pass in 0..MAX_DECODE_PASSES {
            if !contains_entities(&text) {
                break;
            }
            let decoded = decode_entities(&text);
            if decoded == text {
                break;
            }
            if pass == 0 {
                issues.push("decoded HTML entities".to_string());
            }
            text = strip_dangerous(&decoded, &mut issues);
        }

        // Stage 3: residual tags, then any bare angle brackets.
        let stripped = TAG_REGEX.replace_all(&text, "").into_owned();
        let stripped: String = stripped.chars().filter(|c| *c != '<' && *c != '>').collect();
        if stripped != text {
            issues.push("stripped markup tags".to_string());
            text = stripped;
        }

        // Stage 4: C0/C1 control characters (tab/newline survive until the
        // whitespace stage).
        let cleaned: String = text.chars().filter(|c| !is_stripped_control(*c)).collect();
        if cleaned != text {
            issues.push("removed control characters".to_string());
            text = cleaned;
        }

        // Stage 5: character whitelist.
        let filtered: String = text.chars().filter(|c| self.is_allowed(*c)).collect();
        if filtered != text {
            issues.push("removed disallowed characters".to_string());
            text = filtered;
        }

        // Stages 3-5 delete characters and can reassemble a catalogue
        // match ("java\u{a4}script:" loses its marker and becomes a real
        // scheme), so the catalogue runs once more over the filtered text.
        text = strip_dangerous(&text, &mut issues);

        // Stage 6: whitespace normalization.
        if !self.options.preserve_whitespace {
            let collapsed = WHITESPACE_REGEX.replace_all(&text, " ").trim().to_string();
            if collapsed != text {
                issues.push("normalized whitespace".to_string());
                text = collapsed;
            }
        }

        // Stage 7: length budget.
        if text.chars().count() > self.options.max_length {
            text = truncate_with_suffix(
                &text,
                self.options.max_length,
                &self.options.truncation_suffix,
            );
            issues.push(format!("truncated to {} characters", self.options.max_length));
        }

        let final_length = text.chars().count();
        SanitizationResult {
            was_modified: text != input,
            sanitized: text,
            issues,
            original_length,
            final_length,
        }
    }

    fn is_allowed(&self, c: char) -> bool {
        if let Some(whitelist) = &self.options.custom_whitelist {
            let mut buf = [0u8; 4];
            return whitelist.is_match(c.encode_utf8(&mut buf));
        }
        if c.is_ascii_alphanumeric() || c.is_whitespace() {
            return true;
        }
        if COMMON_PUNCTUATION.contains(c) || EXTRA_PUNCTUATION.contains(c) {
            return true;
        }
        if self.options.allow_unicode_letters && c.is_alphabetic() {
            return true;
        }
        if self.options.allow_unicode_digits && c.is_numeric() {
            return true;
        }
        if self.options.allow_emoji {
            let mut buf = [0u8; 4];
            return EMOJI_REGEX.is_match(c.encode_utf8(&mut buf));
        }
        false
    }
}

/// Apply the dangerous-pattern catalogue until the string stops changing.
///
/// Stripping `<script>` out of `<scr<script>ipt>` re-assembles the outer
/// tag, so a single pass is not enough.
fn strip_dangerous(input: &str, issues: &mut Vec<String>) -> String {
    let mut text = input.to_string();
    for _ in 0..MAX_STRIP_PASSES {
        let mut changed = false;
        for entry in DANGEROUS_PATTERNS.iter() {
            let replaced = entry.regex.replace_all(&text, "");
            if replaced != text {
                let issue = format!("removed {}", entry.label);
                if !issues.contains(&issue) {
                    issues.push(issue);
                }
                text = replaced.into_owned();
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    text
}

fn is_stripped_control(c: char) -> bool {
    let code = c as u32;
    if matches!(c, '\t' | '\n' | '\r') {
        return false;
    }
    code < 0x20 || (0x7f..=0x9f).contains(&code)
}

/// Re-scan a title against the dangerous-pattern catalogue without
/// mutating it.
///
/// Defensive assertion for call sites that bypass the full pipeline: flags
/// catalogue matches, empty titles, and titles longer than twice the
/// configured maximum.
pub fn validate_title(title: &str, config: &TitleConfig) -> TitleValidation {
    let mut errors = Vec::new();

    for label in matching_labels(title) {
        errors.push(format!("title contains {label}"));
    }
    if title.trim().is_empty() {
        errors.push("title is empty".to_string());
    }
    let length = title.chars().count();
    if length > config.max_length * 2 {
        errors.push(format!(
            "title length {length} exceeds twice the configured maximum {}",
            config.max_length
        ));
    }

    TitleValidation { is_valid: errors.is_empty(), errors }
}
