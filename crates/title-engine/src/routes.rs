//! Static route-to-title metadata and pathname resolution.
//!
//! Matching is deterministic: an exact literal match always beats a
//! parameterized or wildcard match, and within each class the registered
//! order decides. Patterns compile to anchored regexes once, at
//! registration, so `resolve` is allocation-free on the happy path.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use crate::config::TitleConfig;
use crate::error::{TitleError, TitleResult};
use crate::format::TitleParts;

/// Title used when nothing matches and the path yields no usable segment.
pub const FALLBACK_TITLE: &str = "Home";

/// Per-entry composition hook, replacing the standard formatter when set.
pub type RouteTitleFn = Arc<dyn Fn(&TitleParts, &TitleConfig) -> String + Send + Sync>;

/// One registered route pattern and its title metadata.
#[derive(Clone)]
pub struct RouteMetadataEntry {
    /// Path pattern: literal, `:param` segments, or `*` wildcard segments.
    pub pattern: String,
    /// Human title for pages under this pattern.
    pub title: String,
    /// Include the session username segment.
    pub show_username: bool,
    /// Include the notification badge segment.
    pub show_notifications: bool,
    /// Optional formatter override for this entry.
    pub formatter: Option<RouteTitleFn>,
}

impl fmt::Debug for RouteMetadataEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMetadataEntry")
            .field("pattern", &self.pattern)
            .field("title", &self.title)
            .field("show_username", &self.show_username)
            .field("show_notifications", &self.show_notifications)
            .field("has_formatter", &self.formatter.is_some())
            .finish()
    }
}

impl RouteMetadataEntry {
    /// Create an entry with both display flags enabled.
    pub fn new<P: Into<String>, T: Into<String>>(pattern: P, title: T) -> Self {
        Self {
            pattern: pattern.into(),
            title: title.into(),
            show_username: true,
            show_notifications: true,
            formatter: None,
        }
    }

    /// Disable the username segment for this entry.
    #[must_use]
    pub fn without_username(mut self) -> Self {
        self.show_username = false;
        self
    }

    /// Disable the notification badge for this entry.
    #[must_use]
    pub fn without_notifications(mut self) -> Self {
        self.show_notifications = false;
        self
    }

    /// Attach a per-entry formatter override.
    #[must_use]
    pub fn with_formatter(mut self, formatter: RouteTitleFn) -> Self {
        self.formatter = Some(formatter);
        self
    }

    fn is_literal(&self) -> bool {
        !self.pattern.split('/').any(|seg| seg.starts_with(':') || seg == "*")
    }
}

/// Structured, non-throwing validation outcome for a registry.
///
/// Callers decide whether findings are fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteValidationReport {
    /// True when no findings were recorded.
    pub is_valid: bool,
    /// Findings, one human-readable line each.
    pub issues: Vec<String>,
}

struct CompiledEntry {
    entry: RouteMetadataEntry,
    /// Anchored matcher; `None` for literal patterns.
    regex: Option<Regex>,
}

/// Ordered registry of route metadata entries.
#[derive(Default)]
pub struct RouteRegistry {
    entries: Vec<CompiledEntry>,
}

impl fmt::Debug for RouteRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRegistry").field("entries", &self.entries.len()).finish()
    }
}

impl RouteRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from an entry list, in order.
    pub fn with_entries<I: IntoIterator<Item = RouteMetadataEntry>>(
        entries: I,
    ) -> TitleResult<Self> {
        let mut registry = Self::new();
        for entry in entries {
            registry.register(entry)?;
        }
        Ok(registry)
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register a new entry at the end of the scan order.
    ///
    /// Duplicate literal paths are a configuration error; use [`upsert`]
    /// to replace an existing entry in place.
    ///
    /// [`upsert`]: Self::upsert
    pub fn register(&mut self, entry: RouteMetadataEntry) -> TitleResult<()> {
        if entry.is_literal()
            && self.entries.iter().any(|existing| existing.entry.pattern == entry.pattern)
        {
            return Err(TitleError::route(format!(
                "duplicate literal route path '{}'",
                entry.pattern
            )));
        }
        let regex = compile_pattern(&entry)?;
        self.entries.push(CompiledEntry { entry, regex });
        Ok(())
    }

    /// Replace the entry with the same pattern, or append a new one.
    pub fn upsert(&mut self, entry: RouteMetadataEntry) -> TitleResult<()> {
        let regex = compile_pattern(&entry)?;
        if let Some(existing) =
            self.entries.iter_mut().find(|existing| existing.entry.pattern == entry.pattern)
        {
            *existing = CompiledEntry { entry, regex };
        } else {
            self.entries.push(CompiledEntry { entry, regex });
        }
        Ok(())
    }

    /// Remove the entry registered under `pattern`, returning whether one
    /// existed.
    pub fn remove(&mut self, pattern: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|existing| existing.entry.pattern != pattern);
        self.entries.len() != before
    }

    /// Resolve a pathname to its metadata entry.
    ///
    /// Exact literal equality wins over any pattern match; pattern entries
    /// are scanned in registration order.
    pub fn resolve(&self, pathname: &str) -> Option<&RouteMetadataEntry> {
        if let Some(found) =
            self.entries.iter().find(|candidate| candidate.entry.pattern == pathname)
        {
            debug!(pathname, pattern = %found.entry.pattern, "resolved literal route");
            return Some(&found.entry);
        }

        for candidate in &self.entries {
            if let Some(regex) = &candidate.regex {
                if regex.is_match(pathname) {
                    debug!(pathname, pattern = %candidate.entry.pattern, "resolved pattern route");
                    return Some(&candidate.entry);
                }
            }
        }
        None
    }

    /// Scan the registry for configuration problems without failing.
    pub fn validate(&self) -> RouteValidationReport {
        let mut issues = Vec::new();

        for (index, candidate) in self.entries.iter().enumerate() {
            let entry = &candidate.entry;
            if entry.pattern.is_empty() {
                issues.push(format!("entry {index}: pattern is empty"));
            }
            if entry.title.trim().is_empty() {
                issues.push(format!("entry {index} ('{}'): title is empty", entry.pattern));
            }
            if entry.pattern.contains("//") {
                issues.push(format!(
                    "entry {index} ('{}'): suspicious double slash",
                    entry.pattern
                ));
            }
            let duplicate = self.entries[..index]
                .iter()
                .any(|earlier| earlier.entry.pattern == entry.pattern);
            if duplicate {
                issues.push(format!("entry {index}: duplicate path '{}'", entry.pattern));
            }
        }

        RouteValidationReport { is_valid: issues.is_empty(), issues }
    }
}

/// Compile a `:param`/`*` pattern to an anchored regex.
///
/// Literal patterns need no regex; they are matched by equality.
fn compile_pattern(entry: &RouteMetadataEntry) -> TitleResult<Option<Regex>> {
    if entry.is_literal() {
        return Ok(None);
    }

    let translated: Vec<String> = entry
        .pattern
        .split('/')
        .map(|segment| {
            if segment.starts_with(':') && segment.len() > 1 {
                "[^/]+".to_string()
            } else if segment == "*" {
                ".*".to_string()
            } else {
                regex::escape(segment)
            }
        })
        .collect();

    let source = format!("^{}$", translated.join("/"));
    Regex::new(&source).map(Some).map_err(|e| {
        TitleError::route(format!("pattern '{}' failed to compile: {e}", entry.pattern))
    })
}

/// Derive a presentable title from the last path segment.
///
/// Kebab- and snake-case segments convert to Title Case; an empty or
/// root path yields [`FALLBACK_TITLE`].
pub fn derive_title_from_path(pathname: &str) -> String {
    let segment = pathname
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .split('/')
        .filter(|seg| !seg.is_empty())
        .next_back();

    let Some(segment) = segment else {
        return FALLBACK_TITLE.to_string();
    };

    let words: Vec<String> = segment
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect();

    if words.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        words.join(" ")
    }
}
