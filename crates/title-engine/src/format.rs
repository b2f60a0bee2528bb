//! Title composition from semantic parts.
//!
//! Segment order is fixed: notification badge, loading prefix, page name,
//! username, app name. The badge renders *before* the loading prefix;
//! callers and tests depend on that ordering. Every untrusted part passes
//! through the sanitizer, and the composed string is truncated once more so
//! the final result respects `max_length`, not just each part.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::clock::Clock;
use crate::config::{TitleConfig, COUNT_PLACEHOLDER};
use crate::error::TitleResult;
use crate::sanitize::{truncate_with_suffix, SanitizeOptions, Sanitizer};

/// Displayed count cap; larger counts render as `"99+"`.
const NOTIFICATION_DISPLAY_CAP: i64 = 99;

/// Semantic parts of one composition request.
///
/// `page` and `username` are untrusted and sanitized during composition.
#[derive(Debug, Clone, Default)]
pub struct TitleParts {
    /// Raw page name, if any.
    pub page: Option<String>,
    /// Raw username, if any.
    pub username: Option<String>,
    /// Unread notification count; zero renders no badge.
    pub notification_count: u32,
    /// Whether the page is currently loading.
    pub is_loading: bool,
    /// When loading started, for still-loading prefix selection.
    pub loading_started: Option<Instant>,
    /// Per-call app name override.
    pub app_name: Option<String>,
}

impl TitleParts {
    /// Empty parts; compose nothing but the configured app name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page name.
    #[must_use]
    pub fn with_page<S: Into<String>>(mut self, page: S) -> Self {
        self.page = Some(page.into());
        self
    }

    /// Set the username.
    #[must_use]
    pub fn with_username<S: Into<String>>(mut self, username: S) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the notification count.
    #[must_use]
    pub fn with_notification_count(mut self, count: u32) -> Self {
        self.notification_count = count;
        self
    }

    /// Mark the page as loading since `started`.
    #[must_use]
    pub fn with_loading(mut self, started: Instant) -> Self {
        self.is_loading = true;
        self.loading_started = Some(started);
        self
    }

    /// Override the app name for this composition only.
    #[must_use]
    pub fn with_app_name<S: Into<String>>(mut self, app_name: S) -> Self {
        self.app_name = Some(app_name.into());
        self
    }
}

/// Composes final title strings from [`TitleParts`].
#[derive(Clone)]
pub struct TitleFormatter {
    config: TitleConfig,
    sanitizer: Sanitizer,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TitleFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TitleFormatter").field("config", &self.config).finish_non_exhaustive()
    }
}

impl TitleFormatter {
    /// Create a formatter over a validated configuration.
    pub fn new(config: TitleConfig, clock: Arc<dyn Clock>) -> TitleResult<Self> {
        config.validate()?;
        let sanitizer = Sanitizer::from_config(&config);
        Ok(Self { config, sanitizer, clock })
    }

    /// The configuration this formatter composes with.
    pub fn config(&self) -> &TitleConfig {
        &self.config
    }

    /// Compose the full decorated title.
    pub fn format(&self, parts: &TitleParts) -> String {
        let mut segments: Vec<String> = Vec::with_capacity(5);

        let badge = self.format_notification_count(i64::from(parts.notification_count));
        if !badge.is_empty() {
            segments.push(badge);
        }

        if parts.is_loading {
            segments.push(self.loading_prefix_for(parts.loading_started).to_string());
        }

        let page = self.sanitizer.sanitize_optional(parts.page.as_deref());
        if !page.is_empty() {
            segments.push(page);
        }

        let username = self.sanitize_username(parts.username.as_deref());
        if !username.is_empty() {
            segments.push(username);
        }

        let app_name = parts.app_name.as_deref().unwrap_or(&self.config.app_name);
        if !app_name.is_empty() {
            segments.push(app_name.to_string());
        }

        let composed = segments.join(&self.config.separator);
        debug!(segments = segments.len(), "composed title");
        self.enforce_budget(&composed)
    }

    /// Compose the undecorated base title (page, username, app name only).
    pub fn format_base(&self, parts: &TitleParts) -> String {
        let undecorated = TitleParts {
            notification_count: 0,
            is_loading: false,
            loading_started: None,
            ..parts.clone()
        };
        self.format(&undecorated)
    }

    /// Reduced variant producing `"page"` or `"page - app"`.
    pub fn create_simple_title(&self, page: &str, include_app_name: bool) -> String {
        let page = self.sanitizer.sanitize(page);
        let mut segments: Vec<&str> = Vec::with_capacity(2);
        if !page.is_empty() {
            segments.push(&page);
        }
        if include_app_name && !self.config.app_name.is_empty() {
            segments.push(&self.config.app_name);
        }
        self.enforce_budget(&segments.join(&self.config.separator))
    }

    /// Decorate an already-composed title with the loading prefix instead
    /// of recomposing it from parts.
    ///
    /// Any existing loading prefix on `base_title` is replaced, so a
    /// loading→still-loading upgrade never stacks prefixes.
    pub fn build_title_with_loading_state(
        &self,
        base_title: &str,
        is_loading: bool,
        loading_started: Option<Instant>,
    ) -> String {
        let base = self.strip_loading_prefix(base_title);
        if !is_loading {
            return self.enforce_budget(base);
        }
        let prefix = self.loading_prefix_for(loading_started);
        if base.is_empty() {
            return self.enforce_budget(prefix);
        }
        self.enforce_budget(&format!("{prefix}{}{base}", self.config.separator))
    }

    /// Render the notification badge, or `""` for non-positive counts.
    pub fn format_notification_count(&self, count: i64) -> String {
        if count <= 0 {
            return String::new();
        }
        let display = if count > NOTIFICATION_DISPLAY_CAP {
            format!("{NOTIFICATION_DISPLAY_CAP}+")
        } else {
            count.to_string()
        };
        self.config.notification_format.replace(COUNT_PLACEHOLDER, &display)
    }

    fn loading_prefix_for(&self, loading_started: Option<Instant>) -> &str {
        let threshold = Duration::from_millis(self.config.still_loading_threshold_ms);
        let elapsed = loading_started
            .map(|started| self.clock.now().saturating_duration_since(started));
        match elapsed {
            Some(elapsed) if elapsed > threshold => &self.config.still_loading_prefix,
            _ => &self.config.loading_prefix,
        }
    }

    fn sanitize_username(&self, username: Option<&str>) -> String {
        let sanitized = self.sanitizer.sanitize_optional(username);
        if sanitized.is_empty() {
            return sanitized;
        }
        truncate_with_suffix(
            &sanitized,
            self.config.username_max_length,
            &self.config.truncation_suffix,
        )
    }

    fn strip_loading_prefix<'a>(&self, title: &'a str) -> &'a str {
        for prefix in [&self.config.still_loading_prefix, &self.config.loading_prefix] {
            if prefix.is_empty() {
                continue;
            }
            let prefixed = format!("{prefix}{}", self.config.separator);
            if let Some(rest) = title.strip_prefix(&prefixed) {
                return rest;
            }
            if title == prefix {
                return "";
            }
        }
        title
    }

    fn enforce_budget(&self, composed: &str) -> String {
        truncate_with_suffix(composed, self.config.max_length, &self.config.truncation_suffix)
    }

    /// Sanitizer options in effect, for audit call sites.
    pub fn sanitize_options(&self) -> &SanitizeOptions {
        self.sanitizer.options()
    }
}
