//! Engine configuration and partial-override merging.
//!
//! One [`TitleConfig`] is supplied at initialization and may be adjusted
//! later through [`TitleConfigOverride`] patches; individual compositions
//! can still override the app name per call via
//! [`TitleParts`](crate::format::TitleParts).

use serde::{Deserialize, Serialize};

use crate::error::{TitleError, TitleResult};

/// Placeholder replaced by the rendered count in `notification_format`.
pub const COUNT_PLACEHOLDER: &str = "%count%";

/// Process-wide title composition configuration.
///
/// Invariant: `max_length` bounds the *final* composed string. Every other
/// length limit is a sub-budget and must respect it; `validate` enforces
/// this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleConfig {
    /// Application name appended as the last title segment.
    pub app_name: String,
    /// Separator joining non-empty segments.
    pub separator: String,
    /// Hard upper bound on the composed title, in characters.
    pub max_length: usize,
    /// Prefix shown while a page is loading.
    pub loading_prefix: String,
    /// Prefix shown once loading has exceeded the threshold.
    pub still_loading_prefix: String,
    /// Elapsed loading time after which the still-loading prefix is used.
    pub still_loading_threshold_ms: u64,
    /// Notification badge template containing [`COUNT_PLACEHOLDER`].
    pub notification_format: String,
    /// Suffix appended when a string is truncated.
    pub truncation_suffix: String,
    /// Character budget for the username segment.
    pub username_max_length: usize,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            app_name: "Linke User Portal".to_string(),
            separator: " - ".to_string(),
            max_length: 100,
            loading_prefix: "Loading...".to_string(),
            still_loading_prefix: "Still loading...".to_string(),
            still_loading_threshold_ms: 5_000,
            notification_format: "(%count%) ".to_string(),
            truncation_suffix: "...".to_string(),
            username_max_length: 24,
        }
    }
}

impl TitleConfig {
    /// Build a configuration from the defaults plus a partial override.
    pub fn with_overrides(overrides: TitleConfigOverride) -> TitleResult<Self> {
        let mut config = Self::default();
        overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Validate field constraints and cross-field budget invariants.
    pub fn validate(&self) -> TitleResult<()> {
        if self.max_length == 0 {
            return Err(TitleError::config_field("max_length", "must be at least 1"));
        }
        if self.username_max_length == 0 {
            return Err(TitleError::config_field("username_max_length", "must be at least 1"));
        }
        if self.username_max_length > self.max_length {
            return Err(TitleError::config_field(
                "username_max_length",
                "sub-budget exceeds max_length",
            ));
        }
        if !self.notification_format.contains(COUNT_PLACEHOLDER) {
            return Err(TitleError::config_field(
                "notification_format",
                format!("missing '{COUNT_PLACEHOLDER}' placeholder"),
            ));
        }
        if self.truncation_suffix.chars().count() >= self.max_length {
            return Err(TitleError::config_field(
                "truncation_suffix",
                "suffix leaves no room for content within max_length",
            ));
        }
        Ok(())
    }
}

/// Partial configuration patch.
///
/// All fields are optional; absent fields keep their current value. Applied
/// once at initialization and mergeable with later partial updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleConfigOverride {
    pub app_name: Option<String>,
    pub separator: Option<String>,
    pub max_length: Option<usize>,
    pub loading_prefix: Option<String>,
    pub still_loading_prefix: Option<String>,
    pub still_loading_threshold_ms: Option<u64>,
    pub notification_format: Option<String>,
    pub truncation_suffix: Option<String>,
    pub username_max_length: Option<usize>,
}

impl TitleConfigOverride {
    /// Parse a partial override document, as shipped in host application
    /// config. Absent fields stay `None`.
    pub fn from_json(json: &str) -> TitleResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| TitleError::config_field("override", e.to_string()))
    }

    /// Apply this patch on top of an existing configuration.
    pub fn apply(&self, config: &mut TitleConfig) {
        if let Some(app_name) = &self.app_name {
            config.app_name = app_name.clone();
        }
        if let Some(separator) = &self.separator {
            config.separator = separator.clone();
        }
        if let Some(max_length) = self.max_length {
            config.max_length = max_length;
        }
        if let Some(loading_prefix) = &self.loading_prefix {
            config.loading_prefix = loading_prefix.clone();
        }
        if let Some(still_loading_prefix) = &self.still_loading_prefix {
            config.still_loading_prefix = still_loading_prefix.clone();
        }
        if let Some(threshold) = self.still_loading_threshold_ms {
            config.still_loading_threshold_ms = threshold;
        }
        if let Some(notification_format) = &self.notification_format {
            config.notification_format = notification_format.clone();
        }
        if let Some(truncation_suffix) = &self.truncation_suffix {
            config.truncation_suffix = truncation_suffix.clone();
        }
        if let Some(username_max_length) = self.username_max_length {
            config.username_max_length = username_max_length;
        }
    }
}
