//! Dynamic page-title engine for the Linke user portal.
//!
//! Owns the full title lifecycle for a browser-hosted client: resolving
//! route metadata into page names, sanitizing untrusted text, composing
//! the decorated title (notification badge, loading prefix, page,
//! username, app name), committing it through an observable store, and
//! writing it to the host window with ranked fallbacks for hosts where
//! direct title assignment is broken.
//!
//! # Architecture
//!
//! - [`config`]: validated [`TitleConfig`] plus partial runtime overrides
//! - [`sanitize`]: multi-stage sanitization pipeline and truncation
//! - [`format`]: pure composition from [`TitleParts`] to a final string
//! - [`routes`]: declarative route-to-title registry with pattern matching
//! - [`store`]: the observable [`TitleStore`] every mutation flows through
//! - [`writer`]: capability detection and the ranked write-strategy chain
//!
//! Everything is dependency-injected and explicitly constructed; there is
//! no module-level global state.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod routes;
pub mod sanitize;
pub mod store;
pub mod writer;

// Testing utilities
// ---------------------------------------------------------------
pub mod testing;

// Re-export commonly used types for convenience
// ------------------------
pub use clock::{Clock, MockClock, SystemClock};
pub use config::{TitleConfig, TitleConfigOverride, COUNT_PLACEHOLDER};
pub use error::{ErrorSeverity, TitleError, TitleResult};
pub use format::{TitleFormatter, TitleParts};
pub use routes::{
    derive_title_from_path, RouteMetadataEntry, RouteRegistry, RouteTitleFn,
    RouteValidationReport, FALLBACK_TITLE,
};
pub use sanitize::{
    truncate_with_suffix, validate_title, SanitizationResult, SanitizeOptions, Sanitizer,
    TitleValidation,
};
pub use store::{SubscriptionToken, TitleState, TitleStore, TitleUpdateEvent, UpdateSource};
pub use writer::{
    parse_user_agent, BrowserFamily, Capability, CompatibilityWriter, HostWindow, TitleWriter,
    WriteMethod,
};
