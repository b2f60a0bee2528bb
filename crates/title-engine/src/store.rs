//! Central observable title state and its transition machine.
//!
//! All mutation flows through [`TitleStore`] transition methods; callers
//! and subscribers never touch [`TitleState`] directly. Each transition
//! recomposes the candidate title, suppresses no-op updates entirely (no
//! event, no write), and otherwise commits state, invokes the
//! compatibility writer, and notifies subscribers synchronously in
//! registration order. Subscribers only ever observe fully-applied states.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::{TitleConfig, TitleConfigOverride};
use crate::error::TitleResult;
use crate::format::{TitleFormatter, TitleParts};
use crate::routes::{derive_title_from_path, RouteRegistry, RouteValidationReport};
use crate::writer::{CompatibilityWriter, HostWindow};

/// Which transition produced a title update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateSource {
    /// Navigation resolved through the route registry.
    Route,
    /// Explicit `set_title`/`set_username`/config change.
    Manual,
    /// Loading flag transition.
    Loading,
    /// Notification count transition.
    Notification,
}

/// Immutable record emitted to subscribers on every successful transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleUpdateEvent {
    /// Title before the transition.
    pub from: String,
    /// Title after the transition.
    pub to: String,
    /// Wall-clock time of the transition.
    pub timestamp: DateTime<Utc>,
    /// Transition kind.
    pub source: UpdateSource,
}

/// Snapshot of the store's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleState {
    /// The composed title as last committed.
    pub current_title: String,
    /// Pre-decoration title (no badge, no loading prefix).
    pub base_title: String,
    /// Whether a page load is in progress.
    pub is_loading: bool,
    /// When the current load started; `None` when not loading.
    pub loading_started: Option<Instant>,
    /// Clamped notification count.
    pub notification_count: u32,
    /// Milliseconds since epoch of the last committed transition.
    pub last_update_ms: u64,
}

/// Token returned by [`TitleStore::subscribe`] for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionToken(Uuid);

type TitleSubscriber = Arc<dyn Fn(&TitleUpdateEvent) + Send + Sync>;

struct StoreInner {
    state: TitleState,
    page: Option<String>,
    username: Option<String>,
    show_username: bool,
    show_notifications: bool,
}

/// Orchestrator owning title state, composition, and the write path.
///
/// Explicitly constructed and dependency-injected; there is no module
/// global. One instance lives for the application lifetime and is torn
/// down through [`shutdown`](Self::shutdown).
pub struct TitleStore {
    formatter: RwLock<TitleFormatter>,
    registry: RwLock<RouteRegistry>,
    writer: CompatibilityWriter,
    clock: Arc<dyn Clock>,
    inner: RwLock<StoreInner>,
    subscribers: RwLock<Vec<(SubscriptionToken, TitleSubscriber)>>,
    shut_down: AtomicBool,
}

impl std::fmt::Debug for TitleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TitleStore")
            .field("state", &self.inner.read().state)
            .field("subscribers", &self.subscribers.read().len())
            .finish_non_exhaustive()
    }
}

impl TitleStore {
    /// Create a store with the system clock.
    pub fn new(
        overrides: TitleConfigOverride,
        registry: RouteRegistry,
        host: Arc<dyn HostWindow>,
    ) -> TitleResult<Self> {
        Self::with_clock(overrides, registry, host, Arc::new(SystemClock))
    }

    /// Create a store with an injected clock (tests use [`MockClock`]).
    ///
    /// [`MockClock`]: crate::clock::MockClock
    pub fn with_clock(
        overrides: TitleConfigOverride,
        registry: RouteRegistry,
        host: Arc<dyn HostWindow>,
        clock: Arc<dyn Clock>,
    ) -> TitleResult<Self> {
        let config = TitleConfig::with_overrides(overrides)?;
        let formatter = TitleFormatter::new(config, clock.clone())?;
        Ok(Self {
            formatter: RwLock::new(formatter),
            registry: RwLock::new(registry),
            writer: CompatibilityWriter::new(host),
            clock,
            inner: RwLock::new(StoreInner {
                state: TitleState::default(),
                page: None,
                username: None,
                show_username: true,
                show_notifications: true,
            }),
            subscribers: RwLock::new(Vec::new()),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Current state snapshot.
    ///
    /// # Panics
    /// Panics after [`shutdown`](Self::shutdown); using a torn-down store
    /// is a wiring bug, not a runtime condition.
    pub fn snapshot(&self) -> TitleState {
        self.ensure_live();
        self.inner.read().state.clone()
    }

    /// Active configuration.
    pub fn config(&self) -> TitleConfig {
        self.formatter.read().config().clone()
    }

    /// Set the page title explicitly.
    pub fn set_title(&self, text: &str) {
        let page = Some(text.to_string());
        self.transition(UpdateSource::Manual, |inner| inner.page = page, None);
    }

    /// Set the session username shown in composed titles.
    pub fn set_username(&self, username: Option<&str>) {
        let username = username.map(str::to_string);
        self.transition(UpdateSource::Manual, |inner| inner.username = username, None);
    }

    /// Set the loading flag.
    ///
    /// The loading timer starts on the false→true edge and clears on the
    /// true→false edge; repeated `true` calls keep the original start.
    pub fn set_loading(&self, loading: bool) {
        let now = self.clock.now();
        self.transition(
            UpdateSource::Loading,
            move |inner| {
                if loading && !inner.state.is_loading {
                    inner.state.loading_started = Some(now);
                } else if !loading {
                    inner.state.loading_started = None;
                }
                inner.state.is_loading = loading;
            },
            None,
        );
    }

    /// Set the notification count; negative values clamp to zero.
    pub fn set_notification_count(&self, count: i64) {
        let clamped = u32::try_from(count.max(0)).unwrap_or(u32::MAX);
        self.transition(
            UpdateSource::Notification,
            move |inner| inner.state.notification_count = clamped,
            None,
        );
    }

    /// Route-declarative entry point: resolve `pathname`, compose, commit.
    ///
    /// Intended to be invoked once per navigation. `override_title` wins
    /// over the resolved entry's title; an unregistered path falls back to
    /// a title derived from the last path segment.
    pub fn apply_route(&self, pathname: &str, override_title: Option<&str>) {
        let resolved = self.registry.read().resolve(pathname).cloned();
        let (title, show_username, show_notifications, entry_formatter) = match resolved {
            Some(entry) => (
                override_title.unwrap_or(&entry.title).to_string(),
                entry.show_username,
                entry.show_notifications,
                entry.formatter.clone(),
            ),
            None => (
                override_title.map_or_else(|| derive_title_from_path(pathname), str::to_string),
                true,
                true,
                None,
            ),
        };

        debug!(pathname, title = %title, "applying route title");
        self.transition(
            UpdateSource::Route,
            move |inner| {
                inner.page = Some(title);
                inner.show_username = show_username;
                inner.show_notifications = show_notifications;
            },
            entry_formatter,
        );
    }

    /// Merge a partial configuration update and recompose.
    pub fn update_config(&self, overrides: &TitleConfigOverride) -> TitleResult<()> {
        {
            let mut formatter = self.formatter.write();
            let mut config = formatter.config().clone();
            overrides.apply(&mut config);
            *formatter = TitleFormatter::new(config, self.clock.clone())?;
        }
        self.transition(UpdateSource::Manual, |_| {}, None);
        Ok(())
    }

    /// Register a subscriber; notification order is registration order.
    ///
    /// Handlers may call back into the store, including removing
    /// themselves mid-notification.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionToken
    where
        F: Fn(&TitleUpdateEvent) + Send + Sync + 'static,
    {
        let token = SubscriptionToken(Uuid::new_v4());
        self.subscribers.write().push((token, Arc::new(handler)));
        token
    }

    /// Remove a subscriber, returning whether it was registered.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != token);
        subscribers.len() != before
    }

    /// The route registry, for runtime registration changes.
    pub fn with_routes<R>(&self, f: impl FnOnce(&mut RouteRegistry) -> R) -> R {
        f(&mut self.registry.write())
    }

    /// Validate the registered routes without failing.
    pub fn validate_routes(&self) -> RouteValidationReport {
        self.registry.read().validate()
    }

    /// The compatibility writer, for capability inspection and cleanup.
    pub fn writer(&self) -> &CompatibilityWriter {
        &self.writer
    }

    /// Tear the store down; the writer forgets cached detection and any
    /// further use of this store panics.
    pub fn shutdown(&self) {
        self.writer.cleanup();
        self.subscribers.write().clear();
        self.shut_down.store(true, Ordering::SeqCst);
        debug!("title store shut down");
    }

    fn ensure_live(&self) {
        assert!(
            !self.shut_down.load(Ordering::SeqCst),
            "title store used after shutdown; this is a wiring bug"
        );
    }

    fn parts_from(inner: &StoreInner) -> TitleParts {
        TitleParts {
            page: inner.page.clone(),
            username: if inner.show_username { inner.username.clone() } else { None },
            notification_count: if inner.show_notifications {
                inner.state.notification_count
            } else {
                0
            },
            is_loading: inner.state.is_loading,
            loading_started: inner.state.loading_started,
            app_name: None,
        }
    }

    fn transition(
        &self,
        source: UpdateSource,
        mutate: impl FnOnce(&mut StoreInner),
        compose_override: Option<crate::routes::RouteTitleFn>,
    ) {
        self.ensure_live();

        let event = {
            let mut inner = self.inner.write();
            mutate(&mut inner);

            let formatter = self.formatter.read();
            let parts = Self::parts_from(&inner);
            let candidate = match &compose_override {
                Some(compose) => compose(&parts, formatter.config()),
                None => formatter.format(&parts),
            };

            // Idempotence: identical recomposition is a complete no-op.
            if candidate == inner.state.current_title {
                return;
            }

            let from = std::mem::replace(&mut inner.state.current_title, candidate);
            inner.state.base_title = formatter.format_base(&parts);
            inner.state.last_update_ms = self.clock.millis_since_epoch();

            TitleUpdateEvent {
                from,
                to: inner.state.current_title.clone(),
                timestamp: DateTime::<Utc>::from(self.clock.system_time()),
                source,
            }
        };

        // Degrade gracefully: a failed write leaves in-memory state
        // correct; the writer has already logged the warning.
        let _ = self.writer.write(&event.to);

        self.notify(&event);
    }

    fn notify(&self, event: &TitleUpdateEvent) {
        // Snapshot the list and drop the guard before invoking anything:
        // a handler that subscribes or unsubscribes reentrantly would
        // otherwise deadlock on the subscriber lock.
        let subscribers: Vec<(SubscriptionToken, TitleSubscriber)> = self
            .subscribers
            .read()
            .iter()
            .map(|(token, handler)| (*token, Arc::clone(handler)))
            .collect();

        for (token, handler) in subscribers {
            // Isolate each subscriber: one panicking handler must neither
            // skip the rest nor corrupt store state.
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(event)));
            if outcome.is_err() {
                warn!(token = %token.0, "title subscriber panicked during notification");
            }
        }
    }
}
