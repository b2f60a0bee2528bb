//! Test doubles shared by unit and integration tests.
//!
//! Nothing here is compiled out in release builds; downstream crates use
//! these doubles in their own test suites, the same way the engine's own
//! integration tests do.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::store::TitleUpdateEvent;
use crate::writer::HostWindow;

/// In-memory [`HostWindow`] with controllable failure modes.
///
/// Three factory shapes cover the hosts the writer has to survive:
/// [`healthy`](Self::healthy) round-trips everything,
/// [`head_only`](Self::head_only) silently drops direct title writes but
/// keeps a working head element, and [`dead`](Self::dead) drops both.
pub struct MockWindow {
    user_agent: String,
    title: Mutex<String>,
    head_title: Mutex<Option<String>>,
    direct_writes_work: AtomicBool,
    head_writes_work: bool,
}

impl MockWindow {
    /// A host where every write surface round-trips.
    pub fn healthy<S: Into<String>>(user_agent: S) -> Self {
        Self::with_modes(user_agent, true, true)
    }

    /// A host that silently ignores direct title assignment but has a
    /// usable head title element.
    pub fn head_only<S: Into<String>>(user_agent: S) -> Self {
        Self::with_modes(user_agent, false, true)
    }

    /// A host where no write surface works at all.
    pub fn dead<S: Into<String>>(user_agent: S) -> Self {
        Self::with_modes(user_agent, false, false)
    }

    fn with_modes<S: Into<String>>(
        user_agent: S,
        direct_writes_work: bool,
        head_writes_work: bool,
    ) -> Self {
        Self {
            user_agent: user_agent.into(),
            title: Mutex::new(String::new()),
            head_title: Mutex::new(None),
            direct_writes_work: AtomicBool::new(direct_writes_work),
            head_writes_work,
        }
    }

    /// Flip a previously healthy host into ignoring direct title writes,
    /// simulating a host regression after capability detection ran.
    pub fn break_direct_writes(&self) {
        self.direct_writes_work.store(false, Ordering::SeqCst);
    }
}

impl HostWindow for MockWindow {
    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn title(&self) -> String {
        self.title.lock().clone()
    }

    fn set_title(&self, title: &str) {
        if self.direct_writes_work.load(Ordering::SeqCst) {
            *self.title.lock() = title.to_string();
        }
    }

    fn head_title_text(&self) -> Option<String> {
        self.head_title.lock().clone()
    }

    fn set_head_title_text(&self, text: &str) -> bool {
        if !self.head_writes_work {
            return false;
        }
        *self.head_title.lock() = Some(text.to_string());
        true
    }
}

/// Collects [`TitleUpdateEvent`]s from a store subscription.
///
/// Clone-cheap; the handler returned by [`handler`](Self::handler) shares
/// the same backing log, so tests can keep the log and hand the closure
/// to [`subscribe`](crate::store::TitleStore::subscribe).
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<TitleUpdateEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A subscriber closure that appends every event to this log.
    pub fn handler(&self) -> impl Fn(&TitleUpdateEvent) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |event: &TitleUpdateEvent| events.lock().push(event.clone())
    }

    /// Snapshot of all recorded events, in delivery order.
    pub fn events(&self) -> Vec<TitleUpdateEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_window_round_trips_both_surfaces() {
        let window = MockWindow::healthy("test-agent");
        window.set_title("Hello");
        assert_eq!(window.title(), "Hello");
        assert!(window.set_head_title_text("Hello"));
        assert_eq!(window.head_title_text().as_deref(), Some("Hello"));
    }

    #[test]
    fn head_only_window_drops_direct_writes() {
        let window = MockWindow::head_only("test-agent");
        window.set_title("Hello");
        assert_eq!(window.title(), "");
        assert!(window.set_head_title_text("Hello"));
    }

    #[test]
    fn dead_window_drops_everything() {
        let window = MockWindow::dead("test-agent");
        window.set_title("Hello");
        assert_eq!(window.title(), "");
        assert!(!window.set_head_title_text("Hello"));
        assert_eq!(window.head_title_text(), None);
    }

    #[test]
    fn broken_window_stops_accepting_direct_writes() {
        let window = MockWindow::healthy("test-agent");
        window.set_title("Before");
        window.break_direct_writes();
        window.set_title("After");
        assert_eq!(window.title(), "Before");
    }
}
