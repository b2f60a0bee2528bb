//! Write path from engine state to the host window title.
//!
//! Some runtimes accept a title assignment and silently drop it, so a
//! plain property write is not enough. [`CompatibilityWriter`] probes the
//! host once (cached), takes the direct path on well-behaved runtimes, and
//! otherwise walks a ranked list of [`TitleWriter`] strategies until one
//! round-trips.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{TitleError, TitleResult};

/// Marker written and read back during the empirical capability probe.
const PROBE_TITLE: &str = "__linke_title_probe__";

static UA_VERSION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(firefox|edg|opr|chrome|version)/(\d+)")
        .expect("UA version regex should compile - this is a bug")
});

/// Host window abstraction.
///
/// Production wires the real window bridge here; tests use the mocks in
/// [`crate::testing`]. All methods take `&self`; hosts are expected to use
/// interior mutability, as a real window object would.
pub trait HostWindow: Send + Sync {
    /// The host's user-agent string.
    fn user_agent(&self) -> String;

    /// Read the current window title.
    fn title(&self) -> String;

    /// Assign the window title property. May be silently ignored by
    /// broken hosts.
    fn set_title(&self, title: &str);

    /// Whether the host allows intercepting the title property.
    fn supports_title_interception(&self) -> bool {
        true
    }

    /// Text of the dedicated title element in the document head, if any.
    fn head_title_text(&self) -> Option<String> {
        None
    }

    /// Locate or create the head title element and set its text.
    /// Returns false when the host has no usable document head.
    fn set_head_title_text(&self, _text: &str) -> bool {
        false
    }
}

/// Browser family identified from the user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrowserFamily {
    Chrome,
    Firefox,
    Safari,
    Edge,
    Opera,
    Unknown,
}

impl fmt::Display for BrowserFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Chrome => "Chrome",
            Self::Firefox => "Firefox",
            Self::Safari => "Safari",
            Self::Edge => "Edge",
            Self::Opera => "Opera",
            Self::Unknown => "Unknown",
        };
        write!(f, "{name}")
    }
}

/// Cached result of one-time capability detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// Browser family from the user agent.
    pub family: BrowserFamily,
    /// Major version, when the user agent carries one.
    pub major_version: Option<u32>,
    /// Whether a direct title assignment round-trips on this host.
    pub direct_write_supported: bool,
}

/// Method that ultimately delivered a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteMethod {
    /// Plain property assignment.
    Direct,
    /// Caller-supplied custom writer.
    Custom,
    /// Dedicated title element in the document head.
    HeadElement,
}

impl fmt::Display for WriteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Custom => write!(f, "custom"),
            Self::HeadElement => write!(f, "head-element"),
        }
    }
}

/// One candidate write strategy.
pub trait TitleWriter: Send + Sync {
    /// Method tag for logging and reporting.
    fn method(&self) -> WriteMethod;

    /// Attempt the write; true only when the result round-trips.
    fn write(&self, host: &dyn HostWindow, title: &str) -> bool;
}

/// Direct property assignment, verified by reading the title back.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectWriter;

impl TitleWriter for DirectWriter {
    fn method(&self) -> WriteMethod {
        WriteMethod::Direct
    }

    fn write(&self, host: &dyn HostWindow, title: &str) -> bool {
        host.set_title(title);
        host.title() == title
    }
}

/// Locates or creates the head title element and sets its text.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadElementWriter;

impl TitleWriter for HeadElementWriter {
    fn method(&self) -> WriteMethod {
        WriteMethod::HeadElement
    }

    fn write(&self, host: &dyn HostWindow, title: &str) -> bool {
        host.set_head_title_text(title) && host.head_title_text().as_deref() == Some(title)
    }
}

/// Caller-supplied write function, tried before the built-in strategies.
pub struct CustomWriter {
    write_fn: Box<dyn Fn(&dyn HostWindow, &str) -> bool + Send + Sync>,
}

impl CustomWriter {
    /// Wrap a custom write function; it must report round-trip success.
    pub fn new<F>(write_fn: F) -> Self
    where
        F: Fn(&dyn HostWindow, &str) -> bool + Send + Sync + 'static,
    {
        Self { write_fn: Box::new(write_fn) }
    }
}

impl TitleWriter for CustomWriter {
    fn method(&self) -> WriteMethod {
        WriteMethod::Custom
    }

    fn write(&self, host: &dyn HostWindow, title: &str) -> bool {
        (self.write_fn)(host, title)
    }
}

/// Capability-detecting writer with a ranked fallback chain.
pub struct CompatibilityWriter {
    host: Arc<dyn HostWindow>,
    capability: RwLock<Option<Capability>>,
    custom: Option<CustomWriter>,
    installed: RwLock<bool>,
}

impl fmt::Debug for CompatibilityWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompatibilityWriter")
            .field("capability", &*self.capability.read())
            .field("has_custom", &self.custom.is_some())
            .field("installed", &*self.installed.read())
            .finish()
    }
}

impl CompatibilityWriter {
    /// Create a writer over a host window.
    pub fn new(host: Arc<dyn HostWindow>) -> Self {
        Self { host, capability: RwLock::new(None), custom: None, installed: RwLock::new(false) }
    }

    /// Create a writer with a caller-supplied custom strategy, tried first
    /// in the fallback chain.
    pub fn with_custom_writer<F>(host: Arc<dyn HostWindow>, write_fn: F) -> Self
    where
        F: Fn(&dyn HostWindow, &str) -> bool + Send + Sync + 'static,
    {
        Self {
            host,
            capability: RwLock::new(None),
            custom: Some(CustomWriter::new(write_fn)),
            installed: RwLock::new(false),
        }
    }

    /// Capability of the host, probing once and caching the result.
    pub fn capability(&self) -> Capability {
        if let Some(cached) = self.capability.read().clone() {
            return cached;
        }
        let detected = self.detect();
        *self.capability.write() = Some(detected.clone());
        detected
    }

    /// Whether the fallback interception is currently installed.
    pub fn is_installed(&self) -> bool {
        *self.installed.read()
    }

    /// Write `title` to the host, trying the direct path first and then
    /// the fallback chain.
    ///
    /// Failure is reported, not thrown upward as fatal: the caller keeps
    /// its in-memory state correct and logs the stale visible title.
    pub fn write(&self, title: &str) -> TitleResult<WriteMethod> {
        let capability = self.capability();

        if capability.direct_write_supported {
            if DirectWriter.write(self.host.as_ref(), title) {
                return Ok(WriteMethod::Direct);
            }
            // The probe said direct writes work; treat this as a host
            // regression and fall through to the chain.
            debug!(family = %capability.family, "direct write stopped round-tripping");
        }

        self.install();

        let mut attempts = 0usize;
        for writer in self.chain() {
            attempts += 1;
            if writer.write(self.host.as_ref(), title) {
                debug!(method = %writer.method(), "title written via fallback chain");
                return Ok(writer.method());
            }
        }

        warn!(
            family = %capability.family,
            attempts,
            title_length = title.chars().count(),
            "all title write strategies failed; visible title may be stale"
        );
        Err(TitleError::WriteFailed {
            attempts,
            message: "no write strategy round-tripped".to_string(),
        })
    }

    /// Tear down the interception and forget cached detection state.
    ///
    /// The next write re-runs detection instead of trusting stale results;
    /// tests and hot-reload paths rely on this.
    pub fn cleanup(&self) {
        *self.installed.write() = false;
        *self.capability.write() = None;
        debug!("compatibility writer cleaned up");
    }

    /// Uninstall and immediately re-run detection.
    pub fn reinstall(&self) -> Capability {
        self.cleanup();
        self.capability()
    }

    fn chain(&self) -> impl Iterator<Item = &dyn TitleWriter> {
        let custom = self.custom.as_ref().map(|c| c as &dyn TitleWriter);
        custom
            .into_iter()
            .chain([&DirectWriter as &dyn TitleWriter, &HeadElementWriter as &dyn TitleWriter])
    }

    fn install(&self) {
        let mut installed = self.installed.write();
        if !*installed && self.host.supports_title_interception() {
            *installed = true;
            debug!("installed title write interception");
        }
    }

    fn detect(&self) -> Capability {
        let user_agent = self.host.user_agent();
        let (family, major_version) = parse_user_agent(&user_agent);

        // Empirical probe: set a marker, read it back, restore.
        let original = self.host.title();
        self.host.set_title(PROBE_TITLE);
        let direct_write_supported = self.host.title() == PROBE_TITLE;
        self.host.set_title(&original);

        debug!(%family, ?major_version, direct_write_supported, "capability detection complete");
        Capability { family, major_version, direct_write_supported }
    }
}

/// Identify browser family and major version from a user-agent string.
pub fn parse_user_agent(user_agent: &str) -> (BrowserFamily, Option<u32>) {
    let lowered = user_agent.to_lowercase();
    let family = if lowered.contains("edg/") || lowered.contains("edge/") {
        BrowserFamily::Edge
    } else if lowered.contains("opr/") || lowered.contains("opera") {
        BrowserFamily::Opera
    } else if lowered.contains("firefox/") {
        BrowserFamily::Firefox
    } else if lowered.contains("chrome/") {
        BrowserFamily::Chrome
    } else if lowered.contains("safari/") {
        BrowserFamily::Safari
    } else {
        BrowserFamily::Unknown
    };

    let version = match family {
        BrowserFamily::Unknown => None,
        _ => UA_VERSION_REGEX.captures_iter(user_agent).find_map(|caps| {
            let product = caps.get(1)?.as_str().to_lowercase();
            let matches_family = match family {
                BrowserFamily::Edge => product == "edg",
                BrowserFamily::Opera => product == "opr",
                BrowserFamily::Firefox => product == "firefox",
                BrowserFamily::Chrome => product == "chrome",
                BrowserFamily::Safari => product == "version",
                BrowserFamily::Unknown => false,
            };
            if matches_family {
                caps.get(2)?.as_str().parse().ok()
            } else {
                None
            }
        }),
    };

    (family, version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockWindow;

    const CHROME_UA: &str =
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/126.0.0.0 Safari/537.36";
    const FIREFOX_UA: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
    const SAFARI_UA: &str =
        "Mozilla/5.0 (Macintosh) AppleWebKit/605.1.15 Version/17.4 Safari/605.1.15";
    const EDGE_UA: &str =
        "Mozilla/5.0 (Windows NT 10.0) AppleWebKit/537.36 Chrome/126.0.0.0 Safari/537.36 Edg/126.0.2592.87";

    #[test]
    fn user_agent_families_and_versions_parse() {
        assert_eq!(parse_user_agent(CHROME_UA), (BrowserFamily::Chrome, Some(126)));
        assert_eq!(parse_user_agent(FIREFOX_UA), (BrowserFamily::Firefox, Some(128)));
        assert_eq!(parse_user_agent(SAFARI_UA), (BrowserFamily::Safari, Some(17)));
        assert_eq!(parse_user_agent(EDGE_UA), (BrowserFamily::Edge, Some(126)));
        assert_eq!(parse_user_agent("curl/8.0").0, BrowserFamily::Unknown);
    }

    #[test]
    fn healthy_host_takes_direct_path() {
        let host = Arc::new(MockWindow::healthy(CHROME_UA));
        let writer = CompatibilityWriter::new(host.clone());

        assert_eq!(writer.write("Dashboard").expect("write ok"), WriteMethod::Direct);
        assert_eq!(host.title(), "Dashboard");
        assert!(writer.capability().direct_write_supported);
        assert!(!writer.is_installed());
    }

    #[test]
    fn probe_restores_original_title() {
        let host = Arc::new(MockWindow::healthy(CHROME_UA));
        host.set_title("Before");
        let writer = CompatibilityWriter::new(host.clone());

        let _ = writer.capability();
        assert_eq!(host.title(), "Before");
    }

    #[test]
    fn broken_direct_write_falls_back_to_head_element() {
        let host = Arc::new(MockWindow::head_only(SAFARI_UA));
        let writer = CompatibilityWriter::new(host.clone());

        assert_eq!(writer.write("Orders").expect("write ok"), WriteMethod::HeadElement);
        assert_eq!(host.head_title_text().as_deref(), Some("Orders"));
        assert!(writer.is_installed());
    }

    #[test]
    fn custom_writer_is_tried_first_in_the_chain() {
        let host = Arc::new(MockWindow::head_only(SAFARI_UA));
        let writer = CompatibilityWriter::with_custom_writer(host.clone(), |window, title| {
            window.set_head_title_text(&format!("custom:{title}"))
        });

        assert_eq!(writer.write("Inbox").expect("write ok"), WriteMethod::Custom);
        assert_eq!(host.head_title_text().as_deref(), Some("custom:Inbox"));
    }

    #[test]
    fn exhausted_chain_reports_without_panicking() {
        let host = Arc::new(MockWindow::dead(FIREFOX_UA));
        let writer = CompatibilityWriter::new(host);

        let err = writer.write("Anything").expect_err("all strategies fail");
        assert!(matches!(err, TitleError::WriteFailed { attempts: 2, .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn detection_is_cached_until_cleanup() {
        let host = Arc::new(MockWindow::healthy(CHROME_UA));
        let writer = CompatibilityWriter::new(host.clone());

        let first = writer.capability();
        host.break_direct_writes();
        // Cached: still reports the old capability.
        assert_eq!(writer.capability(), first);

        writer.cleanup();
        assert!(!writer.capability().direct_write_supported);
    }

    #[test]
    fn reinstall_reprobes_immediately() {
        let host = Arc::new(MockWindow::healthy(CHROME_UA));
        let writer = CompatibilityWriter::new(host.clone());
        assert!(writer.capability().direct_write_supported);

        host.break_direct_writes();
        let capability = writer.reinstall();
        assert!(!capability.direct_write_supported);
    }
}
