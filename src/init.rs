use crate::capture::{AssertHandler, HandlerOptions};
use crate::env::{flag_from_env, level_from_env, LOG_ASSERT_DETECT_DUPES_ENV};
use crate::error::ParseLevelError;
use crate::handler::Handler;
use crate::layer::AssertLayer;
use crate::level::Level;
use crate::report::{PanicReporter, Reporter};
use std::ops::Deref;
use std::panic::Location;
use std::sync::Arc;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration for [`init_capture_with_config`].
///
/// **Fields**
/// - `level`: minimum level of captured events.
/// - `assert_empty`: when `true`, dropping the [`CaptureGuard`] asserts
///   that every captured event was consumed.
/// - `detect_dupes`: reject duplicate attribute keys on derived handlers.
/// - `enable_stdout`: also print events through `tracing_subscriber::fmt`,
///   using the test writer so output is shown only for failing tests.
/// - `wrapped`: handler that every captured record is forwarded to.
/// - `reporter`: how assertion failures are reported.
#[derive(Clone)]
pub struct CaptureConfig {
    pub level: Level,
    pub assert_empty: bool,
    pub detect_dupes: bool,
    pub enable_stdout: bool,
    pub wrapped: Option<Arc<dyn Handler>>,
    pub reporter: Arc<dyn Reporter>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            assert_empty: false,
            detect_dupes: false,
            enable_stdout: false,
            wrapped: None,
            reporter: Arc::new(PanicReporter),
        }
    }
}

impl CaptureConfig {
    /// Defaults overridden by `LOG_ASSERT_LEVEL` and
    /// `LOG_ASSERT_DETECT_DUPES`.
    pub fn from_env() -> Result<Self, ParseLevelError> {
        let defaults = Self::default();
        Ok(Self {
            level: level_from_env(defaults.level)?,
            detect_dupes: flag_from_env(LOG_ASSERT_DETECT_DUPES_ENV),
            ..defaults
        })
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_assert_empty(mut self) -> Self {
        self.assert_empty = true;
        self
    }

    pub fn with_detect_dupes(mut self) -> Self {
        self.detect_dupes = true;
        self
    }

    pub fn with_stdout(mut self) -> Self {
        self.enable_stdout = true;
        self
    }

    pub fn with_wrapped(mut self, wrapped: Arc<dyn Handler>) -> Self {
        self.wrapped = Some(wrapped);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }
}

/// Keeps the capturing subscriber installed as the thread's default.
///
/// Dereferences to the [`AssertHandler`] so assertions can be called on
/// the guard directly. Dropping it first runs the end-of-test check when
/// configured, then reinstates the previous default subscriber.
pub struct CaptureGuard {
    handler: AssertHandler,
    assert_empty: bool,
    created_at: &'static Location<'static>,
    // Dropped after `Drop::drop` runs, so the check still sees the
    // capturing subscriber installed.
    _default: DefaultGuard,
}

impl CaptureGuard {
    pub fn handler(&self) -> &AssertHandler {
        &self.handler
    }
}

impl Deref for CaptureGuard {
    type Target = AssertHandler;

    fn deref(&self) -> &AssertHandler {
        &self.handler
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        if self.assert_empty {
            self.handler.root.check_empty(self.created_at);
        }
    }
}

/// Install a subscriber that captures `tracing` events on the current
/// thread until the returned guard is dropped.
///
/// **Effects**
///
/// The previous default subscriber of this thread is restored when the
/// guard is dropped, on every exit path including panics. Events emitted
/// on other threads are not captured; hand them an [`AssertLayer`] or a
/// [`Logger`](crate::logger::Logger) explicitly.
#[track_caller]
pub fn init_capture_with_config(config: CaptureConfig) -> CaptureGuard {
    let created_at = Location::caller();
    let mut options = HandlerOptions::default()
        .with_level(config.level)
        .with_reporter(config.reporter)
        .without_cleanup();
    options.detect_dupes = config.detect_dupes;
    options.wrapped = config.wrapped;

    let handler = AssertHandler::new(options);
    let layer = AssertLayer::new(handler.clone());

    // Same layering in both branches; the fmt layer only changes the
    // subscriber type, which `set_default` erases.
    let default = if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer().with_test_writer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_default(subscriber)
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_default(subscriber)
    };

    CaptureGuard {
        handler,
        assert_empty: config.assert_empty,
        created_at,
        _default: default,
    }
}

/// Capture `tracing` events with [`CaptureConfig::default`].
#[track_caller]
pub fn init_capture() -> CaptureGuard {
    init_capture_with_config(CaptureConfig::default())
}
