use crate::env::{flag_from_env, level_from_env, LOG_ASSERT_DETECT_DUPES_ENV};
use crate::error::{ConfigError, ParseLevelError};
use crate::handler::{Handler, Record};
use crate::level::Level;
use crate::logger::Logger;
use crate::record::LogEvent;
use crate::report::{PanicReporter, Reporter};
use crate::tree::{flatten_attr, GroupedAttrs};
use crate::value::Attr;
use std::backtrace::Backtrace;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::panic::Location;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Configuration for [`AssertHandler`].
///
/// **Fields**
/// - `level`: minimum level a record needs to be captured.
/// - `detect_dupes`: reject attribute sets whose flattened keys are
///   already present on the handler (see [`AssertHandler::try_with_attrs`]).
/// - `assert_empty_on_drop`: run [`AssertHandler::assert_empty`] when the
///   last handler sharing the buffer is dropped.
/// - `wrapped`: handler that every captured record is forwarded to as well.
/// - `reporter`: how assertion failures are reported.
#[derive(Clone)]
pub struct HandlerOptions {
    pub level: Level,
    pub detect_dupes: bool,
    pub assert_empty_on_drop: bool,
    pub wrapped: Option<Arc<dyn Handler>>,
    pub reporter: Arc<dyn Reporter>,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            detect_dupes: false,
            assert_empty_on_drop: true,
            wrapped: None,
            reporter: Arc::new(PanicReporter),
        }
    }
}

impl HandlerOptions {
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

    pub fn with_detect_dupes(mut self) -> Self {
        self.detect_dupes = true;
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

    pub fn without_cleanup(mut self) -> Self {
        self.assert_empty_on_drop = false;
        self
    }
}

/// Buffer shared by every handler derived from one [`AssertHandler::new`].
pub(crate) struct Root {
    events: Mutex<Vec<LogEvent>>,
    pub(crate) reporter: Arc<dyn Reporter>,
    assert_empty_on_drop: bool,
    created_at: &'static Location<'static>,
}

impl Root {
    pub(crate) fn lock(&self) -> MutexGuard<'_, Vec<LogEvent>> {
        self.events.lock()
    }

    fn push(&self, event: LogEvent) {
        self.lock().push(event);
    }
}

impl Drop for Root {
    fn drop(&mut self) {
        if self.assert_empty_on_drop {
            self.check_empty(self.created_at);
        }
    }
}

/// Handler that captures records for later assertions.
///
/// Handlers derived with [`with_attrs`](Self::with_attrs) and
/// [`with_group`](Self::with_group) keep their own attributes and group
/// path but record into the buffer of the handler they came from, so
/// assertions can be made through any of them.
#[derive(Clone)]
pub struct AssertHandler {
    pub(crate) root: Arc<Root>,
    level: Level,
    detect_dupes: bool,
    groups: Vec<String>,
    attrs: GroupedAttrs,
    wrapped: Option<Arc<dyn Handler>>,
}

impl AssertHandler {
    /// Create a handler with its own empty buffer.
    ///
    /// Unless `options.assert_empty_on_drop` is off, dropping the last
    /// handler sharing this buffer asserts that it is empty; a failure
    /// points at this call.
    #[track_caller]
    pub fn new(options: HandlerOptions) -> Self {
        let root = Root {
            events: Mutex::new(Vec::new()),
            reporter: options.reporter,
            assert_empty_on_drop: options.assert_empty_on_drop,
            created_at: Location::caller(),
        };
        AssertHandler {
            root: Arc::new(root),
            level: options.level,
            detect_dupes: options.detect_dupes,
            groups: Vec::new(),
            attrs: GroupedAttrs::new(),
            wrapped: options.wrapped,
        }
    }

    /// Like [`new`](Self::new), without the check on drop.
    #[track_caller]
    pub fn without_cleanup(options: HandlerOptions) -> Self {
        Self::new(options.without_cleanup())
    }

    /// A [`Logger`] writing to this handler.
    pub fn logger(&self) -> Logger {
        Logger::new(self.clone())
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Group path new attributes and record attributes are placed under.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    fn child(&self) -> AssertHandler {
        AssertHandler {
            root: Arc::clone(&self.root),
            level: self.level,
            detect_dupes: self.detect_dupes,
            groups: self.groups.clone(),
            attrs: self.attrs.clone(),
            wrapped: self.wrapped.clone(),
        }
    }

    /// Derive a handler that adds `attrs` to every record.
    ///
    /// # Panics
    ///
    /// With duplicate detection on, panics if one of the attributes
    /// collides with a key the handler already carries.
    #[track_caller]
    pub fn with_attrs(&self, attrs: impl IntoIterator<Item = Attr>) -> AssertHandler {
        match self.try_with_attrs(attrs) {
            Ok(handler) => handler,
            Err(e) => panic!("{}", e),
        }
    }

    /// Derive a handler that adds `attrs` to every record, rejecting
    /// duplicate flattened keys when duplicate detection is on.
    pub fn try_with_attrs(
        &self,
        attrs: impl IntoIterator<Item = Attr>,
    ) -> Result<AssertHandler, ConfigError> {
        let attrs: Vec<Attr> = attrs.into_iter().collect();
        if self.detect_dupes {
            self.check_dupes(&attrs)?;
        }

        let mut child = self.child();
        if let Some(wrapped) = &self.wrapped {
            child.wrapped = Some(wrapped.with_attrs(attrs.clone()));
        }
        child.attrs.set(&self.groups, attrs);
        Ok(child)
    }

    fn check_dupes(&self, attrs: &[Attr]) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        self.attrs.traverse(|path, attr| {
            flatten_attr(path, attr, &mut |key, _| {
                seen.insert(key);
            })
        });

        let mut duplicate = None;
        for attr in attrs {
            flatten_attr(&self.groups, attr, &mut |key, _| {
                if duplicate.is_none() && !seen.insert(key.clone()) {
                    duplicate = Some(key);
                }
            });
        }

        match duplicate {
            Some(key) => Err(ConfigError::DuplicateKey { key }),
            None => Ok(()),
        }
    }

    /// Derive a handler that nests later attributes under `name`.
    pub fn with_group(&self, name: &str) -> AssertHandler {
        if name.is_empty() {
            return self.clone();
        }
        let mut child = self.child();
        child.groups.push(name.to_string());
        if let Some(wrapped) = &self.wrapped {
            child.wrapped = Some(wrapped.with_group(name));
        }
        child
    }

    /// Capture `record` together with the attributes this handler carries.
    ///
    /// Level filtering is the caller's job (see [`enabled`](Self::enabled));
    /// every record passed in is stored.
    pub fn handle(&self, record: &Record) {
        let mut attrs = BTreeMap::new();
        self.attrs.flatten_into(&mut attrs);
        for attr in &record.attrs {
            flatten_attr(&self.groups, attr, &mut |key, value| {
                attrs.insert(key, value);
            });
        }

        let event = LogEvent {
            message: record.message.clone(),
            level: record.level,
            time: record.time,
            stacktrace: Backtrace::force_capture().to_string(),
            attrs,
        };
        self.root.push(event);

        if let Some(wrapped) = &self.wrapped {
            wrapped.handle(record);
        }
    }
}

impl Handler for AssertHandler {
    fn enabled(&self, level: Level) -> bool {
        AssertHandler::enabled(self, level)
    }

    fn handle(&self, record: &Record) {
        AssertHandler::handle(self, record)
    }

    #[track_caller]
    fn with_attrs(&self, attrs: Vec<Attr>) -> Arc<dyn Handler> {
        Arc::new(AssertHandler::with_attrs(self, attrs))
    }

    fn with_group(&self, name: &str) -> Arc<dyn Handler> {
        Arc::new(AssertHandler::with_group(self, name))
    }
}

impl fmt::Debug for AssertHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertHandler")
            .field("level", &self.level)
            .field("groups", &self.groups)
            .field("attrs", &self.attrs)
            .field("detect_dupes", &self.detect_dupes)
            .field("wrapped", &self.wrapped.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn quiet() -> HandlerOptions {
        HandlerOptions::default().without_cleanup()
    }

    #[test]
    fn enabled_compares_against_threshold() {
        let handler = AssertHandler::new(quiet().with_level(Level::WARN));
        assert!(!handler.enabled(Level::INFO));
        assert!(handler.enabled(Level::WARN));
        assert!(handler.enabled(Level::ERROR));
    }

    #[test]
    fn handle_does_not_refilter() {
        let handler = AssertHandler::new(quiet().with_level(Level::ERROR));
        handler.handle(&Record::new(Level::DEBUG, "below threshold"));
        assert_eq!(handler.unasserted().len(), 1);
    }

    #[test]
    fn inherited_attributes_keep_their_group() {
        let root = AssertHandler::new(quiet());
        let derived = root
            .with_attrs([Attr::new("test_attr", "value")])
            .with_group("group")
            .with_attrs([Attr::new("test2", "value2")]);
        derived.handle(&Record::new(Level::ERROR, "msg").with_attrs([Attr::new("call", 1)]));

        let events = root.unasserted();
        assert_eq!(events.len(), 1);
        let keys: Vec<_> = events[0].attrs.keys().cloned().collect();
        assert_eq!(keys, ["group.call", "group.test2", "test_attr"]);
    }

    #[test]
    fn siblings_do_not_share_attributes() {
        let root = AssertHandler::new(quiet());
        let base = root.with_group("g");
        let left = base.with_attrs([Attr::new("left", true)]);
        let right = base.with_attrs([Attr::new("right", true)]);

        left.handle(&Record::new(Level::INFO, "left"));
        right.handle(&Record::new(Level::INFO, "right"));
        base.handle(&Record::new(Level::INFO, "base"));

        let events = root.unasserted();
        assert!(events[0].attrs.contains_key("g.left") && !events[0].attrs.contains_key("g.right"));
        assert!(events[1].attrs.contains_key("g.right") && !events[1].attrs.contains_key("g.left"));
        assert!(events[2].attrs.is_empty());
    }

    #[test]
    fn record_attributes_win_over_inherited_ones() {
        let root = AssertHandler::new(quiet());
        let derived = root.with_attrs([Attr::new("k", "inherited")]);
        derived.handle(&Record::new(Level::INFO, "msg").with_attrs([Attr::new("k", "call")]));
        assert_eq!(root.unasserted()[0].attrs["k"], Value::from("call"));
    }

    #[test]
    fn duplicate_detection_rejects_existing_and_batch_keys() {
        let root = AssertHandler::new(quiet().with_detect_dupes());
        let derived = root.with_attrs([Attr::new("test_attr", "a")]);

        assert_eq!(
            derived.try_with_attrs([Attr::new("test_attr", "b")]).unwrap_err(),
            ConfigError::DuplicateKey { key: "test_attr".to_string() }
        );
        assert!(root
            .try_with_attrs([Attr::new("x", 1), Attr::new("x", 2)])
            .is_err());
        // Same key in another group is a different flattened key.
        assert!(derived.with_group("g").try_with_attrs([Attr::new("test_attr", "c")]).is_ok());
    }

    #[test]
    #[should_panic(expected = "duplicate attribute key")]
    fn with_attrs_panics_on_duplicates() {
        let root = AssertHandler::new(quiet().with_detect_dupes());
        let derived = root.with_attrs([Attr::new("test_attr", "a")]);
        let _ = derived.with_attrs([Attr::new("test_attr", "b")]);
    }

    #[test]
    fn duplicates_are_allowed_without_detection() {
        let root = AssertHandler::new(quiet());
        let derived = root.with_attrs([Attr::new("k", 1)]).with_attrs([Attr::new("k", 2)]);
        derived.handle(&Record::new(Level::INFO, "msg"));
        assert_eq!(root.unasserted()[0].attrs.len(), 1);
    }

    #[test]
    fn empty_group_name_is_ignored() {
        let root = AssertHandler::new(quiet());
        let same = root.with_group("");
        assert!(same.groups().is_empty());
    }

    #[test]
    fn events_capture_a_stack_trace() {
        let root = AssertHandler::new(quiet());
        root.handle(&Record::new(Level::INFO, "msg"));
        assert!(!root.unasserted()[0].stacktrace.is_empty());
    }
}
