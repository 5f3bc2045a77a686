use crate::capture::{AssertHandler, Root};
use crate::level::Level;
use crate::matcher::{match_attr, MatchOutcome, Matcher};
use crate::record::LogEvent;
use crate::value::Kind;
use crate::INTERNAL_TARGET;
use std::collections::BTreeMap;
use std::panic::Location;

/// A precise description of a captured event.
///
/// `message` is compared for equality; the default empty message only
/// matches events with an empty message. `level: None` accepts any level.
///
/// `attrs` maps flattened keys (see [`encode_key`](crate::key::encode_key))
/// to matchers: an ungrouped key `url` is `"url"`, the same key inside the
/// `request` group is `"request.url"`, and a key that itself contains a dot
/// such as `a.b` is `"a\\.b"`. Every listed key must be present and match.
///
/// With `all_attrs_match` set, the event must not carry any attribute that
/// is not listed.
#[derive(Debug, Clone, Default)]
pub struct MatchSpec {
    pub message: String,
    pub level: Option<Level>,
    pub attrs: BTreeMap<String, Matcher>,
    pub all_attrs_match: bool,
}

impl MatchSpec {
    pub fn new(message: impl Into<String>) -> Self {
        MatchSpec {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    pub fn any_level(mut self) -> Self {
        self.level = None;
        self
    }

    pub fn attr(mut self, key: impl Into<String>, matcher: impl Into<Matcher>) -> Self {
        self.attrs.insert(key.into(), matcher.into());
        self
    }

    pub fn all_attrs_match(mut self) -> Self {
        self.all_attrs_match = true;
        self
    }

    pub fn matches(&self, event: &LogEvent) -> bool {
        let mut invalid = Vec::new();
        let matched = self.evaluate(event, &mut invalid);
        warn_invalid(&invalid);
        matched
    }

    /// Like `matches`, but collects invalid matchers instead of logging
    /// them, so callers holding the buffer lock can report them later.
    fn evaluate(&self, event: &LogEvent, invalid: &mut Vec<InvalidMatch>) -> bool {
        if self.message != event.message {
            return false;
        }
        if let Some(level) = self.level {
            if level != event.level {
                return false;
            }
        }

        for (key, matcher) in &self.attrs {
            let Some(value) = event.attrs.get(key) else {
                return false;
            };
            match match_attr(matcher, value) {
                MatchOutcome::Matched => {}
                MatchOutcome::NotMatched => return false,
                MatchOutcome::InvalidMatcherType { kind, matcher } => {
                    invalid.push(InvalidMatch {
                        key: key.clone(),
                        kind,
                        matcher,
                    });
                    return false;
                }
            }
        }

        !(self.all_attrs_match && self.attrs.len() != event.attrs.len())
    }
}

struct InvalidMatch {
    key: String,
    kind: Kind,
    matcher: &'static str,
}

fn warn_invalid(invalid: &[InvalidMatch]) {
    for InvalidMatch { key, kind, matcher } in invalid {
        tracing::warn!(
            target: INTERNAL_TARGET,
            key = %key,
            kind = %kind,
            matcher = *matcher,
            "matcher cannot be applied to attribute"
        );
    }
}

impl Root {
    /// Remove the events `predicate` accepts and return how many there were.
    ///
    /// With `stop_after_first`, scanning ends at the first match and every
    /// later event is kept without being looked at.
    pub(crate) fn filter<F>(&self, mut predicate: F, stop_after_first: bool) -> usize
    where
        F: FnMut(&LogEvent) -> bool,
    {
        let (matched, kept) = {
            let mut events = self.lock();
            // Decide first, remove after: a panicking predicate leaves the
            // buffer as it was.
            let mut hits = Vec::new();
            for (idx, event) in events.iter().enumerate() {
                if predicate(event) {
                    hits.push(idx);
                    if stop_after_first {
                        break;
                    }
                }
            }

            let mut pending = hits.iter().copied().peekable();
            let mut idx = 0;
            events.retain(|_| {
                let keep = pending.next_if_eq(&idx).is_none();
                idx += 1;
                keep
            });
            (hits.len(), events.len())
        };

        tracing::debug!(
            target: INTERNAL_TARGET,
            matched,
            kept,
            stop_after_first,
            "consumed captured events"
        );
        matched
    }

    /// Dump and fail on anything still buffered.
    pub(crate) fn check_empty(&self, location: &'static Location<'static>) {
        let remaining = self.lock().clone();
        if remaining.is_empty() {
            return;
        }

        let dump: String = remaining.iter().map(|event| event.to_string()).collect();
        self.reporter.dump(&dump);

        if self.reporter.is_failing() {
            // Failing here would hide whatever is already failing the test.
            return;
        }
        self.reporter.fail(
            location,
            &format!("{} unasserted log message(s); see printout above", remaining.len()),
        );
    }
}

impl AssertHandler {
    /// Remove every event `predicate` accepts, or only the first one with
    /// `stop_after_first`, and return the number removed.
    pub fn filter<F>(&self, predicate: F, stop_after_first: bool) -> usize
    where
        F: FnMut(&LogEvent) -> bool,
    {
        self.root.filter(predicate, stop_after_first)
    }

    #[track_caller]
    fn fail_if_none(&self, matches: usize, message: impl FnOnce() -> String) -> usize {
        if matches == 0 {
            self.root.reporter.fail(Location::caller(), &message());
        }
        matches
    }

    /// Assert that nothing is left unasserted.
    ///
    /// Remaining events are printed to stderr before the failure. When the
    /// test is already failing, they are printed but no second failure is
    /// raised.
    #[track_caller]
    pub fn assert_empty(&self) {
        self.root.check_empty(Location::caller());
    }

    /// Consume every event with message `msg`; fails if there is none.
    #[track_caller]
    pub fn assert_some_message(&self, msg: &str) -> usize {
        let matches = self.root.filter(|event| event.message == msg, false);
        self.fail_if_none(matches, || format!("No logs with message {:?} found", msg))
    }

    /// Consume the first event with message `msg`; fails if there is none.
    #[track_caller]
    pub fn assert_message(&self, msg: &str) -> usize {
        let matches = self.root.filter(|event| event.message == msg, true);
        self.fail_if_none(matches, || format!("No logs with message {:?} found", msg))
    }

    /// Consume every event with message `msg` at `level`.
    #[track_caller]
    pub fn assert_some_message_level(&self, msg: &str, level: Level) -> usize {
        let matches = self
            .root
            .filter(|event| event.message == msg && event.level == level, false);
        self.fail_if_none(matches, || {
            format!("No logs with message {:?} and level {} found", msg, level)
        })
    }

    /// Consume the first event with message `msg` at `level`.
    #[track_caller]
    pub fn assert_message_level(&self, msg: &str, level: Level) -> usize {
        let matches = self
            .root
            .filter(|event| event.message == msg && event.level == level, true);
        self.fail_if_none(matches, || {
            format!("No logs with message {:?} and level {} found", msg, level)
        })
    }

    /// Consume the first event matching `spec`.
    #[track_caller]
    pub fn assert_precise(&self, spec: &MatchSpec) -> usize {
        let mut invalid = Vec::new();
        let matches = self.root.filter(|event| spec.evaluate(event, &mut invalid), true);
        warn_invalid(&invalid);
        self.fail_if_none(matches, || format!("No logs matching {:?} were found", spec))
    }

    /// Consume every event matching `spec`.
    #[track_caller]
    pub fn assert_some_precise(&self, spec: &MatchSpec) -> usize {
        let mut invalid = Vec::new();
        let matches = self.root.filter(|event| spec.evaluate(event, &mut invalid), false);
        warn_invalid(&invalid);
        self.fail_if_none(matches, || format!("No logs matching {:?} were found", spec))
    }

    /// Drop everything captured so far.
    pub fn reset(&self) {
        self.root.lock().clear();
    }

    /// Copy of the events not consumed yet, oldest first.
    pub fn unasserted(&self) -> Vec<LogEvent> {
        self.root.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.root.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::HandlerOptions;
    use crate::report::RecordingReporter;
    use crate::value::Attr;
    use std::sync::Arc;

    fn handler_with_reporter() -> (AssertHandler, Arc<RecordingReporter>) {
        let reporter = Arc::new(RecordingReporter::new());
        let handler = AssertHandler::new(
            HandlerOptions::default()
                .with_level(Level::WARN)
                .with_reporter(reporter.clone())
                .without_cleanup(),
        );
        (handler, reporter)
    }

    #[test]
    fn stop_after_first_leaves_later_events_untouched() {
        let (handler, _) = handler_with_reporter();
        let log = handler.logger();
        log.warn("a", []);
        log.warn("b", []);
        log.warn("a", []);

        let mut seen = Vec::new();
        let matched = handler.filter(
            |event| {
                seen.push(event.message.clone());
                event.message == "a"
            },
            true,
        );
        assert_eq!(matched, 1);
        assert_eq!(seen, ["a"]);

        let left: Vec<_> = handler.unasserted().into_iter().map(|e| e.message).collect();
        assert_eq!(left, ["b", "a"]);
    }

    #[test]
    fn failures_go_to_the_reporter_with_the_call_site() {
        let (handler, reporter) = handler_with_reporter();
        assert_eq!(handler.assert_message("missing"), 0);
        assert_eq!(handler.assert_some_precise(&MatchSpec::new("missing")), 0);

        let failures = reporter.failures();
        assert_eq!(failures.len(), 2);
        assert!(failures[0].contains("assertions.rs"));
        assert!(failures[0].contains("No logs with message \"missing\" found"));
    }

    #[test]
    fn message_level_assertions_check_both() {
        let (handler, reporter) = handler_with_reporter();
        let log = handler.logger();
        log.warn("m", []);
        log.error("m", []);
        log.error("m", []);

        assert_eq!(handler.assert_message_level("m", Level::ERROR), 1);
        assert_eq!(handler.assert_some_message_level("m", Level::WARN), 1);
        assert_eq!(handler.assert_some_message_level("m", Level::ERROR), 1);
        assert_eq!(handler.assert_some_message_level("m", Level::ERROR), 0);
        assert_eq!(reporter.failures().len(), 1);
        assert!(handler.is_empty());
    }

    #[test]
    fn match_spec_checks_level_and_exact_attribute_count() {
        let (handler, _) = handler_with_reporter();
        handler.logger().warn("m", [Attr::new("a", 1), Attr::new("b", 2)]);
        let event = handler.unasserted().remove(0);

        assert!(MatchSpec::new("m").matches(&event));
        assert!(MatchSpec::new("m").level(Level::WARN).attr("a", 1).matches(&event));
        assert!(!MatchSpec::new("m").level(Level::ERROR).matches(&event));
        assert!(!MatchSpec::new("m").attr("a", 1).all_attrs_match().matches(&event));
        assert!(MatchSpec::new("m").attr("a", 1).attr("b", 2).all_attrs_match().matches(&event));
        assert!(!MatchSpec::new("m").attr("c", 1).matches(&event));
        assert!(!MatchSpec::new("").matches(&event));
    }

    #[test]
    fn invalid_matchers_never_match() {
        let (handler, reporter) = handler_with_reporter();
        handler.logger().warn("m", [Attr::new("flag", true)]);

        assert_eq!(handler.assert_precise(&MatchSpec::new("m").attr("flag", "true")), 0);
        assert_eq!(reporter.failures().len(), 1);
        assert_eq!(handler.len(), 1);
        handler.reset();
    }

    #[test]
    fn assert_empty_dumps_every_leftover_event() {
        let (handler, reporter) = handler_with_reporter();
        handler.assert_empty();
        assert!(reporter.dumps().is_empty());

        let log = handler.logger();
        log.warn("first", [Attr::new("a", 1)]);
        log.with_group("g").error("second", [Attr::new("b", true)]);
        handler.assert_empty();

        let dumps = reporter.dumps();
        assert_eq!(dumps.len(), 1);
        let dump = &dumps[0];
        for expected in [
            "message:    first",
            "level:      WARN",
            "  a -> (Int64) 1",
            "message:    second",
            "level:      ERROR",
            "  g.b -> (Bool) true",
        ] {
            assert!(dump.contains(expected), "{:?} missing from dump", expected);
        }
        assert_eq!(dump.matches("stack trace:").count(), 2);
        for event in handler.unasserted() {
            assert!(dump.contains(&event.stacktrace));
        }
        assert_eq!(reporter.failures().len(), 1);
        handler.reset();
    }

    #[test]
    fn buffer_survives_a_panicking_predicate() {
        let (handler, _) = handler_with_reporter();
        handler.logger().warn("kept", []);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            handler.filter(|_| panic!("predicate failed"), false)
        }));
        assert!(result.is_err());

        assert_eq!(handler.len(), 1);
        assert_eq!(handler.assert_message("kept"), 1);
    }

    #[test]
    fn assert_empty_reports_once_per_call() {
        let (handler, reporter) = handler_with_reporter();
        handler.assert_empty();
        assert!(reporter.failures().is_empty());

        handler.logger().warn("left over", []);
        handler.assert_empty();
        let failures = reporter.failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("1 unasserted log message(s)"));
        handler.reset();
    }
}
