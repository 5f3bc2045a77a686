use parking_lot::Mutex;
use std::panic::Location;

/// How failed assertions reach the test harness.
pub trait Reporter: Send + Sync {
    /// Mark the current test as failed. `location` is the assertion's call
    /// site in test code.
    fn fail(&self, location: &'static Location<'static>, message: &str);

    /// Whether the test is already failing for another reason.
    fn is_failing(&self) -> bool {
        std::thread::panicking()
    }

    /// Print the events left over at an empty-buffer check. Goes to stderr
    /// so the harness shows it next to the failing test.
    fn dump(&self, text: &str) {
        eprint!("{}", text);
    }
}

/// Fails the test by panicking, which is what `#[test]` functions expect.
#[derive(Clone, Copy, Debug, Default)]
pub struct PanicReporter;

impl Reporter for PanicReporter {
    fn fail(&self, location: &'static Location<'static>, message: &str) {
        panic!("{}: {}", location, message);
    }
}

/// Collects failures and dumps instead of stopping the test.
///
/// Useful for checking assertion behaviour itself, or for soft assertions
/// that are inspected at the end of a test.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    failures: Mutex<Vec<String>>,
    dumps: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }

    pub fn dumps(&self) -> Vec<String> {
        self.dumps.lock().clone()
    }
}

impl Reporter for RecordingReporter {
    fn fail(&self, location: &'static Location<'static>, message: &str) {
        self.failures.lock().push(format!("{}: {}", location, message));
    }

    fn dump(&self, text: &str) {
        self.dumps.lock().push(text.to_string());
    }
}
