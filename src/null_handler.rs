use crate::handler::{Handler, Record};
use crate::level::Level;
use crate::logger::Logger;
use crate::value::Attr;
use std::sync::Arc;

/// A handler that reports every level as disabled and drops all records.
///
/// Handy for code under test that requires a logger when the test does
/// not care about its output.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullHandler;

impl Handler for NullHandler {
    fn enabled(&self, _level: Level) -> bool {
        false
    }

    fn handle(&self, _record: &Record) {}

    fn with_attrs(&self, _attrs: Vec<Attr>) -> Arc<dyn Handler> {
        Arc::new(*self)
    }

    fn with_group(&self, _name: &str) -> Arc<dyn Handler> {
        Arc::new(*self)
    }
}

/// A [`Logger`] backed by [`NullHandler`].
pub fn null_logger() -> Logger {
    Logger::new(NullHandler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_logger_is_never_enabled() {
        let log = null_logger().with_group("g").with([Attr::new("k", 1)]);
        assert!(!log.enabled(Level::ERROR));
        log.error("dropped", []);
    }
}
