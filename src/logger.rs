use crate::handler::{Handler, Record};
use crate::level::Level;
use crate::value::Attr;
use std::fmt;
use std::sync::Arc;

/// Front end for a [`Handler`].
///
/// ```
/// use tracing_log_assert::{AssertHandler, Attr, HandlerOptions, Level};
///
/// let handler = AssertHandler::new(HandlerOptions::default().with_level(Level::WARN));
/// let log = handler.logger().with_group("req").with([Attr::new("id", 7)]);
/// log.warn("slow request", [Attr::new("ms", 1200)]);
///
/// handler.assert_message("slow request");
/// ```
#[derive(Clone)]
pub struct Logger {
    handler: Arc<dyn Handler>,
}

impl Logger {
    pub fn new<H: Handler + 'static>(handler: H) -> Self {
        Logger {
            handler: Arc::new(handler),
        }
    }

    pub fn from_handler(handler: Arc<dyn Handler>) -> Self {
        Logger { handler }
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.handler.enabled(level)
    }

    /// A logger whose records all carry `attrs`.
    pub fn with(&self, attrs: impl IntoIterator<Item = Attr>) -> Logger {
        let attrs: Vec<Attr> = attrs.into_iter().collect();
        if attrs.is_empty() {
            return self.clone();
        }
        Logger {
            handler: self.handler.with_attrs(attrs),
        }
    }

    /// A logger that nests all later attributes under `name`.
    pub fn with_group(&self, name: &str) -> Logger {
        if name.is_empty() {
            return self.clone();
        }
        Logger {
            handler: self.handler.with_group(name),
        }
    }

    pub fn log(&self, level: Level, message: &str, attrs: impl IntoIterator<Item = Attr>) {
        if !self.handler.enabled(level) {
            return;
        }
        let record = Record::new(level, message).with_attrs(attrs);
        self.handler.handle(&record);
    }

    pub fn debug(&self, message: &str, attrs: impl IntoIterator<Item = Attr>) {
        self.log(Level::DEBUG, message, attrs)
    }

    pub fn info(&self, message: &str, attrs: impl IntoIterator<Item = Attr>) {
        self.log(Level::INFO, message, attrs)
    }

    pub fn warn(&self, message: &str, attrs: impl IntoIterator<Item = Attr>) {
        self.log(Level::WARN, message, attrs)
    }

    pub fn error(&self, message: &str, attrs: impl IntoIterator<Item = Attr>) {
        self.log(Level::ERROR, message, attrs)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}
