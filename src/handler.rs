use crate::level::Level;
use crate::value::Attr;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A single log call as it reaches a [`Handler`].
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub time: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub attrs: Vec<Attr>,
}

impl Record {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Record {
            time: Utc::now(),
            level,
            message: message.into(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attrs(mut self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        self.attrs.extend(attrs);
        self
    }
}

/// Destination for structured log records.
///
/// Handlers form a derivation tree: `with_attrs` and `with_group` return a
/// new handler that carries the extra context, leaving `self` untouched.
/// [`Logger`](crate::logger::Logger) checks `enabled` before building a
/// record, so `handle` only sees records that passed the threshold.
pub trait Handler: Send + Sync {
    /// Whether records at `level` should be built and handed to `handle`.
    fn enabled(&self, level: Level) -> bool;

    /// Process one record.
    fn handle(&self, record: &Record);

    /// Derive a handler whose records all carry `attrs` in the currently
    /// open group.
    fn with_attrs(&self, attrs: Vec<Attr>) -> Arc<dyn Handler>;

    /// Derive a handler that nests everything that follows under `name`.
    fn with_group(&self, name: &str) -> Arc<dyn Handler>;
}
