//! Capture structured log events in tests and assert on them.
//!
//! An [`AssertHandler`] records every log event it receives into a buffer.
//! Tests then consume events with assertions such as
//! [`assert_message`](AssertHandler::assert_message) or
//! [`assert_precise`](AssertHandler::assert_precise), and finally check with
//! [`assert_empty`](AssertHandler::assert_empty) that nothing was left
//! unaccounted for. By default that last check runs automatically when
//! the handler is dropped.
//!
//! ```
//! use tracing_log_assert::{AssertHandler, Attr, HandlerOptions, Level, MatchSpec};
//!
//! let handler = AssertHandler::new(HandlerOptions::default().with_level(Level::WARN));
//! let log = handler.logger().with_group("req");
//!
//! log.warn("slow request", [Attr::new("status", 200)]);
//!
//! handler.assert_precise(
//!     &MatchSpec::new("slow request")
//!         .level(Level::WARN)
//!         .attr("req.status", 200)
//!         .all_attrs_match(),
//! );
//! ```
//!
//! Code instrumented with `tracing` is captured through [`AssertLayer`],
//! or with [`init_capture`] for the current thread.

pub mod assertions;
pub mod capture;
pub mod env;
pub mod error;
pub mod handler;
pub mod init;
pub mod key;
pub mod layer;
pub mod level;
pub mod logger;
pub mod matcher;
pub mod null_handler;
pub mod record;
pub mod report;
pub mod tree;
pub mod value;

pub use assertions::MatchSpec;
pub use capture::{AssertHandler, HandlerOptions};
pub use error::{ConfigError, ParseLevelError};
pub use handler::{Handler, Record};
pub use init::{init_capture, init_capture_with_config, CaptureConfig, CaptureGuard};
pub use key::{decode_key, encode_key};
pub use layer::AssertLayer;
pub use level::{Level, LEVEL_DONT_CARE};
pub use logger::Logger;
pub use matcher::{match_attr, Literal, MatchOutcome, Matcher, TypedPredicate};
pub use null_handler::{null_logger, NullHandler};
pub use record::LogEvent;
pub use report::{PanicReporter, RecordingReporter, Reporter};
pub use value::{AnyValue, Attr, FnValuer, Kind, LogValuer, Value};

/// Target of the crate's own diagnostics. [`AssertLayer`] never captures
/// events with this target.
pub const INTERNAL_TARGET: &str = "tracing_log_assert::internal";
