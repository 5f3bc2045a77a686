use crate::level::Level;
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A captured log event waiting to be asserted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    pub message: String,
    pub level: Level,
    pub time: DateTime<Utc>,
    /// Backtrace of the logging call, captured when the event was recorded.
    pub stacktrace: String,
    /// Attribute values keyed by their flattened group path; see
    /// [`encode_key`](crate::key::encode_key).
    pub attrs: BTreeMap<String, Value>,
}

/// The diagnostic block printed for events nobody asserted.
impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--------")?;
        writeln!(f, "message:    {}", self.message)?;
        writeln!(f, "level:      {}", self.level)?;
        writeln!(f, "attributes:")?;
        for (key, value) in &self.attrs {
            writeln!(f, "  {} -> ({}) {}", key, value.kind(), value)?;
        }
        writeln!(f)?;
        writeln!(f, "stack trace:")?;
        writeln!(f, "{}", self.stacktrace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_lists_sorted_attributes_with_kinds() {
        let mut attrs = BTreeMap::new();
        attrs.insert("zeta".to_string(), Value::from(true));
        attrs.insert("req.status".to_string(), Value::from(200));
        let event = LogEvent {
            message: "request done".to_string(),
            level: Level::WARN,
            time: Utc::now(),
            stacktrace: "frame 0".to_string(),
            attrs,
        };

        let dump = event.to_string();
        assert!(dump.contains("message:    request done\n"));
        assert!(dump.contains("level:      WARN\n"));
        assert!(dump.contains("stack trace:\nframe 0\n"));
        let status = dump.find("  req.status -> (Int64) 200").unwrap();
        let zeta = dump.find("  zeta -> (Bool) true").unwrap();
        assert!(status < zeta);
    }
}
