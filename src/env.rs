//! Environment variable names used to configure capture from the outside,
//! e.g. to raise the capture threshold on CI without touching test code.
//!
//! These are helpers only; [`HandlerOptions`](crate::capture::HandlerOptions)
//! and [`CaptureConfig`](crate::init::CaptureConfig) can always be built
//! explicitly.

use crate::error::ParseLevelError;
use crate::level::Level;

/// Minimum captured level, e.g. `warn` or `INFO+2`.
pub const LOG_ASSERT_LEVEL_ENV: &str = "LOG_ASSERT_LEVEL";

/// Enables duplicate attribute detection when set to `1`, `true`, `yes` or `on`.
pub const LOG_ASSERT_DETECT_DUPES_ENV: &str = "LOG_ASSERT_DETECT_DUPES";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Level from [`LOG_ASSERT_LEVEL_ENV`], or `default` when unset.
pub fn level_from_env(default: Level) -> Result<Level, ParseLevelError> {
    match std::env::var(LOG_ASSERT_LEVEL_ENV) {
        Ok(value) if !value.trim().is_empty() => value.parse(),
        _ => Ok(default),
    }
}

/// Boolean switch read from `key`; unset means `false`.
pub fn flag_from_env(key: &str) -> bool {
    matches!(
        env_or(key, "").trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_when_unset() {
        assert_eq!(env_or("LOG_ASSERT_TEST_SURELY_UNSET", "fallback"), "fallback");
    }

    #[test]
    fn flags_accept_common_spellings() {
        std::env::set_var("LOG_ASSERT_TEST_FLAG_ON", " Yes ");
        std::env::set_var("LOG_ASSERT_TEST_FLAG_OFF", "0");
        assert!(flag_from_env("LOG_ASSERT_TEST_FLAG_ON"));
        assert!(!flag_from_env("LOG_ASSERT_TEST_FLAG_OFF"));
        assert!(!flag_from_env("LOG_ASSERT_TEST_FLAG_UNSET"));
    }

    // The only test touching these variables; the process environment is
    // shared by every test thread.
    #[test]
    fn options_read_level_and_dupes_from_the_environment() {
        use crate::capture::HandlerOptions;
        use crate::init::CaptureConfig;

        std::env::remove_var(LOG_ASSERT_LEVEL_ENV);
        std::env::remove_var(LOG_ASSERT_DETECT_DUPES_ENV);
        assert_eq!(level_from_env(Level::DEBUG), Ok(Level::DEBUG));
        let options = HandlerOptions::from_env().unwrap();
        assert_eq!(options.level, Level::DEBUG);
        assert!(!options.detect_dupes);

        std::env::set_var(LOG_ASSERT_LEVEL_ENV, "warn");
        std::env::set_var(LOG_ASSERT_DETECT_DUPES_ENV, "true");
        let options = HandlerOptions::from_env().unwrap();
        assert_eq!(options.level, Level::WARN);
        assert!(options.detect_dupes);

        std::env::set_var(LOG_ASSERT_LEVEL_ENV, "INFO+2");
        let config = CaptureConfig::from_env().unwrap();
        assert_eq!(config.level, Level(2));
        assert!(config.detect_dupes);

        std::env::set_var(LOG_ASSERT_LEVEL_ENV, "loudest");
        assert_eq!(
            level_from_env(Level::DEBUG),
            Err(ParseLevelError::UnknownName("loudest".to_string()))
        );
        assert!(HandlerOptions::from_env().is_err());
        assert!(CaptureConfig::from_env().is_err());

        std::env::remove_var(LOG_ASSERT_LEVEL_ENV);
        std::env::remove_var(LOG_ASSERT_DETECT_DUPES_ENV);
    }
}
