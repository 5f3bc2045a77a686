/// Error returned when an attribute set cannot be attached to a handler.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("duplicate attribute key {key:?}")]
    DuplicateKey { key: String },
}

/// Error returned when parsing a [`Level`](crate::level::Level) from text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseLevelError {
    #[error("unknown level name in {0:?}")]
    UnknownName(String),

    #[error("invalid level offset in {0:?}")]
    BadOffset(String),
}
