use thiserror::Error;

/// Configuration errors. All of these are fatal at startup: nothing is
/// armed until the configuration validates.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid time zone: '{0}'")]
    InvalidTimezone(String),

    #[error("invalid time for {field}: '{value}' (expected HH:MM)")]
    InvalidTime { field: &'static str, value: String },

    #[error("reminder lead of {0} minutes is out of range (1..1440)")]
    InvalidReminderLead(u32),

    #[error("weather API key is missing")]
    MissingApiKey,

    #[error("cannot read config file: {0}")]
    Read(String),

    #[error("cannot parse config file: {0}")]
    Parse(String),
}

/// Errors from records-store operations (used by trait definitions in
/// daybreak-core; the SQL layer itself is out of scope).
#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("records backend connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("record not found")]
    NotFound,
}

/// Errors from outbound message delivery.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("recipient has blocked the assistant")]
    Blocked,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Errors from the upstream forecast provider.
///
/// All of these are recovered inside the weather provider: the user sees a
/// fallback string and nothing is cached.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("forecast endpoint returned status {0}")]
    Status(u16),

    #[error("forecast request timed out")]
    Timeout,

    #[error("forecast request failed: {0}")]
    Network(String),

    #[error("invalid forecast payload: {0}")]
    Decode(String),
}

/// Unexpected failures inside a session handler.
///
/// Business-rule outcomes ("task not found") are ordinary `Ok` reply strings,
/// not errors; this type is for failures the handler could not recover from.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("records store failure: {0}")]
    Records(#[from] RecordsError),

    #[error("{0}")]
    Other(String),
}

/// Errors from the durable forecast cache tier.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serde(String),
}
