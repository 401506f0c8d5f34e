//! Error types for the application.

use thiserror::Error;

/// Errors surfaced to the interaction layer.
///
/// Every handler returns this type; the dispatch router turns each variant
/// into a user-facing reply and decides how loudly to log it.
#[derive(Debug, Error)]
pub enum BotError {
    /// User input failed one or more documented rules. Reported inline, itemized.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// A handler, avatar, or binding does not exist (or is not the caller's).
    #[error("{what} not found")]
    NotFound { what: String },

    /// A wizard session lapsed before it was completed.
    #[error("avatar creation session expired")]
    ExpiredSession,

    /// The store or the platform failed underneath us.
    #[error("downstream failure: {0}")]
    Downstream(#[from] DownstreamError),

    /// A response broke a platform limit. Always a programming error.
    #[error("response rejected before send: {0}")]
    Limits(#[from] LimitError),

    /// A handler panicked.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl BotError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }
}

impl From<StoreError> for BotError {
    fn from(error: StoreError) -> Self {
        Self::Downstream(DownstreamError::Store(error))
    }
}

/// Failures of external collaborators (store, Discord API, renderer).
#[derive(Debug, Error)]
pub enum DownstreamError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("Discord API error: {0}")]
    Discord(#[from] serenity::Error),

    #[error("platform error: {message}")]
    Platform { message: String },

    #[error("renderer error: {message}")]
    Render { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl DownstreamError {
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform {
            message: message.into(),
        }
    }
}

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unique constraint violated: {message}")]
    Conflict { message: String },

    #[error("record not found: {what}")]
    Missing { what: String },
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Stat formula loading and compilation errors.
#[derive(Debug, Error, PartialEq)]
pub enum FormulaError {
    #[error("unexpected character '{found}' at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{found}'")]
    UnexpectedToken { found: String },

    #[error("unknown identifier '{name}'")]
    UnknownIdentifier { name: String },

    #[error("invalid number literal '{literal}'")]
    InvalidNumber { literal: String },

    #[error("species '{species}', attribute '{attribute}': {source}")]
    InAttribute {
        species: String,
        attribute: String,
        #[source]
        source: Box<FormulaError>,
    },

    #[error("failed to load species catalog: {message}")]
    Catalog { message: String },
}

/// Platform payload limits broken by an outbound response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimitError {
    #[error("embed title is {len} chars (max {max})")]
    Title { len: usize, max: usize },

    #[error("embed description is {len} chars (max {max})")]
    Description { len: usize, max: usize },

    #[error("embed has {count} fields (max {max})")]
    FieldCount { count: usize, max: usize },

    #[error("field name is {len} chars (max {max})")]
    FieldName { len: usize, max: usize },

    #[error("field value is {len} chars (max {max})")]
    FieldValue { len: usize, max: usize },

    #[error("select menu has {count} options (max {max})")]
    SelectOptions { count: usize, max: usize },

    #[error("response has {count} embeds (max {max})")]
    EmbedCount { count: usize, max: usize },

    #[error("response has {count} component rows (max {max})")]
    RowCount { count: usize, max: usize },
}

/// Result type alias for handler operations.
pub type BotResult<T> = std::result::Result<T, BotError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
