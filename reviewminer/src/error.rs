use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Shape error: {0}")]
    Shape(#[from] ShapeError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

impl Error {
    /// Short label used for metrics and log fields
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::Transport(_) => "transport",
            Error::Config(_) => "config",
            Error::Shape(_) => "shape",
            Error::InvalidUrl(_) => "invalid_url",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::TomlParse(_) | Error::TomlWrite(_) => "toml",
        }
    }
}

/// Failures of the outbound query call. Never retried internally.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("Authentication failed (status {status})")]
    Auth { status: u16 },

    #[error("Query rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The response did not have the aggregation structure the selector asked for.
///
/// `path` names the node that failed, e.g.
/// `aggregations[0].results[0].aggregations[0].results[3]`.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} at `{path}`")]
pub struct ShapeError {
    pub path: String,
    pub kind: ShapeErrorKind,
}

impl ShapeError {
    pub fn new(path: impl Into<String>, kind: ShapeErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeErrorKind {
    #[error("no aggregations present")]
    EmptyAggregations,

    #[error("bucket container has no results")]
    EmptyBuckets,

    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no aggregation matches {expected}")]
    NoMatch { expected: String },

    #[error("{candidates} aggregations match {expected}")]
    Ambiguous { expected: String, candidates: usize },

    #[error("expected a bucket container, found `{found}` metric")]
    NotBucketContainer { found: String },

    #[error("expected a metric, found `{found}` bucket container")]
    NotMetric { found: String },

    #[error("node carries both `results` and `value`")]
    ConflictingShape,

    #[error("value is missing")]
    MissingValue,

    #[error("value `{found}` is not a number")]
    NotNumeric { found: String },

    #[error("bucket has neither `key_as_string` nor a formattable `key`")]
    MissingLabel,

    #[error("no bucket with key `{key}`")]
    BucketKeyNotFound { key: String },

    #[error("bucket keys cannot be ordered")]
    UnorderableKeys,
}

pub type Result<T> = std::result::Result<T, Error>;
