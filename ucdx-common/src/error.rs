use std::sync::Arc;

use thiserror::Error;

/// Structured parse failure with the offending source position.
///
/// `line` and `column` are 1-based. `expected` describes what the grammar
/// was looking for when it gave up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parse error at line {line}, column {column}: expected {expected}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub expected: String,
}

impl ParseError {
    pub fn new(line: usize, column: usize, expected: impl Into<String>) -> Self {
        ParseError {
            line,
            column,
            expected: expected.into(),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum UcdError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Semantic Versioning Error: {0}")]
    SemVer(#[from] Arc<semver::Error>),

    #[error("Parse Error: {0}")]
    Parse(#[from] ParseError),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Cache Error: {0}")]
    Cache(String),

    #[error("State Store Error: {0}")]
    Store(String),

    #[error("Unexpected HTTP status {0} for '{1}'")]
    HttpStatus(u16, String),

    #[error("Invalid ReadMe: {0}")]
    BadReadme(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for UcdError {
    fn from(err: std::io::Error) -> Self {
        UcdError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for UcdError {
    fn from(err: reqwest::Error) -> Self {
        UcdError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for UcdError {
    fn from(err: serde_json::Error) -> Self {
        UcdError::Json(Arc::new(err))
    }
}

impl From<semver::Error> for UcdError {
    fn from(err: semver::Error) -> Self {
        UcdError::SemVer(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, UcdError>;
