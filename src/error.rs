use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger source not found or unreadable: {path}: {source}")]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Ledger schema error: {0}")]
    SchemaError(String),

    #[error("Parse error at {location}: {details}")]
    ParseError { location: String, details: String },

    #[error("Category '{0}' is not present in the loaded ledger")]
    MissingCategory(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl LedgerError {
    pub(crate) fn parse(location: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ParseError {
            location: location.into(),
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
