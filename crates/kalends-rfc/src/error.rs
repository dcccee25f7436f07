use thiserror::Error;

use crate::rfc::ical::expand::{ExpandError, RuleError};
use crate::rfc::ical::parse::ParseError;

/// RFC parsing and expansion errors
#[derive(Error, Debug)]
pub enum RfcError {
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    #[error("Recurrence rule error: {0}")]
    RuleError(#[from] RuleError),

    #[error("Expansion error: {0}")]
    ExpandError(#[from] ExpandError),

    #[error("Alias table error: {0}")]
    AliasTableError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    CoreError(#[from] kalends_core::error::CoreError),
}

pub type RfcResult<T> = std::result::Result<T, RfcError>;
