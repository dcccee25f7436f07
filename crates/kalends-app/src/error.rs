use thiserror::Error;

/// Application-level errors (command-line layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    RfcError(#[from] kalends_rfc::error::RfcError),

    #[error(transparent)]
    CoreError(#[from] kalends_core::error::CoreError),

    #[error("Failed to read {path}: {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<kalends_rfc::rfc::ical::ParseError> for AppError {
    fn from(e: kalends_rfc::rfc::ical::ParseError) -> Self {
        Self::RfcError(e.into())
    }
}

impl From<kalends_rfc::rfc::ical::expand::ExpandError> for AppError {
    fn from(e: kalends_rfc::rfc::ical::expand::ExpandError) -> Self {
        Self::RfcError(e.into())
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
