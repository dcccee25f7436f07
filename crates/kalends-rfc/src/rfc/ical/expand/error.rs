//! Recurrence building and expansion errors.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while turning RRULE text into a recurrence rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Recurrence rule has no usable DTSTART")]
    MissingStart,

    #[error("Recurrence rule has no FREQ part")]
    MissingFrequency,

    #[error(
        "UNTIL '{0}' cannot be matched to DTSTART's value type \
         (RFC 5545 §3.3.10: UNTIL must have the same value type as DTSTART)"
    )]
    UntilMismatch(String),

    #[error("Recurrence engine rejected rule: {0}")]
    Engine(String),
}

/// Errors raised by [`super::Expander::expand`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpandError {
    #[error("Invalid range: from {from} is after to {to}")]
    InvalidRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    #[error(transparent)]
    Rule(#[from] RuleError),
}
