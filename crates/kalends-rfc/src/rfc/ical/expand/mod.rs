//! Recurrence rules and occurrence expansion.
//!
//! - `builder`: RRULE text plus DTSTART into a [`RecurrenceRule`]
//! - `engine`: the `rrule` crate behind [`RecurrenceEngine`]
//! - `expander`: occurrences of a component within a range

mod builder;
mod describe;
mod engine;
mod error;
mod expander;
mod rule;

pub use builder::{RuleBuilder, build_rule};
pub use describe::describe;
pub use engine::RruleCrateEngine;
pub use error::{ExpandError, RuleError};
pub use expander::{ExpandOptions, Expander, Occurrence};
pub use rule::{
    CompiledRule, EmptyRule, Frequency, RecurrenceEngine, RecurrenceRule, RuleFrame, RuleOptions,
    RuleSpec,
};
