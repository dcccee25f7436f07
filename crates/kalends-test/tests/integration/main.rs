//! Cross-crate integration tests.

mod chunked;
mod dst;
mod helpers;
mod rule_cases;
mod scenarios;
mod sequence;
