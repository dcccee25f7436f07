//! Command-line front end for the kalends iCalendar expander.

pub mod cli;
pub mod error;
pub mod report;
