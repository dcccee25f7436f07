//! kalends iCalendar toolkit - integration test support.
//!
//! Re-exports the workspace crates so integration tests can use
//! `kalends_test::` paths.

pub mod component {
    pub use kalends_app::report;
    pub use kalends_core::config;
    pub use kalends_rfc::rfc::ical::{core, expand, parse, timezone};
}

pub use kalends_rfc::error::{RfcError, RfcResult};
