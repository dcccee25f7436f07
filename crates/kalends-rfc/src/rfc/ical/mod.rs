//! iCalendar RFC 5545 implementation.
//!
//! - `core`: the parsed object graph (documents, components, time values)
//! - `timezone`: identifier resolution and wall-time conversion
//! - `parse`: content-line lexing, value decoding and component assembly
//! - `expand`: recurrence rule building and occurrence expansion
//!
//! ## Example
//!
//! ```rust,no_run
//! use chrono::{TimeZone, Utc};
//! use kalends_rfc::rfc::ical::expand::{ExpandOptions, Expander};
//! use kalends_rfc::rfc::ical::parse::parse_with;
//! use kalends_rfc::rfc::ical::timezone::TimezoneResolver;
//!
//! let resolver = TimezoneResolver::default();
//! let text = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:a\r\nDTSTART:20250101T090000Z\r\nRRULE:FREQ=DAILY;COUNT=3\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
//! let document = parse_with(text, &resolver).unwrap();
//! let options = ExpandOptions::new(
//!     Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap(),
//! );
//! let occurrences = Expander::new(&resolver)
//!     .expand(&document.components["a"], &options)
//!     .unwrap();
//! assert_eq!(occurrences.len(), 3);
//! ```

pub mod core;
pub mod expand;
pub mod parse;
pub mod timezone;

pub use core::{CalendarDocument, Component, ComponentKind, TimeValue, ZoneIdentifier};
pub use expand::{ExpandOptions, Expander, Occurrence};
pub use parse::{
    ParseError, ParseResult, parse, parse_chunked, parse_chunked_with_rules, parse_with,
    parse_with_rules,
};
pub use timezone::{ResolvedZone, TimezoneResolver};
