//! Tolerant iCalendar (RFC 5545) parsing, timezone resolution and
//! recurrence expansion.

pub mod error;
pub mod rfc;
