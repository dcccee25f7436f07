#![allow(clippy::expect_used, dead_code)]
//! Test helpers for integration tests.
//!
//! Provides utilities for:
//! - Building resolvers with a pinned host zone
//! - Wrapping component bodies into a VCALENDAR
//! - Expanding a parsed component over an RFC 3339 range

use chrono::{DateTime, NaiveDate, Utc};

use kalends_test::component::core::{CalendarDocument, Component};
use kalends_test::component::expand::{ExpandOptions, Expander, Occurrence};
use kalends_test::component::parse::parse_with;
use kalends_test::component::timezone::{TimezoneResolver, ZoneRef};

/// ## Summary
/// Returns a resolver whose host zone is `zone`, independent of the machine.
#[must_use]
pub fn resolver_in(zone: chrono_tz::Tz) -> TimezoneResolver {
    TimezoneResolver::with_host_zone(ZoneRef::Iana(zone))
}

/// Wraps component lines into a VCALENDAR with CRLF line endings.
#[must_use]
pub fn calendar(body: &[&str]) -> String {
    let mut lines = vec!["BEGIN:VCALENDAR", "VERSION:2.0", "PRODID:-//kalends//tests//EN"];
    lines.extend_from_slice(body);
    lines.push("END:VCALENDAR");
    let mut text = lines.join("\r\n");
    text.push_str("\r\n");
    text
}

/// Parses `text`, panicking with the parse error on failure.
#[must_use]
pub fn parse_ok(text: &str, resolver: &TimezoneResolver) -> CalendarDocument {
    parse_with(text, resolver).expect("calendar should parse")
}

#[must_use]
pub fn instant(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .expect("valid RFC 3339 instant")
        .with_timezone(&Utc)
}

#[must_use]
pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
}

/// Expands `component` over `[from, to]` with default options.
#[must_use]
pub fn expand<'c>(
    resolver: &TimezoneResolver,
    component: &'c Component,
    from: &str,
    to: &str,
) -> Vec<Occurrence<'c>> {
    expand_with(
        resolver,
        component,
        &ExpandOptions::new(instant(from), instant(to)),
    )
}

#[must_use]
pub fn expand_with<'c>(
    resolver: &TimezoneResolver,
    component: &'c Component,
    options: &ExpandOptions,
) -> Vec<Occurrence<'c>> {
    Expander::new(resolver)
        .expand(component, options)
        .expect("range should be valid")
}

/// Calendar days of each occurrence start, as written.
#[must_use]
pub fn start_days(occurrences: &[Occurrence<'_>]) -> Vec<NaiveDate> {
    occurrences
        .iter()
        .map(|occurrence| occurrence.start.calendar_date())
        .collect()
}
