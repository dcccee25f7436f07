//! End-to-end parse and expand scenarios.

use chrono::TimeDelta;

use kalends_test::component::core::{DiagnosticKind, ZoneIdentifier};
use kalends_test::component::expand::ExpandOptions;

use super::helpers::{
    calendar, date, expand, expand_with, instant, parse_ok, resolver_in, start_days,
};

#[test_log::test]
fn yearly_full_day_with_date_until() {
    let resolver = resolver_in(chrono_tz::UTC);
    let text = calendar(&[
        "BEGIN:VEVENT",
        "UID:anniversary",
        "DTSTART;VALUE=DATE:20160313",
        "RRULE:FREQ=YEARLY;UNTIL=20190312;BYMONTHDAY=13;BYMONTH=3",
        "END:VEVENT",
    ]);
    let document = parse_ok(&text, &resolver);
    let event = document.get("anniversary").expect("event stored");

    let occurrences = expand(
        &resolver,
        event,
        "2016-01-01T00:00:00Z",
        "2020-12-31T00:00:00Z",
    );
    assert_eq!(
        start_days(&occurrences),
        [date("2016-03-13"), date("2017-03-13"), date("2018-03-13")]
    );
    assert!(occurrences.iter().all(|o| o.is_full_day && o.is_recurring));

    let rule = event.rrule.as_ref().expect("rule built");
    assert_eq!(rule.all().len(), 3);
}

#[test_log::test]
fn date_until_on_date_time_start_keeps_that_day() {
    let resolver = resolver_in(chrono_tz::Europe::Oslo);
    let text = calendar(&[
        "BEGIN:VEVENT",
        "UID:julebord",
        "DTSTART;TZID=Europe/Oslo:20211216T180000",
        "DTEND;TZID=Europe/Oslo:20211216T230000",
        "RRULE:FREQ=WEEKLY;UNTIL=20211216",
        "END:VEVENT",
    ]);
    let document = parse_ok(&text, &resolver);
    let event = document.get("julebord").expect("event stored");
    assert!(document.diagnostics.is_empty());

    let occurrences = expand(
        &resolver,
        event,
        "2021-12-01T00:00:00Z",
        "2022-12-31T00:00:00Z",
    );
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].start.instant, instant("2021-12-16T17:00:00Z"));
    assert_eq!(occurrences[0].end.instant, instant("2021-12-16T22:00:00Z"));
}

#[test_log::test]
fn daily_full_day_inclusive_week() {
    let resolver = resolver_in(chrono_tz::Europe::Berlin);
    let text = calendar(&[
        "BEGIN:VEVENT",
        "UID:daily",
        "DTSTART;VALUE=DATE:20250101",
        "RRULE:FREQ=DAILY",
        "END:VEVENT",
    ]);
    let document = parse_ok(&text, &resolver);
    let event = document.get("daily").expect("event stored");

    let occurrences = expand(
        &resolver,
        event,
        "2025-01-01T00:00:00+01:00",
        "2025-01-07T00:00:00+01:00",
    );
    let days = start_days(&occurrences);
    assert_eq!(days.len(), 7);
    assert_eq!(days[0], date("2025-01-01"));
    assert!(days.windows(2).all(|pair| pair[1] - pair[0] == TimeDelta::days(1)));
}

#[test_log::test]
fn exdate_and_override_touch_only_their_instances() {
    let resolver = resolver_in(chrono_tz::Europe::Berlin);
    let text = calendar(&[
        "BEGIN:VEVENT",
        "UID:sync@example.com",
        "SUMMARY:Sync",
        "DTSTART;TZID=Europe/Berlin:20150707T090000",
        "DTEND;TZID=Europe/Berlin:20150707T093000",
        "RRULE:FREQ=WEEKLY;BYDAY=TU,WE;COUNT=6",
        "EXDATE;VALUE=DATE:20150708",
        "END:VEVENT",
        "BEGIN:VEVENT",
        "UID:sync@example.com",
        "RECURRENCE-ID;TZID=Europe/Berlin:20150707T090000",
        "SUMMARY:Sync (moved)",
        "DTSTART;TZID=Europe/Berlin:20150707T110000",
        "DTEND;TZID=Europe/Berlin:20150707T113000",
        "END:VEVENT",
    ]);
    let document = parse_ok(&text, &resolver);
    let event = document.get("sync@example.com").expect("event stored");
    assert!(!event.is_override());

    let occurrences = expand(
        &resolver,
        event,
        "2015-07-01T00:00:00Z",
        "2015-07-31T00:00:00Z",
    );
    assert_eq!(
        start_days(&occurrences),
        [
            date("2015-07-07"),
            date("2015-07-14"),
            date("2015-07-15"),
            date("2015-07-21"),
            date("2015-07-22"),
        ]
    );

    let moved = &occurrences[0];
    assert!(moved.is_override);
    assert_eq!(moved.summary.as_deref(), Some("Sync (moved)"));
    assert_eq!(moved.start.instant, instant("2015-07-07T09:00:00Z"));
    assert!(
        occurrences[1..]
            .iter()
            .all(|o| !o.is_override && o.summary.as_deref() == Some("Sync"))
    );

    let raw = expand_with(
        &resolver,
        event,
        &ExpandOptions::new(instant("2015-07-01T00:00:00Z"), instant("2015-07-31T00:00:00Z"))
            .include_overrides(false)
            .exclude_exdates(false),
    );
    assert_eq!(raw.len(), 6);
    assert!(raw.iter().all(|o| !o.is_override));
}

#[test_log::test]
fn empty_duration_ends_at_start() {
    let resolver = resolver_in(chrono_tz::UTC);
    let text = calendar(&[
        "BEGIN:VEVENT",
        "UID:instant",
        "DTSTART:20250101T120000Z",
        "DURATION:P",
        "END:VEVENT",
    ]);
    let document = parse_ok(&text, &resolver);
    let event = document.get("instant").expect("event stored");
    assert_eq!(event.end, event.start);

    let occurrences = expand(
        &resolver,
        event,
        "2025-01-01T00:00:00Z",
        "2025-01-02T00:00:00Z",
    );
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].start, occurrences[0].end);
}

#[test_log::test]
fn windows_zone_names_resolve() {
    let resolver = resolver_in(chrono_tz::UTC);
    let text = calendar(&[
        "BEGIN:VEVENT",
        "UID:outlook",
        "DTSTART;TZID=W. Europe Standard Time:20250106T090000",
        "DTEND;TZID=W. Europe Standard Time:20250106T100000",
        "END:VEVENT",
    ]);
    let document = parse_ok(&text, &resolver);
    let start = document
        .get("outlook")
        .and_then(|event| event.start.clone())
        .expect("start parsed");
    assert_eq!(start.instant, instant("2025-01-06T08:00:00Z"));
    assert_eq!(
        start.zone,
        Some(ZoneIdentifier::Iana("Europe/Berlin".to_string()))
    );
    assert!(document.diagnostics.is_empty());
}

#[test_log::test]
fn unknown_zone_is_reported_not_fatal() {
    let resolver = resolver_in(chrono_tz::Asia::Tokyo);
    let text = calendar(&[
        "BEGIN:VEVENT",
        "UID:mystery",
        "DTSTART;TZID=Atlantis/Poseidonia:20250106T090000",
        "END:VEVENT",
    ]);
    let document = parse_ok(&text, &resolver);
    let start = document
        .get("mystery")
        .and_then(|event| event.start.clone())
        .expect("start parsed");
    assert_eq!(start.instant, instant("2025-01-06T00:00:00Z"));
    assert_eq!(document.diagnostics.len(), 1);
    assert_eq!(document.diagnostics[0].kind, DiagnosticKind::UnresolvedTimezone);
    assert_eq!(document.diagnostics[0].uid.as_deref(), Some("mystery"));
}
