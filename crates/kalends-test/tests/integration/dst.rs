//! Daylight-saving transitions across parsing, resolution and expansion.

use chrono::{Datelike, NaiveDate, TimeDelta, Weekday};

use kalends_test::component::timezone::ZoneRef;

use super::helpers::{calendar, expand, instant, parse_ok, resolver_in, start_days};

#[test_log::test]
fn full_day_weekly_keeps_weekday_across_spring_forward() {
    let resolver = resolver_in(chrono_tz::America::New_York);
    let text = calendar(&[
        "BEGIN:VEVENT",
        "UID:monday",
        "DTSTART;VALUE=DATE:20250303",
        "RRULE:FREQ=WEEKLY;COUNT=4",
        "END:VEVENT",
    ]);
    let document = parse_ok(&text, &resolver);
    let event = document.get("monday").expect("event stored");

    let occurrences = expand(
        &resolver,
        event,
        "2025-03-01T00:00:00Z",
        "2025-04-01T00:00:00Z",
    );
    let days = start_days(&occurrences);
    assert_eq!(days.len(), 4);
    assert!(days.iter().all(|day| day.weekday() == Weekday::Mon));

    // Midnights move with the offset; the calendar days do not.
    assert_eq!(occurrences[0].start.instant, instant("2025-03-03T05:00:00Z"));
    assert_eq!(occurrences[1].start.instant, instant("2025-03-10T04:00:00Z"));
    assert!(occurrences.iter().all(|o| o.end.calendar_date() - o.start.calendar_date() == TimeDelta::days(1)));
}

#[test_log::test]
fn timed_weekly_keeps_wall_clock() {
    let resolver = resolver_in(chrono_tz::Europe::Berlin);
    let text = calendar(&[
        "BEGIN:VEVENT",
        "UID:planning",
        "DTSTART;TZID=Europe/Berlin:20250320T100000",
        "DTEND;TZID=Europe/Berlin:20250320T110000",
        "RRULE:FREQ=WEEKLY;COUNT=3",
        "END:VEVENT",
    ]);
    let document = parse_ok(&text, &resolver);
    let event = document.get("planning").expect("event stored");

    let occurrences = expand(
        &resolver,
        event,
        "2025-03-01T00:00:00Z",
        "2025-04-30T00:00:00Z",
    );
    let starts: Vec<_> = occurrences.iter().map(|o| o.start.instant).collect();
    assert_eq!(
        starts,
        [
            instant("2025-03-20T09:00:00Z"),
            instant("2025-03-27T09:00:00Z"),
            instant("2025-04-03T08:00:00Z"),
        ]
    );
    assert!(
        occurrences
            .iter()
            .all(|o| o.start.wall.time().to_string() == "10:00:00")
    );
    assert!(occurrences.iter().all(|o| o.end.instant - o.start.instant == TimeDelta::hours(1)));
}

#[test_log::test]
fn nonexistent_start_lands_after_gap() {
    let resolver = resolver_in(chrono_tz::UTC);
    let text = calendar(&[
        "BEGIN:VEVENT",
        "UID:gap",
        "DTSTART;TZID=Europe/Oslo:20210328T023000",
        "END:VEVENT",
    ]);
    let document = parse_ok(&text, &resolver);
    let start = document
        .get("gap")
        .and_then(|event| event.start.clone())
        .expect("start parsed");

    // 02:00 local jumps to 03:00; the gap opens at 01:00Z.
    assert_eq!(start.instant, instant("2021-03-28T01:30:00Z"));
    let oslo = ZoneRef::Iana(chrono_tz::Europe::Oslo);
    assert_eq!(
        resolver.local_wall_time(start.instant, &oslo).time().to_string(),
        "03:30:00"
    );
}

#[test_log::test]
fn overlap_first_reading_plus_one_hour_is_second() {
    let resolver = resolver_in(chrono_tz::UTC);
    let oslo = ZoneRef::Iana(chrono_tz::Europe::Oslo);
    let wall = NaiveDate::from_ymd_opt(2021, 10, 31)
        .and_then(|d| d.and_hms_opt(2, 30, 0))
        .expect("valid wall time");

    let first = resolver.parse_local_time_as_instant(wall, &oslo);
    let second = first + TimeDelta::hours(1);
    assert_eq!(first, instant("2021-10-31T00:30:00Z"));
    assert_eq!(resolver.local_wall_time(second, &oslo), wall);
}

#[test_log::test]
fn daily_instances_through_both_transitions() {
    let resolver = resolver_in(chrono_tz::America::New_York);

    let spring = calendar(&[
        "BEGIN:VEVENT",
        "UID:spring",
        "DTSTART;TZID=America/New_York:20250308T023000",
        "RRULE:FREQ=DAILY;COUNT=3",
        "END:VEVENT",
    ]);
    let document = parse_ok(&spring, &resolver);
    let occurrences = expand(
        &resolver,
        document.get("spring").expect("event stored"),
        "2025-03-01T00:00:00Z",
        "2025-03-31T00:00:00Z",
    );
    let starts: Vec<_> = occurrences.iter().map(|o| o.start.instant).collect();
    assert_eq!(
        starts,
        [
            instant("2025-03-08T07:30:00Z"),
            instant("2025-03-09T07:30:00Z"),
            instant("2025-03-10T06:30:00Z"),
        ]
    );

    let autumn = calendar(&[
        "BEGIN:VEVENT",
        "UID:autumn",
        "DTSTART;TZID=America/New_York:20251101T013000",
        "RRULE:FREQ=DAILY;COUNT=3",
        "END:VEVENT",
    ]);
    let document = parse_ok(&autumn, &resolver);
    let occurrences = expand(
        &resolver,
        document.get("autumn").expect("event stored"),
        "2025-10-01T00:00:00Z",
        "2025-11-30T00:00:00Z",
    );
    let starts: Vec<_> = occurrences.iter().map(|o| o.start.instant).collect();
    assert_eq!(
        starts,
        [
            instant("2025-11-01T05:30:00Z"),
            instant("2025-11-02T05:30:00Z"),
            instant("2025-11-03T06:30:00Z"),
        ]
    );
}

#[test_log::test]
fn resolution_is_idempotent() {
    let resolver = resolver_in(chrono_tz::UTC);
    for label in [
        "Europe/Paris",
        "Eastern Standard Time",
        "(UTC+05:30) Chennai, Kolkata, Mumbai, New Delhi",
        "/mozilla.org/20070129_1/Europe/Berlin",
        "GMT-03:00",
    ] {
        let first = resolver.resolve(label);
        assert!(!first.is_unresolved(), "{label} should resolve");
        let again = resolver.resolve(&first.original);
        assert_eq!(again, first, "{label}");
    }
}
