//! UID merging, SEQUENCE precedence and override indexing.

use std::sync::Arc;

use kalends_test::component::core::DiagnosticKind;

use super::helpers::{calendar, expand, instant, parse_ok, resolver_in};

fn master(sequence: &str, summary: &str) -> Vec<String> {
    vec![
        "BEGIN:VEVENT".to_string(),
        "UID:review".to_string(),
        format!("SEQUENCE:{sequence}"),
        format!("SUMMARY:{summary}"),
        "DTSTART:20250106T150000Z".to_string(),
        "DTEND:20250106T160000Z".to_string(),
        "RRULE:FREQ=WEEKLY;COUNT=4".to_string(),
        "END:VEVENT".to_string(),
    ]
}

fn moved(sequence: &str, summary: &str) -> Vec<String> {
    vec![
        "BEGIN:VEVENT".to_string(),
        "UID:review".to_string(),
        format!("SEQUENCE:{sequence}"),
        format!("SUMMARY:{summary}"),
        "RECURRENCE-ID:20250113T150000Z".to_string(),
        "DTSTART:20250113T170000Z".to_string(),
        "DTEND:20250113T180000Z".to_string(),
        "END:VEVENT".to_string(),
    ]
}

fn document_of(records: &[Vec<String>]) -> String {
    let lines: Vec<&str> = records.iter().flatten().map(String::as_str).collect();
    calendar(&lines)
}

#[test_log::test]
fn higher_sequence_wins_in_either_order() {
    let resolver = resolver_in(chrono_tz::UTC);
    let newer = master("2", "Review v2");
    let older = master("1", "Review v1");

    for (records, stale) in [
        (vec![older.clone(), newer.clone()], false),
        (vec![newer.clone(), older.clone()], true),
    ] {
        let document = parse_ok(&document_of(&records), &resolver);
        let event = document.get("review").expect("event stored");
        assert_eq!(event.summary.as_deref(), Some("Review v2"));
        assert_eq!(event.sequence, 2);
        assert_eq!(
            document
                .diagnostics
                .iter()
                .any(|d| d.kind == DiagnosticKind::StaleSequence),
            stale
        );
    }
}

#[test_log::test]
fn override_sequence_wins_per_key() {
    let resolver = resolver_in(chrono_tz::UTC);
    for records in [
        vec![master("0", "Review"), moved("1", "old move"), moved("3", "new move")],
        vec![master("0", "Review"), moved("3", "new move"), moved("1", "old move")],
    ] {
        let document = parse_ok(&document_of(&records), &resolver);
        let event = document.get("review").expect("event stored");
        let by_day = event.overrides.get("2025-01-13").expect("date key");
        let by_instant = event
            .overrides
            .get("2025-01-13T15:00:00Z")
            .expect("instant key");
        assert!(Arc::ptr_eq(by_day, by_instant));
        assert_eq!(by_day.summary.as_deref(), Some("new move"));
    }
}

#[test_log::test]
fn override_before_master_is_applied() {
    let resolver = resolver_in(chrono_tz::UTC);
    let document = parse_ok(
        &document_of(&[moved("0", "Moved review"), master("0", "Review")]),
        &resolver,
    );
    let event = document.get("review").expect("event stored");
    assert!(!event.is_override());
    assert!(event.rrule.is_some());

    let occurrences = expand(
        &resolver,
        event,
        "2025-01-01T00:00:00Z",
        "2025-02-28T00:00:00Z",
    );
    assert_eq!(occurrences.len(), 4);
    let second = &occurrences[1];
    assert!(second.is_override);
    assert_eq!(second.summary.as_deref(), Some("Moved review"));
    assert_eq!(second.start.instant, instant("2025-01-13T17:00:00Z"));
    assert_eq!(second.end.instant, instant("2025-01-13T18:00:00Z"));
}

#[test_log::test]
fn exception_keys_share_one_record() {
    let resolver = resolver_in(chrono_tz::UTC);
    let mut records = master("0", "Review");
    records.insert(
        records.len() - 1,
        "EXDATE:20250120T150000Z,20250127T150000Z".to_string(),
    );
    let document = parse_ok(&document_of(&[records]), &resolver);
    let event = document.get("review").expect("event stored");

    for (day, full) in [
        ("2025-01-20", "2025-01-20T15:00:00Z"),
        ("2025-01-27", "2025-01-27T15:00:00Z"),
    ] {
        let by_day = event.exceptions.get(day).expect("date key");
        let by_instant = event.exceptions.get(full).expect("instant key");
        assert!(Arc::ptr_eq(by_day, by_instant));
    }

    let occurrences = expand(
        &resolver,
        event,
        "2025-01-01T00:00:00Z",
        "2025-02-28T00:00:00Z",
    );
    assert_eq!(occurrences.len(), 2);
}

#[test_log::test]
fn newer_sequence_replaces_untyped_properties() {
    let resolver = resolver_in(chrono_tz::UTC);
    let record = |sequence: &str, description: &str, location: &str, hour: &str| {
        vec![
            "BEGIN:VEVENT".to_string(),
            "UID:u".to_string(),
            format!("SEQUENCE:{sequence}"),
            format!("DESCRIPTION:{description}"),
            format!("LOCATION:{location}"),
            format!("DTSTART:20250106T{hour}0000Z"),
            "END:VEVENT".to_string(),
        ]
    };
    let older = record("0", "old", "Room A", "09");
    let newer = record("1", "new", "Room B", "10");

    for records in [vec![older.clone(), newer.clone()], vec![newer, older]] {
        let document = parse_ok(&document_of(&records), &resolver);
        let event = document.get("u").expect("event stored");
        assert_eq!(
            event.start.as_ref().map(|start| start.instant),
            Some(instant("2025-01-06T10:00:00Z"))
        );
        assert_eq!(event.text("description"), Some("new"));
        assert_eq!(event.text("location"), Some("Room B"));
        assert_eq!(event.get_properties("description").len(), 1);
    }
}

#[test_log::test]
fn overrides_sharing_a_day_are_both_applied() {
    let resolver = resolver_in(chrono_tz::UTC);
    let text = calendar(&[
        "BEGIN:VEVENT",
        "UID:shifts",
        "SUMMARY:Shift",
        "DTSTART:20250106T090000Z",
        "DTEND:20250106T100000Z",
        "RRULE:FREQ=DAILY;BYHOUR=9,17;COUNT=4",
        "END:VEVENT",
        "BEGIN:VEVENT",
        "UID:shifts",
        "SEQUENCE:1",
        "SUMMARY:morning",
        "RECURRENCE-ID:20250106T090000Z",
        "DTSTART:20250106T100000Z",
        "DTEND:20250106T110000Z",
        "END:VEVENT",
        "BEGIN:VEVENT",
        "UID:shifts",
        "SEQUENCE:0",
        "SUMMARY:evening",
        "RECURRENCE-ID:20250106T170000Z",
        "DTSTART:20250106T180000Z",
        "DTEND:20250106T190000Z",
        "END:VEVENT",
    ]);
    let document = parse_ok(&text, &resolver);
    assert!(
        !document
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::StaleSequence)
    );

    let event = document.get("shifts").expect("event stored");
    let occurrences = expand(
        &resolver,
        event,
        "2025-01-06T00:00:00Z",
        "2025-01-08T00:00:00Z",
    );
    let moved: Vec<_> = occurrences
        .iter()
        .filter(|o| o.is_override)
        .map(|o| (o.summary.as_deref(), o.start.instant))
        .collect();
    assert_eq!(
        moved,
        [
            (Some("morning"), instant("2025-01-06T10:00:00Z")),
            (Some("evening"), instant("2025-01-06T18:00:00Z")),
        ]
    );
}
