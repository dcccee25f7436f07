//! Chunked and direct parsing produce the same document.

use kalends_test::component::config::Settings;
use kalends_test::component::parse::{ParseErrorKind, parse_chunked, parse_with};

use super::helpers::{calendar, resolver_in};

fn large_calendar(events: usize) -> String {
    let records: Vec<String> = (0..events)
        .map(|i| {
            let day = i % 28 + 1;
            format!(
                "BEGIN:VEVENT\r\nUID:event-{i}\r\nSEQUENCE:{seq}\r\nSUMMARY:Event {i}\r\n\
                 DTSTART;TZID=Europe/Vienna:202502{day:02}T090000\r\n\
                 DURATION:PT45M\r\nRRULE:FREQ=MONTHLY;COUNT=6\r\nEND:VEVENT",
                seq = i % 3,
            )
        })
        .collect();
    let lines: Vec<&str> = records.iter().map(String::as_str).collect();
    calendar(&lines)
}

#[test_log::test(tokio::test)]
async fn chunked_equals_direct_for_any_chunk_size() {
    let resolver = resolver_in(chrono_tz::Europe::Vienna);
    let text = large_calendar(120);
    let direct = parse_with(&text, &resolver).expect("direct parse");
    assert_eq!(direct.components.len(), 120);

    for chunk_lines in [1, 7, 64, Settings::default().parser.chunk_lines, 100_000] {
        let chunked = parse_chunked(&text, &resolver, chunk_lines)
            .await
            .expect("chunked parse");
        assert_eq!(chunked.metadata, direct.metadata);
        assert_eq!(chunked.diagnostics, direct.diagnostics);
        assert_eq!(chunked.components.len(), direct.components.len());
        for (uid, component) in &direct.components {
            let other = chunked.get(uid).expect("same uids");
            assert_eq!(other.start, component.start, "{uid}");
            assert_eq!(other.end, component.end, "{uid}");
            assert_eq!(other.sequence, component.sequence, "{uid}");
            assert_eq!(
                other.rrule.as_ref().map(|r| r.all()),
                component.rrule.as_ref().map(|r| r.all()),
                "{uid}"
            );
        }
    }
}

#[test_log::test(tokio::test)]
async fn chunked_errors_match_direct_errors() {
    let resolver = resolver_in(chrono_tz::UTC);
    let text = calendar(&[
        "BEGIN:VEVENT",
        "UID:broken",
        "DTSTART:20250101T090000Z",
        "EXDATE:20250101T090000Z,20250431T090000Z",
        "END:VEVENT",
    ]);

    let direct = parse_with(&text, &resolver).expect_err("impossible EXDATE");
    for chunk_lines in [1, 2, 500] {
        let chunked = parse_chunked(&text, &resolver, chunk_lines)
            .await
            .expect_err("impossible EXDATE");
        assert_eq!(chunked, direct);
    }
    assert_eq!(direct.kind, ParseErrorKind::InvalidExceptionDate);
    assert_eq!(direct.line, 7);
}
