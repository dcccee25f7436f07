use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use kalends_test::component::expand::build_rule;
use kalends_test::component::timezone::{TimezoneResolver, ZoneRef};

pub struct RuleCase {
    pub name: &'static str,
    pub rule: &'static str,
    pub host: Tz,
    pub expected: Option<&'static [&'static str]>,
    pub expected_len: Option<usize>,
    pub limit: u16,
    pub after: Option<&'static str>,
    pub before: Option<&'static str>,
}

#[expect(clippy::too_many_lines)]
pub fn rule_cases() -> Vec<RuleCase> {
    vec![
        RuleCase {
            name: "daily_basic",
            rule: "DTSTART:20120201T093000Z\nRRULE:FREQ=DAILY;COUNT=3",
            host: Tz::UTC,
            expected: Some(&[
                "2012-02-01T09:30:00+00:00",
                "2012-02-02T09:30:00+00:00",
                "2012-02-03T09:30:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RuleCase {
            name: "weekly_basic",
            rule: "DTSTART:19970902T090000Z\nRRULE:FREQ=WEEKLY;COUNT=3;BYDAY=TU,TH",
            host: Tz::UTC,
            expected: Some(&[
                "1997-09-02T09:00:00+00:00",
                "1997-09-04T09:00:00+00:00",
                "1997-09-09T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RuleCase {
            name: "monthly_last_friday",
            rule: "DTSTART:20250131T100000Z\nRRULE:FREQ=MONTHLY;BYDAY=-1FR;COUNT=3",
            host: Tz::UTC,
            expected: Some(&[
                "2025-01-31T10:00:00+00:00",
                "2025-02-28T10:00:00+00:00",
                "2025-03-28T10:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RuleCase {
            name: "rfc_every_day_in_jan",
            rule: "DTSTART;TZID=America/New_York:19980101T090000\nRRULE:FREQ=YEARLY;UNTIL=20000131T140000Z;BYMONTH=1;BYDAY=SU,MO,TU,WE,TH,FR,SA",
            host: Tz::UTC,
            expected: None,
            expected_len: Some(93),
            limit: 200,
            after: None,
            before: None,
        },
        RuleCase {
            name: "full_day_yearly_date_until",
            rule: "DTSTART;VALUE=DATE:20160313\nRRULE:FREQ=YEARLY;UNTIL=20190312;BYMONTHDAY=13;BYMONTH=3",
            host: Tz::UTC,
            expected: Some(&[
                "2016-03-13T00:00:00+00:00",
                "2017-03-13T00:00:00+00:00",
                "2018-03-13T00:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RuleCase {
            name: "date_until_on_zoned_start",
            rule: "DTSTART;TZID=Europe/Oslo:20211216T180000\nRRULE:FREQ=WEEKLY;UNTIL=20211216",
            host: Tz::UTC,
            expected: Some(&["2021-12-16T18:00:00+01:00"]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RuleCase {
            name: "floating_start_uses_host",
            rule: "DTSTART:20250320T100000\nRRULE:FREQ=WEEKLY;COUNT=3",
            host: Tz::Europe__Berlin,
            expected: Some(&[
                "2025-03-20T10:00:00+01:00",
                "2025-03-27T10:00:00+01:00",
                "2025-04-03T10:00:00+02:00",
            ]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RuleCase {
            name: "until_before_start_is_empty",
            rule: "DTSTART:20250110T090000Z\nRRULE:FREQ=DAILY;UNTIL=20250101T090000Z",
            host: Tz::UTC,
            expected: Some(&[]),
            expected_len: None,
            limit: 100,
            after: None,
            before: None,
        },
        RuleCase {
            name: "hourly_limited",
            rule: "DTSTART:20250101T000000Z\nRRULE:FREQ=HOURLY;INTERVAL=6",
            host: Tz::UTC,
            expected: None,
            expected_len: Some(5),
            limit: 5,
            after: None,
            before: None,
        },
        RuleCase {
            name: "window_inclusive",
            rule: "DTSTART:20250101T090000Z\nRRULE:FREQ=DAILY;COUNT=10",
            host: Tz::UTC,
            expected: Some(&[
                "2025-01-03T09:00:00+00:00",
                "2025-01-04T09:00:00+00:00",
                "2025-01-05T09:00:00+00:00",
            ]),
            expected_len: None,
            limit: 100,
            after: Some("2025-01-03T09:00:00+00:00"),
            before: Some("2025-01-05T09:00:00+00:00"),
        },
        RuleCase {
            name: "window_open_ended",
            rule: "DTSTART;TZID=Asia/Kolkata:20250106T083000\nRRULE:FREQ=WEEKLY;BYDAY=MO,FR;COUNT=6",
            host: Tz::UTC,
            expected: Some(&[
                "2025-01-13T08:30:00+05:30",
                "2025-01-17T08:30:00+05:30",
                "2025-01-20T08:30:00+05:30",
                "2025-01-24T08:30:00+05:30",
            ]),
            expected_len: None,
            limit: 100,
            after: Some("2025-01-11T00:00:00+00:00"),
            before: None,
        },
    ]
}

pub fn assert_case(case: &RuleCase) {
    let resolver = TimezoneResolver::with_host_zone(ZoneRef::Iana(case.host));
    let rule = build_rule(case.rule, None, &[], &resolver)
        .unwrap_or_else(|err| panic!("Failed to build {}: {}", case.name, err))
        .with_max_instances(case.limit);

    let instances = match (case.after, case.before) {
        (None, None) => rule.all(),
        (after, before) => rule.between(
            parse_utc(after.unwrap_or(OPEN_START)),
            parse_utc(before.unwrap_or(OPEN_END)),
        ),
    };
    let actual_timestamps: Vec<i64> = instances.iter().map(|v| v.instant.timestamp()).collect();

    if let Some(expected) = case.expected {
        let expected_timestamps: Vec<i64> = expected
            .iter()
            .map(|value| parse_rfc3339(value).timestamp())
            .collect();
        assert_eq!(
            actual_timestamps, expected_timestamps,
            "Case {} did not match",
            case.name
        );
    }

    if let Some(expected_len) = case.expected_len {
        assert_eq!(
            instances.len(),
            expected_len,
            "Case {} expected {} occurrences",
            case.name,
            expected_len
        );
    }
}

const OPEN_START: &str = "1900-01-01T00:00:00+00:00";
const OPEN_END: &str = "2100-01-01T00:00:00+00:00";

fn parse_utc(value: &str) -> DateTime<Utc> {
    parse_rfc3339(value).with_timezone(&Utc)
}

fn parse_rfc3339(value: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(value)
        .unwrap_or_else(|err| panic!("Failed to parse rfc3339 value {value}: {err}"))
}
