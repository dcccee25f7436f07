//! DATE and DATE-TIME value parsing (RFC 5545 §3.3.4, §3.3.5).
//!
//! Zone interpretation for values without a trailing `Z`:
//! 1. TZID resolved to a fixed offset, then to an IANA zone
//! 2. A VTIMEZONE defined earlier in the same document
//! 3. Host-local time, tagged with the unresolved label
//!
//! Values without a TZID use the document's most recent VTIMEZONE, or
//! float in the host zone when there is none.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

use super::values::strip_quotes;
use crate::rfc::ical::core::{TimeValue, ZoneIdentifier};
use crate::rfc::ical::timezone::{TimezoneResolver, VTimezone, ZoneRef};

/// Result of reading one DATE / DATE-TIME value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateTimeOutcome {
    Value(TimeValue),
    /// Text that matches no date grammar, kept as written.
    Verbatim(String),
    /// Digits in date shape that name no real date or time.
    Impossible(String),
}

/// Document state the parser needs for zone fallback.
#[derive(Debug, Clone, Copy)]
pub struct DateTimeContext<'a> {
    pub resolver: &'a TimezoneResolver,
    /// VTIMEZONE definitions seen so far, by TZID.
    pub vtimezones: &'a HashMap<String, VTimezone>,
    /// TZID of the most recent VTIMEZONE, for values without a TZID.
    pub default_tzid: Option<&'a str>,
}

/// Parsed `YYYYMMDD[THHMMSS[Z]]` pieces.
struct Shape<'a> {
    date: &'a str,
    time: Option<&'a str>,
    utc: bool,
}

fn shape(raw: &str) -> Option<Shape<'_>> {
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let (body, utc) = match raw.strip_suffix(['Z', 'z']) {
        Some(body) => (body, true),
        None => (raw, false),
    };

    let date = body.get(..8).filter(|d| digits(d))?;
    let rest = &body[8..];
    if rest.is_empty() {
        return Some(Shape {
            date,
            time: None,
            utc,
        });
    }

    let time = rest.strip_prefix(['T', 't'])?;
    (matches!(time.len(), 4 | 6) && digits(time)).then_some(Shape {
        date,
        time: Some(time),
        utc,
    })
}

fn to_date(digits: &str) -> Option<NaiveDate> {
    let year = digits.get(0..4)?.parse().ok()?;
    let month = digits.get(4..6)?.parse().ok()?;
    let day = digits.get(6..8)?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Builds a wall time, rolling `T240000` into the next day and clamping
/// leap second 60 to 59.
fn to_wall(date: NaiveDate, time: &str) -> Option<NaiveDateTime> {
    let field = |range: std::ops::Range<usize>| -> Option<u32> {
        match time.get(range) {
            Some(v) => v.parse().ok(),
            None => Some(0),
        }
    };
    let (hour, minute, second) = (field(0..2)?, field(2..4)?, field(4..6)?);

    if hour == 24 && minute == 0 && second == 0 {
        return date.succ_opt().map(|next| next.and_time(NaiveTime::MIN));
    }
    let second = if second == 60 { 59 } else { second };
    NaiveTime::from_hms_opt(hour, minute, second).map(|t| date.and_time(t))
}

/// Normalizes a `YYYYMMDDTHHMMSS` wall-time string whose hour reads 24.
#[must_use]
pub fn normalize_hour_24(formatted: &str) -> String {
    shape(formatted)
        .and_then(|s| Some((to_date(s.date)?, s)))
        .and_then(|(date, s)| Some((to_wall(date, s.time?)?, s.utc)))
        .map_or_else(
            || formatted.to_string(),
            |(wall, utc)| {
                let mut out = wall.format("%Y%m%dT%H%M%S").to_string();
                if utc {
                    out.push('Z');
                }
                out
            },
        )
}

/// ## Summary
/// Parses a DATE or DATE-TIME value.
///
/// `value_type` is the `VALUE` parameter, `tzid` the `TZID` parameter.
/// A value is date-only when it is exactly eight digits or `VALUE=DATE` is
/// given; in the latter case any time part is ignored.
#[must_use]
pub fn parse_date_time(
    raw: &str,
    value_type: Option<&str>,
    tzid: Option<&str>,
    ctx: &DateTimeContext<'_>,
) -> DateTimeOutcome {
    let raw = raw.trim();
    let Some(shape) = shape(raw) else {
        return DateTimeOutcome::Verbatim(raw.to_string());
    };
    let Some(date) = to_date(shape.date) else {
        return DateTimeOutcome::Impossible(raw.to_string());
    };
    let tzid = tzid.map(strip_quotes).map(str::trim).filter(|t| !t.is_empty());

    let wants_date = value_type.is_some_and(|v| v.eq_ignore_ascii_case("DATE"));
    let time = match shape.time {
        Some(time) if !wants_date => time,
        _ => return DateTimeOutcome::Value(date_value(date, tzid, ctx)),
    };

    let Some(wall) = to_wall(date, time) else {
        return DateTimeOutcome::Impossible(raw.to_string());
    };

    if shape.utc {
        return DateTimeOutcome::Value(TimeValue::utc(wall.and_utc()));
    }

    let value = match tzid.or(ctx.default_tzid) {
        Some(tzid) => zoned_value(wall, tzid, ctx),
        None => {
            let host = ctx.resolver.host_zone();
            TimeValue::date_time(ctx.resolver.parse_local_time_as_instant(wall, &host), wall, None)
        }
    };
    DateTimeOutcome::Value(value)
}

fn date_value(date: NaiveDate, tzid: Option<&str>, ctx: &DateTimeContext<'_>) -> TimeValue {
    let midnight = date.and_time(NaiveTime::MIN);
    let zone = tzid.and_then(|tzid| ctx.resolver.zone_for(&ctx.resolver.resolve(tzid)));
    let instant = ctx
        .resolver
        .parse_local_time_as_instant(midnight, &zone.unwrap_or_else(|| ctx.resolver.host_zone()));
    TimeValue::date(date, instant, zone.map(|z| z.identifier()))
}

fn zoned_value(wall: NaiveDateTime, tzid: &str, ctx: &DateTimeContext<'_>) -> TimeValue {
    let resolved = ctx.resolver.resolve(tzid);
    if let Some(zone) = ctx.resolver.zone_for(&resolved) {
        let instant = ctx.resolver.parse_local_time_as_instant(wall, &zone);
        return TimeValue::date_time(instant, wall, Some(resolved.identifier()));
    }

    if let Some(vtimezone) = ctx.vtimezones.get(tzid) {
        let offset = vtimezone.offset_at(wall);
        return TimeValue::date_time(
            vtimezone.to_utc(wall),
            wall,
            Some(ZoneIdentifier::Offset(offset.minutes())),
        );
    }

    let host: ZoneRef = ctx.resolver.host_zone();
    TimeValue::date_time(
        ctx.resolver.parse_local_time_as_instant(wall, &host),
        wall,
        Some(ZoneIdentifier::Unresolved(tzid.to_string())),
    )
}

/// Adds `days` calendar days to a wall time.
#[must_use]
pub fn add_days(wall: NaiveDateTime, days: i64) -> NaiveDateTime {
    wall.checked_add_signed(TimeDelta::days(days)).unwrap_or(wall)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use chrono_tz::Tz;

    fn resolver() -> TimezoneResolver {
        TimezoneResolver::with_host_zone(ZoneRef::Iana(Tz::America__New_York))
    }

    fn parse(raw: &str, value_type: Option<&str>, tzid: Option<&str>) -> DateTimeOutcome {
        let resolver = resolver();
        let vtimezones = HashMap::new();
        let ctx = DateTimeContext {
            resolver: &resolver,
            vtimezones: &vtimezones,
            default_tzid: None,
        };
        parse_date_time(raw, value_type, tzid, &ctx)
    }

    fn value(outcome: DateTimeOutcome) -> TimeValue {
        match outcome {
            DateTimeOutcome::Value(value) => value,
            other => panic!("expected a value, got {other:?}"),
        }
    }

    #[test]
    fn eight_digits_are_date_only() {
        let v = value(parse("20160313", None, None));
        assert!(v.date_only);
        assert_eq!(v.date_key(), "2016-03-13");
        // Host midnight in New York (EDT starts later that morning).
        assert_eq!(v.instant, Utc.with_ymd_and_hms(2016, 3, 13, 5, 0, 0).unwrap());
        assert!(v.zone.is_none());
    }

    #[test]
    fn value_date_ignores_time_part() {
        let v = value(parse("20160313T120000", Some("DATE"), Some("Europe/Oslo")));
        assert!(v.date_only);
        assert_eq!(v.instant, Utc.with_ymd_and_hms(2016, 3, 12, 23, 0, 0).unwrap());
        assert_eq!(v.zone, Some(ZoneIdentifier::Iana("Europe/Oslo".to_string())));
    }

    #[test]
    fn trailing_z_is_utc() {
        let v = value(parse("20250101T090000Z", None, Some("Europe/Oslo")));
        assert!(v.is_utc());
        assert_eq!(v.instant, Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn tzid_is_resolved() {
        let v = value(parse("20211216T180000", None, Some("Europe/Oslo")));
        assert_eq!(v.instant, Utc.with_ymd_and_hms(2021, 12, 16, 17, 0, 0).unwrap());
        assert_eq!(v.wall.to_string(), "2021-12-16 18:00:00");
    }

    #[test]
    fn offset_tzid_takes_priority() {
        let v = value(parse("20250601T120000", None, Some("(UTC+05:30) Unlisted")));
        assert_eq!(v.zone, Some(ZoneIdentifier::Offset(330)));
        assert_eq!(v.instant, Utc.with_ymd_and_hms(2025, 6, 1, 6, 30, 0).unwrap());
    }

    #[test]
    fn unresolved_tzid_reads_host_time() {
        let v = value(parse("20250115T100000", None, Some("Nowhere Standard Time")));
        assert!(v.zone.as_ref().is_some_and(ZoneIdentifier::is_unresolved));
        assert_eq!(v.instant, Utc.with_ymd_and_hms(2025, 1, 15, 15, 0, 0).unwrap());
    }

    #[test]
    fn floating_reads_host_time() {
        let v = value(parse("20250115T100000", None, None));
        assert!(v.is_floating());
        assert_eq!(v.instant, Utc.with_ymd_and_hms(2025, 1, 15, 15, 0, 0).unwrap());
    }

    #[test]
    fn hour_24_rolls_to_next_day() {
        let v = value(parse("20250131T240000Z", None, None));
        assert_eq!(v.instant, Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(normalize_hour_24("20251231T240000"), "20260101T000000");
        assert_eq!(normalize_hour_24("20251231T120000Z"), "20251231T120000Z");
    }

    #[test]
    fn garbage_is_verbatim_and_bad_digits_are_impossible() {
        assert_eq!(
            parse("TBD", None, None),
            DateTimeOutcome::Verbatim("TBD".to_string())
        );
        assert_eq!(
            parse("20150799T090000", None, None),
            DateTimeOutcome::Impossible("20150799T090000".to_string())
        );
        assert_eq!(
            parse("20150701T250000", None, None),
            DateTimeOutcome::Impossible("20150701T250000".to_string())
        );
    }
}
