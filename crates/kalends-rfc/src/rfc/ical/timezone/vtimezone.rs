//! Offsets from document-local VTIMEZONE definitions (RFC 5545 §3.6.5).
//!
//! Used when a TZID resolves to neither an IANA zone nor a known alias but
//! the document itself defines STANDARD/DAYLIGHT observances for it.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc, Weekday};

use crate::rfc::ical::core::{Component, ComponentKind};

/// Error while reading a VTIMEZONE component.
#[derive(Debug, thiserror::Error)]
pub enum VTimezoneError {
    #[error("Missing required TZID property")]
    MissingTzid,

    #[error("VTIMEZONE must have at least one STANDARD or DAYLIGHT component")]
    NoObservances,

    #[error("Missing required property {0} in {1} component")]
    MissingProperty(&'static str, &'static str),

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),
}

/// UTC offset in seconds (positive = east).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtcOffset {
    pub seconds: i32,
}

impl UtcOffset {
    #[must_use]
    pub const fn from_seconds(seconds: i32) -> Self {
        Self { seconds }
    }

    /// Returns the offset in whole minutes.
    #[must_use]
    pub const fn minutes(self) -> i32 {
        self.seconds / 60
    }

    /// ## Summary
    /// Parses `(+|-)HHMM[SS]`.
    ///
    /// ## Errors
    /// Returns [`VTimezoneError::InvalidValue`] if the offset is malformed.
    pub fn parse(s: &str) -> Result<Self, VTimezoneError> {
        let s = s.trim();
        let invalid = || VTimezoneError::InvalidValue("UTC offset", s.to_string());

        let (sign, rest) = match s.as_bytes().first() {
            Some(b'+') => (1, &s[1..]),
            Some(b'-') => (-1, &s[1..]),
            _ => return Err(invalid()),
        };
        if !matches!(rest.len(), 4 | 6) || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let field = |range: std::ops::Range<usize>| -> i32 {
            rest.get(range).and_then(|v| v.parse().ok()).unwrap_or(0)
        };
        let total = field(0..2) * 3600 + field(2..4) * 60 + field(4..6);
        Ok(Self::from_seconds(sign * total))
    }
}

impl fmt::Display for UtcOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.seconds >= 0 { '+' } else { '-' };
        let total = self.seconds.abs();
        let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
        if seconds == 0 {
            write!(f, "{sign}{hours:02}{minutes:02}")
        } else {
            write!(f, "{sign}{hours:02}{minutes:02}{seconds:02}")
        }
    }
}

/// Yearly transition rule of the form `FREQ=YEARLY;BYMONTH=m;BYDAY=nDD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AnnualTransition {
    month: u32,
    ordinal: i32,
    weekday: Weekday,
}

impl AnnualTransition {
    fn parse(rrule: &str) -> Option<Self> {
        let mut freq = None;
        let mut month = None;
        let mut byday = None;
        for part in rrule.split(';') {
            let (key, value) = part.split_once('=')?;
            match key.trim().to_ascii_uppercase().as_str() {
                "FREQ" => freq = Some(value.trim().to_ascii_uppercase()),
                "BYMONTH" => month = value.trim().parse().ok(),
                "BYDAY" => byday = parse_byday(value),
                _ => {}
            }
        }
        if freq.as_deref() != Some("YEARLY") {
            return None;
        }
        let (ordinal, weekday) = byday?;
        Some(Self {
            month: month?,
            ordinal,
            weekday,
        })
    }

    fn in_year(self, year: i32, time: NaiveTime) -> Option<NaiveDateTime> {
        nth_weekday_of_month(year, self.month, self.weekday, self.ordinal)
            .map(|date| date.and_time(time))
    }
}

/// A STANDARD or DAYLIGHT observance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observance {
    pub kind: ComponentKind,
    pub offset_from: UtcOffset,
    pub offset_to: UtcOffset,
    /// First onset, local time.
    pub dtstart: NaiveDateTime,
    pub rdates: Vec<NaiveDateTime>,
    transition: Option<AnnualTransition>,
}

impl Observance {
    fn parse(component: &Component) -> Result<Self, VTimezoneError> {
        let kind_str = component.kind.as_str();
        let raw = |name: &'static str| {
            component
                .get_property(name)
                .map(|p| p.raw.trim())
                .ok_or(VTimezoneError::MissingProperty(name, kind_str))
        };

        let dtstart_raw = raw("DTSTART")?;
        let dtstart = parse_local(dtstart_raw)
            .ok_or_else(|| VTimezoneError::InvalidValue("DTSTART", dtstart_raw.to_string()))?;
        let offset_to = UtcOffset::parse(raw("TZOFFSETTO")?)?;
        let offset_from = UtcOffset::parse(raw("TZOFFSETFROM")?)?;

        let transition = component
            .get_property("RRULE")
            .and_then(|p| AnnualTransition::parse(&p.raw));

        let rdates = component
            .get_properties("RDATE")
            .iter()
            .flat_map(|p| p.raw.split(','))
            .filter_map(parse_local)
            .collect();

        Ok(Self {
            kind: component.kind,
            offset_from,
            offset_to,
            dtstart,
            rdates,
            transition,
        })
    }

    /// Most recent onset at or before `dt`.
    fn onset_before(&self, dt: NaiveDateTime) -> Option<NaiveDateTime> {
        if dt < self.dtstart {
            return None;
        }
        let mut best = self.dtstart;
        for rdate in self.rdates.iter().filter(|r| **r <= dt) {
            best = best.max(*rdate);
        }
        if let Some(transition) = self.transition {
            let time = self.dtstart.time();
            // Only this year and last can hold the latest onset.
            for year in [dt.year() - 1, dt.year()] {
                if year < self.dtstart.year() {
                    continue;
                }
                if let Some(onset) = transition.in_year(year, time).filter(|o| *o <= dt) {
                    best = best.max(onset);
                }
            }
        }
        Some(best)
    }
}

/// A VTIMEZONE reduced to its observances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VTimezone {
    pub tzid: String,
    pub observances: Vec<Observance>,
}

impl VTimezone {
    /// ## Summary
    /// Reads a VTIMEZONE component and its observance children.
    ///
    /// ## Errors
    /// Returns an error if TZID is missing, no observance is present, or an
    /// observance lacks DTSTART / TZOFFSETFROM / TZOFFSETTO.
    pub fn parse(component: &Component) -> Result<Self, VTimezoneError> {
        let tzid = component
            .get_property("TZID")
            .map(|p| p.raw.trim().to_string())
            .filter(|tzid| !tzid.is_empty())
            .ok_or(VTimezoneError::MissingTzid)?;

        let observances = component
            .children
            .iter()
            .filter(|child| child.kind.is_observance())
            .map(Observance::parse)
            .collect::<Result<Vec<_>, _>>()?;

        if observances.is_empty() {
            return Err(VTimezoneError::NoObservances);
        }

        Ok(Self { tzid, observances })
    }

    /// Returns the offset in effect at a local wall time.
    ///
    /// Before every onset, the earliest observance's TZOFFSETFROM applies.
    #[must_use]
    pub fn offset_at(&self, local: NaiveDateTime) -> UtcOffset {
        self.observances
            .iter()
            .filter_map(|obs| obs.onset_before(local).map(|onset| (onset, obs)))
            .max_by_key(|(onset, _)| *onset)
            .map_or_else(
                || {
                    self.observances
                        .iter()
                        .min_by_key(|obs| obs.dtstart)
                        .map_or(UtcOffset::from_seconds(0), |obs| obs.offset_from)
                },
                |(_, obs)| obs.offset_to,
            )
    }

    /// Converts a local wall time to an instant.
    #[must_use]
    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let offset = self.offset_at(local);
        (local - TimeDelta::seconds(i64::from(offset.seconds))).and_utc()
    }
}

fn parse_local(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim().trim_end_matches(['Z', 'z']);
    NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y%m%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Parses a BYDAY entry such as `1SU` or `-1SU`.
fn parse_byday(s: &str) -> Option<(i32, Weekday)> {
    let s = s.trim();
    let split = s.len().checked_sub(2)?;
    let (num, day) = s.split_at_checked(split)?;
    let ordinal = if num.is_empty() { 1 } else { num.parse().ok()? };
    let weekday = match day.to_ascii_uppercase().as_str() {
        "SU" => Weekday::Sun,
        "MO" => Weekday::Mon,
        "TU" => Weekday::Tue,
        "WE" => Weekday::Wed,
        "TH" => Weekday::Thu,
        "FR" => Weekday::Fri,
        "SA" => Weekday::Sat,
        _ => return None,
    };
    Some((ordinal, weekday))
}

/// Returns the nth (or, for negative `ordinal`, nth-from-last) weekday of a month.
fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, ordinal: i32) -> Option<NaiveDate> {
    let ordinal = i8::try_from(ordinal).ok()?;
    if ordinal > 0 {
        NaiveDate::from_weekday_of_month_opt(year, month, weekday, ordinal.unsigned_abs())
    } else if ordinal < 0 {
        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
        let back = (last.weekday().num_days_from_monday() + 7 - weekday.num_days_from_monday()) % 7;
        let weeks_back = u64::from(ordinal.unsigned_abs() - 1) * 7;
        let date = last.checked_sub_days(chrono::Days::new(u64::from(back) + weeks_back))?;
        (date.month() == month).then_some(date)
    } else {
        None
    }
}
