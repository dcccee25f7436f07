//! Recurrence rules (RFC 5545 §3.3.10) behind a swappable engine.
//!
//! Engines enumerate wall-clock times in the rule's frame; the
//! [`RecurrenceRule`] wrapper turns them into instants through the
//! timezone database, so gap and overlap handling is the same as for
//! parsed values.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeDelta, Utc};

use super::describe::describe;
use super::error::RuleError;
use crate::rfc::ical::core::{TimeValue, ZoneIdentifier};
use crate::rfc::ical::timezone::{TimezoneDatabase, ZoneRef};

/// Recurrence frequency (FREQ).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Parses a FREQ value (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SECONDLY" => Some(Self::Secondly),
            "MINUTELY" => Some(Self::Minutely),
            "HOURLY" => Some(Self::Hourly),
            "DAILY" => Some(Self::Daily),
            "WEEKLY" => Some(Self::Weekly),
            "MONTHLY" => Some(Self::Monthly),
            "YEARLY" => Some(Self::Yearly),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Secondly => "SECONDLY",
            Self::Minutely => "MINUTELY",
            Self::Hourly => "HOURLY",
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }

    /// Returns true for frequencies finer than a day.
    #[must_use]
    pub const fn is_sub_daily(self) -> bool {
        matches!(self, Self::Secondly | Self::Minutely | Self::Hourly)
    }

    /// First window searched backwards from an instant; sized so a plain
    /// rule fits well under the default enumeration cap.
    fn lookback(self) -> TimeDelta {
        match self {
            Self::Secondly => TimeDelta::hours(1),
            Self::Minutely => TimeDelta::days(1),
            Self::Hourly => TimeDelta::days(7),
            Self::Daily => TimeDelta::days(366),
            Self::Weekly => TimeDelta::days(4 * 366),
            Self::Monthly => TimeDelta::days(20 * 366),
            Self::Yearly => TimeDelta::days(200 * 366),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parsed rule parts, for introspection and descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOptions {
    pub frequency: Frequency,
    pub interval: u32,
    pub count: Option<u32>,
    /// Normalized UNTIL: date-only for date-only starts, UTC otherwise.
    pub until: Option<TimeValue>,
    pub by_second: Vec<i32>,
    pub by_minute: Vec<i32>,
    pub by_hour: Vec<i32>,
    /// BYDAY entries as written, e.g. `MO`, `-1FR`, `2TU`.
    pub by_day: Vec<String>,
    pub by_month_day: Vec<i32>,
    pub by_year_day: Vec<i32>,
    pub by_week_no: Vec<i32>,
    pub by_month: Vec<i32>,
    pub by_set_pos: Vec<i32>,
    pub week_start: Option<String>,
}

impl RuleOptions {
    /// ## Summary
    /// Reads options from uppercase `(KEY, VALUE)` rule parts.
    ///
    /// Unparseable numbers inside BY-lists are skipped; a missing or
    /// zero INTERVAL reads as 1.
    ///
    /// ## Errors
    /// Returns an error if FREQ is missing or names no frequency.
    pub fn from_parts(parts: &[(String, String)], until: Option<TimeValue>) -> Result<Self, RuleError> {
        let get = |key: &str| {
            parts
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        let numbers = |key: &str| -> Vec<i32> {
            get(key)
                .map(|v| v.split(',').filter_map(|n| n.trim().parse().ok()).collect())
                .unwrap_or_default()
        };

        let frequency_text = get("FREQ").ok_or(RuleError::MissingFrequency)?;
        let frequency = Frequency::parse(frequency_text)
            .ok_or_else(|| RuleError::Engine(format!("unknown frequency '{frequency_text}'")))?;

        Ok(Self {
            frequency,
            interval: get("INTERVAL")
                .and_then(|v| v.trim().parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(1),
            count: get("COUNT").and_then(|v| v.trim().parse().ok()),
            until,
            by_second: numbers("BYSECOND"),
            by_minute: numbers("BYMINUTE"),
            by_hour: numbers("BYHOUR"),
            by_day: get("BYDAY")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|d| !d.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            by_month_day: numbers("BYMONTHDAY"),
            by_year_day: numbers("BYYEARDAY"),
            by_week_no: numbers("BYWEEKNO"),
            by_month: numbers("BYMONTH"),
            by_set_pos: numbers("BYSETPOS"),
            week_start: get("WKST").map(String::from),
        })
    }
}

/// Clock an engine enumerates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFrame {
    /// Calendar days; instances are local midnights in the zone.
    Date(ZoneRef),
    /// UTC date-times.
    Utc,
    /// Wall-clock date-times in a zone (floating starts use the host zone).
    Wall(ZoneRef),
}

impl RuleFrame {
    /// The zone instants are converted through.
    #[must_use]
    pub const fn zone(&self) -> ZoneRef {
        match self {
            Self::Date(zone) | Self::Wall(zone) => *zone,
            Self::Utc => ZoneRef::utc(),
        }
    }
}

/// Canonical, engine-independent rule specification.
#[derive(Debug, Clone)]
pub struct RuleSpec {
    pub dtstart: TimeValue,
    pub frame: RuleFrame,
    /// Normalized body starting with `FREQ=`, UNTIL in RFC form.
    pub body: String,
    /// UNTIL as a wall time in the frame.
    pub until_wall: Option<NaiveDateTime>,
    pub options: RuleOptions,
    /// RDATE values merged into every enumeration.
    pub rdates: Vec<TimeValue>,
}

impl RuleSpec {
    /// Returns true when UNTIL falls before DTSTART; such a rule yields nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.until_wall.is_some_and(|until| until < self.dtstart.wall)
    }

    /// Body handed to an engine: UNTIL rewritten as a frame wall time with
    /// a `Z` marker, matching a DTSTART expressed in the same clock.
    #[must_use]
    pub fn engine_body(&self) -> String {
        let until = self
            .until_wall
            .map(|wall| format!("UNTIL={}", wall.format("%Y%m%dT%H%M%SZ")));
        self.body
            .split(';')
            .filter(|part| !part.starts_with("UNTIL="))
            .map(String::from)
            .chain(until)
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// A rule an engine has compiled.
pub trait CompiledRule: Send + Sync + fmt::Debug {
    /// Returns frame wall times within `[from, to]` (inclusive, either bound
    /// open), ascending, at most `limit` of them.
    fn enumerate(
        &self,
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
        limit: u16,
    ) -> Vec<NaiveDateTime>;
}

/// An RFC 5545 RRULE evaluator.
pub trait RecurrenceEngine: Send + Sync + fmt::Debug {
    /// ## Errors
    /// Returns [`RuleError::Engine`] if the engine cannot represent the rule.
    fn compile(&self, spec: &RuleSpec) -> Result<Arc<dyn CompiledRule>, RuleError>;
}

/// Compiled rule that yields no instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyRule;

impl CompiledRule for EmptyRule {
    fn enumerate(
        &self,
        _from: Option<NaiveDateTime>,
        _to: Option<NaiveDateTime>,
        _limit: u16,
    ) -> Vec<NaiveDateTime> {
        Vec::new()
    }
}

/// A built recurrence rule.
#[derive(Clone)]
pub struct RecurrenceRule {
    spec: Arc<RuleSpec>,
    compiled: Arc<dyn CompiledRule>,
    database: Arc<dyn TimezoneDatabase>,
    max_instances: u16,
}

impl fmt::Debug for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecurrenceRule")
            .field("dtstart", &self.spec.dtstart)
            .field("body", &self.spec.body)
            .field("rdates", &self.spec.rdates.len())
            .field("max_instances", &self.max_instances)
            .finish_non_exhaustive()
    }
}

impl RecurrenceRule {
    #[must_use]
    pub fn new(
        spec: RuleSpec,
        compiled: Arc<dyn CompiledRule>,
        database: Arc<dyn TimezoneDatabase>,
        max_instances: u16,
    ) -> Self {
        Self {
            spec: Arc::new(spec),
            compiled,
            database,
            max_instances,
        }
    }

    /// Returns a copy with a different enumeration cap.
    #[must_use]
    pub fn with_max_instances(mut self, max_instances: u16) -> Self {
        self.max_instances = max_instances;
        self
    }

    #[must_use]
    pub fn spec(&self) -> &RuleSpec {
        &self.spec
    }

    #[must_use]
    pub fn options(&self) -> &RuleOptions {
        &self.spec.options
    }

    #[must_use]
    pub const fn max_instances(&self) -> u16 {
        self.max_instances
    }

    /// Returns true if instances are calendar days.
    #[must_use]
    pub fn is_full_day(&self) -> bool {
        matches!(self.spec.frame, RuleFrame::Date(_))
    }

    #[must_use]
    pub fn is_sub_daily(&self) -> bool {
        self.spec.options.frequency.is_sub_daily()
    }

    /// Instances whose instant lies in `[from, to]`.
    #[must_use]
    pub fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<TimeValue> {
        self.between_limited(from, to, self.max_instances)
    }

    /// Like [`Self::between`] with an explicit enumeration cap.
    #[must_use]
    pub fn between_limited(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: u16,
    ) -> Vec<TimeValue> {
        // Wall and instant order can differ by the zone offset; pad by a day.
        let wall_from = self.wall_of(from) - TimeDelta::days(1);
        let wall_to = self.wall_of(to) + TimeDelta::days(1);

        let enumerated = self
            .compiled
            .enumerate(Some(wall_from), Some(wall_to), limit)
            .into_iter()
            .map(|wall| self.instance(wall));
        let rdates = self.spec.rdates.iter().cloned();

        let in_range = |value: &TimeValue| value.instant >= from && value.instant <= to;
        sorted_unique(enumerated.chain(rdates).filter(in_range).collect(), limit)
    }

    /// Every instance, capped at the rule's enumeration limit.
    #[must_use]
    pub fn all(&self) -> Vec<TimeValue> {
        let enumerated = self
            .compiled
            .enumerate(None, None, self.max_instances)
            .into_iter()
            .map(|wall| self.instance(wall));
        sorted_unique(
            enumerated.chain(self.spec.rdates.iter().cloned()).collect(),
            self.max_instances,
        )
    }

    /// First instance strictly after `instant`.
    #[must_use]
    pub fn after(&self, instant: DateTime<Utc>) -> Option<TimeValue> {
        let wall_from = self.wall_of(instant) - TimeDelta::days(1);
        let later = |value: &TimeValue| value.instant > instant;
        let next = self.scan(Some(wall_from), None, &later, true);
        let next_rdate = self
            .spec
            .rdates
            .iter()
            .filter(|value| value.instant > instant)
            .min_by_key(|value| value.instant)
            .cloned();
        [next, next_rdate].into_iter().flatten().min_by_key(|v| v.instant)
    }

    /// Last instance strictly before `instant`.
    ///
    /// Searches a window ending at `instant`, doubling it towards DTSTART
    /// until an instance turns up.
    #[must_use]
    pub fn before(&self, instant: DateTime<Utc>) -> Option<TimeValue> {
        let wall_to = self.wall_of(instant) + TimeDelta::days(1);
        let earlier = |value: &TimeValue| value.instant < instant;

        let mut span = self.spec.options.frequency.lookback();
        let previous = loop {
            let window_start = wall_to
                .checked_sub_signed(span)
                .filter(|start| *start > self.spec.dtstart.wall);
            if let Some(hit) = self.scan(window_start, Some(wall_to), &earlier, false) {
                break Some(hit);
            }
            match (window_start, span.checked_add(&span)) {
                (Some(_), Some(wider)) => span = wider,
                (None, _) => break None,
                (Some(_), None) => break self.scan(None, Some(wall_to), &earlier, false),
            }
        };

        let previous_rdate = self
            .spec
            .rdates
            .iter()
            .filter(|value| value.instant < instant)
            .max_by_key(|value| value.instant)
            .cloned();
        [previous, previous_rdate]
            .into_iter()
            .flatten()
            .max_by_key(|v| v.instant)
    }

    /// Renders the rule as `DTSTART` / `RRULE` / `RDATE` lines.
    #[must_use]
    pub fn to_rfc_string(&self) -> String {
        let start = &self.spec.dtstart;
        let mut out = match self.spec.frame {
            RuleFrame::Date(_) => format!("DTSTART;VALUE=DATE:{}", start.wall.format("%Y%m%d")),
            RuleFrame::Utc => format!("DTSTART:{}", start.instant.format("%Y%m%dT%H%M%SZ")),
            RuleFrame::Wall(_) => {
                let wall = start.wall.format("%Y%m%dT%H%M%S");
                match &start.zone {
                    Some(zone @ (ZoneIdentifier::Iana(_) | ZoneIdentifier::Offset(_))) => {
                        format!("DTSTART;TZID={zone}:{wall}")
                    }
                    Some(ZoneIdentifier::Unresolved(_)) | None => format!("DTSTART:{wall}"),
                }
            }
        };
        out.push_str("\nRRULE:");
        out.push_str(&self.spec.body);

        if !self.spec.rdates.is_empty() {
            let rdates = self
                .spec
                .rdates
                .iter()
                .map(|value| {
                    if value.date_only {
                        value.wall.format("%Y%m%d").to_string()
                    } else {
                        value.instant.format("%Y%m%dT%H%M%SZ").to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(",");
            out.push_str("\nRDATE:");
            out.push_str(&rdates);
        }
        out
    }

    /// Human-readable description; unknown locales fall back to English.
    #[must_use]
    pub fn describe(&self, locale: &str) -> String {
        describe(&self.spec.options, locale)
    }

    /// Walks `[from, to]` a page of `max_instances` at a time and returns the
    /// first (`first == true`) or last instance accepted by `accept`.
    fn scan(
        &self,
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
        accept: &dyn Fn(&TimeValue) -> bool,
        first: bool,
    ) -> Option<TimeValue> {
        let page_size = usize::from(self.max_instances);
        let mut cursor = from;
        let mut found = None;
        loop {
            let page = self.compiled.enumerate(cursor, to, self.max_instances);
            let Some(&tail) = page.last() else {
                return found;
            };
            let full = page.len() >= page_size;
            let mut accepted = page
                .into_iter()
                .map(|wall| self.instance(wall))
                .filter(|value| accept(value));
            if first {
                if let Some(hit) = accepted.next() {
                    return Some(hit);
                }
            } else if let Some(hit) = accepted.last() {
                found = Some(hit);
            }
            if !full {
                return found;
            }
            cursor = Some(tail + TimeDelta::seconds(1));
        }
    }

    fn wall_of(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        self.database.to_wall(instant, &self.spec.frame.zone())
    }

    fn instance(&self, wall: NaiveDateTime) -> TimeValue {
        let zone = self.spec.dtstart.zone.clone();
        match &self.spec.frame {
            RuleFrame::Date(frame_zone) => {
                let date = wall.date();
                let midnight = self
                    .database
                    .to_instant(date.and_time(NaiveTime::MIN), frame_zone);
                TimeValue::date(date, midnight, zone)
            }
            RuleFrame::Utc => TimeValue::utc(wall.and_utc()),
            RuleFrame::Wall(frame_zone) => {
                TimeValue::date_time(self.database.to_instant(wall, frame_zone), wall, zone)
            }
        }
    }
}

fn sorted_unique(mut values: Vec<TimeValue>, limit: u16) -> Vec<TimeValue> {
    values.sort_by_key(|value| value.instant);
    values.dedup_by_key(|value| value.instant);
    values.truncate(usize::from(limit));
    values
}
