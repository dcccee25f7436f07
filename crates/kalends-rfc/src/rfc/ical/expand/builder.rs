//! Builds [`RecurrenceRule`]s from a start value and RRULE text.
//!
//! The builder's main job is repairing UNTIL values whose type does not
//! match DTSTART, which real producers get wrong regularly.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use kalends_core::config::DEFAULT_MAX_INSTANCES;

use super::engine::RruleCrateEngine;
use super::error::RuleError;
use super::rule::{RecurrenceEngine, RecurrenceRule, RuleFrame, RuleOptions, RuleSpec};
use crate::rfc::ical::core::TimeValue;
use crate::rfc::ical::parse::datetime::{
    DateTimeContext, DateTimeOutcome, normalize_hour_24, parse_date_time,
};
use crate::rfc::ical::parse::lexer::parse_content_line;
use crate::rfc::ical::timezone::TimezoneResolver;

/// Rule parts passed to the engine; anything else (e.g. `X-` parts) is dropped.
const RULE_PARTS: &[&str] = &[
    "FREQ",
    "UNTIL",
    "COUNT",
    "INTERVAL",
    "BYSECOND",
    "BYMINUTE",
    "BYHOUR",
    "BYDAY",
    "BYMONTHDAY",
    "BYYEARDAY",
    "BYWEEKNO",
    "BYMONTH",
    "BYSETPOS",
    "WKST",
];

/// Turns RRULE text into [`RecurrenceRule`]s with a chosen engine.
#[derive(Debug, Clone)]
pub struct RuleBuilder<'r> {
    resolver: &'r TimezoneResolver,
    engine: Arc<dyn RecurrenceEngine>,
    max_instances: u16,
}

impl<'r> RuleBuilder<'r> {
    /// Returns a builder using the `rrule` crate engine.
    #[must_use]
    pub fn new(resolver: &'r TimezoneResolver) -> Self {
        Self {
            resolver,
            engine: Arc::new(RruleCrateEngine),
            max_instances: DEFAULT_MAX_INSTANCES,
        }
    }

    #[must_use]
    pub fn with_engine(mut self, engine: Arc<dyn RecurrenceEngine>) -> Self {
        self.engine = engine;
        self
    }

    #[must_use]
    pub const fn with_max_instances(mut self, max_instances: u16) -> Self {
        self.max_instances = max_instances;
        self
    }

    /// The resolver start and UNTIL values are read with.
    #[must_use]
    pub const fn resolver(&self) -> &'r TimezoneResolver {
        self.resolver
    }

    /// ## Summary
    /// Builds a rule from RRULE text and the component's start.
    ///
    /// A `DTSTART` line embedded in `text` takes precedence over `start`.
    /// The body is taken from `FREQ=` onwards; UNTIL is normalized to the
    /// start's value type before the engine sees it.
    ///
    /// ## Errors
    /// Returns an error if there is no start, no FREQ, an UNTIL that is not
    /// a date or date-time, or the engine rejects the rule.
    #[tracing::instrument(skip(self, start, rdates), fields(start = ?start.map(ToString::to_string)))]
    pub fn build(
        &self,
        text: &str,
        start: Option<&TimeValue>,
        rdates: &[TimeValue],
    ) -> Result<RecurrenceRule, RuleError> {
        let embedded = self.embedded_start(text);
        let start = embedded.as_ref().or(start).ok_or(RuleError::MissingStart)?;
        let body = rule_body(text).ok_or(RuleError::MissingFrequency)?;
        let frame = self.frame_for(start);

        let mut parts = rule_parts(body);
        let until = parts
            .iter()
            .position(|(key, _)| key == "UNTIL")
            .map(|index| parts.remove(index).1)
            .map(|raw| self.normalize_until(&raw, start, frame))
            .transpose()?;

        let mut body = parts
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>();
        if let Some(until) = &until {
            body.push(format!("UNTIL={}", until.rfc));
        }
        let body = body.join(";");

        let options = RuleOptions::from_parts(&parts, until.as_ref().map(|u| u.value.clone()))?;
        let spec = RuleSpec {
            dtstart: start.clone(),
            frame,
            body,
            until_wall: until.map(|u| u.wall),
            options,
            rdates: rdates.to_vec(),
        };

        let compiled = self.engine.compile(&spec)?;
        tracing::debug!(body = %spec.body, "Built recurrence rule");
        Ok(RecurrenceRule::new(
            spec,
            compiled,
            self.resolver.database_handle(),
            self.max_instances,
        ))
    }

    fn frame_for(&self, start: &TimeValue) -> RuleFrame {
        let zone = self.resolver.zone_ref_for(start.zone.as_ref());
        if start.date_only {
            RuleFrame::Date(zone)
        } else if start.is_utc() {
            RuleFrame::Utc
        } else {
            RuleFrame::Wall(zone)
        }
    }

    /// Parses a `DTSTART[;params]:value` line embedded in the rule text.
    fn embedded_start(&self, text: &str) -> Option<TimeValue> {
        let line = text
            .lines()
            .map(str::trim)
            .find(|line| line.get(..7).is_some_and(|p| p.eq_ignore_ascii_case("DTSTART")))?;
        let content = parse_content_line(line, 1).ok()?;

        let vtimezones = HashMap::new();
        let ctx = DateTimeContext {
            resolver: self.resolver,
            vtimezones: &vtimezones,
            default_tzid: None,
        };
        match parse_date_time(
            &content.raw_value,
            content.get_param_value("VALUE"),
            content.get_param_value("TZID"),
            &ctx,
        ) {
            DateTimeOutcome::Value(value) => Some(value),
            DateTimeOutcome::Verbatim(raw) | DateTimeOutcome::Impossible(raw) => {
                tracing::debug!(value = %raw, "Ignoring unparseable embedded DTSTART");
                None
            }
        }
    }

    /// ## Summary
    /// Matches UNTIL to the start's value type.
    ///
    /// - date-only start: any time part is dropped
    /// - date-time start, date-only UNTIL: 23:59:59 that day in the start's zone
    /// - date-time start, UNTIL without `Z`: read in the start's zone
    fn normalize_until(
        &self,
        raw: &str,
        start: &TimeValue,
        frame: RuleFrame,
    ) -> Result<Until, RuleError> {
        let mismatch = || RuleError::UntilMismatch(raw.to_string());
        let normalized = normalize_hour_24(raw.trim().trim_matches('"'));
        let (digits, utc) = match normalized.strip_suffix(['Z', 'z']) {
            Some(digits) => (digits, true),
            None => (normalized.as_str(), false),
        };

        let written = if digits.len() == 8 {
            let date = NaiveDate::parse_from_str(digits, "%Y%m%d").map_err(|_| mismatch())?;
            UntilWritten::Date(date)
        } else {
            let wall = NaiveDateTime::parse_from_str(&digits.to_ascii_uppercase(), "%Y%m%dT%H%M%S")
                .map_err(|_| mismatch())?;
            UntilWritten::DateTime { wall, utc }
        };

        let zone = frame.zone();
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).ok_or_else(mismatch)?;

        if start.date_only {
            let date = match written {
                UntilWritten::Date(date) => date,
                UntilWritten::DateTime { wall, .. } => wall.date(),
            };
            let midnight = self
                .resolver
                .parse_local_time_as_instant(date.and_time(NaiveTime::MIN), &zone);
            return Ok(Until {
                value: TimeValue::date(date, midnight, start.zone.clone()),
                rfc: date.format("%Y%m%d").to_string(),
                wall: date.and_time(end_of_day),
            });
        }

        let instant = match written {
            UntilWritten::Date(date) => {
                tracing::debug!(until = raw, "Date-only UNTIL on a date-time start");
                self.resolver
                    .parse_local_time_as_instant(date.and_time(end_of_day), &zone)
            }
            UntilWritten::DateTime { wall, utc: true } => wall.and_utc(),
            UntilWritten::DateTime { wall, utc: false } => {
                self.resolver.parse_local_time_as_instant(wall, &zone)
            }
        };
        Ok(Until {
            value: TimeValue::utc(instant),
            rfc: instant.format("%Y%m%dT%H%M%SZ").to_string(),
            wall: self.resolver.local_wall_time(instant, &zone),
        })
    }
}

/// ## Summary
/// Builds a rule with the default engine.
///
/// ## Errors
/// See [`RuleBuilder::build`].
pub fn build_rule(
    text: &str,
    start: Option<&TimeValue>,
    rdates: &[TimeValue],
    resolver: &TimezoneResolver,
) -> Result<RecurrenceRule, RuleError> {
    RuleBuilder::new(resolver).build(text, start, rdates)
}

enum UntilWritten {
    Date(NaiveDate),
    DateTime { wall: NaiveDateTime, utc: bool },
}

struct Until {
    value: TimeValue,
    rfc: String,
    wall: NaiveDateTime,
}

/// Returns the rule text from `FREQ=` up to the end of its line.
fn rule_body(text: &str) -> Option<&str> {
    let start = text.to_ascii_uppercase().find("FREQ=")?;
    let body = &text[start..];
    let end = body.find(['\r', '\n']).unwrap_or(body.len());
    Some(body[..end].trim().trim_end_matches(';'))
}

/// Splits a body into uppercase `(KEY, VALUE)` pairs, keeping the first of
/// each known key with FREQ first.
fn rule_parts(body: &str) -> Vec<(String, String)> {
    let mut parts: Vec<(String, String)> = Vec::new();
    for part in body.split(';') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_uppercase();
        let value = value.trim().to_ascii_uppercase();
        if value.is_empty() || parts.iter().any(|(k, _)| *k == key) {
            continue;
        }
        if !RULE_PARTS.contains(&key.as_str()) {
            tracing::trace!(part = %key, "Dropping unknown rule part");
            continue;
        }
        parts.push((key, value));
    }
    parts.sort_by_key(|(key, _)| key != "FREQ");
    parts
}
