//! [`RecurrenceEngine`] backed by the `rrule` crate.
//!
//! The engine runs every rule in a UTC clock whose readings are the rule
//! frame's wall times, so BYHOUR and friends apply to local time and DST
//! shifts never move an instance's wall-clock hour.

use std::sync::Arc;

use chrono::{NaiveDateTime, TimeDelta, TimeZone};
use rrule::{RRule, RRuleError, RRuleSet, Tz, Unvalidated};

use super::error::RuleError;
use super::rule::{CompiledRule, EmptyRule, RecurrenceEngine, RuleSpec};

#[derive(Debug, Clone, Copy, Default)]
pub struct RruleCrateEngine;

impl RecurrenceEngine for RruleCrateEngine {
    fn compile(&self, spec: &RuleSpec) -> Result<Arc<dyn CompiledRule>, RuleError> {
        if spec.is_empty() {
            tracing::debug!(body = %spec.body, "UNTIL precedes DTSTART, rule is empty");
            return Ok(Arc::new(EmptyRule));
        }

        let dtstart = Tz::UTC.from_utc_datetime(&spec.dtstart.wall);
        let body = spec.engine_body();
        let engine_error = |err: RRuleError| RuleError::Engine(err.to_string());

        let rule = body
            .parse::<RRule<Unvalidated>>()
            .map_err(engine_error)?
            .validate(dtstart)
            .map_err(engine_error)?;

        tracing::trace!(body = %body, "Compiled recurrence rule");
        Ok(Arc::new(RruleSetRule {
            set: RRuleSet::new(dtstart).rrule(rule),
        }))
    }
}

#[derive(Debug, Clone)]
struct RruleSetRule {
    set: RRuleSet,
}

impl CompiledRule for RruleSetRule {
    fn enumerate(
        &self,
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
        limit: u16,
    ) -> Vec<NaiveDateTime> {
        let mut set = self.set.clone();
        // Bounds are padded so the engine's inclusivity does not matter.
        if let Some(from) = from {
            set = set.after(Tz::UTC.from_utc_datetime(&(from - TimeDelta::seconds(1))));
        }
        if let Some(to) = to {
            set = set.before(Tz::UTC.from_utc_datetime(&(to + TimeDelta::seconds(1))));
        }

        let result = set.all(limit);
        if result.limited {
            tracing::debug!(limit, "Recurrence enumeration hit its limit");
        }

        result
            .dates
            .into_iter()
            .map(|date| date.naive_utc())
            .filter(|wall| from.is_none_or(|from| *wall >= from))
            .filter(|wall| to.is_none_or(|to| *wall <= to))
            .collect()
    }
}
