//! Occurrence expansion over a date range.
//!
//! Full-day values are compared by calendar day, never by instant, so an
//! all-day event cannot drift to a neighbouring day under large offsets or
//! across DST transitions.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use kalends_core::config::DEFAULT_MAX_INSTANCES;

use super::error::ExpandError;
use crate::rfc::ical::core::{Component, TimeValue, ZoneIdentifier};
use crate::rfc::ical::timezone::{TimezoneResolver, ZoneRef};

/// Range and switches for [`Expander::expand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandOptions {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Substitute RECURRENCE-ID overrides for the instances they replace.
    pub include_overrides: bool,
    /// Drop instances listed in EXDATE.
    pub exclude_exdates: bool,
    /// Also return instances that started before `from` but are still running.
    pub expand_ongoing: bool,
    /// Engine enumeration cap for this call.
    pub max_instances: u16,
}

impl ExpandOptions {
    #[must_use]
    pub const fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            include_overrides: true,
            exclude_exdates: true,
            expand_ongoing: false,
            max_instances: DEFAULT_MAX_INSTANCES,
        }
    }

    #[must_use]
    pub const fn include_overrides(mut self, include: bool) -> Self {
        self.include_overrides = include;
        self
    }

    #[must_use]
    pub const fn exclude_exdates(mut self, exclude: bool) -> Self {
        self.exclude_exdates = exclude;
        self
    }

    #[must_use]
    pub const fn expand_ongoing(mut self, ongoing: bool) -> Self {
        self.expand_ongoing = ongoing;
        self
    }

    #[must_use]
    pub const fn max_instances(mut self, max_instances: u16) -> Self {
        self.max_instances = max_instances;
        self
    }
}

/// One concrete occurrence of a component.
#[derive(Debug, Clone)]
pub struct Occurrence<'a> {
    pub start: TimeValue,
    pub end: TimeValue,
    pub summary: Option<String>,
    pub is_full_day: bool,
    pub is_recurring: bool,
    pub is_override: bool,
    /// The component the occurrence came from (the override record for overrides).
    pub source: &'a Component,
}

/// Length of the base occurrence.
#[derive(Debug, Clone, Copy)]
enum Span {
    Days(i64),
    Exact(TimeDelta),
}

/// Expands components into occurrences.
#[derive(Debug, Clone, Copy)]
pub struct Expander<'r> {
    resolver: &'r TimezoneResolver,
}

impl<'r> Expander<'r> {
    #[must_use]
    pub const fn new(resolver: &'r TimezoneResolver) -> Self {
        Self { resolver }
    }

    /// ## Summary
    /// Returns the component's occurrences in `[options.from, options.to]`,
    /// ascending by start.
    ///
    /// Components without a start produce nothing.
    ///
    /// ## Errors
    /// Returns [`ExpandError::InvalidRange`] if `from` is after `to`.
    #[tracing::instrument(
        skip(self, component, options),
        fields(uid = component.uid.as_deref(), from = %options.from, to = %options.to)
    )]
    pub fn expand<'c>(
        &self,
        component: &'c Component,
        options: &ExpandOptions,
    ) -> Result<Vec<Occurrence<'c>>, ExpandError> {
        if options.from > options.to {
            return Err(ExpandError::InvalidRange {
                from: options.from,
                to: options.to,
            });
        }
        let Some(start) = &component.start else {
            tracing::trace!("Component has no start, nothing to expand");
            return Ok(Vec::new());
        };

        let span = self.span_of(component, start);
        let is_recurring = component.rrule.is_some() || !component.rdates.is_empty();

        let mut occurrences = if is_recurring {
            self.expand_recurring(component, start, span, options)
        } else {
            let occurrence = self.occurrence(component, start.clone(), span, false);
            let occurrence = Occurrence {
                is_override: component.is_override(),
                ..occurrence
            };
            vec![occurrence]
        };

        occurrences.retain(|occurrence| self.in_range(occurrence, options));
        occurrences.sort_by_key(|occurrence| occurrence.start.instant);

        tracing::debug!(count = occurrences.len(), "Expanded component");
        Ok(occurrences)
    }

    fn expand_recurring<'c>(
        &self,
        component: &'c Component,
        start: &TimeValue,
        span: Span,
        options: &ExpandOptions,
    ) -> Vec<Occurrence<'c>> {
        let full_day = start.date_only;

        let mut from = options.from;
        let mut to = options.to;
        if options.expand_ongoing {
            from -= match span {
                Span::Days(days) => TimeDelta::days(days.max(0)),
                Span::Exact(delta) => delta.max(TimeDelta::zero()),
            };
        }
        if full_day {
            // A day on each side guards against offset truncation; the
            // re-filter compares calendar days.
            from -= TimeDelta::days(1);
            to += TimeDelta::days(1);
        }

        let instances = match &component.rrule {
            Some(rule) => rule.between_limited(from, to, options.max_instances),
            None => {
                let mut instances: Vec<TimeValue> = std::iter::once(start.clone())
                    .chain(component.rdates.iter().cloned())
                    .filter(|value| value.instant >= from && value.instant <= to)
                    .collect();
                instances.sort_by_key(|value| value.instant);
                instances.dedup_by_key(|value| value.instant);
                instances
            }
        };
        let sub_daily = component
            .rrule
            .as_ref()
            .is_some_and(super::rule::RecurrenceRule::is_sub_daily);

        let mut occurrences = Vec::with_capacity(instances.len());
        for instance in instances {
            let keys = lookup_keys(&instance, full_day, sub_daily);

            if options.exclude_exdates && keys.iter().any(|k| component.exceptions.contains_key(k)) {
                tracing::trace!(instance = %instance, "Instance excluded");
                continue;
            }

            let replacement = options
                .include_overrides
                .then(|| keys.iter().find_map(|k| component.overrides.get(k)))
                .flatten();

            let occurrence = match replacement {
                Some(record) => self.override_occurrence(record, instance, span),
                None => self.occurrence(component, instance, span, true),
            };
            occurrences.push(occurrence);
        }
        occurrences
    }

    fn occurrence<'c>(
        &self,
        component: &'c Component,
        start: TimeValue,
        span: Span,
        is_recurring: bool,
    ) -> Occurrence<'c> {
        let (start, end) = self.with_end(start, span);
        Occurrence {
            is_full_day: start.date_only,
            start,
            end,
            summary: component.summary.clone(),
            is_recurring,
            is_override: false,
            source: component,
        }
    }

    /// Builds the occurrence for an override record; a record without its
    /// own start keeps the enumerated one, one without an end keeps the base span.
    fn override_occurrence<'c>(
        &self,
        record: &'c Component,
        instance: TimeValue,
        base_span: Span,
    ) -> Occurrence<'c> {
        let start = record.start.clone().unwrap_or(instance);
        let (start, end) = match &record.end {
            Some(end) if !start.date_only => (start, end.clone()),
            Some(end) => {
                let days = (end.calendar_date() - start.calendar_date()).num_days();
                self.with_end(start, Span::Days(days))
            }
            None => self.with_end(start, base_span),
        };
        Occurrence {
            is_full_day: start.date_only,
            start,
            end,
            summary: record.summary.clone(),
            is_recurring: true,
            is_override: true,
            source: record,
        }
    }

    /// Normalizes full-day starts to local midnight and attaches the end.
    fn with_end(&self, start: TimeValue, span: Span) -> (TimeValue, TimeValue) {
        if start.date_only {
            let days = match span {
                Span::Days(days) => days,
                Span::Exact(delta) => delta.num_days(),
            };
            let day = start.calendar_date();
            let end_day = day
                .checked_add_signed(TimeDelta::days(days))
                .unwrap_or(day);
            let zone = start.zone.clone();
            return (
                self.midnight(day, zone.clone()),
                self.midnight(end_day, zone),
            );
        }

        let delta = match span {
            Span::Exact(delta) => delta,
            Span::Days(days) => TimeDelta::days(days),
        };
        let instant = start.instant + delta;
        let end = if start.is_utc() {
            TimeValue::utc(instant)
        } else {
            let zone = self.resolver.zone_ref_for(start.zone.as_ref());
            TimeValue::date_time(
                instant,
                self.resolver.local_wall_time(instant, &zone),
                start.zone.clone(),
            )
        };
        (start, end)
    }

    /// Local midnight of `day`, derived from the calendar day.
    fn midnight(&self, day: NaiveDate, zone: Option<ZoneIdentifier>) -> TimeValue {
        let zone_ref = self.resolver.zone_ref_for(zone.as_ref());
        let instant = self
            .resolver
            .parse_local_time_as_instant(day.and_time(NaiveTime::MIN), &zone_ref);
        TimeValue::date(day, instant, zone)
    }

    fn span_of(&self, component: &Component, start: &TimeValue) -> Span {
        let Some(end) = &component.end else {
            return if start.date_only {
                Span::Days(1)
            } else {
                Span::Exact(TimeDelta::zero())
            };
        };
        if start.date_only {
            Span::Days((end.calendar_date() - start.calendar_date()).num_days())
        } else {
            Span::Exact(end.instant - start.instant)
        }
    }

    fn in_range(&self, occurrence: &Occurrence<'_>, options: &ExpandOptions) -> bool {
        if occurrence.is_full_day {
            let zone = self
                .resolver
                .zone_ref_for(occurrence.start.zone.as_ref());
            let from_day = self.day_of(options.from, &zone);
            let to_day = self.day_of(options.to, &zone);
            let start_day = occurrence.start.calendar_date();
            let end_day = occurrence.end.calendar_date();

            return start_day <= to_day
                && (start_day >= from_day || (options.expand_ongoing && end_day > from_day));
        }

        let start = occurrence.start.instant;
        let end = occurrence.end.instant;
        start <= options.to && (start >= options.from || (options.expand_ongoing && end > options.from))
    }

    /// Calendar day of `instant` in `zone`. A `to` at local midnight
    /// therefore still covers that whole day.
    fn day_of(&self, instant: DateTime<Utc>, zone: &ZoneRef) -> NaiveDate {
        self.resolver.local_wall_time(instant, zone).date()
    }
}

/// Index keys to look an instance up under.
///
/// Full-day instances use their calendar day. Sub-daily rules use the exact
/// instant only, since one day holds many instances. Everything else tries
/// the exact instant, then the day.
fn lookup_keys(instance: &TimeValue, full_day: bool, sub_daily: bool) -> Vec<String> {
    if full_day || instance.date_only {
        return vec![instance.date_key()];
    }
    let exact = instance.instant_key().into_iter();
    if sub_daily {
        exact.collect()
    } else {
        exact.chain(std::iter::once(instance.date_key())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfc::ical::core::{ComponentKind, ExceptionIndex};
    use crate::rfc::ical::expand::build_rule;
    use chrono::TimeZone;
    use chrono_tz::Tz;

    fn resolver() -> TimezoneResolver {
        TimezoneResolver::with_host_zone(ZoneRef::Iana(Tz::Europe__Oslo))
    }

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn event(start: TimeValue, end: TimeValue) -> Component {
        let mut event = Component::new(ComponentKind::Event);
        event.uid = Some("e".to_string());
        event.summary = Some("Standup".to_string());
        event.start = Some(start);
        event.end = Some(end);
        event
    }

    fn day(y: i32, m: u32, d: u32) -> TimeValue {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        let midnight = Tz::Europe__Oslo
            .from_local_datetime(&date.and_time(NaiveTime::MIN))
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        TimeValue::date(date, midnight, None)
    }

    #[test]
    fn inverted_range_is_rejected() {
        let resolver = resolver();
        let component = event(
            TimeValue::utc(utc(2025, 1, 1, 9)),
            TimeValue::utc(utc(2025, 1, 1, 10)),
        );
        let options = ExpandOptions::new(utc(2025, 2, 1, 0), utc(2025, 1, 1, 0));
        assert!(matches!(
            Expander::new(&resolver).expand(&component, &options),
            Err(ExpandError::InvalidRange { .. })
        ));
    }

    #[test]
    fn single_event_in_and_out_of_range() {
        let resolver = resolver();
        let component = event(
            TimeValue::utc(utc(2025, 1, 1, 9)),
            TimeValue::utc(utc(2025, 1, 1, 10)),
        );
        let expander = Expander::new(&resolver);

        let hits = expander
            .expand(&component, &ExpandOptions::new(utc(2025, 1, 1, 0), utc(2025, 1, 2, 0)))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(!hits[0].is_recurring);
        assert_eq!(hits[0].end.instant, utc(2025, 1, 1, 10));

        let misses = expander
            .expand(&component, &ExpandOptions::new(utc(2025, 1, 1, 9) + TimeDelta::minutes(30), utc(2025, 1, 2, 0)))
            .unwrap();
        assert!(misses.is_empty());

        let ongoing = expander
            .expand(
                &component,
                &ExpandOptions::new(utc(2025, 1, 1, 9) + TimeDelta::minutes(30), utc(2025, 1, 2, 0))
                    .expand_ongoing(true),
            )
            .unwrap();
        assert_eq!(ongoing.len(), 1);
    }

    #[test]
    fn exdates_and_overrides() {
        let resolver = resolver();
        let mut component = event(
            TimeValue::utc(utc(2025, 1, 1, 9)),
            TimeValue::utc(utc(2025, 1, 1, 10)),
        );
        component.rrule = Some(
            build_rule("FREQ=DAILY;COUNT=5", component.start.as_ref(), &[], &resolver).unwrap(),
        );
        let mut exceptions = ExceptionIndex::default();
        exceptions.insert(TimeValue::utc(utc(2025, 1, 2, 9)));
        component.exceptions = exceptions;

        let mut moved = event(
            TimeValue::utc(utc(2025, 1, 3, 14)),
            TimeValue::utc(utc(2025, 1, 3, 16)),
        );
        moved.summary = Some("Moved".to_string());
        moved.recurrence_id = Some(TimeValue::utc(utc(2025, 1, 3, 9)));
        component.overrides.insert(moved);

        let expander = Expander::new(&resolver);
        let range = ExpandOptions::new(utc(2025, 1, 1, 0), utc(2025, 1, 31, 0));
        let occurrences = expander.expand(&component, &range).unwrap();
        let starts: Vec<_> = occurrences.iter().map(|o| o.start.instant).collect();
        assert_eq!(
            starts,
            vec![utc(2025, 1, 1, 9), utc(2025, 1, 3, 14), utc(2025, 1, 4, 9), utc(2025, 1, 5, 9)]
        );
        assert!(occurrences[1].is_override);
        assert_eq!(occurrences[1].summary.as_deref(), Some("Moved"));
        assert_eq!(occurrences[1].end.instant, utc(2025, 1, 3, 16));
        assert!(occurrences.iter().all(|o| o.is_recurring));

        let raw = expander
            .expand(&component, &range.clone().include_overrides(false).exclude_exdates(false))
            .unwrap();
        assert_eq!(raw.len(), 5);
        assert!(raw.iter().all(|o| !o.is_override));
    }

    #[test]
    fn full_day_keeps_weekday_across_dst() {
        let resolver = resolver();
        let mut component = event(day(2025, 3, 24), day(2025, 3, 25));
        component.rrule = Some(
            build_rule("FREQ=WEEKLY;COUNT=3", component.start.as_ref(), &[], &resolver).unwrap(),
        );
        let occurrences = Expander::new(&resolver)
            .expand(&component, &ExpandOptions::new(utc(2025, 3, 1, 0), utc(2025, 4, 30, 0)))
            .unwrap();
        let days: Vec<_> = occurrences.iter().map(|o| o.start.date_key()).collect();
        assert_eq!(days, vec!["2025-03-24", "2025-03-31", "2025-04-07"]);
        assert!(occurrences.iter().all(|o| o.is_full_day));
        assert_eq!(occurrences[1].end.date_key(), "2025-04-01");
        // Oslo midnight after DST is 22:00Z the previous day.
        assert_eq!(occurrences[1].start.instant, utc(2025, 3, 30, 22));
    }

    #[test]
    fn full_day_range_compares_calendar_days() {
        let resolver = resolver();
        let component = event(day(2025, 1, 10), day(2025, 1, 11));
        let expander = Expander::new(&resolver);
        // `to` exactly at local midnight of the 10th still includes that day.
        let to = Tz::Europe__Oslo
            .with_ymd_and_hms(2025, 1, 10, 0, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let hits = expander
            .expand(&component, &ExpandOptions::new(utc(2025, 1, 1, 0), to))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].is_full_day);
    }

    #[test]
    fn lookup_key_choice() {
        let value = TimeValue::utc(utc(2025, 1, 1, 9));
        assert_eq!(
            lookup_keys(&value, false, false),
            vec!["2025-01-01T09:00:00Z", "2025-01-01"]
        );
        assert_eq!(lookup_keys(&value, false, true), vec!["2025-01-01T09:00:00Z"]);
        assert_eq!(lookup_keys(&day(2025, 1, 1), true, false), vec!["2025-01-01"]);
    }
}
