//! Expansion of a parsed document into serializable occurrence records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use kalends_rfc::rfc::ical::{CalendarDocument, ExpandOptions, Expander, Occurrence, TimeValue};

use crate::error::AppResult;

/// One expanded occurrence as printed by the binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccurrenceReport {
    pub uid: Option<String>,
    pub kind: String,
    pub summary: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Start as written, in its own zone.
    pub local_start: String,
    pub zone: Option<String>,
    pub full_day: bool,
    pub recurring: bool,
    #[serde(rename = "override")]
    pub is_override: bool,
    /// Prose rendering of the recurrence rule, for recurring sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl OccurrenceReport {
    fn new(occurrence: &Occurrence<'_>, rule: Option<String>) -> Self {
        Self {
            uid: occurrence.source.uid.clone(),
            kind: occurrence.source.kind.to_string(),
            summary: occurrence.summary.clone(),
            start: occurrence.start.instant,
            end: occurrence.end.instant,
            local_start: local_text(&occurrence.start),
            zone: occurrence.start.zone.as_ref().map(ToString::to_string),
            full_day: occurrence.is_full_day,
            recurring: occurrence.is_recurring,
            is_override: occurrence.is_override,
            rule,
        }
    }
}

fn local_text(value: &TimeValue) -> String {
    if value.date_only {
        value.wall.format("%Y-%m-%d").to_string()
    } else {
        value.wall.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// ## Summary
/// Expands every schedulable component (or only `uid`) and returns the
/// occurrences sorted by start.
///
/// ## Errors
/// Returns an error if the range is inverted.
pub fn collect(
    document: &CalendarDocument,
    expander: &Expander<'_>,
    options: &ExpandOptions,
    uid: Option<&str>,
    locale: &str,
) -> AppResult<Vec<OccurrenceReport>> {
    let mut reports = Vec::new();

    for component in document
        .schedulable()
        .filter(|c| uid.is_none_or(|uid| c.uid.as_deref() == Some(uid)))
    {
        let rule = component.rrule.as_ref().map(|rule| rule.describe(locale));
        let occurrences = expander.expand(component, options)?;
        tracing::trace!(uid = ?component.uid, count = occurrences.len(), "Expanded component");
        reports.extend(
            occurrences
                .iter()
                .map(|occurrence| OccurrenceReport::new(occurrence, rule.clone())),
        );
    }

    reports.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.uid.cmp(&b.uid)));
    tracing::debug!(count = reports.len(), "Collected occurrences");
    Ok(reports)
}
