//! Component stack assembler (RFC 5545 §3.4-3.6).
//!
//! A stack machine over content lines: `BEGIN` pushes a frame, `END`
//! finalizes the top frame and folds it into its parent or the document.
//! Folding into the document is a pure function of the old document and
//! the finished component, see [`fold_into_document`].

use std::collections::{HashMap, HashSet};

use chrono::TimeDelta;

use super::datetime::{DateTimeContext, DateTimeOutcome, add_days, parse_date_time};
use super::error::{ParseError, ParseErrorKind, ParseResult};
use super::lexer::parse_content_line;
use super::values::{decode_params, decode_scalar, split_value_list, unescape_text};
use crate::rfc::ical::core::{
    CalendarDocument, CalendarMetadata, Component, ComponentKind, ContentLine, Diagnostic,
    DiagnosticKind, Duration, OverrideInsert, Property, PropertyValue, TimeValue,
    names,
};
use crate::rfc::ical::expand::RuleBuilder;
use crate::rfc::ical::timezone::{TimezoneResolver, VTimezone};

/// An open component and the single-valued properties it has seen.
#[derive(Debug)]
struct Frame {
    component: Component,
    line: usize,
    seen: HashSet<&'static str>,
}

/// Builds a [`CalendarDocument`] one content line at a time.
#[derive(Debug)]
pub struct Assembler<'r> {
    resolver: &'r TimezoneResolver,
    rules: RuleBuilder<'r>,
    stack: Vec<Frame>,
    document: CalendarDocument,
    vtimezones: HashMap<String, VTimezone>,
    last_tzid: Option<String>,
    lines: usize,
}

impl<'r> Assembler<'r> {
    #[must_use]
    pub fn new(resolver: &'r TimezoneResolver) -> Self {
        Self {
            resolver,
            rules: RuleBuilder::new(resolver),
            stack: Vec::new(),
            document: CalendarDocument::default(),
            vtimezones: HashMap::new(),
            last_tzid: None,
            lines: 0,
        }
    }

    /// Uses a custom rule builder (engine or enumeration cap).
    #[must_use]
    pub fn with_rule_builder(mut self, rules: RuleBuilder<'r>) -> Self {
        self.rules = rules;
        self
    }

    /// ## Summary
    /// Feeds one unfolded content line.
    ///
    /// Lines that do not match the content-line grammar are dropped.
    ///
    /// ## Errors
    /// Returns an error for a repeated DTSTART/DTEND/DUE, or an EXDATE or
    /// RECURRENCE-ID whose digits name no real date or time.
    pub fn push_line(&mut self, line_num: usize, line: &str) -> ParseResult<()> {
        let content = match parse_content_line(line, line_num) {
            Ok(content) => content,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::trace!(error = %e, "Dropping malformed content line");
                return Ok(());
            }
        };
        self.lines += 1;

        match content.name.as_str() {
            names::BEGIN => {
                let name = content.raw_value.trim();
                tracing::trace!(component = name, line = line_num, "BEGIN");
                self.stack.push(Frame {
                    component: Component::named(ComponentKind::parse(name), name),
                    line: line_num,
                    seen: HashSet::new(),
                });
                Ok(())
            }
            names::END => {
                self.end(content.raw_value.trim(), line_num);
                Ok(())
            }
            _ => self.property(content),
        }
    }

    /// ## Summary
    /// Closes any components left open and returns the document.
    ///
    /// ## Errors
    /// Returns [`ParseErrorKind::EmptyInput`] if no content line was seen.
    pub fn finish(mut self) -> ParseResult<CalendarDocument> {
        if self.lines == 0 {
            return Err(ParseError::new(ParseErrorKind::EmptyInput, 1, 1));
        }

        while let Some(frame) = self.stack.pop() {
            self.diagnose(
                Diagnostic::new(
                    DiagnosticKind::UnclosedComponent,
                    format!("{} was never closed", frame.component.name),
                )
                .at_line(frame.line)
                .for_uid(frame.component.uid.as_deref()),
            );
            self.close(frame);
        }

        tracing::debug!(
            components = self.document.components.len(),
            diagnostics = self.document.diagnostics.len(),
            "iCalendar document assembled"
        );
        Ok(self.document)
    }

    fn end(&mut self, name: &str, line_num: usize) {
        let position = self
            .stack
            .iter()
            .rposition(|frame| frame.component.name.eq_ignore_ascii_case(name));

        let Some(position) = position else {
            self.diagnose(
                Diagnostic::new(
                    DiagnosticKind::MismatchedEnd,
                    format!("END:{name} has no open component"),
                )
                .at_line(line_num),
            );
            return;
        };

        while self.stack.len() > position + 1 {
            if let Some(frame) = self.stack.pop() {
                self.diagnose(
                    Diagnostic::new(
                        DiagnosticKind::MismatchedEnd,
                        format!("END:{name} closes {} implicitly", frame.component.name),
                    )
                    .at_line(line_num)
                    .for_uid(frame.component.uid.as_deref()),
                );
                self.close(frame);
            }
        }
        if let Some(frame) = self.stack.pop() {
            self.close(frame);
        }
    }

    fn close(&mut self, frame: Frame) {
        let component = self.finalize(frame.component);
        self.fold(component);
    }

    /// Applies end defaults and builds the recurrence rule.
    fn finalize(&mut self, mut component: Component) -> Component {
        if !component.kind.is_recurrence_capable() {
            return component;
        }

        if component.end.is_none()
            && let Some(start) = &component.start
        {
            component.end = match component.duration {
                Some(duration) => Some(self.add_duration(start, duration)),
                None if component.is_override() => None,
                None if start.date_only => Some(self.add_duration(start, Duration::days(1))),
                None => Some(start.clone()),
            };
        }

        if let Some(text) = &component.rrule_text {
            match self
                .rules
                .build(text, component.start.as_ref(), &component.rdates)
            {
                Ok(rule) => component.rrule = Some(rule),
                Err(e) => {
                    let diagnostic = Diagnostic::new(DiagnosticKind::RuleNotBuilt, e.to_string())
                        .for_uid(component.uid.as_deref());
                    self.diagnose(diagnostic);
                }
            }
        }
        component
    }

    /// Adds a DURATION: weeks and days on the wall clock, the rest exactly.
    fn add_duration(&self, start: &TimeValue, duration: Duration) -> TimeValue {
        let days = duration.calendar_days();
        let zone = self.resolver.zone_ref_for(start.zone.as_ref());
        if start.date_only {
            let wall = add_days(start.wall, days);
            let midnight = self.resolver.parse_local_time_as_instant(wall, &zone);
            return TimeValue::date(wall.date(), midnight, start.zone.clone());
        }

        let shifted = if start.is_utc() {
            start.instant + TimeDelta::days(days)
        } else {
            self.resolver
                .parse_local_time_as_instant(add_days(start.wall, days), &zone)
        };
        let instant = shifted + TimeDelta::seconds(duration.clock_seconds());
        if start.is_utc() {
            TimeValue::utc(instant)
        } else {
            TimeValue::date_time(
                instant,
                self.resolver.local_wall_time(instant, &zone),
                start.zone.clone(),
            )
        }
    }

    fn fold(&mut self, component: Component) {
        match component.kind {
            ComponentKind::Calendar => {
                self.document.metadata = calendar_metadata(&component);
                return;
            }
            ComponentKind::Alarm => {
                let parent = self.stack.last_mut().filter(|frame| {
                    matches!(frame.component.kind, ComponentKind::Event | ComponentKind::Todo)
                });
                if let Some(parent) = parent {
                    parent.component.alarms.push(component);
                    return;
                }
            }
            ComponentKind::Timezone => self.register_vtimezone(&component),
            _ => {}
        }

        if component.kind.is_top_level() {
            let document = std::mem::take(&mut self.document);
            self.document = fold_into_document(document, component);
            return;
        }

        match self.stack.last_mut() {
            Some(parent) => parent.component.children.push(component),
            None => {
                let document = std::mem::take(&mut self.document);
                self.document = fold_into_document(document, component);
            }
        }
    }

    fn register_vtimezone(&mut self, component: &Component) {
        match VTimezone::parse(component) {
            Ok(vtimezone) => {
                tracing::trace!(tzid = %vtimezone.tzid, "Registered VTIMEZONE");
                self.last_tzid = Some(vtimezone.tzid.clone());
                self.vtimezones.insert(vtimezone.tzid.clone(), vtimezone);
            }
            Err(e) => tracing::debug!(error = %e, "Ignoring unusable VTIMEZONE"),
        }
    }

    fn property(&mut self, content: ContentLine) -> ParseResult<()> {
        let Some(kind) = self.stack.last().map(|f| f.component.kind) else {
            tracing::trace!(name = %content.name, "Dropping property outside any component");
            return Ok(());
        };

        let value = if matches!(
            kind,
            ComponentKind::Timezone | ComponentKind::Standard | ComponentKind::Daylight
        ) {
            decode_scalar(&content.name, &content.raw_value)
        } else {
            self.typed_property(&content)?
        };

        let params = decode_params(&content.params);
        let (name, custom) = match content.name.strip_prefix("X-") {
            Some(suffix) => (suffix.to_ascii_lowercase(), true),
            None => (content.name.to_ascii_lowercase(), false),
        };
        let property = Property {
            name,
            params,
            raw: content.raw_value,
            value,
        };

        if let Some(frame) = self.stack.last_mut() {
            if custom {
                frame
                    .component
                    .custom
                    .entry(property.name.clone())
                    .or_default()
                    .push(property);
            } else {
                frame.component.add_property(property);
            }
        }
        Ok(())
    }

    /// Decodes a property of a schedulable component and sets its typed field.
    fn typed_property(&mut self, content: &ContentLine) -> ParseResult<PropertyValue> {
        let name = content.name.as_str();
        match name {
            names::DTSTART | names::DTEND | names::DUE | names::COMPLETED => {
                self.date_time_property(content)
            }
            names::RECURRENCE_ID => {
                let value = match self.read_time(content, &content.raw_value) {
                    DateTimeOutcome::Value(value) => value,
                    DateTimeOutcome::Impossible(raw) => {
                        return Err(ParseError::new(
                            ParseErrorKind::InvalidRecurrenceId,
                            content.line,
                            1,
                        )
                        .with_context(format!("RECURRENCE-ID value {raw}")));
                    }
                    DateTimeOutcome::Verbatim(raw) => {
                        self.diagnose_here(
                            DiagnosticKind::InvalidRecurrenceId,
                            content.line,
                            format!("RECURRENCE-ID '{raw}' is not a date or date-time, dropped"),
                        );
                        return Ok(PropertyValue::Text(raw));
                    }
                };
                self.with_top(|c| c.recurrence_id = Some(value.clone()));
                Ok(PropertyValue::Time(value))
            }
            names::EXDATE => {
                let mut values = Vec::new();
                for raw in split_value_list(&content.raw_value) {
                    match self.read_time(content, raw) {
                        DateTimeOutcome::Value(value) => values.push(value),
                        DateTimeOutcome::Impossible(raw) => {
                            return Err(ParseError::new(
                                ParseErrorKind::InvalidExceptionDate,
                                content.line,
                                1,
                            )
                            .with_context(format!("EXDATE value {raw}")));
                        }
                        DateTimeOutcome::Verbatim(raw) => self.diagnose_here(
                            DiagnosticKind::InvalidExceptionDate,
                            content.line,
                            format!("EXDATE entry '{raw}' is not a date or date-time, dropped"),
                        ),
                    }
                }
                self.with_top(|c| {
                    for value in &values {
                        c.exceptions.insert(value.clone());
                    }
                });
                Ok(PropertyValue::TimeList(values))
            }
            names::RDATE => {
                let mut values = Vec::new();
                for raw in split_value_list(&content.raw_value) {
                    // PERIOD values contribute their start.
                    let start = raw.split_once('/').map_or(raw, |(start, _)| start);
                    match self.read_time(content, start) {
                        DateTimeOutcome::Value(value) => values.push(value),
                        DateTimeOutcome::Verbatim(raw) | DateTimeOutcome::Impossible(raw) => {
                            self.diagnose_here(
                                DiagnosticKind::UnparsedDateTime,
                                content.line,
                                format!("RDATE entry '{raw}' kept as text"),
                            );
                        }
                    }
                }
                self.with_top(|c| c.rdates.extend(values.iter().cloned()));
                Ok(PropertyValue::TimeList(values))
            }
            names::RRULE => {
                self.with_top(|c| c.rrule_text = Some(content.raw_value.trim().to_string()));
                Ok(PropertyValue::Text(content.raw_value.clone()))
            }
            names::DURATION => {
                let duration = Duration::parse(&content.raw_value).unwrap_or_else(|| {
                    self.diagnose_here(
                        DiagnosticKind::MalformedDuration,
                        content.line,
                        format!("DURATION '{}' treated as zero", content.raw_value),
                    );
                    Duration::zero()
                });
                self.with_top(|c| c.duration = Some(duration));
                Ok(PropertyValue::Text(duration.to_string()))
            }
            names::UID => {
                let uid = unescape_text(content.raw_value.trim());
                self.with_top(|c| c.uid = Some(uid.clone()));
                Ok(PropertyValue::Text(uid))
            }
            names::SUMMARY => {
                let summary = unescape_text(&content.raw_value);
                self.with_top(|c| c.summary = Some(summary.clone()));
                Ok(PropertyValue::Text(summary))
            }
            _ => {
                let value = decode_scalar(name, &content.raw_value);
                if let (names::SEQUENCE, PropertyValue::Integer(sequence)) = (name, &value) {
                    let sequence = *sequence;
                    self.with_top(|c| c.sequence = sequence);
                }
                Ok(value)
            }
        }
    }

    fn date_time_property(&mut self, content: &ContentLine) -> ParseResult<PropertyValue> {
        let key = match content.name.as_str() {
            names::DTSTART => names::DTSTART,
            names::DTEND => names::DTEND,
            names::DUE => names::DUE,
            _ => names::COMPLETED,
        };
        if key != names::COMPLETED {
            let first = self
                .stack
                .last_mut()
                .is_some_and(|frame| frame.seen.insert(key));
            if !first {
                return Err(ParseError::new(ParseErrorKind::DuplicateProperty, content.line, 1)
                    .with_context(format!("{key} appears more than once")));
            }
        }

        let value = match self.read_time(content, &content.raw_value) {
            DateTimeOutcome::Value(value) => value,
            DateTimeOutcome::Verbatim(raw) | DateTimeOutcome::Impossible(raw) => {
                self.diagnose_here(
                    DiagnosticKind::UnparsedDateTime,
                    content.line,
                    format!("{key} '{raw}' kept as text"),
                );
                return Ok(PropertyValue::Text(raw));
            }
        };

        if let Some(tzid) = value
            .zone
            .as_ref()
            .filter(|zone| zone.is_unresolved())
            .map(ToString::to_string)
        {
            self.diagnose_here(
                DiagnosticKind::UnresolvedTimezone,
                content.line,
                format!("TZID '{tzid}' resolved nowhere, {key} read as host-local time"),
            );
        }

        self.with_top(|c| {
            let slot = match key {
                names::DTSTART => &mut c.start,
                names::DTEND => &mut c.end,
                names::DUE => &mut c.due,
                _ => &mut c.completed,
            };
            *slot = Some(value.clone());
        });
        Ok(PropertyValue::Time(value))
    }

    fn read_time(&self, content: &ContentLine, raw: &str) -> DateTimeOutcome {
        let ctx = DateTimeContext {
            resolver: self.resolver,
            vtimezones: &self.vtimezones,
            default_tzid: self.last_tzid.as_deref(),
        };
        parse_date_time(
            raw,
            content.get_param_value("VALUE"),
            content.get_param_value("TZID"),
            &ctx,
        )
    }

    /// Applies `f` to the component on top of the stack.
    fn with_top(&mut self, f: impl FnOnce(&mut Component)) {
        if let Some(frame) = self.stack.last_mut() {
            f(&mut frame.component);
        }
    }

    fn diagnose_here(&mut self, kind: DiagnosticKind, line: usize, message: String) {
        let uid = self
            .stack
            .last()
            .and_then(|frame| frame.component.uid.clone());
        self.diagnose(
            Diagnostic::new(kind, message)
                .at_line(line)
                .for_uid(uid.as_deref()),
        );
    }

    fn diagnose(&mut self, diagnostic: Diagnostic) {
        diagnostic.emit();
        self.document.diagnostics.push(diagnostic);
    }
}

/// ## Summary
/// Folds a finished top-level component into the document.
///
/// - No UID: stored under a generated identifier.
/// - Override (RECURRENCE-ID) with no record for its UID: becomes a
///   placeholder record carrying itself as its only override.
/// - Override with an existing record: added to that record's overrides,
///   per key, higher SEQUENCE winning.
/// - Other records: merged field by field into the existing record when
///   SEQUENCE is not lower (or the existing record is a placeholder),
///   discarded with a diagnostic otherwise.
#[must_use]
pub fn fold_into_document(mut document: CalendarDocument, component: Component) -> CalendarDocument {
    let Some(uid) = component.uid.clone() else {
        let key = uuid::Uuid::new_v4().to_string();
        tracing::trace!(key = %key, kind = %component.kind, "Storing component without UID");
        document.components.insert(key, component);
        return document;
    };

    let existing = document.components.remove(&uid);
    let stored = match (existing, component.is_override()) {
        (None, false) => component,
        (None, true) => {
            let mut placeholder = component.override_copy();
            placeholder.overrides.insert(component.override_copy());
            placeholder
        }
        (Some(mut canonical), true) => {
            let sequence = component.sequence;
            if canonical.overrides.insert(component.override_copy()) == OverrideInsert::Stale {
                push_diagnostic(
                    &mut document,
                    Diagnostic::new(
                        DiagnosticKind::StaleSequence,
                        format!("override with SEQUENCE {sequence} is older than the stored one"),
                    )
                    .for_uid(Some(&uid)),
                );
            }
            canonical
        }
        (Some(canonical), false) => {
            if component.sequence >= canonical.sequence || canonical.is_override() {
                merge_records(canonical, component)
            } else {
                push_diagnostic(
                    &mut document,
                    Diagnostic::new(
                        DiagnosticKind::StaleSequence,
                        format!(
                            "record with SEQUENCE {} discarded, stored SEQUENCE is {}",
                            component.sequence, canonical.sequence
                        ),
                    )
                    .for_uid(Some(&uid)),
                );
                canonical
            }
        }
    };

    document.components.insert(uid, stored);
    document
}

fn push_diagnostic(document: &mut CalendarDocument, diagnostic: Diagnostic) {
    diagnostic.emit();
    document.diagnostics.push(diagnostic);
}

/// Merges `incoming` over `base`: fields and property names `incoming` sets
/// replace those of `base`, the rest are kept.
fn merge_records(base: Component, incoming: Component) -> Component {
    let has_rule = incoming.rrule_text.is_some();
    let (rrule, rrule_text) = if has_rule {
        (incoming.rrule, incoming.rrule_text)
    } else {
        (base.rrule, base.rrule_text)
    };

    let mut exceptions = base.exceptions;
    exceptions.extend(&incoming.exceptions);
    let mut overrides = base.overrides;
    overrides.merge(&incoming.overrides);

    let mut properties = base.properties;
    properties.extend(incoming.properties);
    let mut custom = base.custom;
    custom.extend(incoming.custom);

    Component {
        kind: incoming.kind,
        name: incoming.name,
        uid: incoming.uid.or(base.uid),
        summary: incoming.summary.or(base.summary),
        start: incoming.start.or(base.start),
        end: incoming.end.or(base.end),
        due: incoming.due.or(base.due),
        completed: incoming.completed.or(base.completed),
        duration: incoming.duration.or(base.duration),
        // A record carrying RRULE is the series itself, never an override.
        recurrence_id: if has_rule {
            None
        } else {
            incoming.recurrence_id.or(base.recurrence_id)
        },
        rrule,
        rrule_text,
        rdates: if incoming.rdates.is_empty() {
            base.rdates
        } else {
            incoming.rdates
        },
        exceptions,
        overrides,
        alarms: if incoming.alarms.is_empty() {
            base.alarms
        } else {
            incoming.alarms
        },
        sequence: incoming.sequence,
        properties,
        custom,
        children: if incoming.children.is_empty() {
            base.children
        } else {
            incoming.children
        },
    }
}

/// Reads VCALENDAR-level properties into metadata.
fn calendar_metadata(calendar: &Component) -> CalendarMetadata {
    let text = |name: &str| calendar.text(name).map(String::from);
    let custom = |suffix: &str| {
        calendar
            .get_custom(suffix)
            .and_then(|p| p.value.as_text())
            .map(String::from)
    };

    let known = ["prodid", "version", "calscale", "method", "name", "description"];
    let extra = calendar
        .properties
        .iter()
        .filter(|(name, _)| !known.contains(&name.as_str()))
        .filter_map(|(name, props)| {
            props
                .first()
                .and_then(|p| p.value.as_text())
                .map(|v| (name.clone(), v.to_string()))
        })
        .collect();

    CalendarMetadata {
        prodid: text(names::PRODID),
        version: text(names::VERSION),
        calscale: text(names::CALSCALE),
        method: text(names::METHOD),
        name: custom("wr-calname").or_else(|| text(names::NAME)),
        description: custom("wr-caldesc").or_else(|| text(names::DESCRIPTION)),
        timezone: custom("wr-timezone"),
        extra,
    }
}
