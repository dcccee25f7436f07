//! iCalendar component types (RFC 5545 §3.4-3.6) and the parsed document.

use std::collections::BTreeMap;
use std::fmt;

use super::duration::Duration;
use super::index::{ExceptionIndex, OverrideIndex};
use super::property::{Property, PropertyMap};
use super::time::TimeValue;
use crate::rfc::ical::expand::RecurrenceRule;

/// Component kind for iCalendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// VCALENDAR wrapper component.
    Calendar,
    /// VEVENT component.
    Event,
    /// VTODO component.
    Todo,
    /// VJOURNAL component.
    Journal,
    /// VFREEBUSY component.
    FreeBusy,
    /// VTIMEZONE component.
    Timezone,
    /// VALARM component (nested within VEVENT/VTODO).
    Alarm,
    /// STANDARD sub-component of VTIMEZONE.
    Standard,
    /// DAYLIGHT sub-component of VTIMEZONE.
    Daylight,
    /// Unknown/X-component.
    Unknown,
}

impl ComponentKind {
    /// Returns the string name for this component kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Calendar => "VCALENDAR",
            Self::Event => "VEVENT",
            Self::Todo => "VTODO",
            Self::Journal => "VJOURNAL",
            Self::FreeBusy => "VFREEBUSY",
            Self::Timezone => "VTIMEZONE",
            Self::Alarm => "VALARM",
            Self::Standard => "STANDARD",
            Self::Daylight => "DAYLIGHT",
            Self::Unknown => "X-UNKNOWN",
        }
    }

    /// Parses a component kind from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "VCALENDAR" => Self::Calendar,
            "VEVENT" => Self::Event,
            "VTODO" => Self::Todo,
            "VJOURNAL" => Self::Journal,
            "VFREEBUSY" => Self::FreeBusy,
            "VTIMEZONE" => Self::Timezone,
            "VALARM" => Self::Alarm,
            "STANDARD" => Self::Standard,
            "DAYLIGHT" => Self::Daylight,
            _ => Self::Unknown,
        }
    }

    /// Returns whether RRULE / RECURRENCE-ID apply (VEVENT, VTODO, VJOURNAL).
    #[must_use]
    pub const fn is_recurrence_capable(self) -> bool {
        matches!(self, Self::Event | Self::Todo | Self::Journal)
    }

    /// Returns whether a finished component of this kind is a document entry
    /// even when nested inside another component.
    #[must_use]
    pub const fn is_top_level(self) -> bool {
        matches!(
            self,
            Self::Event | Self::Todo | Self::Journal | Self::FreeBusy | Self::Timezone
        )
    }

    /// Returns whether this is a VTIMEZONE observance.
    #[must_use]
    pub const fn is_observance(self) -> bool {
        matches!(self, Self::Standard | Self::Daylight)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An iCalendar component with typed fields for the properties the
/// parser and expander interpret, plus open maps for everything else.
#[derive(Debug, Clone)]
pub struct Component {
    /// Component type.
    pub kind: ComponentKind,
    /// Original component name (preserved for X-components).
    pub name: String,
    pub uid: Option<String>,
    pub summary: Option<String>,
    pub start: Option<TimeValue>,
    pub end: Option<TimeValue>,
    pub due: Option<TimeValue>,
    pub completed: Option<TimeValue>,
    /// DURATION, zero when the written value was malformed.
    pub duration: Option<Duration>,
    /// Present only on override records.
    pub recurrence_id: Option<TimeValue>,
    /// Built recurrence rule.
    pub rrule: Option<RecurrenceRule>,
    /// RRULE text as written.
    pub rrule_text: Option<String>,
    pub rdates: Vec<TimeValue>,
    pub exceptions: ExceptionIndex,
    pub overrides: OverrideIndex,
    pub alarms: Vec<Component>,
    pub sequence: i64,
    /// Every property by lower-cased name, `X-` properties excluded.
    pub properties: PropertyMap,
    /// `X-` properties keyed by their lower-cased suffix.
    pub custom: PropertyMap,
    /// Nested components that are neither alarms nor document entries.
    pub children: Vec<Component>,
}

impl Component {
    /// Creates a new, empty component with the given kind.
    #[must_use]
    pub fn new(kind: ComponentKind) -> Self {
        Self::named(kind, kind.as_str())
    }

    /// Creates a component keeping the name as written (for X-components).
    #[must_use]
    pub fn named(kind: ComponentKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into().trim().to_ascii_uppercase(),
            uid: None,
            summary: None,
            start: None,
            end: None,
            due: None,
            completed: None,
            duration: None,
            recurrence_id: None,
            rrule: None,
            rrule_text: None,
            rdates: Vec::new(),
            exceptions: ExceptionIndex::default(),
            overrides: OverrideIndex::default(),
            alarms: Vec::new(),
            sequence: 0,
            properties: PropertyMap::new(),
            custom: PropertyMap::new(),
            children: Vec::new(),
        }
    }

    /// Returns the first property with the given name (case-insensitive).
    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<&Property> {
        self.properties
            .get(&name.to_ascii_lowercase())
            .and_then(|props| props.first())
    }

    /// Returns all properties with the given name (case-insensitive).
    #[must_use]
    pub fn get_properties(&self, name: &str) -> &[Property] {
        self.properties
            .get(&name.to_ascii_lowercase())
            .map_or(&[], Vec::as_slice)
    }

    /// Returns the first `X-` property with the given suffix, e.g. `wr-calname`.
    #[must_use]
    pub fn get_custom(&self, suffix: &str) -> Option<&Property> {
        self.custom
            .get(&suffix.to_ascii_lowercase())
            .and_then(|props| props.first())
    }

    /// Returns the first text value of a property.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get_property(name).and_then(|p| p.value.as_text())
    }

    /// Appends a property.
    pub fn add_property(&mut self, property: Property) {
        self.properties
            .entry(property.name.clone())
            .or_default()
            .push(property);
    }

    /// Returns true if this is a full-day component.
    #[must_use]
    pub fn is_full_day(&self) -> bool {
        self.start.as_ref().is_some_and(|start| start.date_only)
    }

    /// Returns true if this record is a RECURRENCE-ID override.
    #[must_use]
    pub const fn is_override(&self) -> bool {
        self.recurrence_id.is_some()
    }

    /// Returns a copy suitable for an override index (no nested overrides).
    #[must_use]
    pub fn override_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.overrides = OverrideIndex::default();
        copy
    }
}

/// Top-level VCALENDAR properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarMetadata {
    pub prodid: Option<String>,
    pub version: Option<String>,
    pub calscale: Option<String>,
    pub method: Option<String>,
    /// `X-WR-CALNAME` or `NAME`.
    pub name: Option<String>,
    /// `X-WR-CALDESC` or `DESCRIPTION`.
    pub description: Option<String>,
    /// `X-WR-TIMEZONE`.
    pub timezone: Option<String>,
    /// Remaining scalar properties keyed by lower-cased name.
    pub extra: BTreeMap<String, String>,
}

/// Kinds of non-fatal anomalies reported while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A TZID resolved nowhere; the value was read as host-local time.
    UnresolvedTimezone,
    /// A DATE / DATE-TIME value kept as text.
    UnparsedDateTime,
    /// DURATION was empty or malformed and treated as zero.
    MalformedDuration,
    /// A record with a lower SEQUENCE was discarded.
    StaleSequence,
    /// A RECURRENCE-ID value was unusable and dropped.
    InvalidRecurrenceId,
    /// An EXDATE entry was unusable and dropped.
    InvalidExceptionDate,
    /// An RRULE could not be turned into a recurrence rule.
    RuleNotBuilt,
    /// END did not match any open component.
    MismatchedEnd,
    /// Input ended with components still open.
    UnclosedComponent,
}

impl DiagnosticKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnresolvedTimezone => "unresolved timezone",
            Self::UnparsedDateTime => "unparsed date-time",
            Self::MalformedDuration => "malformed duration",
            Self::StaleSequence => "stale sequence",
            Self::InvalidRecurrenceId => "invalid recurrence id",
            Self::InvalidExceptionDate => "invalid exception date",
            Self::RuleNotBuilt => "recurrence rule not built",
            Self::MismatchedEnd => "mismatched END",
            Self::UnclosedComponent => "unclosed component",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A non-fatal anomaly found while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// 1-based line number, when known.
    pub line: Option<usize>,
    /// UID of the affected component, when known.
    pub uid: Option<String>,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            line: None,
            uid: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    #[must_use]
    pub fn for_uid(mut self, uid: Option<&str>) -> Self {
        self.uid = uid.map(String::from);
        self
    }

    /// Logs the diagnostic on the `tracing` warning channel.
    pub fn emit(&self) {
        tracing::warn!(
            kind = %self.kind,
            line = self.line,
            uid = self.uid.as_deref(),
            "{}",
            self.message
        );
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(line) = self.line {
            write!(f, " at line {line}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// A parsed iCalendar document.
#[derive(Debug, Clone, Default)]
pub struct CalendarDocument {
    /// Components keyed by UID, or a generated identifier for UID-less components.
    pub components: BTreeMap<String, Component>,
    pub metadata: CalendarMetadata,
    /// Non-fatal anomalies in the order they were found.
    pub diagnostics: Vec<Diagnostic>,
}

impl CalendarDocument {
    /// Returns the component stored under `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Component> {
        self.components.get(id)
    }

    /// Iterates over components of one kind.
    pub fn components_of(&self, kind: ComponentKind) -> impl Iterator<Item = &Component> {
        self.components.values().filter(move |c| c.kind == kind)
    }

    /// Iterates over VEVENT, VTODO and VJOURNAL entries.
    pub fn schedulable(&self) -> impl Iterator<Item = &Component> {
        self.components
            .values()
            .filter(|c| c.kind.is_recurrence_capable())
    }
}
