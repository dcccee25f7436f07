//! iCalendar property and content line types (RFC 5545 §3.1, §3.8).

use std::collections::BTreeMap;
use std::fmt;

use super::time::TimeValue;

/// A parameter exactly as written on a content line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawParameter {
    /// Parameter name (normalized to uppercase).
    pub name: String,
    /// Comma-separated values with quoting removed.
    pub values: Vec<String>,
}

impl RawParameter {
    /// Returns the first value.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

/// A raw content line as parsed from iCalendar text.
///
/// This is the low-level representation before value decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    /// Property name (normalized to uppercase).
    pub name: String,
    /// Parameters in order of appearance.
    pub params: Vec<RawParameter>,
    /// Raw value string (after unfolding, before unescaping).
    pub raw_value: String,
    /// 1-based line number of the first physical line.
    pub line: usize,
}

impl ContentLine {
    /// Returns the value of a parameter.
    #[must_use]
    pub fn get_param_value(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .and_then(RawParameter::value)
    }
}

/// A decoded parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Boolean(bool),
    Integer(i64),
    Float(f64),
    /// Multi-valued parameter (`MEMBER="a","b"`).
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// Returns the text form for text values.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::Boolean(value) => write!(f, "{}", if *value { "TRUE" } else { "FALSE" }),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::List(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{value}")?;
                }
                Ok(())
            }
        }
    }
}

/// A decoded property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Unescaped text, also used for values that matched no known grammar.
    Text(String),
    Integer(i64),
    /// Comma-separated text list (CATEGORIES, RESOURCES).
    List(Vec<String>),
    Geo { latitude: f64, longitude: f64 },
    Time(TimeValue),
    TimeList(Vec<TimeValue>),
}

impl PropertyValue {
    /// Returns the text for text values.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the time value for DATE / DATE-TIME properties that parsed.
    #[must_use]
    pub const fn as_time(&self) -> Option<&TimeValue> {
        match self {
            Self::Time(value) => Some(value),
            _ => None,
        }
    }
}

/// A decoded iCalendar property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Property name, lower-cased (`X-` prefix removed for custom properties).
    pub name: String,
    /// Parameters keyed by uppercase name.
    pub params: BTreeMap<String, ParamValue>,
    /// Raw value as written (after unfolding).
    pub raw: String,
    /// Decoded value.
    pub value: PropertyValue,
}

impl Property {
    /// Creates a text property without parameters.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            name: name.into().to_ascii_lowercase(),
            params: BTreeMap::new(),
            raw: value.clone(),
            value: PropertyValue::Text(value),
        }
    }

    /// Returns a parameter value as text.
    #[must_use]
    pub fn param_text(&self, name: &str) -> Option<String> {
        self.params.get(name).map(ToString::to_string)
    }
}

/// Properties of one component keyed by lower-cased name. Repeats keep their order.
pub type PropertyMap = BTreeMap<String, Vec<Property>>;

/// Well-known property names (uppercase, as they appear on the wire).
pub mod names {
    // Calendar properties
    pub const CALSCALE: &str = "CALSCALE";
    pub const METHOD: &str = "METHOD";
    pub const PRODID: &str = "PRODID";
    pub const VERSION: &str = "VERSION";
    pub const NAME: &str = "NAME";

    // Descriptive
    pub const CATEGORIES: &str = "CATEGORIES";
    pub const DESCRIPTION: &str = "DESCRIPTION";
    pub const GEO: &str = "GEO";
    pub const PERCENT_COMPLETE: &str = "PERCENT-COMPLETE";
    pub const PRIORITY: &str = "PRIORITY";
    pub const RESOURCES: &str = "RESOURCES";
    pub const SUMMARY: &str = "SUMMARY";

    // Date and time
    pub const COMPLETED: &str = "COMPLETED";
    pub const DTEND: &str = "DTEND";
    pub const DUE: &str = "DUE";
    pub const DTSTART: &str = "DTSTART";
    pub const DURATION: &str = "DURATION";

    // Timezone
    pub const TZID: &str = "TZID";

    // Relationship
    pub const RECURRENCE_ID: &str = "RECURRENCE-ID";
    pub const UID: &str = "UID";

    // Recurrence
    pub const EXDATE: &str = "EXDATE";
    pub const RDATE: &str = "RDATE";
    pub const RRULE: &str = "RRULE";

    // Alarm
    pub const REPEAT: &str = "REPEAT";

    // Change management
    pub const SEQUENCE: &str = "SEQUENCE";

    // Component delimiters
    pub const BEGIN: &str = "BEGIN";
    pub const END: &str = "END";
}
