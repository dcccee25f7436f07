//! Parsed DATE and DATE-TIME values (RFC 5545 §3.3.4, §3.3.5).

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Name used for values carrying a trailing `Z`.
pub const UTC_ZONE_NAME: &str = "UTC";

/// Zone a time value was interpreted in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ZoneIdentifier {
    /// IANA zone name, e.g. `Europe/Oslo`.
    Iana(String),
    /// Fixed offset from UTC in minutes (positive = east).
    Offset(i32),
    /// Vendor label that could not be resolved, kept verbatim.
    Unresolved(String),
}

impl ZoneIdentifier {
    /// The canonical UTC identifier.
    #[must_use]
    pub fn utc() -> Self {
        Self::Iana(UTC_ZONE_NAME.to_string())
    }

    /// Returns true for UTC, however it was spelled.
    #[must_use]
    pub fn is_utc(&self) -> bool {
        match self {
            Self::Iana(name) => matches!(name.as_str(), "UTC" | "Etc/UTC" | "Z" | "Etc/Zulu"),
            Self::Offset(minutes) => *minutes == 0,
            Self::Unresolved(_) => false,
        }
    }

    /// Returns true if the identifier could not be resolved.
    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved(_))
    }
}

impl fmt::Display for ZoneIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iana(name) | Self::Unresolved(name) => write!(f, "{name}"),
            Self::Offset(minutes) => {
                let sign = if *minutes < 0 { '-' } else { '+' };
                let total = minutes.abs();
                write!(f, "{sign}{:02}:{:02}", total / 60, total % 60)
            }
        }
    }
}

/// An absolute instant plus the wall time and zone it was written in.
///
/// Equality only considers the instant and `date_only`; the zone tag and
/// wall time are display metadata.
#[derive(Debug, Clone)]
pub struct TimeValue {
    /// The instant in UTC. For date-only values this is local midnight.
    pub instant: DateTime<Utc>,
    /// Wall-clock time in the original zone.
    pub wall: NaiveDateTime,
    /// Zone tag. `None` means floating (interpreted in the host zone).
    pub zone: Option<ZoneIdentifier>,
    /// True for DATE values.
    pub date_only: bool,
}

impl TimeValue {
    /// Creates a UTC date-time value.
    #[must_use]
    pub fn utc(instant: DateTime<Utc>) -> Self {
        Self {
            instant,
            wall: instant.naive_utc(),
            zone: Some(ZoneIdentifier::utc()),
            date_only: false,
        }
    }

    /// Creates a date-time value from an already converted instant.
    #[must_use]
    pub const fn date_time(
        instant: DateTime<Utc>,
        wall: NaiveDateTime,
        zone: Option<ZoneIdentifier>,
    ) -> Self {
        Self {
            instant,
            wall,
            zone,
            date_only: false,
        }
    }

    /// Creates a date-only value whose instant is `midnight` (local midnight of `date`).
    #[must_use]
    pub fn date(date: NaiveDate, midnight: DateTime<Utc>, zone: Option<ZoneIdentifier>) -> Self {
        Self {
            instant: midnight,
            wall: date.and_time(NaiveTime::MIN),
            zone,
            date_only: true,
        }
    }

    /// Returns the calendar day as written.
    #[must_use]
    pub fn calendar_date(&self) -> NaiveDate {
        self.wall.date()
    }

    /// Returns the coarse index key (`YYYY-MM-DD`).
    ///
    /// Date-only values use their written calendar day; date-times use the
    /// date portion of the UTC instant.
    #[must_use]
    pub fn date_key(&self) -> String {
        if self.date_only {
            self.wall.format("%Y-%m-%d").to_string()
        } else {
            self.instant.format("%Y-%m-%d").to_string()
        }
    }

    /// Returns the full-instant index key, or `None` for date-only values.
    #[must_use]
    pub fn instant_key(&self) -> Option<String> {
        (!self.date_only).then(|| self.instant.format("%Y-%m-%dT%H:%M:%SZ").to_string())
    }

    /// Returns true if the value was written with a trailing `Z`.
    #[must_use]
    pub fn is_utc(&self) -> bool {
        self.zone.as_ref().is_some_and(ZoneIdentifier::is_utc)
    }

    /// Returns true if the value carries no zone at all.
    #[must_use]
    pub const fn is_floating(&self) -> bool {
        self.zone.is_none()
    }
}

impl PartialEq for TimeValue {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant && self.date_only == other.date_only
    }
}

impl Eq for TimeValue {}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.date_only {
            return write!(f, "{}", self.wall.format("%Y-%m-%d"));
        }
        write!(f, "{}", self.wall.format("%Y-%m-%dT%H:%M:%S"))?;
        match &self.zone {
            Some(zone) if zone.is_utc() => write!(f, "Z"),
            Some(zone) => write!(f, " [{zone}]"),
            None => Ok(()),
        }
    }
}
