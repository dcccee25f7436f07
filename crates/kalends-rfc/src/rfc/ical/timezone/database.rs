//! Zone lookup and DST-aware wall-time conversion.
//!
//! The [`TimezoneDatabase`] trait is the only place the parser and expander
//! touch zone rules, so a compiled database can replace `chrono-tz`
//! without changes elsewhere.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, FixedOffset, LocalResult, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::rfc::ical::core::ZoneIdentifier;

/// A zone the database can convert through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneRef {
    /// Named zone with DST rules.
    Iana(Tz),
    /// Fixed offset from UTC.
    Fixed(FixedOffset),
}

impl ZoneRef {
    /// The UTC zone.
    #[must_use]
    pub const fn utc() -> Self {
        Self::Iana(Tz::UTC)
    }

    /// Builds a fixed-offset zone from minutes east of UTC.
    #[must_use]
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self::Fixed)
    }

    /// Returns the identifier used to tag time values interpreted in this zone.
    #[must_use]
    pub fn identifier(&self) -> ZoneIdentifier {
        match self {
            Self::Iana(tz) => ZoneIdentifier::Iana(tz.name().to_string()),
            Self::Fixed(offset) => ZoneIdentifier::Offset(offset.local_minus_utc() / 60),
        }
    }

    /// Returns the IANA name for named zones.
    #[must_use]
    pub fn iana_name(&self) -> Option<&'static str> {
        match self {
            Self::Iana(tz) => Some(tz.name()),
            Self::Fixed(_) => None,
        }
    }

    /// Returns the offset in effect at `instant`, in seconds east of UTC.
    #[must_use]
    pub fn offset_seconds_at(&self, instant: DateTime<Utc>) -> i32 {
        match self {
            Self::Iana(tz) => tz
                .offset_from_utc_datetime(&instant.naive_utc())
                .fix()
                .local_minus_utc(),
            Self::Fixed(offset) => offset.local_minus_utc(),
        }
    }
}

impl fmt::Display for ZoneRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// Zone lookup plus local-time and instant conversion.
pub trait TimezoneDatabase: Send + Sync + fmt::Debug {
    /// Looks up a zone by exact IANA name.
    fn zone(&self, name: &str) -> Option<ZoneRef>;

    /// Returns true if `name` is a zone this database knows.
    fn is_valid(&self, name: &str) -> bool {
        self.zone(name).is_some()
    }

    /// ## Summary
    /// Converts a wall-clock time in `zone` to an instant.
    ///
    /// A wall time inside a spring-forward gap is read with the offset in
    /// effect before the gap, which lands after the gap by the gap's width.
    /// A wall time inside a fall-back overlap resolves to the earlier instant.
    fn to_instant(&self, wall: NaiveDateTime, zone: &ZoneRef) -> DateTime<Utc> {
        match zone {
            ZoneRef::Iana(tz) => local_to_utc(tz, wall),
            ZoneRef::Fixed(offset) => local_to_utc(offset, wall),
        }
    }

    /// Converts an instant to wall-clock time in `zone`.
    fn to_wall(&self, instant: DateTime<Utc>, zone: &ZoneRef) -> NaiveDateTime {
        match zone {
            ZoneRef::Iana(tz) => instant.with_timezone(tz).naive_local(),
            ZoneRef::Fixed(offset) => instant.with_timezone(offset).naive_local(),
        }
    }
}

/// Database backed by the compiled `chrono-tz` tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChronoTzDatabase;

impl TimezoneDatabase for ChronoTzDatabase {
    fn zone(&self, name: &str) -> Option<ZoneRef> {
        Tz::from_str(name.trim()).ok().map(ZoneRef::Iana)
    }
}

fn local_to_utc<T: TimeZone>(tz: &T, wall: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&wall) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            // Gaps never exceed a day; step backwards for the pre-transition offset.
            let mut earlier = wall;
            for _ in 0..48 {
                earlier -= TimeDelta::minutes(30);
                if let Some(before) = tz.from_local_datetime(&earlier).earliest() {
                    let offset = before.offset().fix().local_minus_utc();
                    let utc = wall - TimeDelta::seconds(i64::from(offset));
                    return Utc.from_utc_datetime(&utc);
                }
            }
            Utc.from_utc_datetime(&wall)
        }
    }
}
