//! iCalendar DURATION value type (RFC 5545 §3.3.6).

use std::fmt;

/// Duration value (RFC 5545 §3.3.6).
///
/// Weeks and days are nominal (calendar) units; hours, minutes and seconds
/// are exact. The sign applies to the whole duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Duration {
    /// Whether this duration is negative.
    pub negative: bool,
    /// Number of weeks.
    pub weeks: u32,
    /// Number of days.
    pub days: u32,
    /// Number of hours.
    pub hours: u32,
    /// Number of minutes.
    pub minutes: u32,
    /// Number of seconds.
    pub seconds: u32,
}

impl Duration {
    /// Creates a new zero duration.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            negative: false,
            weeks: 0,
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }

    /// Creates a duration from days.
    #[must_use]
    pub const fn days(days: u32) -> Self {
        Self {
            negative: false,
            weeks: 0,
            days,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }

    /// Parses `[+|-]P(nW|nD|T nH nM nS)*`.
    ///
    /// Returns `None` when no unit segment is present (a bare `P`) or a
    /// segment is malformed.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (negative, rest) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let rest = rest.strip_prefix(['P', 'p'])?;

        let mut dur = Self {
            negative,
            ..Self::zero()
        };
        let mut in_time = false;
        let mut digits = String::new();
        let mut segments = 0;

        for c in rest.chars() {
            match c.to_ascii_uppercase() {
                d if d.is_ascii_digit() => digits.push(d),
                'T' if digits.is_empty() && !in_time => in_time = true,
                unit @ ('W' | 'D' | 'H' | 'M' | 'S') => {
                    let num: u32 = digits.parse().ok()?;
                    digits.clear();
                    match (unit, in_time) {
                        ('W', false) => dur.weeks = num,
                        ('D', false) => dur.days = num,
                        ('H', true) => dur.hours = num,
                        ('M', true) => dur.minutes = num,
                        ('S', true) => dur.seconds = num,
                        _ => return None,
                    }
                    segments += 1;
                }
                _ => return None,
            }
        }

        (segments > 0 && digits.is_empty()).then_some(dur)
    }

    /// Returns the nominal part (weeks and days) as signed days.
    #[must_use]
    pub fn calendar_days(&self) -> i64 {
        let days = i64::from(self.weeks) * 7 + i64::from(self.days);
        if self.negative { -days } else { days }
    }

    /// Returns the exact part (hours, minutes, seconds) as signed seconds.
    #[must_use]
    pub fn clock_seconds(&self) -> i64 {
        let secs = i64::from(self.hours) * 3600
            + i64::from(self.minutes) * 60
            + i64::from(self.seconds);
        if self.negative { -secs } else { secs }
    }

    /// Returns the total duration as seconds, counting a day as 24 hours.
    #[must_use]
    pub fn as_seconds(&self) -> i64 {
        self.calendar_days() * 86_400 + self.clock_seconds()
    }

    /// Returns true if every component is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.weeks == 0 && self.days == 0 && self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        write!(f, "P")?;
        if self.weeks > 0 {
            write!(f, "{}W", self.weeks)?;
        }
        if self.days > 0 {
            write!(f, "{}D", self.days)?;
        }
        if self.hours > 0 || self.minutes > 0 || self.seconds > 0 {
            write!(f, "T")?;
            if self.hours > 0 {
                write!(f, "{}H", self.hours)?;
            }
            if self.minutes > 0 {
                write!(f, "{}M", self.minutes)?;
            }
            if self.seconds > 0 {
                write!(f, "{}S", self.seconds)?;
            }
        }
        if self.is_zero() {
            write!(f, "T0S")?;
        }
        Ok(())
    }
}
