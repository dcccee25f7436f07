//! Timezone identifier resolution.
//!
//! Real-world producers write TZIDs as IANA names, Windows identifiers,
//! Outlook display labels, `(UTC+01:00) ...` prefixed strings, bare
//! offsets, or vendor placeholders. [`TimezoneResolver::resolve`] maps all
//! of them to an IANA name or a fixed offset, and never fails: anything it
//! cannot place is returned unresolved with the original label kept.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, NaiveDateTime, Utc};
use icu::time::zone::WindowsParser;
use icu::time::zone::iana::IanaParserExtended;
use kalends_core::config::Settings;

use super::aliases::LegacyAliasTable;
use super::database::{ChronoTzDatabase, TimezoneDatabase, ZoneRef};
use crate::error::RfcResult;
use crate::rfc::ical::core::ZoneIdentifier;

/// Largest whole-hour offset with an `Etc/GMT` zone.
const MAX_ETC_HOURS: i32 = 14;

/// Outcome of resolving a timezone identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedZone {
    /// IANA zone name, when one was found.
    pub iana: Option<String>,
    /// Fixed offset in minutes east of UTC, when the label carried one.
    pub offset_minutes: Option<i32>,
    /// `Etc/GMT∓N` zone equivalent to a whole-hour offset.
    pub etc_label: Option<String>,
    /// The identifier exactly as supplied.
    pub original: String,
}

impl ResolvedZone {
    fn unresolved(original: &str) -> Self {
        Self {
            iana: None,
            offset_minutes: None,
            etc_label: None,
            original: original.to_string(),
        }
    }

    /// Returns true if neither a zone nor an offset was found.
    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        self.iana.is_none() && self.offset_minutes.is_none()
    }

    /// Returns the identifier to tag time values with.
    #[must_use]
    pub fn identifier(&self) -> ZoneIdentifier {
        match (&self.iana, self.offset_minutes) {
            (_, Some(minutes)) => ZoneIdentifier::Offset(minutes),
            (Some(iana), None) => ZoneIdentifier::Iana(iana.clone()),
            (None, None) => ZoneIdentifier::Unresolved(self.original.clone()),
        }
    }
}

impl fmt::Display for ResolvedZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.original, self.identifier())
    }
}

/// Resolves timezone identifiers and converts between wall time and instants.
///
/// Resolutions are cached per resolver; the resolver itself is shareable
/// across threads.
#[derive(Debug)]
pub struct TimezoneResolver {
    database: Arc<dyn TimezoneDatabase>,
    aliases: Arc<LegacyAliasTable>,
    host: ZoneRef,
    cache: RwLock<HashMap<String, ResolvedZone>>,
}

impl Default for TimezoneResolver {
    fn default() -> Self {
        let database: Arc<dyn TimezoneDatabase> = Arc::new(ChronoTzDatabase);
        let host = host_zone_ref(database.as_ref(), &guess_host_local_zone());
        Self::new(database, LegacyAliasTable::builtin(), host)
    }
}

impl TimezoneResolver {
    #[must_use]
    pub fn new(
        database: Arc<dyn TimezoneDatabase>,
        aliases: Arc<LegacyAliasTable>,
        host: ZoneRef,
    ) -> Self {
        Self {
            database,
            aliases,
            host,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a resolver with the built-in tables and an explicit host zone.
    #[must_use]
    pub fn with_host_zone(host: ZoneRef) -> Self {
        Self::new(Arc::new(ChronoTzDatabase), LegacyAliasTable::builtin(), host)
    }

    /// Returns a resolver with a different alias table.
    #[must_use]
    pub fn with_aliases(self, aliases: Arc<LegacyAliasTable>) -> Self {
        Self::new(self.database, aliases, self.host)
    }

    /// ## Summary
    /// Builds a resolver from configuration.
    ///
    /// The host zone comes from `timezone.host_zone`, or is guessed from the
    /// machine; the alias table comes from `timezone.alias_table`, or is the
    /// built-in table.
    ///
    /// ## Errors
    /// Returns an error if the configured alias table cannot be loaded.
    pub fn from_settings(settings: &Settings) -> RfcResult<Self> {
        let database: Arc<dyn TimezoneDatabase> = Arc::new(ChronoTzDatabase);

        let host_id = match settings.timezone.host_zone.as_deref() {
            Some(name) if database.is_valid(name) => ZoneIdentifier::Iana(name.to_string()),
            Some(name) => {
                tracing::warn!(zone = name, "Configured host zone is unknown, guessing instead");
                guess_host_local_zone()
            }
            None => guess_host_local_zone(),
        };
        let host = host_zone_ref(database.as_ref(), &host_id);

        let aliases = match &settings.timezone.alias_table {
            Some(path) => Arc::new(LegacyAliasTable::from_path(path)?),
            None => LegacyAliasTable::builtin(),
        };

        tracing::debug!(host = %host, aliases = aliases.len(), "Timezone resolver ready");
        Ok(Self::new(database, aliases, host))
    }

    /// The zone used for floating times and unresolved identifiers.
    #[must_use]
    pub const fn host_zone(&self) -> ZoneRef {
        self.host
    }

    #[must_use]
    pub fn database(&self) -> &dyn TimezoneDatabase {
        self.database.as_ref()
    }

    /// Returns a shared handle to the database, for values that outlive the resolver.
    #[must_use]
    pub fn database_handle(&self) -> Arc<dyn TimezoneDatabase> {
        Arc::clone(&self.database)
    }

    /// Returns true if `name` is a zone the database knows.
    #[must_use]
    pub fn is_valid_zone_identifier(&self, name: &str) -> bool {
        self.database.is_valid(name)
    }

    /// ## Summary
    /// Resolves a raw timezone identifier.
    ///
    /// Order: vendor placeholder (host zone), exact IANA name, legacy alias
    /// (whole label, then its first comma-separated segment), ICU Windows and
    /// IANA-alias canonicalization, embedded or bare numeric offset. Anything
    /// else comes back unresolved with `original` preserved.
    pub fn resolve(&self, identifier: &str) -> ResolvedZone {
        if let Some(hit) = self
            .cache
            .read()
            .ok()
            .and_then(|cache| cache.get(identifier).cloned())
        {
            return hit;
        }

        let resolved = self.resolve_uncached(identifier);
        if resolved.is_unresolved() {
            tracing::debug!(tzid = identifier, "Timezone identifier not resolved");
        } else {
            tracing::trace!(tzid = identifier, resolved = %resolved, "Resolved timezone");
        }

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(identifier.to_string(), resolved.clone());
        }
        resolved
    }

    fn resolve_uncached(&self, identifier: &str) -> ResolvedZone {
        let label = clean_label(identifier);
        if label.is_empty() {
            return ResolvedZone::unresolved(identifier);
        }

        if is_vendor_placeholder(label) {
            let zone = if label.to_ascii_lowercase().ends_with("/utc") {
                ZoneRef::utc()
            } else {
                self.host
            };
            return self.from_zone_ref(identifier, zone);
        }

        if let Some(zone) = self.database.zone(label) {
            return self.from_zone_ref(identifier, zone);
        }

        let (offset_prefix, display) = split_parenthesized(label);
        for candidate in [label, display] {
            if let Some(iana) = self.lookup_alias(candidate) {
                return iana_zone(identifier, iana);
            }
        }

        let canonical = offset_prefix
            .is_none()
            .then(|| canonicalize_with_icu(label))
            .flatten()
            .filter(|name| self.database.is_valid(name));
        if let Some(iana) = canonical {
            return iana_zone(identifier, iana);
        }

        if let Some(minutes) = offset_prefix.map_or_else(|| parse_offset_minutes(label), parse_offset_minutes) {
            return self.offset(identifier, minutes);
        }

        ResolvedZone::unresolved(identifier)
    }

    fn lookup_alias(&self, label: &str) -> Option<String> {
        let whole = self.aliases.lookup(label);
        let first_segment = || {
            label
                .split_once(',')
                .and_then(|(first, _)| self.aliases.lookup(first))
        };
        whole
            .or_else(first_segment)
            .filter(|iana| self.database.is_valid(iana))
            .map(String::from)
    }

    fn from_zone_ref(&self, original: &str, zone: ZoneRef) -> ResolvedZone {
        match zone {
            ZoneRef::Iana(tz) => iana_zone(original, tz.name().to_string()),
            ZoneRef::Fixed(offset) => self.offset(original, offset.local_minus_utc() / 60),
        }
    }

    fn offset(&self, original: &str, minutes: i32) -> ResolvedZone {
        let etc_label = etc_label_for(minutes).filter(|label| self.database.is_valid(label));
        ResolvedZone {
            iana: None,
            offset_minutes: Some(minutes),
            etc_label,
            original: original.to_string(),
        }
    }

    /// Returns the convertible zone for a resolution, if it found one.
    #[must_use]
    pub fn zone_for(&self, resolved: &ResolvedZone) -> Option<ZoneRef> {
        if let Some(minutes) = resolved.offset_minutes {
            return ZoneRef::from_offset_minutes(minutes);
        }
        resolved.iana.as_deref().and_then(|name| self.database.zone(name))
    }

    /// Returns the zone a time value's tag refers to.
    ///
    /// Floating and unresolved tags map to the host zone.
    #[must_use]
    pub fn zone_ref_for(&self, zone: Option<&ZoneIdentifier>) -> ZoneRef {
        match zone {
            Some(ZoneIdentifier::Iana(name)) => self.database.zone(name).unwrap_or(self.host),
            Some(ZoneIdentifier::Offset(minutes)) => {
                ZoneRef::from_offset_minutes(*minutes).unwrap_or(self.host)
            }
            Some(ZoneIdentifier::Unresolved(_)) | None => self.host,
        }
    }

    /// ## Summary
    /// Converts a wall-clock time in `zone` to a UTC instant.
    ///
    /// Gap times read with the pre-transition offset; overlap times take the
    /// earlier instant.
    #[must_use]
    pub fn parse_local_time_as_instant(&self, wall: NaiveDateTime, zone: &ZoneRef) -> DateTime<Utc> {
        self.database.to_instant(wall, zone)
    }

    /// Returns the wall-clock time of `instant` in `zone`.
    #[must_use]
    pub fn local_wall_time(&self, instant: DateTime<Utc>, zone: &ZoneRef) -> NaiveDateTime {
        self.database.to_wall(instant, zone)
    }

    /// Formats `instant` as a local `YYYYMMDDTHHMMSS` timestamp in `zone`.
    #[must_use]
    pub fn format_instant_as_local_wall_time(&self, instant: DateTime<Utc>, zone: &ZoneRef) -> String {
        self.local_wall_time(instant, zone)
            .format("%Y%m%dT%H%M%S")
            .to_string()
    }
}

/// ## Summary
/// Guesses the machine's local zone.
///
/// Falls back to UTC when the platform zone is unavailable or unknown.
#[must_use]
pub fn guess_host_local_zone() -> ZoneIdentifier {
    match iana_time_zone::get_timezone() {
        Ok(name) if ChronoTzDatabase.is_valid(&name) => ZoneIdentifier::Iana(name),
        Ok(name) => {
            tracing::debug!(zone = %name, "Host zone unknown to the database, using UTC");
            ZoneIdentifier::utc()
        }
        Err(e) => {
            tracing::debug!(error = %e, "Could not determine host zone, using UTC");
            ZoneIdentifier::utc()
        }
    }
}

fn iana_zone(original: &str, iana: String) -> ResolvedZone {
    ResolvedZone {
        iana: Some(iana),
        offset_minutes: None,
        etc_label: None,
        original: original.to_string(),
    }
}

fn host_zone_ref(database: &dyn TimezoneDatabase, id: &ZoneIdentifier) -> ZoneRef {
    match id {
        ZoneIdentifier::Iana(name) => database.zone(name).unwrap_or_else(ZoneRef::utc),
        ZoneIdentifier::Offset(minutes) => {
            ZoneRef::from_offset_minutes(*minutes).unwrap_or_else(ZoneRef::utc)
        }
        ZoneIdentifier::Unresolved(_) => ZoneRef::utc(),
    }
}

/// Trims whitespace, one layer of quotes and vendor path prefixes.
fn clean_label(raw: &str) -> &str {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
        .trim();
    unquoted
        .strip_prefix("/mozilla.org/20050126_1/")
        .or_else(|| unquoted.strip_prefix("/mozilla.org/20070129_1/"))
        .or_else(|| unquoted.strip_prefix("/mozilla.org/"))
        .or_else(|| unquoted.strip_prefix("/softwarestudio.org/Olson_20011030_5/"))
        .or_else(|| unquoted.strip_prefix("/softwarestudio.org/"))
        .unwrap_or(unquoted)
}

fn is_vendor_placeholder(label: &str) -> bool {
    let lower = label.to_ascii_lowercase();
    lower.starts_with("customized time zone") || lower.starts_with("tzone://microsoft/")
}

/// Splits `(UTC+01:00) Amsterdam, ...` into the parenthesized part and the rest.
fn split_parenthesized(label: &str) -> (Option<&str>, &str) {
    label
        .strip_prefix('(')
        .and_then(|rest| rest.split_once(')'))
        .map_or((None, label), |(inner, display)| (Some(inner.trim()), display.trim()))
}

/// Parses `+01:00`, `-0500`, `+5`, `UTC+01:00`, `GMT-05:30` or a bare `UTC`/`GMT`.
fn parse_offset_minutes(label: &str) -> Option<i32> {
    let upper = label.trim().to_ascii_uppercase();
    let rest = upper
        .strip_prefix("UTC")
        .or_else(|| upper.strip_prefix("GMT"))
        .map_or(upper.as_str(), str::trim);
    if rest.is_empty() {
        return (rest.len() != upper.len()).then_some(0);
    }

    let (sign, digits) = match rest.as_bytes().first() {
        Some(b'+') => (1, &rest[1..]),
        Some(b'-') => (-1, &rest[1..]),
        _ => return None,
    };
    let (hours, minutes) = match digits.split_once(':') {
        Some(parts) => parts,
        None if digits.len() > 2 => digits.split_at(digits.len() - 2),
        None => (digits, ""),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if hours.is_empty() || !all_digits(hours) || !all_digits(minutes) {
        return None;
    }

    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = if minutes.is_empty() { 0 } else { minutes.parse().ok()? };
    (hours <= MAX_ETC_HOURS && minutes < 60).then(|| sign * (hours * 60 + minutes))
}

/// `Etc/GMT` names invert the sign: UTC+01:00 is `Etc/GMT-1`.
fn etc_label_for(minutes: i32) -> Option<String> {
    if minutes % 60 != 0 {
        return None;
    }
    let hours = minutes / 60;
    match hours {
        0 => Some("Etc/GMT".to_string()),
        h if h.abs() <= MAX_ETC_HOURS => Some(format!("Etc/GMT{:+}", -h)),
        _ => None,
    }
}

/// Maps Windows identifiers and IANA aliases to a canonical IANA name via ICU.
fn canonicalize_with_icu(label: &str) -> Option<String> {
    let iana_parser = IanaParserExtended::new();

    let windows = WindowsParser::new()
        .parse(label, None)
        .and_then(|tz| iana_parser.iter().find(|entry| entry.time_zone == tz));
    if let Some(entry) = windows {
        return Some(entry.canonical.to_string());
    }

    let parsed = iana_parser.parse(label);
    (parsed.time_zone != icu::time::TimeZone::UNKNOWN).then(|| parsed.canonical.to_string())
}
