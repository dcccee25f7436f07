//! Timezone resolution and wall-time conversion.
//!
//! Uses `chrono-tz` for zone rules, ICU4X for Windows identifier and IANA
//! alias canonicalization, and a legacy alias table for display labels.

mod aliases;
mod database;
mod resolver;
mod vtimezone;

pub use aliases::LegacyAliasTable;
pub use database::{ChronoTzDatabase, TimezoneDatabase, ZoneRef};
pub use resolver::{ResolvedZone, TimezoneResolver, guess_host_local_zone};
pub use vtimezone::{Observance, UtcOffset, VTimezone, VTimezoneError};
