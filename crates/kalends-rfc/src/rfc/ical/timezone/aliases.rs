//! Legacy timezone alias table.
//!
//! Maps Windows zone identifiers and historical display labels (as emitted
//! by Outlook, Exchange and Lotus Notes) to a primary IANA zone. The table
//! is plain JSON:
//!
//! ```json
//! {
//!   "zones":   { "W. Europe Standard Time": ["Europe/Berlin", "Europe/Oslo"] },
//!   "aliases": { "Amsterdam, Berlin, Bern, Rome, Stockholm, Vienna": "W. Europe Standard Time" }
//! }
//! ```
//!
//! The first entry of each `zones` list is the primary zone.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use serde::Deserialize;

use crate::error::RfcResult;

const BUILTIN_TABLE: &str = include_str!("legacy_aliases.json");

static BUILTIN: LazyLock<Arc<LegacyAliasTable>> = LazyLock::new(|| {
    Arc::new(LegacyAliasTable::from_json(BUILTIN_TABLE).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Built-in legacy alias table is invalid");
        LegacyAliasTable::default()
    }))
});

#[derive(Debug, Deserialize)]
struct AliasTableFile {
    #[serde(default)]
    zones: HashMap<String, Vec<String>>,
    #[serde(default)]
    aliases: HashMap<String, String>,
}

/// Read-only lookup from legacy labels to IANA zone names.
#[derive(Debug, Clone, Default)]
pub struct LegacyAliasTable {
    /// Normalized Windows identifier to primary IANA zone.
    zones: HashMap<String, String>,
    /// Normalized label to normalized Windows identifier.
    aliases: HashMap<String, String>,
}

impl LegacyAliasTable {
    /// Returns the table compiled into the crate.
    #[must_use]
    pub fn builtin() -> Arc<Self> {
        Arc::clone(&BUILTIN)
    }

    /// ## Summary
    /// Parses a table from its JSON form.
    ///
    /// ## Errors
    /// Returns an error if the JSON does not match the table shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: AliasTableFile = serde_json::from_str(json)?;

        let zones = file
            .zones
            .into_iter()
            .filter_map(|(id, zones)| Some((normalize(&id), zones.into_iter().next()?)))
            .collect();
        let aliases = file
            .aliases
            .into_iter()
            .map(|(label, id)| (normalize(&label), normalize(&id)))
            .collect();

        Ok(Self { zones, aliases })
    }

    /// ## Summary
    /// Loads a table from a JSON file.
    ///
    /// ## Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> RfcResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let table = Self::from_json(&json)?;
        tracing::debug!(
            path = %path.display(),
            zones = table.zones.len(),
            aliases = table.aliases.len(),
            "Loaded legacy alias table"
        );
        Ok(table)
    }

    /// Returns the primary IANA zone for a Windows identifier or legacy label.
    #[must_use]
    pub fn lookup(&self, label: &str) -> Option<&str> {
        let key = normalize(label);
        if key.is_empty() {
            return None;
        }
        if let Some(zone) = self.zones.get(&key) {
            return Some(zone);
        }
        self.aliases
            .get(&key)
            .and_then(|id| self.zones.get(id))
            .map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len() + self.aliases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty() && self.aliases.is_empty()
    }
}

/// Lower-cases and collapses runs of whitespace.
fn normalize(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
