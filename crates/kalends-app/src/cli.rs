//! Command-line arguments.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Parser;

/// Expand the occurrences of an iCalendar file within a time range.
#[derive(Debug, Parser)]
#[command(name = "kalends", version, about)]
pub struct Cli {
    /// iCalendar file to read.
    pub file: PathBuf,

    /// Range start (RFC 3339, e.g. 2025-01-01T00:00:00Z).
    #[arg(long)]
    pub from: DateTime<Utc>,

    /// Range end (RFC 3339).
    #[arg(long)]
    pub to: DateTime<Utc>,

    /// Only expand the component with this UID.
    #[arg(long)]
    pub uid: Option<String>,

    /// Ignore RECURRENCE-ID overrides.
    #[arg(long)]
    pub no_overrides: bool,

    /// Keep occurrences excluded by EXDATE.
    #[arg(long)]
    pub keep_exdates: bool,

    /// Include occurrences that started before the range but are still running.
    #[arg(long)]
    pub ongoing: bool,

    /// Parse cooperatively in chunks of `parser.chunk_lines` lines.
    #[arg(long)]
    pub chunked: bool,
}
