//! iCalendar core models (RFC 5545).
//!
//! This module defines the object graph produced by the parser:
//! - Typed components with open maps for unrecognized and `X-` properties
//! - Time values that keep the instant, the written wall time and the zone
//! - Dual-keyed exception and override indices

mod component;
mod duration;
mod index;
mod property;
mod time;

pub use component::{
    CalendarDocument, CalendarMetadata, Component, ComponentKind, Diagnostic, DiagnosticKind,
};
pub use duration::Duration;
pub use index::{ExceptionIndex, OverrideIndex, OverrideInsert};
pub use property::{
    ContentLine, ParamValue, Property, PropertyMap, PropertyValue, RawParameter, names,
};
pub use time::{TimeValue, UTC_ZONE_NAME, ZoneIdentifier};
