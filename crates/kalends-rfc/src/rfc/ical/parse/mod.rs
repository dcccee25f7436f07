//! iCalendar parsing.
//!
//! Text is unfolded into content lines (`lexer`), values are decoded
//! (`values`, `datetime`) and components are assembled into a
//! [`CalendarDocument`](crate::rfc::ical::core::CalendarDocument).

mod assembler;
pub mod datetime;
mod error;
pub mod lexer;
mod parser;
pub mod values;

pub use assembler::{Assembler, fold_into_document};
pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use parser::{parse, parse_chunked, parse_chunked_with_rules, parse_with, parse_with_rules};
