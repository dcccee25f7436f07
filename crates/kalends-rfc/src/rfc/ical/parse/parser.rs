//! iCalendar document parser (RFC 5545).
//!
//! Two entry points share one [`Assembler`]: a direct pass over the whole
//! input and a chunked pass that yields to the runtime between chunks.

use kalends_core::config::DEFAULT_CHUNK_LINES;

use super::assembler::Assembler;
use super::error::ParseResult;
use super::lexer::split_lines;
use crate::rfc::ical::core::CalendarDocument;
use crate::rfc::ical::expand::RuleBuilder;
use crate::rfc::ical::timezone::TimezoneResolver;

/// Parses an iCalendar document using the host's local zone.
///
/// ## Errors
///
/// Returns an error if the input holds no content lines, or on a
/// conformance violation (repeated DTSTART/DTEND/DUE, impossible EXDATE or
/// RECURRENCE-ID).
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
pub fn parse(input: &str) -> ParseResult<CalendarDocument> {
    parse_with(input, &TimezoneResolver::default())
}

/// Parses an iCalendar document with an explicit resolver.
///
/// ## Errors
///
/// See [`parse`].
#[tracing::instrument(skip(input, resolver), fields(input_len = input.len()))]
pub fn parse_with(input: &str, resolver: &TimezoneResolver) -> ParseResult<CalendarDocument> {
    parse_with_rules(input, RuleBuilder::new(resolver))
}

/// Parses an iCalendar document, building RRULEs with `rules` (engine and
/// enumeration cap). Times are read with the builder's resolver.
///
/// ## Errors
///
/// See [`parse`].
pub fn parse_with_rules(input: &str, rules: RuleBuilder<'_>) -> ParseResult<CalendarDocument> {
    tracing::debug!("Parsing iCalendar document");

    let lines = split_lines(input);
    tracing::trace!(count = lines.len(), "Split lines");

    let mut assembler = Assembler::new(rules.resolver()).with_rule_builder(rules);
    for (line_num, line) in &lines {
        assembler.push_line(*line_num, line)?;
    }
    assembler.finish()
}

/// ## Summary
/// Parses an iCalendar document `chunk_lines` lines at a time, yielding to
/// the runtime between chunks.
///
/// The result, including any error, is identical to [`parse_with`]. A
/// `chunk_lines` of zero uses the default chunk size.
///
/// ## Errors
///
/// See [`parse`].
#[tracing::instrument(skip(input, resolver), fields(input_len = input.len(), chunk_lines))]
pub async fn parse_chunked(
    input: &str,
    resolver: &TimezoneResolver,
    chunk_lines: u32,
) -> ParseResult<CalendarDocument> {
    parse_chunked_with_rules(input, RuleBuilder::new(resolver), chunk_lines).await
}

/// Chunked counterpart of [`parse_with_rules`].
///
/// ## Errors
///
/// See [`parse`].
pub async fn parse_chunked_with_rules(
    input: &str,
    rules: RuleBuilder<'_>,
    chunk_lines: u32,
) -> ParseResult<CalendarDocument> {
    tracing::debug!("Parsing iCalendar document in chunks");

    let chunk_lines = if chunk_lines == 0 {
        DEFAULT_CHUNK_LINES
    } else {
        chunk_lines
    };
    let chunk = usize::try_from(chunk_lines).unwrap_or(usize::MAX);
    let lines = split_lines(input);

    let mut assembler = Assembler::new(rules.resolver()).with_rule_builder(rules);
    for (index, batch) in lines.chunks(chunk).enumerate() {
        if index > 0 {
            tokio::task::yield_now().await;
        }
        tracing::trace!(chunk = index, lines = batch.len(), "Processing chunk");
        for (line_num, line) in batch {
            assembler.push_line(*line_num, line)?;
        }
    }
    assembler.finish()
}
