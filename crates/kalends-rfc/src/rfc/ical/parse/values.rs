//! Value decoders for iCalendar (RFC 5545 §3.3).
//!
//! Decoding never fails: values that match no typed grammar stay text.

use std::collections::BTreeMap;

use crate::rfc::ical::core::{ParamValue, PropertyValue, RawParameter, names};

/// Unescapes text values (RFC 5545 §3.3.11).
///
/// Escape sequences: \\ \, \; \n \N
#[must_use]
pub fn unescape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => result.push('\n'),
            Some(',') => result.push(','),
            Some(';') => result.push(';'),
            Some('\\') | None => result.push('\\'),
            Some(other) => {
                // Unknown escape, preserve as-is
                result.push('\\');
                result.push(other);
            }
        }
    }

    result
}

/// Splits on commas that are not escaped, then unescapes each part.
#[must_use]
pub fn split_text_list(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in s.chars() {
        match c {
            ',' if !escaped => parts.push(unescape_text(&std::mem::take(&mut current))),
            _ => {
                escaped = c == '\\' && !escaped;
                current.push(c);
            }
        }
    }
    parts.push(unescape_text(&current));
    parts
}

/// Splits a DATE / DATE-TIME list on commas, dropping empty entries.
#[must_use]
pub fn split_value_list(s: &str) -> Vec<&str> {
    s.split(',').map(str::trim).filter(|v| !v.is_empty()).collect()
}

/// Removes one layer of surrounding double quotes.
#[must_use]
pub fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(s)
}

/// Coerces a single parameter value when unambiguous.
///
/// `TRUE`/`FALSE` become booleans, plain decimal integers (no sign prefix,
/// no leading zeros) become integers, and decimals with a fractional part
/// become floats. Everything else stays text, so offsets like `+0100` and
/// zero-padded codes survive untouched.
#[must_use]
pub fn coerce_param_value(value: &str) -> ParamValue {
    let value = strip_quotes(value);
    if value.eq_ignore_ascii_case("TRUE") {
        return ParamValue::Boolean(true);
    }
    if value.eq_ignore_ascii_case("FALSE") {
        return ParamValue::Boolean(false);
    }
    if let Some(n) = is_plain_integer(value).then(|| value.parse().ok()).flatten() {
        return ParamValue::Integer(n);
    }
    if let Some(f) = is_plain_decimal(value).then(|| value.parse().ok()).flatten() {
        return ParamValue::Float(f);
    }
    ParamValue::Text(value.to_string())
}

/// Decodes a content line's parameters, keyed by uppercase name.
///
/// Multi-valued parameters become [`ParamValue::List`]; a repeated
/// parameter name keeps its last occurrence.
#[must_use]
pub fn decode_params(params: &[RawParameter]) -> BTreeMap<String, ParamValue> {
    params
        .iter()
        .map(|param| {
            let value = match param.values.as_slice() {
                [single] => coerce_param_value(single),
                values => ParamValue::List(values.iter().map(|v| coerce_param_value(v)).collect()),
            };
            (param.name.clone(), value)
        })
        .collect()
}

/// Decodes the value of a non-temporal property by its (uppercase) name.
#[must_use]
pub fn decode_scalar(name: &str, raw: &str) -> PropertyValue {
    match name {
        names::SEQUENCE | names::PRIORITY | names::PERCENT_COMPLETE | names::REPEAT => raw
            .trim()
            .parse()
            .map_or_else(|_| PropertyValue::Text(unescape_text(raw)), PropertyValue::Integer),
        names::CATEGORIES | names::RESOURCES => PropertyValue::List(
            split_text_list(raw)
                .into_iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect(),
        ),
        names::GEO => parse_geo(raw).map_or_else(
            || PropertyValue::Text(unescape_text(raw)),
            |(latitude, longitude)| PropertyValue::Geo {
                latitude,
                longitude,
            },
        ),
        _ => PropertyValue::Text(unescape_text(raw)),
    }
}

/// Parses `lat;lon` (RFC 5545 §3.8.1.6).
fn parse_geo(raw: &str) -> Option<(f64, f64)> {
    let (lat, lon) = raw.split_once(';')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)).then_some((lat, lon))
}

fn is_plain_integer(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'))
}

fn is_plain_decimal(s: &str) -> bool {
    s.split_once('.').is_some_and(|(int, frac)| {
        is_plain_integer(int) && !frac.is_empty() && frac.bytes().all(|b| b.is_ascii_digit())
    })
}
