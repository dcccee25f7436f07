//! Human-readable recurrence descriptions.

use chrono::Datelike;

use super::rule::{Frequency, RuleOptions};

/// Supported description languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Language {
    English,
    German,
}

impl Language {
    fn from_locale(locale: &str) -> Self {
        let language = locale.split(['-', '_']).next().unwrap_or_default();
        if language.eq_ignore_ascii_case("de") {
            Self::German
        } else {
            Self::English
        }
    }
}

const ENGLISH_DAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];
const GERMAN_DAYS: [&str; 7] = [
    "Montag",
    "Dienstag",
    "Mittwoch",
    "Donnerstag",
    "Freitag",
    "Samstag",
    "Sonntag",
];
const ENGLISH_MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];
const GERMAN_MONTHS: [&str; 12] = [
    "Januar",
    "Februar",
    "März",
    "April",
    "Mai",
    "Juni",
    "Juli",
    "August",
    "September",
    "Oktober",
    "November",
    "Dezember",
];

/// ## Summary
/// Describes a rule in prose, e.g. "every 2 weeks on Monday and Friday
/// until January 31, 2025".
///
/// `locale` is a BCP 47 tag; languages other than German use English.
#[must_use]
pub fn describe(options: &RuleOptions, locale: &str) -> String {
    let language = Language::from_locale(locale);
    let mut out = frequency_phrase(options.frequency, options.interval, language);

    let days: Vec<String> = options
        .by_day
        .iter()
        .filter_map(|day| weekday_phrase(day, language))
        .collect();
    if !days.is_empty() {
        out.push_str(match language {
            Language::English => " on ",
            Language::German => " am ",
        });
        out.push_str(&join(&days, language));
    }

    let month_days: Vec<String> = options.by_month_day.iter().map(ToString::to_string).collect();
    if !month_days.is_empty() {
        out.push_str(match language {
            Language::English => " on day ",
            Language::German => " am Tag ",
        });
        out.push_str(&join(&month_days, language));
    }

    let months: Vec<String> = options
        .by_month
        .iter()
        .filter_map(|m| month_name(*m, language))
        .map(String::from)
        .collect();
    if !months.is_empty() {
        out.push_str(match language {
            Language::English => " in ",
            Language::German => " im ",
        });
        out.push_str(&join(&months, language));
    }

    if let Some(count) = options.count {
        out.push_str(&match (language, count) {
            (Language::English, 1) => " once".to_string(),
            (Language::English, n) => format!(" for {n} times"),
            (Language::German, 1) => " einmal".to_string(),
            (Language::German, n) => format!(", {n} Mal"),
        });
    }

    if let Some(until) = &options.until {
        let date = until.calendar_date();
        let month = i32::try_from(date.month())
            .ok()
            .and_then(|m| month_name(m, language))
            .unwrap_or_default();
        out.push_str(&match language {
            Language::English => format!(" until {month} {}, {}", date.day(), date.year()),
            Language::German => format!(" bis zum {}. {month} {}", date.day(), date.year()),
        });
    }

    out
}

fn frequency_phrase(frequency: Frequency, interval: u32, language: Language) -> String {
    let (one, many) = match (language, frequency) {
        (Language::English, Frequency::Secondly) => ("every second", "seconds"),
        (Language::English, Frequency::Minutely) => ("every minute", "minutes"),
        (Language::English, Frequency::Hourly) => ("every hour", "hours"),
        (Language::English, Frequency::Daily) => ("every day", "days"),
        (Language::English, Frequency::Weekly) => ("every week", "weeks"),
        (Language::English, Frequency::Monthly) => ("every month", "months"),
        (Language::English, Frequency::Yearly) => ("every year", "years"),
        (Language::German, Frequency::Secondly) => ("jede Sekunde", "Sekunden"),
        (Language::German, Frequency::Minutely) => ("jede Minute", "Minuten"),
        (Language::German, Frequency::Hourly) => ("jede Stunde", "Stunden"),
        (Language::German, Frequency::Daily) => ("jeden Tag", "Tage"),
        (Language::German, Frequency::Weekly) => ("jede Woche", "Wochen"),
        (Language::German, Frequency::Monthly) => ("jeden Monat", "Monate"),
        (Language::German, Frequency::Yearly) => ("jedes Jahr", "Jahre"),
    };
    match (interval, language) {
        (0 | 1, _) => one.to_string(),
        (n, Language::English) => format!("every {n} {many}"),
        (n, Language::German) => format!("alle {n} {many}"),
    }
}

/// Renders a BYDAY entry such as `MO`, `2TU` or `-1FR`.
fn weekday_phrase(entry: &str, language: Language) -> Option<String> {
    let entry = entry.trim().to_ascii_uppercase();
    let split = entry.len().checked_sub(2)?;
    let (ordinal, code) = entry.split_at(split);
    let index = ["MO", "TU", "WE", "TH", "FR", "SA", "SU"]
        .iter()
        .position(|c| *c == code)?;
    let name = match language {
        Language::English => ENGLISH_DAYS[index],
        Language::German => GERMAN_DAYS[index],
    };

    if ordinal.is_empty() {
        return Some(name.to_string());
    }
    let n: i32 = ordinal.trim_start_matches('+').parse().ok()?;
    Some(match (language, n) {
        (Language::English, -1) => format!("the last {name}"),
        (Language::English, n) if n < 0 => format!("the {} to last {name}", english_ordinal(-n)),
        (Language::English, n) => format!("the {} {name}", english_ordinal(n)),
        (Language::German, -1) => format!("letzten {name}"),
        (Language::German, n) if n < 0 => format!("{}. letzten {name}", -n),
        (Language::German, n) => format!("{n}. {name}"),
    })
}

fn english_ordinal(n: i32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn month_name(month: i32, language: Language) -> Option<&'static str> {
    let index = usize::try_from(month.checked_sub(1)?).ok()?;
    match language {
        Language::English => ENGLISH_MONTHS.get(index).copied(),
        Language::German => GERMAN_MONTHS.get(index).copied(),
    }
}

fn join(items: &[String], language: Language) -> String {
    let and = match language {
        Language::English => " and ",
        Language::German => " und ",
    };
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{}{and}{last}", head.join(", ")),
    }
}
