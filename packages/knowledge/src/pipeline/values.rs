//! Value parsers - raw text to typed values.
//!
//! Three stateless parsers for the formats the analysis collaborator
//! emits: currency magnitudes (`£12.5m`), percentages (`65%`, bare
//! fractions), and UK/ISO dates. All return `None` on unparseable
//! input; callers fall back to a raw-string representation.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// Magnitude tokens in precedence order.
///
/// The order is a fixed contract: `m`/`million` is checked before
/// `k`/`thousand`, which is checked before `billion`/`bn`/`b`. Within
/// each group the longer token comes first so `bn` is consumed whole
/// rather than leaving a stray `n`.
const MAGNITUDE_TOKENS: &[(&str, f64)] = &[
    ("million", 1_000_000.0),
    ("m", 1_000_000.0),
    ("thousand", 1_000.0),
    ("k", 1_000.0),
    ("billion", 1_000_000_000.0),
    ("bn", 1_000_000_000.0),
    ("b", 1_000_000_000.0),
];

/// Parse a currency amount, scaled to whole units.
///
/// Strips currency symbols (`£ $ €`), commas, and whitespace,
/// case-folds, applies any magnitude suffix, and rounds.
///
/// ```
/// use knowledge::pipeline::values::parse_currency_value;
///
/// assert_eq!(parse_currency_value("£12.5m"), Some(12_500_000.0));
/// assert_eq!(parse_currency_value("£2,500,000"), Some(2_500_000.0));
/// assert_eq!(parse_currency_value("not a number"), None);
/// ```
pub fn parse_currency_value(raw: &str) -> Option<f64> {
    let mut cleaned: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '£' | '$' | '€' | ',') && !c.is_whitespace())
        .collect();

    let mut multiplier = 1.0;
    for (token, factor) in MAGNITUDE_TOKENS {
        if cleaned.contains(token) {
            cleaned = cleaned.replace(token, "");
            multiplier = *factor;
            break;
        }
    }

    let value: f64 = cleaned.parse().ok()?;
    Some((value * multiplier).round())
}

/// Check whether a raw value carries a digit-then-magnitude-suffix
/// pattern (`12.5m`, `450 k`, `1.2bn`), suggesting a currency amount
/// even without a currency symbol.
pub fn has_magnitude_suffix(raw: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\d\s*(million|thousand|billion|bn|m|k|b)\b").unwrap()
    });
    pattern.is_match(raw)
}

/// Parse a percentage onto the 0-100 scale.
///
/// Bare decimals strictly between 0 and 1 are treated as fractions
/// (`0.2` parses to `20`); anything else is returned unscaled.
///
/// ```
/// use knowledge::pipeline::values::parse_percentage_value;
///
/// assert_eq!(parse_percentage_value("65%"), Some(65.0));
/// assert_eq!(parse_percentage_value("0.2"), Some(20.0));
/// assert_eq!(parse_percentage_value("120"), Some(120.0));
/// ```
pub fn parse_percentage_value(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '%' && !c.is_whitespace())
        .collect();

    let value: f64 = cleaned.parse().ok()?;
    if value > 0.0 && value < 1.0 {
        Some(value * 100.0)
    } else {
        Some(value)
    }
}

// Unambiguous formats tried before the day-first fallback. Ambiguous
// slash dates never appear here so `25/12/2024` always takes the UK
// day-first path below.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B, %Y",
];

/// Parse a date, UK day-first for slash/dash forms.
///
/// Tries, in order: a list of unambiguous formats, a `DD/MM/YYYY`
/// (or `DD-MM-YYYY`) pattern, and a `"<Month> <Year>"` pattern that
/// resolves to the first of the month.
///
/// ```
/// use chrono::NaiveDate;
/// use knowledge::pipeline::values::parse_date_value;
///
/// assert_eq!(
///     parse_date_value("25/12/2024"),
///     NaiveDate::from_ymd_opt(2024, 12, 25),
/// );
/// assert_eq!(
///     parse_date_value("March 2024"),
///     NaiveDate::from_ymd_opt(2024, 3, 1),
/// );
/// ```
pub fn parse_date_value(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }

    static DAY_FIRST: OnceLock<Regex> = OnceLock::new();
    let day_first = DAY_FIRST
        .get_or_init(|| Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4})$").unwrap());
    if let Some(caps) = day_first.captures(trimmed) {
        let day: u32 = caps[1].parse().unwrap_or(0);
        let month: u32 = caps[2].parse().unwrap_or(0);
        let year: i32 = caps[3].parse().unwrap_or(0);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    static MONTH_YEAR: OnceLock<Regex> = OnceLock::new();
    let month_year =
        MONTH_YEAR.get_or_init(|| Regex::new(r"^([A-Za-z]+)\.?\s+(\d{4})$").unwrap());
    if let Some(caps) = month_year.captures(trimmed) {
        if let (Some(month), Ok(year)) = (month_number(&caps[1]), caps[2].parse::<i32>()) {
            return NaiveDate::from_ymd_opt(year, month, 1);
        }
    }

    None
}

/// Month number from a full or three-letter English month name.
fn month_number(name: &str) -> Option<u32> {
    let folded = name.to_lowercase();
    if folded.len() < 3 {
        return None;
    }
    let month = match &folded[..3] {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    // Reject things like "martian 2024" that share a prefix
    let full = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ][month - 1];
    if folded.len() == 3 || folded == full {
        Some(month as u32)
    } else {
        None
    }
}
