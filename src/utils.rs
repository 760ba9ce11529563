use crate::error::{LedgerError, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Returns the Monday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday();
    date - Duration::days(i64::from(offset))
}

pub fn is_week_start(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Mon
}

/// Parses a ledger column label such as "Jan 5, 24" using the layout's date format.
pub fn parse_date_label(label: &str, format: &str) -> Result<NaiveDate> {
    let trimmed = label.trim();
    NaiveDate::parse_from_str(trimmed, format).map_err(|e| {
        LedgerError::parse(
            format!("date label '{}'", trimmed),
            format!("does not match format '{}': {}", format, e),
        )
    })
}

/// Parses a single ledger cell.
///
/// Blank cells are `None`. Besides plain decimals, the accounting export
/// forms `$1,234.50`, `-$1,234.50` and `(1,234.50)` are accepted. At most
/// one sign is allowed and thousands separators must group by three.
/// Returns the rejection reason so the caller can attach the cell location.
pub fn parse_amount(raw: &str) -> std::result::Result<Option<f64>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let reject = || format!("'{}' is not a numeric amount", trimmed);

    let (negative, text) = split_sign(trimmed).ok_or_else(reject)?;
    let digits = strip_thousands(text).ok_or_else(reject)?;

    let value: f64 = digits.parse().map_err(|_| reject())?;
    if !value.is_finite() {
        return Err(format!("'{}' is out of range", trimmed));
    }

    Ok(Some(if negative { -value } else { value }))
}

/// Separates the sign (`-`, `+` or surrounding parentheses) and an optional
/// `$` from the number. `None` when more than one sign is present.
fn split_sign(text: &str) -> Option<(bool, &str)> {
    let (mut sign, mut rest) = match text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => (Some(true), inner.trim()),
        None => (None, text),
    };

    rest = take_sign(rest, &mut sign)?;
    if let Some(after) = rest.strip_prefix('$') {
        rest = take_sign(after, &mut sign)?;
    }

    Some((sign.unwrap_or(false), rest))
}

fn take_sign<'a>(text: &'a str, sign: &mut Option<bool>) -> Option<&'a str> {
    match text.strip_prefix(['-', '+']) {
        Some(_) if sign.is_some() => None,
        Some(after) => {
            *sign = Some(text.starts_with('-'));
            Some(after.trim_start())
        }
        None => Some(text),
    }
}

/// Validates `1,234.50`-style text and returns it without separators.
fn strip_thousands(text: &str) -> Option<String> {
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text, None),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if let Some(fraction) = fraction {
        if fraction.is_empty() || !all_digits(fraction) {
            return None;
        }
    }
    if whole.is_empty() && fraction.is_none() {
        return None;
    }

    let mut groups = whole.split(',');
    let lead = groups.next().unwrap_or_default();
    if !all_digits(lead) || (whole.contains(',') && !(1..=3).contains(&lead.len())) {
        return None;
    }
    if !groups.all(|g| g.len() == 3 && all_digits(g)) {
        return None;
    }

    let mut digits: String = whole.chars().filter(|c| *c != ',').collect();
    if let Some(fraction) = fraction {
        digits.push('.');
        digits.push_str(fraction);
    }
    Some(digits)
}

/// Formats an amount the way the dashboard metric cards show it, e.g. `$1,234.56`.
pub fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents != 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, fraction)
}
