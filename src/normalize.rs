use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::DateOrder;

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

fn iso_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap())
}

fn dmy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{2,4})$").unwrap())
}

pub fn excel_serial_to_date(serial: f64) -> String {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
    let date = base + chrono::Duration::days(serial as i64);
    date.format("%Y-%m-%d").to_string()
}

/// Normalize a source date string to an ISO calendar date, or `None` if it
/// cannot be read (the row is then dropped, not the run).
///
/// Accepted shapes: already-ISO (truncated to the date part), `D/M/YY` and
/// friends with `/`, `.` or `-` separators, Excel serial numbers, and a short
/// list of spelled-out fallbacks. A day or month component greater than 12
/// settles the component order on its own; only truly ambiguous dates fall
/// back to the caller-supplied `DateOrder`.
pub fn normalize_date(raw: &str, order: DateOrder) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if iso_re().is_match(raw) {
        let head: String = raw.chars().take(10).collect();
        return NaiveDate::parse_from_str(&head, "%Y-%m-%d")
            .ok()
            .map(|d| d.format("%Y-%m-%d").to_string());
    }

    if let Some(caps) = dmy_re().captures(raw) {
        let a: u32 = caps[1].parse().ok()?;
        let b: u32 = caps[2].parse().ok()?;
        let mut year: i32 = caps[3].parse().ok()?;
        if year < 100 {
            year += 2000;
        }
        let (day, month) = if a > 12 {
            (a, b)
        } else if b > 12 {
            (b, a)
        } else {
            match order {
                DateOrder::DayFirst => (a, b),
                DateOrder::MonthFirst => (b, a),
            }
        };
        return NaiveDate::from_ymd_opt(year, month, day)
            .map(|d| d.format("%Y-%m-%d").to_string());
    }

    // Spreadsheet cells hand dates over as Excel serials.
    if let Ok(serial) = raw.parse::<f64>() {
        if (20000.0..=80000.0).contains(&serial) {
            return Some(excel_serial_to_date(serial));
        }
        return None;
    }

    for fmt in ["%Y/%m/%d", "%d %b %Y", "%b %d, %Y", "%B %d, %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d.format("%Y-%m-%d").to_string());
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Parse a money string into a signed value, or `None` if unreadable.
///
/// Handles currency symbols and codes, parenthesized negatives, and both
/// locale conventions: when `.` and `,` are both present the right-most one
/// is the decimal separator; a lone `,` is decimal only when at most two
/// digits follow it ("45,00" is 45.00 but "1,234" is 1234).
pub fn normalize_amount(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let (s, parenthesized) = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (inner.trim(), true),
        None => (s, false),
    };

    let mut cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if cleaned.chars().all(|c| !c.is_ascii_digit()) {
        return None;
    }

    match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) => {
            if comma > dot {
                // European: "." groups thousands, "," is decimal.
                cleaned.retain(|c| c != '.');
                cleaned = cleaned.replace(',', ".");
            } else {
                cleaned.retain(|c| c != ',');
            }
        }
        (None, Some(comma)) => {
            let trailing = cleaned.len() - comma - 1;
            if cleaned.matches(',').count() == 1 && trailing <= 2 {
                cleaned = cleaned.replace(',', ".");
            } else {
                cleaned.retain(|c| c != ',');
            }
        }
        (Some(_), None) => {
            // "1.234.567": repeated dots can only group thousands.
            if cleaned.matches('.').count() > 1 {
                cleaned.retain(|c| c != '.');
            }
        }
        (None, None) => {}
    }

    let value: f64 = cleaned.parse().ok()?;
    Some(if parenthesized { -value.abs() } else { value })
}

/// Amounts compare and key on whole cents, never on raw floats.
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}
