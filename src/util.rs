// Parsing, statistics and display helpers.
//
// This module centralizes all the "dirty" CSV/number/date handling so the
// rest of the code can assume clean, typed values. Display formatting lives
// here too and is only ever applied to presentation copies.
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Parse an amount while being forgiving about the formatting common in
/// spreadsheet exports.
///
/// - Trims whitespace and strips thousands separators.
/// - Accepts a leading `$` (also after a minus sign).
/// - Accepts accounting negatives such as `(1,250.00)`.
/// - Rejects values that contain alphabetic characters.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let (negative, body) = match s.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        Some(inner) => (true, inner.trim()),
        None => (false, s),
    };
    let cleaned: String = body.chars().filter(|c| *c != ',' && *c != '$').collect();
    let v = cleaned.trim().parse::<f64>().ok()?;
    if !v.is_finite() {
        return None;
    }
    Some(if negative { -v } else { v })
}

// Two-digit years are tried before four-digit ones: `%Y` would read "24" as year 24.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Years a workbook date cell can hold; anything outside is treated as a
/// data-entry error.
pub const VALID_YEARS: std::ops::RangeInclusive<i32> = 1900..=9999;

/// Parse an order date. ISO and US layouts are accepted, with or without a
/// time component (the time is dropped). Dates outside [`VALID_YEARS`] are
/// rejected.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let in_range = |d: &NaiveDate| VALID_YEARS.contains(&d.year());
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok().filter(in_range))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
                .filter(in_range)
        })
}

/// Trimmed, non-empty string or `None`.
pub fn clean_text(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

pub fn median(mut v: Vec<f64>) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.sort_by(|a, b| a.total_cmp(b));
    let mid = v.len() / 2;
    if v.len() % 2 == 1 {
        v[mid]
    } else {
        (v[mid - 1] + v[mid]) / 2.0
    }
}

/// Population standard deviation.
pub fn std_dev(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let mean = average(v);
    let var = v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / v.len() as f64;
    var.sqrt()
}

/// `part / whole`, undefined when `whole` is zero.
pub fn ratio(part: f64, whole: f64) -> Option<f64> {
    if whole == 0.0 {
        None
    } else {
        Some(part / whole)
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let s = format!("{:.*}", decimals, n.abs());
    let neg = n.is_sign_negative() && s.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let mut res = match int_part.parse::<u128>() {
        Ok(v) => v.to_formatted_string(&Locale::en),
        // Beyond u128: group the digit string directly.
        Err(_) => group_digits(int_part, Locale::en.separator()),
    };
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

fn group_digits(digits: &str, sep: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 * sep.len());
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(sep);
        }
        out.push(c);
    }
    out
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// `1234.5` -> `$1,234.50`, `-20` -> `-$20.00`.
pub fn format_currency(n: f64) -> String {
    let body = format_number(n, 2);
    match body.strip_prefix('-') {
        Some(abs) => format!("-${}", abs),
        None => format!("${}", body),
    }
}

/// Fraction to percentage text: `0.125` -> `12.5%`.
pub fn format_percent(fraction: f64) -> String {
    format!("{}%", format_number(fraction * 100.0, 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1500", Some(1500.0))]
    #[case(" 1,234.50 ", Some(1234.5))]
    #[case("$2,000", Some(2000.0))]
    #[case("-$20.25", Some(-20.25))]
    #[case("(1,250.00)", Some(-1250.0))]
    #[case("-75", Some(-75.0))]
    #[case("N/A", None)]
    #[case("", None)]
    #[case("12abc", None)]
    fn test_parse_f64_safe(#[case] s: &str, #[case] want: Option<f64>) {
        assert_eq!(parse_f64_safe(Some(s)), want);
    }

    #[rstest]
    #[case("2024-01-31", Some((2024, 1, 31)))]
    #[case("01/31/2024", Some((2024, 1, 31)))]
    #[case("1/5/24", Some((2024, 1, 5)))]
    #[case("2024-03-02 13:45:00", Some((2024, 3, 2)))]
    #[case("3/2/2024 9:15", Some((2024, 3, 2)))]
    #[case("2024-02-30", None)]
    #[case("yesterday", None)]
    #[case("202-01-15", None)]
    #[case("1/5/1899", None)]
    #[case("1900-01-01", Some((1900, 1, 1)))]
    fn test_parse_date_safe(#[case] s: &str, #[case] want: Option<(i32, u32, u32)>) {
        let want = want.map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap());
        assert_eq!(parse_date_safe(Some(s)), want);
    }

    #[rstest]
    #[case(1234567.891, 2, "1,234,567.89")]
    #[case(-1234.5, 2, "-1,234.50")]
    #[case(999.999, 0, "1,000")]
    #[case(-0.001, 2, "0.00")]
    #[case(2.5e19, 0, "25,000,000,000,000,000,000")]
    #[case(-1e40, 0, "-10,000,000,000,000,000,303,786,028,427,003,666,890,752")]
    fn test_format_number(#[case] n: f64, #[case] decimals: usize, #[case] want: &str) {
        assert_eq!(format_number(n, decimals), want);
    }

    #[test]
    fn currency_and_percent() {
        assert_eq!(format_currency(1500.0), "$1,500.00");
        assert_eq!(format_currency(-20.0), "-$20.00");
        assert_eq!(format_percent(0.125), "12.5%");
    }

    #[test]
    fn statistics() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(vec![4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(average(&[]), 0.0);
        assert!((std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.0).abs() < 1e-12);
        assert_eq!(ratio(1.0, 0.0), None);
    }
}
