//! Calendar date parsing for the formats study files actually carry.

use chrono::NaiveDate;

/// Formats tried in order. Month-first slashed dates are the dominant
/// convention in the source files; ISO and day-month-name forms appear in
/// exports from other tooling. The two-digit-year form goes first: `%Y`
/// happily accepts `"19"` as year 0019, so trying it earlier would
/// swallow two-digit years.
const DATE_FORMATS: &[&str] = &["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d", "%d-%b-%Y"];

/// Parse a date cell. Empty or unparseable text yields `None`; the
/// missing-value drop stage counts those downstream.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

/// Parse an amount cell. Empty or non-numeric text yields `None`.
pub fn parse_amount(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn parses_supported_formats() {
        assert_eq!(parse_date("02/03/2019"), Some(date(2019, 2, 3)));
        assert_eq!(parse_date("2019-02-03"), Some(date(2019, 2, 3)));
        assert_eq!(parse_date("02/03/19"), Some(date(2019, 2, 3)));
        assert_eq!(parse_date("03-Feb-2019"), Some(date(2019, 2, 3)));
    }

    #[test]
    fn two_digit_years_land_in_the_current_century() {
        // A greedy four-digit-year match would read "19" as year 0019.
        assert_eq!(parse_date("02/03/19"), Some(date(2019, 2, 3)));
        assert_eq!(parse_date("12/31/68"), Some(date(2068, 12, 31)));
        assert_eq!(parse_date("02/03/2019"), Some(date(2019, 2, 3)));
    }

    #[test]
    fn unparseable_dates_become_missing() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("13/45/2019"), None);
    }

    #[test]
    fn amounts_tolerate_blank_cells() {
        assert_eq!(parse_amount("12.5"), Some(12.5));
        assert_eq!(parse_amount(" "), None);
        assert_eq!(parse_amount("n/a"), None);
    }
}
