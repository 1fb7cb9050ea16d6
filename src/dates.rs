use chrono::{Datelike as _, NaiveDate};

pub const TBA: &str = "TBA";

pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Long-form date such as "Sunday, December 7, 2025"; missing or invalid dates are "TBA".
pub fn format_date(raw: Option<&str>) -> String {
    match raw.and_then(parse_iso_date) {
        Some(date) => date.format("%A, %B %-d, %Y").to_string(),
        None => TBA.to_owned(),
    }
}

/// Builds `YYYY-MM-DD` from separate numeric inputs, rejecting dates that do not exist
/// and years that are not four digits.
pub fn build_dob(year: i32, month: u32, day: u32) -> Option<String> {
    if !(1000..=9999).contains(&year) || month == 0 || day == 0 {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    if date.year() != year || date.month() != month || date.day() != day {
        return None;
    }
    Some(format!("{year:04}-{month:02}-{day:02}"))
}

/// Parses form text for `build_dob`; blank or non-numeric parts yield `None`.
pub fn build_dob_from_text(year: &str, month: &str, day: &str) -> Option<String> {
    let year = year.trim().parse::<i32>().ok()?;
    let month = month.trim().parse::<u32>().ok()?;
    let day = day.trim().parse::<u32>().ok()?;
    build_dob(year, month, day)
}

/// Splits a stored `YYYY-MM-DD` back into form values without leading zeros.
pub fn split_dob(dob: &str) -> Option<(String, String, String)> {
    let mut parts = dob.splitn(3, '-');
    let year = parts.next()?.to_owned();
    let month = parts.next()?.parse::<u32>().ok()?.to_string();
    let day = parts.next()?.parse::<u32>().ok()?.to_string();
    Some((year, month, day))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_dob_rejects_impossible_days() {
        assert_eq!(build_dob(2025, 2, 30), None);
        assert_eq!(build_dob(2025, 4, 31), None);
        assert_eq!(build_dob(2025, 13, 1), None);
        assert_eq!(build_dob(2025, 0, 1), None);
        assert_eq!(build_dob(0, 1, 1), None);
        assert_eq!(build_dob(99, 1, 1), None);
        assert_eq!(build_dob(10_000, 1, 1), None);
        assert_eq!(build_dob_from_text("0099", "1", "1"), None);
    }

    #[test]
    fn build_dob_pads_month_and_day() {
        assert_eq!(build_dob(2025, 2, 28).as_deref(), Some("2025-02-28"));
        assert_eq!(build_dob(2024, 2, 29).as_deref(), Some("2024-02-29"));
        assert_eq!(
            build_dob_from_text(" 2012 ", "3", "04").as_deref(),
            Some("2012-03-04")
        );
        assert_eq!(build_dob_from_text("2012", "", "4"), None);
    }

    #[test]
    fn format_date_falls_back_to_tba() {
        assert_eq!(format_date(None), "TBA");
        assert_eq!(format_date(Some("")), "TBA");
        assert_eq!(format_date(Some("next week")), "TBA");
        assert_eq!(format_date(Some("2025-12-07")), "Sunday, December 7, 2025");
    }

    #[test]
    fn split_dob_strips_leading_zeros() {
        assert_eq!(
            split_dob("2012-03-04"),
            Some(("2012".to_owned(), "3".to_owned(), "4".to_owned()))
        );
        assert_eq!(split_dob("garbage"), None);
    }
}
