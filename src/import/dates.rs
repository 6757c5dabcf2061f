//! Tolerant date parsing for spreadsheet cells
//!
//! Accepted shapes:
//! - ISO `YYYY-MM-DD`, optionally followed by a time part
//! - `day/month/year`, days past the end of the month clamped to the last day
//! - free-text "MONTH YEAR" with French or English month names, day 1
//!
//! Blank input is absent, never an error.

use chrono::{Datelike, Months, NaiveDate};

use crate::core::text::normalize;

/// Month names after normalization (accents stripped, lower case)
const MONTHS: &[(&str, u32)] = &[
    ("janvier", 1),
    ("january", 1),
    ("fevrier", 2),
    ("february", 2),
    ("mars", 3),
    ("march", 3),
    ("avril", 4),
    ("april", 4),
    ("mai", 5),
    ("may", 5),
    ("juin", 6),
    ("june", 6),
    ("juillet", 7),
    ("july", 7),
    ("aout", 8),
    ("august", 8),
    ("septembre", 9),
    ("september", 9),
    ("octobre", 10),
    ("october", 10),
    ("novembre", 11),
    ("november", 11),
    ("decembre", 12),
    ("december", 12),
];

pub fn parse_import_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    parse_iso(raw)
        .or_else(|| parse_day_month_year(raw))
        .or_else(|| parse_month_year(raw))
}

fn parse_iso(raw: &str) -> Option<NaiveDate> {
    let head = raw.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn parse_day_month_year(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.split('/').map(str::trim).collect();
    let [day, month, year] = parts.as_slice() else {
        return None;
    };

    let day: u32 = day.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let mut year: i32 = year.parse().ok()?;
    if (0..100).contains(&year) {
        year += 2000;
    }
    if day == 0 || !(1..=12).contains(&month) {
        return None;
    }

    let last = last_day_of_month(year, month)?;
    NaiveDate::from_ymd_opt(year, month, day.min(last))
}

fn parse_month_year(raw: &str) -> Option<NaiveDate> {
    let text = normalize(raw);
    let tokens = tokens(&text);

    let month = tokens
        .iter()
        .find_map(|t| MONTHS.iter().find(|(name, _)| name == t).map(|(_, m)| *m))?;
    let year: i32 = tokens
        .iter()
        .find(|t| t.len() == 4 && t.bytes().all(|b| b.is_ascii_digit()))?
        .parse()
        .ok()?;

    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Split into runs of letters and runs of digits, so "aout2024" yields both parts
fn tokens(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = None;
    let mut prev_digit = false;
    for (i, c) in text.char_indices() {
        if !c.is_alphanumeric() {
            if let Some(s) = start.take() {
                out.push(&text[s..i]);
            }
            continue;
        }
        let digit = c.is_ascii_digit();
        match start {
            Some(s) if digit != prev_digit => {
                out.push(&text[s..i]);
                start = Some(i);
            }
            None => start = Some(i),
            _ => {}
        }
        prev_digit = digit;
    }
    if let Some(s) = start {
        out.push(&text[s..]);
    }
    out
}

fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
    Some(last.day())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_iso_dates() {
        assert_eq!(parse_import_date("2024-01-05"), Some(d(2024, 1, 5)));
        assert_eq!(parse_import_date("2024-01-05T00:00:00.000Z"), Some(d(2024, 1, 5)));
        assert_eq!(parse_import_date("2024-02-30"), None);
    }

    #[test]
    fn test_slash_dates_clamp_day() {
        assert_eq!(parse_import_date("30/02/2025"), Some(d(2025, 2, 28)));
        assert_eq!(parse_import_date("31/02/2024"), Some(d(2024, 2, 29)));
        assert_eq!(parse_import_date("1/7/2022"), Some(d(2022, 7, 1)));
        assert_eq!(parse_import_date("31/04/23"), Some(d(2023, 4, 30)));
    }

    #[test]
    fn test_slash_dates_reject_nonsense() {
        assert_eq!(parse_import_date("0/02/2025"), None);
        assert_eq!(parse_import_date("12/13/2025"), None);
        assert_eq!(parse_import_date("1/2"), None);
        assert_eq!(parse_import_date("a/b/c"), None);
    }

    #[test]
    fn test_month_year_text() {
        assert_eq!(parse_import_date("AOUT -2024"), Some(d(2024, 8, 1)));
        assert_eq!(parse_import_date("Décembre 2023"), Some(d(2023, 12, 1)));
        assert_eq!(parse_import_date("march 2025"), Some(d(2025, 3, 1)));
        assert_eq!(parse_import_date("DECEMBRE"), None);
    }

    #[test]
    fn test_month_glued_to_year() {
        assert_eq!(parse_import_date("AOUT2024"), Some(d(2024, 8, 1)));
        assert_eq!(parse_import_date("juin2023"), Some(d(2023, 6, 1)));
        // "mai" inside another word is not a month
        assert_eq!(parse_import_date("Maison 2024"), None);
    }

    #[test]
    fn test_out_of_range_years_are_absent() {
        assert_eq!(parse_import_date("31/12/2147483647"), None);
        assert_eq!(parse_import_date("15/12/-2147483648"), None);
        assert_eq!(parse_import_date("31/12/262143"), None);
    }

    #[test]
    fn test_tokens_split_letters_from_digits() {
        assert_eq!(tokens("aout2024"), vec!["aout", "2024"]);
        assert_eq!(tokens("le 12mars, 2024"), vec!["le", "12", "mars", "2024"]);
        assert!(tokens(" - ").is_empty());
    }

    #[test]
    fn test_blank_is_absent() {
        assert_eq!(parse_import_date(""), None);
        assert_eq!(parse_import_date("   \t"), None);
        assert_eq!(parse_import_date("n/a"), None);
    }
}
