// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use comfy_table::{Cell, Table, presets::UTF8_FULL};

/// Parse amount text typed with grouping separators ("1.234.500", "Rp 25,000").
/// Everything that is not a digit is dropped; no digits at all means 0.
pub fn parse_grouped_amount(text: &str) -> i64 {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse::<i64>().unwrap_or(i64::MAX)
}

/// Render an amount with a '.' every three digits from the right.
pub fn format_grouped(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

pub fn fmt_money(amount: i64) -> String {
    format!("Rp{}", format_grouped(amount))
}

/// First and last instant (23:59:59) of the month containing `date`.
pub fn month_range(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let first = date.with_day(1).unwrap_or(date);
    let last = month_end(date.year(), date.month()).unwrap_or(date);
    (
        first.and_hms_opt(0, 0, 0).unwrap_or_default(),
        last.and_hms_opt(23, 59, 59).unwrap_or_default(),
    )
}

/// Current local wall-clock time, truncated to whole seconds as stored.
pub fn now_local() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Grouping key for daily buckets, in the same naive local time the store uses.
pub fn date_key(at: &NaiveDateTime) -> String {
    at.format("%Y-%m-%d").to_string()
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// Parse `YYYY-MM` into (year, month).
pub fn parse_month(s: &str) -> Result<(i32, u32)> {
    let d = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", s))?;
    Ok((d.year(), d.month()))
}

pub fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let last_day = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
                29
            } else {
                28
            }
        }
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, last_day)
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // Arrays stream one element per line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouped_amount_ignores_separators() {
        assert_eq!(parse_grouped_amount("1.234.500"), 1_234_500);
        assert_eq!(parse_grouped_amount("Rp 25,000"), 25_000);
        assert_eq!(parse_grouped_amount("-40"), 40);
        assert_eq!(parse_grouped_amount(""), 0);
        assert_eq!(parse_grouped_amount("abc"), 0);
        assert_eq!(parse_grouped_amount("99999999999999999999999"), i64::MAX);
    }

    #[test]
    fn grouping_inserts_dots() {
        assert_eq!(format_grouped(0), "0");
        assert_eq!(format_grouped(999), "999");
        assert_eq!(format_grouped(1000), "1.000");
        assert_eq!(format_grouped(1_234_500), "1.234.500");
        assert_eq!(format_grouped(-25_000), "-25.000");
        assert_eq!(parse_grouped_amount(&format_grouped(7_654_321)), 7_654_321);
    }

    #[test]
    fn month_range_covers_leap_february() {
        let (start, end) = month_range(NaiveDate::from_ymd_opt(2024, 2, 14).unwrap());
        assert_eq!(start.to_string(), "2024-02-01 00:00:00");
        assert_eq!(end.to_string(), "2024-02-29 23:59:59");

        let (_, end) = month_range(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(end.to_string(), "2023-12-31 23:59:59");
    }

    #[test]
    fn date_key_uses_calendar_date() {
        let at = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(23, 30, 0)
            .unwrap();
        assert_eq!(date_key(&at), "2024-01-05");
    }

    #[test]
    fn parse_month_rejects_garbage() {
        assert_eq!(parse_month("2024-07").unwrap(), (2024, 7));
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("July").is_err());
    }
}
