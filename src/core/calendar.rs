use chrono::{Datelike, Months, NaiveDate};

pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    if !s.is_ascii() || s.len() != 10 {
        return None;
    }
    let (year, rest) = s.split_at(4);
    let (dash1, rest) = rest.split_at(1);
    let (month, rest) = rest.split_at(2);
    let (dash2, day) = rest.split_at(1);
    if dash1 != "-" || dash2 != "-" {
        return None;
    }

    let year = parse_digits(year)? as i32;
    let month = parse_digits(month)?;
    let day = parse_digits(day)?;
    if !(1..=12).contains(&month) {
        return None;
    }
    // Day-of-month validity is delegated to calendar construction, so
    // impossible dates like 2025-02-30 come back as None.
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn add_months_clamped(date: NaiveDate, months: i32) -> NaiveDate {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

pub fn to_iso_date(date: NaiveDate) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        date.month(),
        date.day()
    )
}

pub fn month_key(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
