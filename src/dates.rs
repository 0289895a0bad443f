use chrono::{Local, NaiveDate};

const KEY_FORMAT: &str = "%Y-%m-%d";

/// Shape check only: four digits, dash, two digits, dash, two digits.
pub fn is_date_key(key: &str) -> bool {
    let bytes = key.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Parses a `YYYY-MM-DD` key into a calendar date. Rejects anything that is
/// not exactly that shape or not a real day.
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    if !is_date_key(key) {
        return None;
    }
    NaiveDate::parse_from_str(key, KEY_FORMAT).ok()
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(KEY_FORMAT).to_string()
}

pub fn previous_day(date: NaiveDate) -> Option<NaiveDate> {
    date.pred_opt()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Inclusive day-by-day walk from `start` to `end`. Empty when `start > end`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}
