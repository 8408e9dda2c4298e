use chrono::{NaiveDate, Utc};
use uuid::Uuid;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Calendar day in UTC, formatted `YYYY-MM-DD`.
pub fn today() -> String {
    Utc::now().date_naive().format(DATE_FORMAT).to_string()
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}
