use chrono::{Datelike, Duration, NaiveDate};
use std::fmt;

/// Inclusive date range of one calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportingPeriod {
    /// The calendar month ending the day before `first_of_next`
    fn month_before(first_of_next: NaiveDate) -> Self {
        let end = first_of_next - Duration::days(1);
        Self {
            start: first_of_month(end),
            end,
        }
    }

    /// `YYYY_MM` used in report file names
    pub fn file_label(&self) -> String {
        self.start.format("%Y_%m").to_string()
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Last full month and the month before it, relative to `today`
pub fn last_two_months(today: NaiveDate) -> (ReportingPeriod, ReportingPeriod) {
    let last_month = ReportingPeriod::month_before(first_of_month(today));
    let previous_month = ReportingPeriod::month_before(last_month.start);
    (last_month, previous_month)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}
