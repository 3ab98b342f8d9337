//! Report window resolution.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, WindowErrorCode};

/// Length of the default trailing window, both ends inclusive.
pub const DEFAULT_WINDOW_DAYS: u64 = 7;

/// Optional bounds as supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRequest {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

/// Resolved inclusive date range for one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

impl ReportWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from_date <= date && date <= self.to_date
    }
}

impl WindowRequest {
    /// Parses raw `YYYY-MM-DD` query bounds. Blank values count as absent.
    pub fn parse(from_date: Option<&str>, to_date: Option<&str>) -> Result<Self> {
        Ok(Self {
            from_date: parse_bound("from_date", from_date)?,
            to_date: parse_bound("to_date", to_date)?,
        })
    }

    /// Fills defaults against the newest mart date and validates the result.
    ///
    /// `to_date` defaults to `max_report_date`; `from_date` defaults to six
    /// days before `to_date`. The window may not end after `max_report_date`.
    pub fn resolve(&self, max_report_date: NaiveDate) -> Result<ReportWindow> {
        let to_date = self.to_date.unwrap_or(max_report_date);
        let from_date = match self.from_date {
            Some(date) => date,
            None => to_date
                .checked_sub_days(Days::new(DEFAULT_WINDOW_DAYS - 1))
                .unwrap_or(NaiveDate::MIN),
        };

        if from_date > to_date {
            return Err(Error::inverted_window());
        }

        if to_date > max_report_date {
            return Err(Error::window_unavailable(max_report_date));
        }

        Ok(ReportWindow { from_date, to_date })
    }
}

fn parse_bound(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                Error::window(
                    WindowErrorCode::Unparseable,
                    format!("{name} must be a date in YYYY-MM-DD format"),
                )
            }),
    }
}
