//! UTC query windows for a local calendar range.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::AppError;

/// Request timestamp layout expected by the market-data service.
const PERIOD_FORMAT: &str = "%Y%m%d%H%M";

/// A UTC request window covering `lookback` whole local days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryWindow {
    /// First local day covered.
    pub start_date: NaiveDate,
    /// Last local day covered.
    pub end_date: NaiveDate,
    pub utc_start: NaiveDateTime,
    pub utc_end: NaiveDateTime,
}

impl QueryWindow {
    /// Window ending on local day `end_date` (inclusive) and reaching back
    /// `lookback_days` days, shifted to UTC by a fixed `offset_hours`.
    pub fn from_local(end_date: NaiveDate, lookback_days: u32, offset_hours: i32) -> Result<Self, AppError> {
        if lookback_days == 0 {
            return Err(AppError::config("Lookback must be at least one day."));
        }
        let start_date = end_date
            .checked_sub_signed(Duration::days(i64::from(lookback_days) - 1))
            .ok_or_else(|| AppError::config("Lookback reaches before the supported date range."))?;
        let after_end = end_date
            .succ_opt()
            .ok_or_else(|| AppError::config("End date is past the supported date range."))?;

        let offset = Duration::hours(i64::from(offset_hours));
        let to_utc = |date: NaiveDate| {
            date.and_time(chrono::NaiveTime::MIN)
                .checked_sub_signed(offset)
                .ok_or_else(|| AppError::config(format!("Offset of {offset_hours} hours leaves the supported date range.")))
        };
        Ok(Self {
            start_date,
            end_date,
            utc_start: to_utc(start_date)?,
            utc_end: to_utc(after_end)?,
        })
    }

    /// Same as [`QueryWindow::from_local`] with the end date as `YYYY-MM-DD`.
    pub fn parse(end_date: &str, lookback_days: u32, offset_hours: i32) -> Result<Self, AppError> {
        let end = NaiveDate::parse_from_str(end_date.trim(), "%Y-%m-%d")
            .map_err(|e| AppError::config(format!("Invalid end date '{end_date}' (expected YYYY-MM-DD): {e}")))?;
        Self::from_local(end, lookback_days, offset_hours)
    }

    pub fn period_start(&self) -> String {
        self.utc_start.format(PERIOD_FORMAT).to_string()
    }

    pub fn period_end(&self) -> String {
        self.utc_end.format(PERIOD_FORMAT).to_string()
    }

    /// `<start>_to_<end>` with both local dates as `YYYYMMDD`.
    pub fn file_tag(&self) -> String {
        format!(
            "{}_to_{}",
            self.start_date.format("%Y%m%d"),
            self.end_date.format("%Y%m%d")
        )
    }
}
