//! Flood-season alignment.
//!
//! Measurements are re-indexed from calendar dates onto a season axis so that
//! one wet season (which straddles the calendar-year boundary) can be treated
//! as a single unit of analysis.
//!
//! Convention: `seasonyear` is the calendar year in which that season's anchor
//! date falls, and `dayofseason` counts real days from the anchor, 1-based, so
//! the anchor date itself is day 1 and a season containing a leap day runs to
//! day 366.

use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use crate::constants::{FLOODSEASON_START_DAY, FLOODSEASON_START_MONTH};

/// Month/day anchor marking the start of the flood season; the year is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonAnchor {
    month: u32,
    day: u32,
}

impl Default for SeasonAnchor {
    /// June 1, the start of the Niger river flood season according to ABN.
    fn default() -> Self {
        Self { month: FLOODSEASON_START_MONTH, day: FLOODSEASON_START_DAY }
    }
}

impl SeasonAnchor {
    /// Create an anchor from a month and day.
    ///
    /// The pair must be a valid date in every year, so February 29 is
    /// rejected.
    pub fn new(month: u32, day: u32) -> Result<Self> {
        // Validate against a non-leap year.
        if NaiveDate::from_ymd_opt(2001, month, day).is_none() {
            bail!("[season] invalid season anchor: month {month}, day {day}");
        }
        Ok(Self { month, day })
    }

    /// The anchor date within the given calendar year.
    fn date_in(&self, year: i32) -> NaiveDate {
        // Validity in any year is checked at construction.
        NaiveDate::from_ymd_opt(year, self.month, self.day).unwrap()
    }

    /// Map a calendar date to its (seasonyear, dayofseason) pair.
    pub fn split(&self, date: NaiveDate) -> (i32, i32) {
        let anchor = self.date_in(date.year());
        let seasonyear = if date >= anchor { date.year() } else { date.year() - 1 };
        let dayofseason = (date - self.date_in(seasonyear)).num_days() as i32 + 1;
        (seasonyear, dayofseason)
    }
}

/// Augment a table with `seasonyear` and `dayofseason` columns derived from
/// `date_col`, and sort it by (seasonyear, dayofseason).
///
/// `date_col` must be a polars `Date` column. Null dates produce null season
/// columns and sort last.
pub fn shift_to_floodseason(
    df: DataFrame,
    date_col: &str,
    anchor: SeasonAnchor,
) -> Result<DataFrame> {
    let dates = df
        .column(date_col)
        .with_context(|| format!("[season] missing date column {date_col:?}"))?
        .as_materialized_series()
        .date()
        .with_context(|| format!("[season] column {date_col:?} must have dtype Date"))?;

    let mut seasonyear: Vec<Option<i32>> = Vec::with_capacity(df.height());
    let mut dayofseason: Vec<Option<i32>> = Vec::with_capacity(df.height());
    for days in dates.physical().into_iter() {
        match days.and_then(date_from_epoch_days) {
            Some(date) => {
                let (year, day) = anchor.split(date);
                seasonyear.push(Some(year));
                dayofseason.push(Some(day));
            }
            None => {
                seasonyear.push(None);
                dayofseason.push(None);
            }
        }
    }

    let mut df = df;
    df.with_column(Column::new("dayofseason".into(), dayofseason))?;
    df.with_column(Column::new("seasonyear".into(), seasonyear))?;
    df.sort(["seasonyear", "dayofseason"], SortMultipleOptions::default().with_nulls_last(true))
        .context("[season] failed to sort by season columns")
}

/// Convert a polars Date physical value (days since the Unix epoch) to chrono.
pub(crate) fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    // 719_163 days from 0001-01-01 to 1970-01-01.
    NaiveDate::from_num_days_from_ce_opt(days + 719_163)
}

/// The inverse of [`date_from_epoch_days`].
pub(crate) fn epoch_days_from_date(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - 719_163
}
