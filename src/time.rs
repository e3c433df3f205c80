// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Time coordinate handling.
//!
//! Setup timelines use the modified Julian date as a plain `f64` (so an
//! open-ended interval can end at `f64::INFINITY`); raw counter samples use
//! Unix seconds on a 1 Hz integer grid. Both are UTC with no leap-second
//! bookkeeping, which is how the counter files are tagged.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use thiserror::Error;

/// The MJD of the Unix epoch, 1970-01-01.
const MJD_UNIX_EPOCH: f64 = 40587.0;

/// Days from the Common Era to the MJD epoch, 1858-11-17.
const MJD_CE_DAYS: i32 = 678576;

/// Convert an MJD to Unix seconds. Infinity maps to infinity.
pub(crate) fn mjd2unix(mjd: f64) -> f64 {
    (mjd - MJD_UNIX_EPOCH) * 86400.0
}

/// Convert Unix seconds to an MJD.
pub(crate) fn unix2mjd(t: f64) -> f64 {
    t / 86400.0 + MJD_UNIX_EPOCH
}

pub(crate) fn date2mjd(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce() - MJD_CE_DAYS)
}

/// The calendar date containing an MJD instant.
pub(crate) fn mjd2date(mjd: f64) -> NaiveDate {
    NaiveDate::from_num_days_from_ce_opt(mjd.floor() as i32 + MJD_CE_DAYS)
        .expect("MJD out of chrono's representable range")
}

/// Smart interpretation of an input date.
///
/// A float > 1 is taken as an MJD, fractional part included. A float <= 1 is
/// taken as a day offset from today (-1 = yesterday, 0 = today, 1 =
/// tomorrow). Anything else is parsed as a `YYYY-MM-DD` date.
pub(crate) fn parse_input_date(s: &str) -> Result<f64, DateParseError> {
    if let Ok(d) = s.trim().parse::<f64>() {
        if !d.is_finite() {
            return Err(DateParseError::NotFinite(s.to_string()));
        }
        if d > 1.0 {
            return Ok(d);
        }
        let today = date2mjd(Utc::now().date_naive());
        return Ok(today + d.floor());
    }

    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map(|date| date2mjd(date).round())
        .map_err(|_| DateParseError::Unparsable(s.to_string()))
}

/// The calendar days whose counter files may contain data in `[start, stop)`
/// (both MJD). One day of lookback: a file started the previous day can run
/// past local midnight.
pub(crate) fn generate_dates(start: f64, stop: f64) -> Vec<NaiveDate> {
    let first = mjd2date(start) - Duration::days(1);
    let num_days = (mjd2date(stop) - mjd2date(start)).num_days().max(0);
    (0..=num_days)
        .map(|offset| first + Duration::days(offset))
        .collect()
}

#[derive(Error, Debug)]
pub enum DateParseError {
    #[error("'{0}' is neither a number nor a YYYY-MM-DD date")]
    Unparsable(String),

    #[error("'{0}' is not a finite date")]
    NotFinite(String),
}
