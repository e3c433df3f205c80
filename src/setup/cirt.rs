// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! BIPM Circular T reference epochs.
//!
//! Clock comparisons are reported against the monthly Circular T bulletin;
//! its month boundaries fall on MJDs that are multiples of 5 plus 4, so a
//! "month" runs from the boundary closest to one first-of-month to the
//! boundary closest to the next.

use chrono::{Datelike, NaiveDate};

use super::Timeline;
use crate::time::{date2mjd, mjd2date};

/// A timeline of Circular T epoch labels ("YYYY-MM"), one span per month
/// boundary in `[start, stop]` (both MJD).
///
/// The epoch active at `start` is only returned if its own boundary falls
/// inside the window; callers wanting it must extend `start` backwards by at
/// least one month (see `CIRT_LOOKBACK_DAYS`).
pub(crate) fn circular_t_timeline(start: f64, stop: f64) -> Timeline<String> {
    let mut points = Vec::new();
    // Boundaries sit within 2 days of a first-of-month.
    let mut date = first_of_month(mjd2date(start - 3.0));
    while date2mjd(date) <= stop + 3.0 {
        let boundary = month_boundary_mjd(date);
        if boundary >= start && boundary <= stop {
            points.push((boundary, cirt_label(boundary)));
        }
        date = next_month(date);
    }

    Timeline::from_points(points).expect("month boundaries are strictly increasing")
}

/// The Circular T boundary for the month beginning on `first_day`: the MJD
/// congruent to 4 modulo 5 nearest to it.
fn month_boundary_mjd(first_day: NaiveDate) -> f64 {
    let mjd = date2mjd(first_day) as i64;
    let down = mjd - (mjd - 4).rem_euclid(5);
    let up = down + 5;
    if mjd - down <= up - mjd {
        down as f64
    } else {
        up as f64
    }
}

/// The bulletin month a boundary opens, as "YYYY-MM". The boundary is within
/// 2 days of the first of that month, so 2 days in is safely inside it.
pub(crate) fn cirt_label(boundary_mjd: f64) -> String {
    mjd2date(boundary_mjd + 2.0).format("%Y-%m").to_string()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).expect("valid by construction")
}

fn next_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = match date.month() {
        12 => (date.year() + 1, 1),
        m => (date.year(), m + 1),
    };
    NaiveDate::from_ymd_opt(year, month, 1).expect("valid by construction")
}
