// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading raw dead-time-free counter files.
//!
//! One file per counter per day, named `YYMMDD_<counter>_Frequ.txt`: a
//! header line, then one line per second with a local timetag and one
//! frequency reading in Hz per channel. The counters are not disciplined, so
//! timetags drift and have to be rebuilt on a regular one-second grid.

mod error;
#[cfg(test)]
mod tests;

pub(crate) use error::ReadError;

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;
use log::{debug, info, warn};
use ndarray::prelude::*;

/// The samples of one counter file: Unix timetags on a regular one-second
/// grid and the per-channel frequency readings in Hz.
pub(crate) struct CounterData {
    pub(crate) t: Array1<f64>,
    pub(crate) channels: Array2<f64>,
}

impl CounterData {
    /// Indices of the samples with `start <= t < stop` (Unix seconds). The
    /// timetags are sorted, so this is a contiguous range.
    pub(crate) fn window(&self, start: f64, stop: f64) -> std::ops::Range<usize> {
        let lo = self.t.iter().position(|&t| t >= start).unwrap_or(self.t.len());
        let hi = self.t.iter().position(|&t| t >= stop).unwrap_or(self.t.len());
        lo..hi.max(lo)
    }
}

/// Counter files for one day, sorted by name.
pub(crate) fn find_files(dir: &Path, date: NaiveDate) -> Result<Vec<PathBuf>, ReadError> {
    let pattern = dir
        .join(date.format("%y%m%d_?_Frequ.txt").to_string())
        .to_string_lossy()
        .into_owned();
    let mut files: Vec<PathBuf> = glob::glob(&pattern)?.filter_map(Result::ok).collect();
    files.sort_unstable();
    Ok(files)
}

/// Repair counter files duplicated by cloud sync. The conflicted copy holds
/// all the data, so it is renamed over the plain name, with the plain file
/// backed up first under a `wasconflicted_` prefix.
pub(crate) fn fix_conflicted_files(dir: &Path, date: NaiveDate) -> Result<(), ReadError> {
    let pattern = dir
        .join(date.format("%y%m%d_?_Frequ (conflicted).txt").to_string())
        .to_string_lossy()
        .into_owned();
    for entry in glob::glob(&pattern)? {
        let Ok(con_path) = entry else { continue };
        let Some(con_name) = con_path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let good_path = dir.join(con_name.replace(" (conflicted)", ""));

        if good_path.exists() {
            let backup = dir.join(format!(
                "wasconflicted_{}",
                good_path.file_name().unwrap_or_default().to_string_lossy()
            ));
            std::fs::copy(&good_path, &backup).map_err(|e| ReadError::Io {
                path: backup,
                source: e,
            })?;
        }
        std::fs::rename(&con_path, &good_path).map_err(|e| ReadError::Io {
            path: con_path.clone(),
            source: e,
        })?;
        info!("Conflict resolved for {}", con_path.display());
    }
    Ok(())
}

/// Read one counter file into regularized samples.
///
/// Rows that do not parse, or whose channel count differs from the first
/// good row, are dropped; the channel count is capped at `max_columns`.
/// Timetags are rebuilt on an integer-second grid starting from the rounded
/// first tag, with successive deltas rounded to whole seconds. If a seasonal
/// time change in `timezone` falls between the first and last tag and
/// `fix_summer_time` is set, deltas are first reduced modulo one hour.
pub(crate) fn read_counter_file(
    path: &Path,
    max_columns: usize,
    fix_summer_time: bool,
    timezone: Tz,
) -> Result<CounterData, ReadError> {
    let file = File::open(path).map_err(|e| ReadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut raw_t: Vec<f64> = vec![];
    let mut rows: Vec<Vec<f64>> = vec![];
    let mut num_channels = None;
    for line in BufReader::new(file).lines().skip(1) {
        let line = line.map_err(|e| ReadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        // The counter interleaves status messages ("Measurement interval
        // (re-)synchronized!") with data lines; anything unparsable is
        // dropped.
        let Some((t, channels)) = parse_data_line(&line, max_columns) else {
            continue;
        };
        if *num_channels.get_or_insert(channels.len()) != channels.len() {
            continue;
        }
        raw_t.push(t);
        rows.push(channels);
    }

    if raw_t.is_empty() {
        return Err(ReadError::NoData {
            path: path.to_path_buf(),
        });
    }

    let mut dt: Vec<f64> = raw_t.windows(2).map(|w| (w[1] - w[0]).round()).collect();

    if fix_summer_time && summer_time_changed(raw_t[0], raw_t[raw_t.len() - 1], timezone) {
        debug!("{}: trying to fix summer time", path.display());
        for d in &mut dt {
            *d = d.rem_euclid(3600.0);
        }
    }

    let t0 = raw_t[0].round();
    let mut t = Vec::with_capacity(raw_t.len());
    t.push(t0);
    let mut acc = t0;
    for d in dt {
        acc += d;
        t.push(acc);
    }

    // Signed on purpose: the summer-time fix legitimately rebuilds the grid
    // one hour early.
    let dev = t[t.len() - 1] - raw_t[raw_t.len() - 1];
    if dev > 0.5 {
        warn!("{}: timetag regularization deviation {dev} s", path.display());
    }

    // Zero deltas leave duplicate tags; keep the first occurrence.
    let mut seen = HashSet::new();
    let keep: Vec<usize> = (0..t.len()).filter(|&i| seen.insert(t[i].to_bits())).collect();
    if keep.len() < t.len() {
        warn!(
            "{}: {} duplicate timetags dropped",
            path.display(),
            t.len() - keep.len()
        );
    }

    let num_channels = num_channels.unwrap_or(0);
    let mut channels = Array2::zeros((keep.len(), num_channels));
    let mut t2 = Array1::zeros(keep.len());
    for (out, &i) in keep.iter().enumerate() {
        t2[out] = t[i];
        channels
            .row_mut(out)
            .assign(&ArrayView1::from(&rows[i][..]));
    }

    Ok(CounterData { t: t2, channels })
}

/// `YYMMDD HHMMSS[.sss]` timetag plus per-channel readings. The timetag is
/// taken at face value as UTC; seasonal offsets are handled downstream.
fn parse_data_line(line: &str, max_columns: usize) -> Option<(f64, Vec<f64>)> {
    let mut fields = line.split_whitespace();
    let date = fields.next()?;
    let time = fields.next()?;
    let stamp = format!("{date} {time}");
    let dt = NaiveDateTime::parse_from_str(&stamp, "%y%m%d %H%M%S%.f").ok()?;
    let t = dt.and_utc().timestamp_millis() as f64 / 1e3;

    let channels: Option<Vec<f64>> = fields
        .take(max_columns)
        .map(|f| f.parse::<f64>().ok())
        .collect();
    let channels = channels?;
    if channels.is_empty() {
        return None;
    }
    Some((t, channels))
}

/// Did a seasonal time change fall between two timetags? The tags are local
/// wall-clock times, so the comparison is between the UTC offsets in force
/// at the two local datetimes.
fn summer_time_changed(t1: f64, t2: f64, timezone: Tz) -> bool {
    let naive = |t: f64| DateTime::from_timestamp(t as i64, 0).map(|d| d.naive_utc());
    let offset = |n: NaiveDateTime| {
        timezone
            .offset_from_local_datetime(&n)
            .earliest()
            .map(|o| o.fix())
    };
    match (naive(t1).and_then(offset), naive(t2).and_then(offset)) {
        (Some(o1), Some(o2)) => o1 != o2,
        _ => false,
    }
}
