// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Loading setup tables.
//!
//! A setup table is a tab-separated file whose first column is an ISO date
//! (or datetime) and whose header names the remaining columns. `#` starts a
//! comment; the header line itself may start with `# `. Each row describes
//! the setup from its date until the next row's date.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use itertools::Itertools;
use log::warn;

use super::{CombConfig, DoConfig, Setup, SetupError, Timeline};
use crate::time::date2mjd;

/// Load a designed oscillator's setup, combining it with the setup of every
/// comb it was measured on and tracking the changes of both.
///
/// A comb named in the DO table but without a `<comb>.dat` table of its own
/// is skipped with a warning; records using it are invalid and produce no
/// output.
pub(crate) fn load_do_setup(do_name: &str, dir: &Path) -> Result<Timeline<Setup>, SetupError> {
    let do_timeline = load_do_file(&dir.join(format!("{do_name}.dat")))?;

    let comb_names: Vec<String> = do_timeline
        .iter()
        .map(|s| s.value.comb.clone())
        .unique()
        .collect();

    let mut merged = do_timeline.map(|do_cfg| Setup {
        do_cfg: Some(do_cfg.clone()),
        combs: BTreeMap::new(),
        cirt: None,
        name: String::new(),
    });

    for comb_name in comb_names {
        let comb_path = dir.join(format!("{comb_name}.dat"));
        let comb_timeline = match load_comb_file(&comb_path) {
            Ok(t) => t,
            Err(SetupError::Io { path, source })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                warn!("No setup table for comb '{comb_name}' ({})", path.display());
                continue;
            }
            Err(e) => return Err(e),
        };

        merged = merged.merge_with(&comb_timeline, |setup, comb_cfg| {
            let mut setup = setup.cloned().unwrap_or_default();
            if let Some(comb_cfg) = comb_cfg {
                setup.combs.insert(comb_name.clone(), comb_cfg.clone());
            }
            setup
        });
    }

    Ok(merged)
}

pub(crate) fn load_do_file(path: &Path) -> Result<Timeline<DoConfig>, SetupError> {
    let table = Table::read(path)?;
    let mut points = Vec::with_capacity(table.rows.len());

    for row in 0..table.rows.len() {
        let counters = table.multi_usize(row, "counter")?;
        if counters.is_empty() {
            return Err(SetupError::NoCounters {
                path: table.path.clone(),
                line: table.line(row),
            });
        }
        if counters.len() > 3 {
            return Err(SetupError::TooManyCounters {
                path: table.path.clone(),
                line: table.line(row),
                num: counters.len(),
            });
        }

        let threshold = table.opt_f64(row, "threshold")?;
        if counters.len() > 1 && threshold.is_none() {
            return Err(SetupError::MissingThreshold {
                path: table.path.clone(),
                line: table.line(row),
            });
        }

        let mut lower = table.multi_f64(row, "min")?;
        if lower.is_empty() {
            lower.push(f64::NEG_INFINITY);
        }
        let mut upper = table.multi_f64(row, "max")?;
        if upper.is_empty() {
            upper.push(f64::INFINITY);
        }
        let mut lo_freqs = table.multi_f64(row, "flo")?;
        if lo_freqs.is_empty() {
            lo_freqs.push(0.0);
        }

        let config = DoConfig {
            nominal: table.req(row, "nominal")?.trim_matches('\'').to_string(),
            tooth_n: table.req_i64(row, "N")?,
            comb: table.req(row, "comb")?.to_string(),
            physical: table.opt(row, "physical").unwrap_or_default().to_string(),
            counters,
            lower,
            upper,
            lo_freqs,
            threshold,
            f_beat_sign: table.opt_i64(row, "fbeat_sign")?.unwrap_or(1) as i32,
            k_scale: table.opt_i64(row, "kscale")?.unwrap_or(1),
            f0_scale: table.opt_i64(row, "f0_scale")?.unwrap_or(1),
            f_offset: table.opt_f64(row, "foffset")?.unwrap_or(0.0),
        };
        points.push((table.datetime(row)?, config));
    }

    Ok(Timeline::from_points(points)?)
}

pub(crate) fn load_comb_file(path: &Path) -> Result<Timeline<CombConfig>, SetupError> {
    let table = Table::read(path)?;
    let mut points = Vec::with_capacity(table.rows.len());

    for row in 0..table.rows.len() {
        let config = CombConfig {
            f_rep: table.req_f64(row, "frep")?,
            f0: table.req_f64(row, "f0")?,
            counter_f0: table.req_usize(row, "counter_f0")?,
            maser: table.opt(row, "maser").unwrap_or_default().to_string(),
        };
        points.push((table.datetime(row)?, config));
    }

    Ok(Timeline::from_points(points)?)
}

/// A parsed tab-separated setup table.
struct Table {
    path: PathBuf,
    headers: Vec<String>,
    /// (1-based line number in the file, cells).
    rows: Vec<(usize, Vec<String>)>,
}

impl Table {
    fn read(path: &Path) -> Result<Table, SetupError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SetupError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut lines = contents.lines().enumerate();
        let headers: Vec<String> = match lines.next() {
            Some((_, header)) => header
                .split('\t')
                .map(|h| h.trim().trim_start_matches('#').trim().to_string())
                .collect(),
            None => {
                return Err(SetupError::Empty {
                    path: path.to_path_buf(),
                })
            }
        };

        let rows = lines
            .filter(|(_, line)| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
            .map(|(i, line)| {
                (
                    i + 1,
                    line.split('\t').map(|c| c.trim().to_string()).collect(),
                )
            })
            .collect();

        Ok(Table {
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    fn line(&self, row: usize) -> usize {
        self.rows[row].0
    }

    /// A cell by column name; `None` if the column doesn't exist or the cell
    /// is empty.
    fn opt(&self, row: usize, column: &str) -> Option<&str> {
        let i = self.headers.iter().position(|h| h == column)?;
        let cell = self.rows[row].1.get(i)?.as_str();
        (!cell.is_empty()).then_some(cell)
    }

    fn req(&self, row: usize, column: &str) -> Result<&str, SetupError> {
        self.opt(row, column).ok_or_else(|| SetupError::MissingColumn {
            path: self.path.clone(),
            column: column.to_string(),
        })
    }

    fn bad_value(&self, row: usize, column: &str, value: &str) -> SetupError {
        SetupError::BadValue {
            path: self.path.clone(),
            line: self.line(row),
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    /// The first cell of a row is its ISO date (with optional time), as an
    /// MJD.
    fn datetime(&self, row: usize) -> Result<f64, SetupError> {
        let column = self.headers.first().map(|h| h.as_str()).unwrap_or("datetime");
        let cell = self.rows[row].1.first().map(|c| c.as_str()).unwrap_or("");
        for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(cell, format) {
                let seconds = dt.time().signed_duration_since(
                    chrono::NaiveTime::from_hms_opt(0, 0, 0).expect("midnight exists"),
                );
                return Ok(date2mjd(dt.date()) + seconds.num_seconds() as f64 / 86400.0);
            }
        }
        NaiveDate::parse_from_str(cell, "%Y-%m-%d")
            .map(date2mjd)
            .map_err(|_| self.bad_value(row, column, cell))
    }

    fn req_f64(&self, row: usize, column: &str) -> Result<f64, SetupError> {
        let cell = self.req(row, column)?;
        cell.parse()
            .map_err(|_| self.bad_value(row, column, cell))
    }

    fn opt_f64(&self, row: usize, column: &str) -> Result<Option<f64>, SetupError> {
        self.opt(row, column)
            .map(|cell| cell.parse().map_err(|_| self.bad_value(row, column, cell)))
            .transpose()
    }

    fn parse_i64(&self, row: usize, column: &str, cell: &str) -> Result<i64, SetupError> {
        // Integer columns sometimes carry a trailing ".0" from spreadsheet
        // exports.
        if let Ok(i) = cell.parse::<i64>() {
            return Ok(i);
        }
        match cell.parse::<f64>() {
            Ok(f) if f.fract() == 0.0 && f.abs() < 9e15 => Ok(f as i64),
            _ => Err(self.bad_value(row, column, cell)),
        }
    }

    fn req_i64(&self, row: usize, column: &str) -> Result<i64, SetupError> {
        let cell = self.req(row, column)?;
        self.parse_i64(row, column, cell)
    }

    fn opt_i64(&self, row: usize, column: &str) -> Result<Option<i64>, SetupError> {
        self.opt(row, column)
            .map(|cell| self.parse_i64(row, column, cell))
            .transpose()
    }

    fn req_usize(&self, row: usize, column: &str) -> Result<usize, SetupError> {
        let cell = self.req(row, column)?;
        match self.parse_i64(row, column, cell)? {
            i if i >= 0 => Ok(i as usize),
            _ => Err(self.bad_value(row, column, cell)),
        }
    }

    /// Collect the present, non-empty cells among `name`, `name1`, `name2`.
    /// Single-channel setups use the plain column; multi-channel setups the
    /// indexed variants.
    fn multi_f64(&self, row: usize, name: &str) -> Result<Vec<f64>, SetupError> {
        let mut values = Vec::new();
        for column in [name.to_string(), format!("{name}1"), format!("{name}2")] {
            if let Some(cell) = self.opt(row, &column) {
                values.push(
                    cell.parse()
                        .map_err(|_| self.bad_value(row, &column, cell))?,
                );
            }
        }
        Ok(values)
    }

    fn multi_usize(&self, row: usize, name: &str) -> Result<Vec<usize>, SetupError> {
        let mut values = Vec::new();
        for column in [name.to_string(), format!("{name}1"), format!("{name}2")] {
            if let Some(cell) = self.opt(row, &column) {
                match self.parse_i64(row, &column, cell)? {
                    i if i >= 0 => values.push(i as usize),
                    _ => return Err(self.bad_value(row, &column, cell)),
                }
            }
        }
        Ok(values)
    }
}
