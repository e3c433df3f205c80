// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("Two timeline records start at the same instant (MJD {mjd})")]
    DuplicateStart { mjd: f64 },

    #[error("A timeline record has a non-finite start instant")]
    NonFiniteStart,
}

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Couldn't read setup file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Setup file {path} is empty")]
    Empty { path: PathBuf },

    #[error("Setup file {path} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Setup file {path}, line {line}: can't parse '{value}' in column '{column}'")]
    BadValue {
        path: PathBuf,
        line: usize,
        column: String,
        value: String,
    },

    #[error("Setup file {path}, line {line}: no counter channels are configured")]
    NoCounters { path: PathBuf, line: usize },

    #[error(
        "Setup file {path}, line {line}: {num} counter channels configured; at most 3 are supported"
    )]
    TooManyCounters {
        path: PathBuf,
        line: usize,
        num: usize,
    },

    #[error(
        "Setup file {path}, line {line}: more than one counter channel needs a 'threshold' column"
    )]
    MissingThreshold { path: PathBuf, line: usize },

    #[error(transparent)]
    Timeline(#[from] TimelineError),
}
