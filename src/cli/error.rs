// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all comb_links-related errors. This should be the *only*
//! error enum that is publicly visible.

use thiserror::Error;

use crate::params::ProcessError;
use crate::time::DateParseError;

#[derive(Error, Debug)]
pub enum CombLinksError {
    #[error("No designed oscillators specified (--do)")]
    NoDesignedOscillators,

    #[error("Start MJD {start} is not before stop MJD {stop}")]
    EmptyWindow { start: f64, stop: f64 },

    #[error("Unrecognised timezone: {0}")]
    Timezone(String),

    #[error("{0}")]
    ArgFile(String),

    #[error("{0}")]
    Date(String),

    #[error("{0}")]
    Process(String),

    #[error("{0}")]
    Io(String),
}

impl From<DateParseError> for CombLinksError {
    fn from(e: DateParseError) -> Self {
        Self::Date(e.to_string())
    }
}

impl From<ProcessError> for CombLinksError {
    fn from(e: ProcessError) -> Self {
        Self::Process(e.to_string())
    }
}

impl From<std::io::Error> for CombLinksError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
