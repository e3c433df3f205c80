// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use thiserror::Error;
use vec1::Vec1;

use crate::deglitch::DeglitchError;
use crate::io::read::ReadError;
use crate::io::write::WriteError;
use crate::setup::SetupError;
use crate::translate::TranslateError;

#[derive(Error, Debug)]
pub(crate) enum ProcessError {
    #[error("{do_name}: {source}")]
    Setup {
        do_name: String,
        source: SetupError,
    },

    #[error("{do_name}: {}: setup names column {column}, but the data has {available} channel columns", .file.display())]
    Column {
        do_name: String,
        file: PathBuf,
        column: usize,
        available: usize,
    },

    #[error("{do_name}: {source}")]
    Deglitch {
        do_name: String,
        source: DeglitchError,
    },

    #[error("{do_name}: {source}")]
    Translate {
        do_name: String,
        source: TranslateError,
    },

    #[error("No data found for: {}", .dos.join(", "))]
    NoData { dos: Vec1<String> },

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

pub(crate) fn column_err(
    do_name: &str,
    file: &Path,
    column: usize,
    available: usize,
) -> ProcessError {
    ProcessError::Column {
        do_name: do_name.to_string(),
        file: file.to_path_buf(),
        column,
        available,
    }
}
