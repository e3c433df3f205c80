// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum WriteError {
    #[error("{path}: IO error: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
