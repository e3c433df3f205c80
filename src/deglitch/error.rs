// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from deglitching counter data.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeglitchError {
    #[error("Got {len} per-channel values, but the data has {num_channels} channels; supply one value or one per channel")]
    ShapeMismatch { len: usize, num_channels: usize },

    #[error("A lower bound is not strictly below its upper bound")]
    BoundsOrder,
}
