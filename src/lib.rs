// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Processing of optical-frequency-comb counter data into fractional-frequency
links.

A "designed oscillator" (DO) is beaten against a comb tooth and counted; this
crate resolves which physical setup was active at every instant, rejects
glitched samples, translates beat notes into fractional-frequency deviations
with exact arithmetic, and writes the result as link segments partitioned by
the setup changes worth tracking.
 */

pub mod cli;
pub(crate) mod constants;
pub mod deglitch;
pub(crate) mod io;
pub(crate) mod params;
pub mod setup;
pub(crate) mod time;
pub mod translate;

pub use cli::{CombLinks, CombLinksError};

use crossbeam_utils::atomic::AtomicCell;

lazy_static::lazy_static! {
    /// Are progress bars being drawn? This is global state so it doesn't need
    /// to be threaded through every function that draws one.
    pub(crate) static ref PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
}
