// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Useful constants.

/// How many neighbouring samples a single rejection contaminates, per side.
/// A counter glitch corrupts multiple consecutive transients.
pub const DEFAULT_GLITCH_EXT: usize = 3;

/// Default threshold on the comb offset-lock sanity check \[Hz\].
pub const DEFAULT_F0_THRESHOLD: f64 = 0.25;

/// Default number of points over which the rolling median is computed.
pub const DEFAULT_MEDIAN_WINDOW: usize = 60;

/// Default rolling-median rejection threshold \[Hz\]. 250 Hz corresponds to a
/// 5-sigma criterion assuming 1e-13 instability at 1 s.
pub const DEFAULT_MEDIAN_THRESHOLD: f64 = 250.0;

/// Double-counting threshold used when only one counter channel is
/// configured. Any positive value works; one channel has zero spread.
pub(crate) const SINGLE_CHANNEL_THRESHOLD: f64 = 1.0;

/// How far before the query start the Circular T source is asked for epochs
/// \[days\]. Longer than any Circular T month (at most 35 days), so the epoch
/// active at the query start is always returned.
pub(crate) const CIRT_LOOKBACK_DAYS: f64 = 40.0;

/// The fixed name of the reference maser oscillator in link segments.
pub(crate) const REFERENCE_OSCILLATOR: &str = "INRIM_HM";

/// Prefix put in front of a designed oscillator's name in link segments.
pub(crate) const OSCILLATOR_PREFIX: &str = "INRIM_";
