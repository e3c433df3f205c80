// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Rejecting glitched counter samples.
//!
//! Four independent mask producers run over one configuration interval's
//! samples; `true` means keep. The stages are combined by the orchestrator
//! with a logical AND, the median-filter stage seeing only the survivors of
//! the other three. Every stage returns a mask over the full sample index so
//! an external visualisation can render them individually.

mod error;

pub use error::DeglitchError;

use ndarray::prelude::*;

/// Resize bounds (or local-oscillator lists) to the number of channels: a
/// single value broadcasts, a per-channel list passes through, anything else
/// is a shape error.
pub(crate) fn prepare_per_channel(
    values: &[f64],
    num_channels: usize,
) -> Result<Array1<f64>, DeglitchError> {
    match values.len() {
        1 => Ok(Array1::from_elem(num_channels, values[0])),
        n if n == num_channels => Ok(Array1::from_vec(values.to_vec())),
        n => Err(DeglitchError::ShapeMismatch {
            len: n,
            num_channels,
        }),
    }
}

/// Mask samples out of bounds: a sample is kept iff every channel's value is
/// strictly between its lower and upper bound.
pub fn mask_from_bounds(
    data: ArrayView2<f64>,
    lower: &[f64],
    upper: &[f64],
) -> Result<Array1<bool>, DeglitchError> {
    let num_channels = data.ncols();
    let lower = prepare_per_channel(lower, num_channels)?;
    let upper = prepare_per_channel(upper, num_channels)?;

    if lower.iter().zip(upper.iter()).any(|(lo, up)| lo >= up) {
        return Err(DeglitchError::BoundsOrder);
    }

    Ok(data
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .zip(lower.iter())
                .zip(upper.iter())
                .all(|((&v, &lo), &up)| v > lo && v < up)
        })
        .collect())
}

/// Mask glitches detected by double counting: disagreement between redundant
/// counter channels, the symptom of one channel briefly miscounting a whole
/// fringe. Uses the per-sample peak-to-peak spread across channels, so a
/// single channel (zero spread) never rejects, and a hypothetical triple
/// counting works unchanged.
pub fn mask_from_double_counting(
    data: ArrayView2<f64>,
    threshold: f64,
    glitch_ext: usize,
) -> Array1<bool> {
    let mut mask: Array1<bool> = data
        .rows()
        .into_iter()
        .map(|row| {
            let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
            for &v in row {
                min = min.min(v);
                max = max.max(v);
            }
            max - min < threshold
        })
        .collect();
    widen_rejections(&mut mask, glitch_ext);
    mask
}

/// Mask samples where the counted comb offset frequency strayed from its
/// nominal value, a symptom of the offset lock failing independently of the
/// beat-note channels.
pub fn mask_from_f0(f0: ArrayView1<f64>, f0_nominal: f64, threshold: f64) -> Array1<bool> {
    f0.mapv(|v| (v - f0_nominal.abs()).abs() < threshold)
}

/// Mask beat samples dissimilar from their neighbours.
///
/// Only the subsequence passing `premask` enters the rolling median, so
/// already-rejected samples cannot contaminate the statistic. Positions
/// outside `premask` pass through as `true`: they are rejected by other
/// stages already, and this stage must not independently reject them. An
/// empty premasked subsequence returns an all-`true` mask.
pub fn mask_from_median_filter(
    f_beat: ArrayView1<f64>,
    premask: ArrayView1<bool>,
    median_window: usize,
    median_threshold: f64,
    glitch_ext: usize,
) -> Array1<bool> {
    let kept: Vec<f64> = f_beat
        .iter()
        .zip(premask.iter())
        .filter(|(_, &keep)| keep)
        .map(|(&v, _)| v)
        .collect();

    if kept.is_empty() {
        return Array1::from_elem(premask.len(), true);
    }

    let rolled = rolling_median(&kept, median_window);
    let mut sub_mask: Array1<bool> = kept
        .iter()
        .zip(rolled.iter())
        .map(|(v, m)| (v - m).abs() < median_threshold)
        .collect();
    widen_rejections(&mut sub_mask, glitch_ext);

    // Scatter back onto the full sample index.
    let mut mask = Array1::from_elem(premask.len(), true);
    let mut sub = sub_mask.iter().copied();
    for (out, &keep) in mask.iter_mut().zip(premask.iter()) {
        if keep {
            if let Some(s) = sub.next() {
                *out = s;
            }
        }
    }
    mask
}

/// Widen every rejection to its neighbours: a `false` at index i forces
/// `false` on `[i - glitch_ext, i + glitch_ext]`, clipped to the array. A
/// glitch typically corrupts several consecutive transients.
pub(crate) fn widen_rejections(mask: &mut Array1<bool>, glitch_ext: usize) {
    if glitch_ext == 0 {
        return;
    }
    let n = mask.len();
    let rejected: Vec<usize> = (0..n).filter(|&i| !mask[i]).collect();
    for i in rejected {
        let lo = i.saturating_sub(glitch_ext);
        let hi = (i + glitch_ext + 1).min(n);
        for j in lo..hi {
            mask[j] = false;
        }
    }
}

/// A centered rolling median. The sequence is reflected at the edges so
/// every window stays full-size; an even window takes the upper middle of
/// the sorted values.
pub(crate) fn rolling_median(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let window = window.clamp(1, n.max(1));
    let half = window / 2;

    let padded: Vec<f64> = values[..half]
        .iter()
        .rev()
        .chain(values.iter())
        .chain(values[n - (window - 1 - half)..].iter().rev())
        .copied()
        .collect();

    let mut buf = Vec::with_capacity(window);
    (0..n)
        .map(|i| {
            buf.clear();
            buf.extend_from_slice(&padded[i..i + window]);
            buf.sort_by(f64::total_cmp);
            buf[buf.len() / 2]
        })
        .collect()
}
