// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Translating counted beat notes into fractional frequencies.
//!
//! The absolute frequency of the counted tooth, `k·(N·f_rep + f0·f0_scale) +
//! f_offset`, and the nominal frequency are both around 1e14 Hz while their
//! difference matters at the sub-Hz level, so the cancellation is done in
//! exact rational arithmetic and only the small residual is cast back to
//! floating point.

mod error;
#[cfg(test)]
mod tests;

pub use error::TranslateError;

use ndarray::prelude::*;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{ToPrimitive, Zero};

/// Everything needed to translate a beat magnitude into a fractional
/// frequency.
#[derive(Debug, Clone)]
pub struct BeatParams<'a> {
    /// Nominal absolute optical frequency \[Hz\] as a decimal string.
    /// Underscore separators and surrounding quotes are tolerated.
    pub nominal: &'a str,

    /// Comb tooth number N.
    pub tooth_n: i64,

    /// Comb repetition rate \[Hz\].
    pub f_rep: f64,

    /// Comb carrier-envelope offset frequency \[Hz\].
    pub f0: f64,

    /// Sign of the counted beat relative to the comb tooth; +1 or -1.
    pub f_beat_sign: i32,

    /// Harmonic multiplier applied to both the measured beat and the tooth
    /// frequency.
    pub k_scale: i64,

    /// Multiplier applied to f0 only.
    pub f0_scale: i64,

    /// A fixed frequency correction \[Hz\], applied once, unscaled.
    pub f_offset: f64,
}

/// Translate counted beat-note magnitudes into fractional frequency
/// deviations y.
///
/// `f_cor = k·(N·f_rep + f0·f0_scale) + f_offset - nominal` is evaluated
/// exactly, then `y = -(|f_beat|·k·sign + f_cor) / nominal`. The leading
/// minus sign is the fixed maser-minus-DO convention.
pub fn beat2y(f_beat: ArrayView1<f64>, params: &BeatParams) -> Result<Array1<f64>, TranslateError> {
    if params.f_beat_sign.abs() != 1 {
        return Err(TranslateError::BadBeatSign(params.f_beat_sign));
    }

    let nominal = parse_decimal(params.nominal)?;
    if nominal <= BigRational::zero() {
        return Err(TranslateError::NonPositiveNominal(
            params.nominal.to_string(),
        ));
    }

    let k_scale = BigRational::from_integer(BigInt::from(params.k_scale));
    let tooth = exact(params.f_rep, "f_rep")? * BigInt::from(params.tooth_n)
        + exact(params.f0, "f0")? * BigInt::from(params.f0_scale);
    let f_cor_exact = k_scale * tooth + exact(params.f_offset, "f_offset")? - &nominal;

    let f_cor = rational_to_f64(&f_cor_exact)?;
    let f_nom = rational_to_f64(&nominal)?;
    let sign = f64::from(params.f_beat_sign);
    let k = params.k_scale as f64;

    Ok(f_beat.mapv(|f| -((f * k).abs() * sign + f_cor) / f_nom))
}

/// Scalar convenience over [beat2y].
pub fn beat2y_scalar(f_beat: f64, params: &BeatParams) -> Result<f64, TranslateError> {
    let y = beat2y(ArrayView1::from(&[f_beat]), params)?;
    Ok(y[0])
}

/// Parse a decimal string ("429228004229873.65", "194_400_000_000_000") into
/// an exact rational. No exponent notation.
pub(crate) fn parse_decimal(s: &str) -> Result<BigRational, TranslateError> {
    let cleaned = s.trim().trim_matches('\'').replace('_', "");
    let bad = || TranslateError::BadDecimal(s.to_string());

    let (sign, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };

    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(bad());
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(bad());
    }

    let mantissa: BigInt = format!("{int_part}{frac_part}").parse().map_err(|_| bad())?;
    let denom = num_traits::pow(BigInt::from(10), frac_part.len());
    Ok(BigRational::new(mantissa * sign, denom))
}

/// Lift a float into an exact rational; the binary representation is taken
/// verbatim, so this is lossless.
fn exact(f: f64, what: &'static str) -> Result<BigRational, TranslateError> {
    BigRational::from_float(f).ok_or(TranslateError::NotFinite(what))
}

fn rational_to_f64(r: &BigRational) -> Result<f64, TranslateError> {
    r.to_f64().ok_or(TranslateError::Unrepresentable)
}
