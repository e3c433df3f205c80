// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::prelude::*;
use num_traits::ToPrimitive;

use super::*;

fn yb_params() -> BeatParams<'static> {
    BeatParams {
        nominal: "194400000000000",
        tooth_n: 777_600,
        f_rep: 250e6,
        f0: 20e6,
        f_beat_sign: -1,
        k_scale: 1,
        f0_scale: 1,
        f_offset: 0.0,
    }
}

#[test]
fn tooth_matching_nominal_gives_zero() {
    // 777600 * 250 MHz + 20 MHz == nominal + 20 MHz, and the counted 20 MHz
    // beat with negative sign cancels it exactly.
    let y = beat2y_scalar(20e6, &yb_params()).unwrap();
    assert_abs_diff_eq!(y, 0.0);

    // The identity holds for any sign/scale combination that keeps
    // k*(N*f_rep + f0) == nominal with a zero beat.
    // k*(N*f_rep + f0) = 2*(194.4 THz + 20 MHz).
    let params = BeatParams {
        nominal: "388800040000000",
        k_scale: 2,
        f_beat_sign: 1,
        ..yb_params()
    };
    let y = beat2y_scalar(0.0, &params).unwrap();
    assert_abs_diff_eq!(y, 0.0);
}

#[test]
fn underscores_and_quotes_in_nominal_are_tolerated() {
    let params = BeatParams {
        nominal: "'194_400_000_000_000'",
        ..yb_params()
    };
    assert_abs_diff_eq!(beat2y_scalar(20e6, &params).unwrap(), 0.0);
}

#[test]
fn beat_offsets_scale_as_expected() {
    // 1 Hz of extra beat is -1/nominal with positive sign convention
    // reversed by f_beat_sign = -1.
    let y = beat2y_scalar(20e6 + 1.0, &yb_params()).unwrap();
    assert_relative_eq!(y, 1.0 / 194400000000000.0, max_relative = 1e-12);

    // The sign convention: a positive beat above the tooth lowers y.
    let params = BeatParams {
        f_beat_sign: 1,
        ..yb_params()
    };
    let y = beat2y_scalar(1.0, &params).unwrap();
    // f_cor = +20 MHz here, so y = -(1 + 2e7)/nominal.
    assert_relative_eq!(y, -(1.0 + 20e6) / 194400000000000.0, max_relative = 1e-12);
}

#[test]
fn fractional_nominal_keeps_sub_hertz_precision() {
    // A nominal with a fractional part; plain f64 would lose the 0.35 Hz
    // residual inside a 1e14 Hz cancellation only if evaluated naively.
    let params = BeatParams {
        nominal: "194400000000000.35",
        ..yb_params()
    };
    let y = beat2y_scalar(20e6, &params).unwrap();
    // f_cor = -0.35 Hz, beat cancels the 20 MHz: y = 0.35/nominal.
    assert_relative_eq!(y, 0.35 / 194400000000000.35, max_relative = 1e-9);
}

#[test]
fn f0_scale_and_offset_enter_the_correction() {
    let params = BeatParams {
        nominal: "194400040000000", // = N*f_rep + 2*f0
        f0_scale: 2,
        f_offset: 20e3,
        f_beat_sign: -1,
        ..yb_params()
    };
    // f_cor = (N*f_rep + 2*f0) + f_offset - nominal = 20 kHz; a 20 kHz beat
    // with negative sign cancels it.
    let y = beat2y_scalar(20e3, &params).unwrap();
    assert_abs_diff_eq!(y, 0.0);
}

#[test]
fn vectorised_over_the_beat_series() {
    let beats = array![20e6, 20e6 + 1.0, 20e6 + 2.0];
    let y = beat2y(beats.view(), &yb_params()).unwrap();
    assert_eq!(y.len(), 3);
    assert_abs_diff_eq!(y[0], 0.0);
    assert!(y[1] > 0.0 && y[2] > y[1]);
}

#[test]
fn bad_inputs_are_rejected() {
    assert!(matches!(
        beat2y_scalar(0.0, &BeatParams { nominal: "threeve", ..yb_params() }),
        Err(TranslateError::BadDecimal(_))
    ));
    assert!(matches!(
        beat2y_scalar(0.0, &BeatParams { nominal: "-1944", ..yb_params() }),
        Err(TranslateError::NonPositiveNominal(_))
    ));
    assert!(matches!(
        beat2y_scalar(0.0, &BeatParams { f_beat_sign: 0, ..yb_params() }),
        Err(TranslateError::BadBeatSign(0))
    ));
}

#[test]
fn parse_decimal_is_exact() {
    let r = parse_decimal("429228004229873.65").unwrap();
    // 42922800422987365 / 100, reduced by the common factor of 5.
    assert_eq!(r.numer().to_i128(), Some(8_584_560_084_597_473_i128));
    assert_eq!(r.denom().to_i128(), Some(20));

    assert!(parse_decimal("").is_err());
    assert!(parse_decimal(".").is_err());
    assert!(parse_decimal("1.2.3").is_err());
}
