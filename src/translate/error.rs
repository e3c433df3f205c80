// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("Can't parse '{0}' as a decimal number")]
    BadDecimal(String),

    #[error("The nominal frequency '{0}' is not positive")]
    NonPositiveNominal(String),

    #[error("The beat sign must be +1 or -1, not {0}")]
    BadBeatSign(i32),

    #[error("{0} is not finite")]
    NotFinite(&'static str),

    #[error("A frequency correction is not representable as a float")]
    Unrepresentable,
}
