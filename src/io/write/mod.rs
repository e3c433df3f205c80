// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Writing out frequency-link segments.

mod error;

pub(crate) use error::WriteError;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::DateTime;
use clap::ArgEnum;
use log::info;
use serde::{Deserialize, Serialize};

use crate::time::unix2mjd;

/// How timestamps are rendered in output files.
#[derive(ArgEnum, Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum TimeFormat {
    Iso,
    #[default]
    Mjd,
    Unix,
}

impl TimeFormat {
    fn column_label(self) -> &'static str {
        match self {
            TimeFormat::Iso => "ISO date",
            TimeFormat::Mjd => "MJD",
            TimeFormat::Unix => "Unix time /s",
        }
    }

    fn render(self, t: f64) -> String {
        match self {
            TimeFormat::Iso => DateTime::from_timestamp_millis((t * 1e3).round() as i64)
                .map(|d| d.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
                .unwrap_or_else(|| format!("{t:.3}")),
            TimeFormat::Mjd => format!("{:.9}", unix2mjd(t)),
            TimeFormat::Unix => format!("{t:.3}"),
        }
    }
}

/// One of the two ends of a link: a name and its declared frequency. The
/// fixed reference end declares the value "1".
#[derive(Debug, Clone)]
pub(crate) struct Oscillator {
    pub(crate) name: String,
    pub(crate) value: String,
}

/// One row of a link segment: a Unix timetag, a fractional frequency offset
/// and a validity flag (0 = invalid).
#[derive(Debug, Clone, Copy)]
pub(crate) struct LinkRow {
    pub(crate) t: f64,
    pub(crate) y: f64,
    pub(crate) flag: u8,
}

/// A contiguous stretch of fractional frequencies between two oscillators,
/// with a free-text provenance block for the file header.
#[derive(Debug, Clone)]
pub(crate) struct LinkSegment {
    pub(crate) reference: Oscillator,
    pub(crate) oscillator: Oscillator,
    pub(crate) rows: Vec<LinkRow>,
    pub(crate) message: String,
}

impl LinkSegment {
    pub(crate) fn drop_invalid(&mut self) {
        self.rows.retain(|r| r.flag != 0);
    }
}

/// Where link segments end up. The orchestrator only ever talks to this
/// trait, so outputs can be redirected in tests.
pub(crate) trait LinkSink {
    /// Persist a segment under a named subdirectory, returning the path it
    /// was written to.
    fn write_segment(
        &self,
        subdir: &str,
        segment: &LinkSegment,
        time_format: TimeFormat,
    ) -> Result<PathBuf, WriteError>;
}

/// Writes segments as `<root>/<subdir>/<reference>-<oscillator>.dat` text
/// files. Rewriting a segment overwrites the previous file, so reruns are
/// idempotent.
pub(crate) struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub(crate) fn new<P: Into<PathBuf>>(root: P) -> DirectorySink {
        DirectorySink { root: root.into() }
    }
}

impl LinkSink for DirectorySink {
    fn write_segment(
        &self,
        subdir: &str,
        segment: &LinkSegment,
        time_format: TimeFormat,
    ) -> Result<PathBuf, WriteError> {
        let dir = self.root.join(subdir);
        std::fs::create_dir_all(&dir).map_err(|e| WriteError::Io {
            path: dir.clone(),
            source: e,
        })?;
        let path = dir.join(format!(
            "{}-{}.dat",
            segment.reference.name, segment.oscillator.name
        ));

        let io_err = |e| WriteError::Io {
            path: path.clone(),
            source: e,
        };
        let file = File::create(&path).map_err(io_err)?;
        let mut w = BufWriter::new(file);
        write_header(&mut w, segment, time_format).map_err(io_err)?;
        for row in &segment.rows {
            writeln!(
                w,
                "{} {:.6e} {}",
                time_format.render(row.t),
                row.y,
                row.flag
            )
            .map_err(io_err)?;
        }
        w.flush().map_err(io_err)?;

        info!("{}: {} rows written", path.display(), segment.rows.len());
        Ok(path)
    }
}

fn write_header(
    w: &mut impl Write,
    segment: &LinkSegment,
    time_format: TimeFormat,
) -> Result<(), std::io::Error> {
    writeln!(
        w,
        "# Link {}-{}",
        segment.reference.name, segment.oscillator.name
    )?;
    writeln!(w, "# {} = {}", segment.reference.name, segment.reference.value)?;
    writeln!(
        w,
        "# {} = {}",
        segment.oscillator.name, segment.oscillator.value
    )?;
    for line in segment.message.lines() {
        writeln!(w, "# {line}")?;
    }
    writeln!(
        w,
        "# Columns: {}, fractional frequency offset, flag",
        time_format.column_label()
    )?;
    Ok(())
}
