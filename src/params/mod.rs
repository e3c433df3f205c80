// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameters for a processing run.
//!
//! The code here is kind of "mirroring" the code within the `cli` module; the
//! idea is that `cli` is unparsed, user-facing code, whereas parameters have
//! been parsed and are ready to be used directly.

mod error;
#[cfg(test)]
mod tests;

pub(crate) use error::ProcessError;

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::izip;
use log::{debug, info};
use ndarray::prelude::*;
use vec1::Vec1;

use crate::{
    constants::{CIRT_LOOKBACK_DAYS, OSCILLATOR_PREFIX, REFERENCE_OSCILLATOR, SINGLE_CHANNEL_THRESHOLD},
    deglitch::{
        mask_from_bounds, mask_from_double_counting, mask_from_f0, mask_from_median_filter,
        prepare_per_channel,
    },
    io::read::{find_files, fix_conflicted_files, read_counter_file, CounterData},
    io::write::{DirectorySink, LinkRow, LinkSegment, LinkSink, Oscillator, TimeFormat},
    params::error::column_err,
    setup::{
        attach_names, cirt::circular_t_timeline, load::load_do_setup, CombConfig, DoConfig, Setup,
        Timeline, TrackedField,
    },
    time::{generate_dates, mjd2unix},
    translate::{beat2y, BeatParams},
    PROGRESS_BARS,
};

/// Which setup fields, besides the nominal frequency, partition the output
/// into separate segments when they change.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TrackedChanges {
    pub(crate) physical: bool,
    pub(crate) comb: bool,
    pub(crate) maser: bool,
    pub(crate) cirt: bool,
}

impl TrackedChanges {
    /// The tracked fields in partitioning order. The nominal frequency is
    /// always tracked.
    fn fields(self) -> Vec<TrackedField> {
        let mut fields = vec![TrackedField::Nominal];
        if self.physical {
            fields.push(TrackedField::Physical);
        }
        if self.comb {
            fields.push(TrackedField::Comb);
        }
        if self.maser {
            fields.push(TrackedField::Maser);
        }
        if self.cirt {
            fields.push(TrackedField::Cirt);
        }
        fields
    }
}

/// Deglitching knobs shared by every designed oscillator in a run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeglitchParams {
    pub(crate) glitch_ext: usize,
    pub(crate) f0_threshold: f64,
    pub(crate) median_window: usize,
    pub(crate) median_threshold: f64,
}

pub(crate) struct ProcessParams {
    /// The designed oscillators to process.
    pub(crate) dos: Vec1<String>,

    /// Start of the processed window \[MJD\].
    pub(crate) start: f64,

    /// End of the processed window \[MJD\], exclusive.
    pub(crate) stop: f64,

    /// Where the output segments go.
    pub(crate) output_dir: PathBuf,

    /// Where the raw counter files live.
    pub(crate) comb_dir: PathBuf,

    /// Where the setup tables live.
    pub(crate) setup_dir: PathBuf,

    pub(crate) time_format: TimeFormat,

    /// The confidence flag attached to valid samples (0 = discarded, 1 =
    /// experimental, 2 = operational).
    pub(crate) flag: u8,

    /// Max number of channel columns read from the counter files.
    pub(crate) max_columns: usize,

    pub(crate) deglitch: DeglitchParams,

    pub(crate) tracked: TrackedChanges,

    /// Close one-hour timetag gaps caused by seasonal time changes.
    pub(crate) fix_summer_time: bool,

    /// The counters' local timezone.
    pub(crate) timezone: Tz,

    /// Person in charge of the analysis, recorded in the output headers.
    pub(crate) operator: String,
}

impl ProcessParams {
    pub(crate) fn run(&self) -> Result<(), ProcessError> {
        let sink = DirectorySink::new(&self.output_dir);
        self.run_with_sink(&sink)
    }

    pub(crate) fn run_with_sink(&self, sink: &dyn LinkSink) -> Result<(), ProcessError> {
        let (start, stop) = (self.start, self.stop);

        // Circular T epochs start well before the processed window so the
        // first setup span still gets a label.
        let cirt = circular_t_timeline(start - CIRT_LOOKBACK_DAYS, stop);

        let tracked_fields = self.tracked.fields();
        let var_fields: Vec<TrackedField> = tracked_fields
            .iter()
            .filter(|f| {
                matches!(
                    f,
                    TrackedField::Physical | TrackedField::Comb | TrackedField::Maser
                )
            })
            .copied()
            .collect();

        // Setup timelines per DO: the full merged one drives processing, the
        // reduced one partitions the output.
        let mut in_setups = Vec::with_capacity(self.dos.len());
        let mut out_setups = Vec::with_capacity(self.dos.len());
        for do_name in &self.dos {
            debug!("Loading {do_name} setup");
            let timeline =
                load_do_setup(do_name, &self.setup_dir).map_err(|e| ProcessError::Setup {
                    do_name: do_name.clone(),
                    source: e,
                })?;
            let merged = timeline.merge_with(&cirt, |setup, label| {
                let mut setup = setup.cloned().unwrap_or_default();
                setup.cirt = label.cloned();
                setup
            });
            let mut limited = merged.limit(start, stop);
            attach_names(&mut limited, &[TrackedField::Cirt], &var_fields);

            let out = limited.reduce_by_key(|setup: &Setup| {
                tracked_fields
                    .iter()
                    .map(|&f| setup.tracked_value(f))
                    .collect::<Vec<_>>()
            });
            in_setups.push(limited);
            out_setups.push(out);
        }

        // File discovery, with a one-day lookback for files straddling
        // midnight.
        let mut files = vec![];
        for date in generate_dates(start, stop) {
            debug!("Checking {date} files");
            fix_conflicted_files(&self.comb_dir, date)?;
            files.extend(find_files(&self.comb_dir, date)?);
        }
        files.sort_unstable();

        let file_progress = ProgressBar::with_draw_target(
            Some(files.len() as u64),
            if PROGRESS_BARS.load() {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:16}: [{wide_bar:.blue}] {pos:4}/{len:4} files ({elapsed_precise}<{eta_precise})").unwrap()
                .progress_chars("=> "),
        )
        .with_message("Processing");

        let mut accumulators: Vec<Vec<LinkRow>> = vec![vec![]; self.dos.len()];
        for file in &files {
            file_progress.set_message(
                file.file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .into_owned(),
            );
            let data =
                read_counter_file(file, self.max_columns, self.fix_summer_time, self.timezone)?;

            for (do_name, in_setup, acc) in izip!(&self.dos, &in_setups, &mut accumulators) {
                for span in in_setup.iter() {
                    let Some((do_cfg, comb_cfg)) = span.value.active() else {
                        continue;
                    };
                    let this_start = start.max(span.start);
                    let this_stop = stop.min(span.end);
                    let window = data.window(mjd2unix(this_start), mjd2unix(this_stop));
                    if window.is_empty() {
                        continue;
                    }

                    let rows = self.process_span(
                        do_name,
                        file,
                        &data,
                        window,
                        do_cfg,
                        comb_cfg,
                    )?;
                    acc.extend(rows);
                }
            }
            file_progress.inc(1);
        }
        file_progress.finish_and_clear();

        // Write out the segments. A DO without any data is an error, but it
        // must not stop the other DOs from being written.
        let mut missing = vec![];
        for (do_name, in_setup, out_setup, acc) in
            izip!(&self.dos, &in_setups, &out_setups, &accumulators)
        {
            if acc.is_empty() {
                missing.push(do_name.clone());
                continue;
            }
            self.write_do_segments(sink, do_name, in_setup, out_setup, acc)?;
        }

        match Vec1::try_from_vec(missing) {
            Ok(dos) => Err(ProcessError::NoData { dos }),
            Err(_) => Ok(()),
        }
    }

    /// One counter file against one valid setup span: select the beat
    /// channels, run the deglitch masks and translate to y.
    fn process_span(
        &self,
        do_name: &str,
        file: &Path,
        data: &CounterData,
        window: std::ops::Range<usize>,
        do_cfg: &DoConfig,
        comb_cfg: &CombConfig,
    ) -> Result<Vec<LinkRow>, ProcessError> {
        let num_data_columns = data.channels.ncols();
        // Setup tables index columns with the timetag as column 0.
        let column = |c: usize| -> Result<usize, ProcessError> {
            if c == 0 || c > num_data_columns {
                Err(column_err(do_name, file, c, num_data_columns))
            } else {
                Ok(c - 1)
            }
        };
        let columns = do_cfg
            .counters
            .iter()
            .map(|&c| column(c))
            .collect::<Result<Vec<usize>, _>>()?;

        let rows = data.channels.slice(s![window.clone(), ..]);
        let red_data = rows.select(Axis(1), &columns);
        let f0_meas = rows.column(column(comb_cfg.counter_f0)?).to_owned();

        let los = prepare_per_channel(&do_cfg.lo_freqs, columns.len()).map_err(|e| {
            ProcessError::Deglitch {
                do_name: do_name.to_string(),
                source: e,
            }
        })?;
        let los_data = (&red_data + &los).mapv(f64::abs);
        let f_beat = los_data.map_axis(Axis(1), |row| row.sum() / row.len() as f64);

        let threshold = if columns.len() > 1 {
            do_cfg.threshold.unwrap_or(SINGLE_CHANNEL_THRESHOLD)
        } else {
            SINGLE_CHANNEL_THRESHOLD
        };

        let deglitch_err = |source| ProcessError::Deglitch {
            do_name: do_name.to_string(),
            source,
        };
        let d = self.deglitch;
        let bounds_mask =
            mask_from_bounds(red_data.view(), &do_cfg.lower, &do_cfg.upper).map_err(deglitch_err)?;
        let counting_mask = mask_from_double_counting(los_data.view(), threshold, d.glitch_ext);
        let f0_mask = mask_from_f0(f0_meas.view(), comb_cfg.f0, d.f0_threshold);

        let premask = ndarray::Zip::from(&bounds_mask)
            .and(&counting_mask)
            .and(&f0_mask)
            .map_collect(|&a, &b, &c| a && b && c);
        let median_mask = mask_from_median_filter(
            f_beat.view(),
            premask.view(),
            d.median_window,
            d.median_threshold,
            d.glitch_ext,
        );

        let y = beat2y(
            f_beat.view(),
            &BeatParams {
                nominal: &do_cfg.nominal,
                tooth_n: do_cfg.tooth_n,
                f_rep: comb_cfg.f_rep,
                f0: comb_cfg.f0,
                f_beat_sign: do_cfg.f_beat_sign,
                k_scale: do_cfg.k_scale,
                f0_scale: do_cfg.f0_scale,
                f_offset: do_cfg.f_offset,
            },
        )
        .map_err(|e| ProcessError::Translate {
            do_name: do_name.to_string(),
            source: e,
        })?;

        Ok(window
            .zip(izip!(y.iter(), premask.iter(), median_mask.iter()))
            .map(|(i, (&y, &pre, &med))| LinkRow {
                t: data.t[i],
                y,
                flag: if pre && med { self.flag } else { 0 },
            })
            .collect())
    }

    /// Write one DO's accumulated rows, one segment per span of the reduced
    /// output timeline.
    fn write_do_segments(
        &self,
        sink: &dyn LinkSink,
        do_name: &str,
        in_setup: &Timeline<Setup>,
        out_setup: &Timeline<Setup>,
        rows: &[LinkRow],
    ) -> Result<(), ProcessError> {
        for span in out_setup.iter() {
            let Some((do_cfg, _)) = span.value.active() else {
                continue;
            };
            let this_start = self.start.max(span.start);
            let this_stop = self.stop.min(span.end);
            let (tstart, tstop) = (mjd2unix(this_start), mjd2unix(this_stop));

            let selected: Vec<LinkRow> = rows
                .iter()
                .filter(|r| r.t >= tstart && r.t < tstop)
                .copied()
                .collect();
            if selected.is_empty() {
                continue;
            }

            // Provenance comes from every setup span overlapping this output
            // window, so a value that changed mid-segment shows all of its
            // values.
            let overlapping: Vec<&Setup> = in_setup
                .iter()
                .filter(|s| s.end > this_start && s.start < this_stop)
                .map(|s| &s.value)
                .collect();
            let message = format!(
                "Designed oscillator = {} measured on {}\nNominal frequency = {}\nHM = {}\nOperator = {}",
                changing_info(&overlapping, TrackedField::Physical),
                changing_info(&overlapping, TrackedField::Comb),
                do_cfg.nominal,
                changing_info(&overlapping, TrackedField::Maser),
                self.operator,
            );

            let mut segment = LinkSegment {
                reference: Oscillator {
                    name: REFERENCE_OSCILLATOR.to_string(),
                    value: "1".to_string(),
                },
                oscillator: Oscillator {
                    name: format!("{OSCILLATOR_PREFIX}{do_name}"),
                    value: do_cfg.nominal.clone(),
                },
                rows: selected,
                message,
            };
            segment.drop_invalid();
            let path = sink.write_segment(&span.value.name, &segment, self.time_format)?;
            info!("{do_name}: wrote {}", path.display());
        }
        Ok(())
    }
}

/// A tracked field's values over a set of setup records, joined with `/` if
/// it actually changed.
fn changing_info(setups: &[&Setup], field: TrackedField) -> String {
    let mut values: Vec<String> = setups
        .iter()
        .map(|s| s.tracked_value(field))
        .filter(|v| !v.is_empty())
        .collect();
    values.dedup();
    if values.is_empty() {
        "unknown".to_string()
    } else {
        values.join("/")
    }
}
