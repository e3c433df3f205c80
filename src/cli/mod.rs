// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code.
//!
//! All booleans must have `#[serde(default)]` annotated, and anything that
//! isn't a boolean must be optional. This allows all arguments to be optional
//! *and* usable in an arguments file.
//!
//! Only 3 things should be public in this module: `CombLinks`,
//! `CombLinks::run`, and `CombLinksError`.

mod error;
#[cfg(test)]
mod tests;

pub use error::CombLinksError;

use std::path::PathBuf;

use clap::{AppSettings, Args, Parser};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use vec1::Vec1;

use crate::{
    constants::{
        DEFAULT_F0_THRESHOLD, DEFAULT_GLITCH_EXT, DEFAULT_MEDIAN_THRESHOLD, DEFAULT_MEDIAN_WINDOW,
    },
    io::write::TimeFormat,
    params::{DeglitchParams, ProcessParams, TrackedChanges},
    time::parse_input_date,
    PROGRESS_BARS,
};

const DEFAULT_OUTPUT_DIR: &str = "./Outputs";
const DEFAULT_COMB_DIR: &str = "./Data";
const DEFAULT_OPERATOR: &str = "Marco Pizzocaro";

#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    about = "Process optical-frequency-comb counter data into fractional-frequency links."
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(infer_long_args = true)]
pub struct CombLinks {
    #[clap(flatten)]
    global_opts: GlobalArgs,

    #[clap(flatten)]
    process_args: ProcessArgs,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Don't draw progress bars.
    #[clap(long)]
    no_progress_bars: bool,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    verbosity: u8,

    /// Only verify that arguments were correctly ingested and print out
    /// high-level information.
    #[clap(long)]
    dry_run: bool,
}

#[derive(Debug, Args, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct ProcessArgs {
    /// A TOML file containing any of the other arguments. Arguments given on
    /// the command line override the file.
    #[clap(name = "ARGUMENTS_FILE", parse(from_os_str))]
    #[serde(skip)]
    args_file: Option<PathBuf>,

    /// Name(s) of the designed oscillators to be processed.
    #[clap(long = "do", multiple_values(true))]
    dos: Vec<String>,

    /// Start date as a date (YYYY-MM-DD), MJD or -n previous days
    /// [default: -1].
    #[clap(long)]
    start: Option<String>,

    /// Stop date as a date (YYYY-MM-DD), MJD or -n previous days
    /// [default: 1].
    #[clap(long)]
    stop: Option<String>,

    /// Directory for storing results [default: ./Outputs].
    #[clap(long)]
    dir: Option<PathBuf>,

    /// Directory of the raw counter data [default: ./Data].
    #[clap(long)]
    comb_dir: Option<PathBuf>,

    /// Directory of the setup tables describing the combs and the designed
    /// oscillators [default: <COMB_DIR>/Setup].
    #[clap(long)]
    setup_dir: Option<PathBuf>,

    /// Output time format [default: mjd].
    #[clap(long, arg_enum)]
    time_format: Option<TimeFormat>,

    /// Don't attempt to fix timetag discontinuities due to seasonal time
    /// changes.
    #[clap(long)]
    #[serde(default)]
    do_not_fix_summer_time: bool,

    /// The counters' local timezone [default: Europe/Rome].
    #[clap(long)]
    timezone: Option<String>,

    /// Number of points in the median filter [default: 60].
    #[clap(long)]
    median_filter_window: Option<usize>,

    /// Median filter threshold in Hz [default: 250].
    #[clap(long)]
    median_filter_threshold: Option<f64>,

    /// Max number of channel columns in a counter file [default: 12].
    #[clap(long)]
    max_columns: Option<usize>,

    /// Person in charge of the analysis [default: Marco Pizzocaro].
    #[clap(long)]
    operator: Option<String>,

    /// Flag for the confidence level (0 = discarded, 1 = experimental, 2 =
    /// operational) [default: 1].
    #[clap(long)]
    flag: Option<u8>,

    /// Track changes of the physical oscillator.
    #[clap(long = "track-phys")]
    #[serde(default)]
    track_phys: bool,

    /// Track changes of the comb.
    #[clap(long = "track-comb")]
    #[serde(default)]
    track_comb: bool,

    /// Track changes of the maser.
    #[clap(long = "track-maser")]
    #[serde(default)]
    track_maser: bool,

    /// Track changes of the Circular T month.
    #[clap(long = "track-cirt")]
    #[serde(default)]
    track_cirt: bool,
}

impl ProcessArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified
    /// into a single struct. Where applicable, it will prefer CLI parameters
    /// over those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    fn merge(self) -> Result<ProcessArgs, CombLinksError> {
        let cli_args = self;

        if let Some(arg_file) = &cli_args.args_file {
            debug!("Attempting to parse argument file {}", arg_file.display());
            let contents = std::fs::read_to_string(arg_file)?;
            let file_args: ProcessArgs = toml::from_str(&contents).map_err(|err| {
                CombLinksError::ArgFile(format!(
                    "Couldn't decode toml structure from {arg_file:?}:\n{err}"
                ))
            })?;

            Ok(ProcessArgs {
                args_file: None,
                dos: if cli_args.dos.is_empty() {
                    file_args.dos
                } else {
                    cli_args.dos
                },
                start: cli_args.start.or(file_args.start),
                stop: cli_args.stop.or(file_args.stop),
                dir: cli_args.dir.or(file_args.dir),
                comb_dir: cli_args.comb_dir.or(file_args.comb_dir),
                setup_dir: cli_args.setup_dir.or(file_args.setup_dir),
                time_format: cli_args.time_format.or(file_args.time_format),
                do_not_fix_summer_time: cli_args.do_not_fix_summer_time
                    || file_args.do_not_fix_summer_time,
                timezone: cli_args.timezone.or(file_args.timezone),
                median_filter_window: cli_args
                    .median_filter_window
                    .or(file_args.median_filter_window),
                median_filter_threshold: cli_args
                    .median_filter_threshold
                    .or(file_args.median_filter_threshold),
                max_columns: cli_args.max_columns.or(file_args.max_columns),
                operator: cli_args.operator.or(file_args.operator),
                flag: cli_args.flag.or(file_args.flag),
                track_phys: cli_args.track_phys || file_args.track_phys,
                track_comb: cli_args.track_comb || file_args.track_comb,
                track_maser: cli_args.track_maser || file_args.track_maser,
                track_cirt: cli_args.track_cirt || file_args.track_cirt,
            })
        } else {
            Ok(cli_args)
        }
    }

    /// Turn the arguments into parameters ready to run.
    fn parse(self) -> Result<ProcessParams, CombLinksError> {
        debug!("{:#?}", self);

        let dos =
            Vec1::try_from_vec(self.dos).map_err(|_| CombLinksError::NoDesignedOscillators)?;

        let start = parse_input_date(self.start.as_deref().unwrap_or("-1"))?;
        let stop = parse_input_date(self.stop.as_deref().unwrap_or("1"))?;
        if start >= stop {
            return Err(CombLinksError::EmptyWindow { start, stop });
        }

        let timezone = self
            .timezone
            .as_deref()
            .unwrap_or("Europe/Rome")
            .parse()
            .map_err(CombLinksError::Timezone)?;

        let comb_dir = self
            .comb_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_COMB_DIR));
        let setup_dir = self.setup_dir.unwrap_or_else(|| comb_dir.join("Setup"));

        Ok(ProcessParams {
            dos,
            start,
            stop,
            output_dir: self.dir.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            comb_dir,
            setup_dir,
            time_format: self.time_format.unwrap_or_default(),
            flag: self.flag.unwrap_or(1),
            max_columns: self.max_columns.unwrap_or(12),
            deglitch: DeglitchParams {
                glitch_ext: DEFAULT_GLITCH_EXT,
                f0_threshold: DEFAULT_F0_THRESHOLD,
                median_window: self.median_filter_window.unwrap_or(DEFAULT_MEDIAN_WINDOW),
                median_threshold: self
                    .median_filter_threshold
                    .unwrap_or(DEFAULT_MEDIAN_THRESHOLD),
            },
            tracked: TrackedChanges {
                physical: self.track_phys,
                comb: self.track_comb,
                maser: self.track_maser,
                cirt: self.track_cirt,
            },
            fix_summer_time: !self.do_not_fix_summer_time,
            timezone,
            operator: self.operator.unwrap_or_else(|| DEFAULT_OPERATOR.to_string()),
        })
    }
}

impl CombLinks {
    pub fn run(self) -> Result<(), CombLinksError> {
        let GlobalArgs {
            verbosity,
            dry_run,
            no_progress_bars,
        } = self.global_opts;
        setup_logging(verbosity).expect("Failed to initialise logging.");
        // Enable progress bars if the user didn't say "no progress bars".
        if !no_progress_bars {
            PROGRESS_BARS.store(true);
        }

        info!("comb_links {}", env!("CARGO_PKG_VERSION"));

        let args = self.process_args.merge()?;
        let params = args.parse()?;

        info!(
            "Processing {} from MJD {} to {}",
            params.dos.join(", "),
            params.start,
            params.stop
        );
        if dry_run {
            info!("Dry run, stopping here");
            return Ok(());
        }

        params.run()?;
        Ok(())
    }
}

fn setup_logging(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.init();

    Ok(())
}
