// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use indoc::indoc;
use tempfile::TempDir;
use vec1::Vec1;

use super::*;
use crate::constants::{
    DEFAULT_F0_THRESHOLD, DEFAULT_GLITCH_EXT, DEFAULT_MEDIAN_THRESHOLD, DEFAULT_MEDIAN_WINDOW,
};

/// One DO on one comb: nominal = N f_rep + f0, so a zero beat translates to
/// y = 0 exactly.
fn write_setup_dir(dir: &std::path::Path) {
    std::fs::write(
        dir.join("LoYb.dat"),
        indoc! {"
            # datetime	nominal	N	comb	physical	counter	min	max	flo	fbeat_sign	kscale	f0_scale	foffset
            2022-03-01	194400020000000	777600	comb1	Yb1	1	-1000000	1000000	0	1	1	1	0.0
        "},
    )
    .unwrap();
    std::fs::write(
        dir.join("comb1.dat"),
        indoc! {"
            # datetime	frep	f0	counter_f0	maser
            2022-02-01	250000000.0	20000000.0	2	HM3
        "},
    )
    .unwrap();
}

/// A counter file for 2022-03-20 (MJD 59658): channel 1 carries a zero beat,
/// channel 2 the counted f0.
fn write_counter_file(dir: &std::path::Path, num_samples: usize) {
    let mut contents = String::from("Date Time Ch1 Ch2\n");
    for i in 0..num_samples {
        contents.push_str(&format!(
            "220320 12{:02}{:02}.000 0.0 20000000.0\n",
            i / 60,
            i % 60
        ));
    }
    std::fs::write(dir.join("220320_1_Frequ.txt"), contents).unwrap();
}

fn params(setup: &TempDir, comb: &TempDir, out: &TempDir) -> ProcessParams {
    ProcessParams {
        dos: Vec1::try_from_vec(vec!["LoYb".to_string()]).unwrap(),
        start: 59658.0,
        stop: 59659.0,
        output_dir: out.path().to_path_buf(),
        comb_dir: comb.path().to_path_buf(),
        setup_dir: setup.path().to_path_buf(),
        time_format: TimeFormat::Mjd,
        flag: 1,
        max_columns: 12,
        deglitch: DeglitchParams {
            glitch_ext: DEFAULT_GLITCH_EXT,
            f0_threshold: DEFAULT_F0_THRESHOLD,
            median_window: DEFAULT_MEDIAN_WINDOW,
            median_threshold: DEFAULT_MEDIAN_THRESHOLD,
        },
        tracked: TrackedChanges::default(),
        fix_summer_time: false,
        timezone: chrono_tz::Europe::Rome,
        operator: "Marco Pizzocaro".to_string(),
    }
}

#[test]
fn end_to_end_zero_beat_run() {
    let setup = TempDir::new().unwrap();
    let comb = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_setup_dir(setup.path());
    write_counter_file(comb.path(), 3600);

    params(&setup, &comb, &out).run().unwrap();

    // MJD 59658 falls in the 2022-03 Circular T epoch, which names the
    // output subdirectory.
    let path = out
        .path()
        .join("2022-03")
        .join("INRIM_HM-INRIM_LoYb.dat");
    let contents = std::fs::read_to_string(path).unwrap();

    let data_lines: Vec<&str> = contents
        .lines()
        .filter(|l| !l.starts_with('#'))
        .collect();
    assert_eq!(data_lines.len(), 3600);
    // 12:00:00 UTC on the day.
    let fields: Vec<&str> = data_lines[0].split_whitespace().collect();
    assert_eq!(fields[0], "59658.500000000");
    assert_eq!(fields[1].parse::<f64>().unwrap(), 0.0);
    assert_eq!(fields[2], "1");

    assert!(contents.contains("# Designed oscillator = Yb1 measured on comb1"));
    assert!(contents.contains("# Nominal frequency = 194400020000000"));
    assert!(contents.contains("# HM = HM3"));
    assert!(contents.contains("# Operator = Marco Pizzocaro"));
}

#[test]
fn out_of_window_run_reports_no_data() {
    let setup = TempDir::new().unwrap();
    let comb = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_setup_dir(setup.path());
    write_counter_file(comb.path(), 60);

    let mut p = params(&setup, &comb, &out);
    p.start = 59000.0;
    p.stop = 59001.0;
    let result = p.run();
    assert!(matches!(
        result,
        Err(ProcessError::NoData { ref dos }) if dos.first().as_str() == "LoYb"
    ));
}

#[test]
fn glitched_samples_are_flagged_zero_but_kept_in_the_accumulator() {
    let setup = TempDir::new().unwrap();
    let comb = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_setup_dir(setup.path());

    // One sample breaks the bounds; it gets flag 0 and is dropped from the
    // written segment, without contaminating the rolling median.
    let mut contents = String::from("Date Time Ch1 Ch2\n");
    for i in 0..60 {
        let ch1 = if i == 30 { 2e6 } else { 0.0 };
        contents.push_str(&format!(
            "220320 1200{:02}.000 {ch1} 20000000.0\n",
            i % 60
        ));
    }
    std::fs::write(comb.path().join("220320_1_Frequ.txt"), contents).unwrap();

    params(&setup, &comb, &out).run().unwrap();

    let path = out
        .path()
        .join("2022-03")
        .join("INRIM_HM-INRIM_LoYb.dat");
    let contents = std::fs::read_to_string(path).unwrap();
    let data_lines: Vec<&str> = contents
        .lines()
        .filter(|l| !l.starts_with('#'))
        .collect();
    assert_eq!(data_lines.len(), 59);
    assert!(data_lines.iter().all(|l| l.ends_with(" 1")));
}
