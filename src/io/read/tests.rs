// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::Write;

use approx::assert_abs_diff_eq;
use chrono::NaiveDate;
use indoc::indoc;
use tempfile::TempDir;

use super::*;

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    let mut f = File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn reading_a_clean_file() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(
        tmp.path(),
        "220320_1_Frequ.txt",
        indoc! {"
            Date Time Ch1 Ch2
            220320 000000.000 55000000.1 -12000000.2
            220320 000001.000 55000000.3 -12000000.4
            220320 000002.000 55000000.5 -12000000.6
        "},
    );

    let data = read_counter_file(&path, 12, false, chrono_tz::Europe::Rome).unwrap();
    // 2022-03-20 = MJD 59658.
    let t0 = 59658.0 * 86400.0 - 40587.0 * 86400.0;
    assert_eq!(data.t.len(), 3);
    assert_abs_diff_eq!(data.t[0], t0);
    assert_abs_diff_eq!(data.t[2], t0 + 2.0);
    assert_eq!(data.channels.shape(), [3, 2]);
    assert_abs_diff_eq!(data.channels[(1, 1)], -12000000.4);
}

#[test]
fn malformed_rows_are_dropped() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(
        tmp.path(),
        "220320_1_Frequ.txt",
        indoc! {"
            Date Time Ch1
            220320 000000.000 55000000.1
            Measurement interval (re-)synchronized!
            220320 000001.000 55000000.2 99.9
            220320 000002.000 55000000.3
        "},
    );

    let data = read_counter_file(&path, 12, false, chrono_tz::Europe::Rome).unwrap();
    // The second data row grew an extra channel and is dropped.
    assert_eq!(data.t.len(), 2);
    assert_abs_diff_eq!(data.t[1] - data.t[0], 2.0);
}

#[test]
fn timetags_are_regularized() {
    let tmp = TempDir::new().unwrap();
    // Tags drift by hundreds of milliseconds; the rebuilt grid is exact.
    let path = write_file(
        tmp.path(),
        "220320_1_Frequ.txt",
        indoc! {"
            Date Time Ch1
            220320 120000.300 1.0
            220320 120001.400 2.0
            220320 120002.200 3.0
        "},
    );

    let data = read_counter_file(&path, 12, false, chrono_tz::Europe::Rome).unwrap();
    let t0 = data.t[0];
    assert_abs_diff_eq!(t0.fract(), 0.0);
    assert_abs_diff_eq!(data.t[1], t0 + 1.0);
    assert_abs_diff_eq!(data.t[2], t0 + 2.0);
}

#[test]
fn duplicate_timetags_keep_the_first_row() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(
        tmp.path(),
        "220320_1_Frequ.txt",
        indoc! {"
            Date Time Ch1
            220320 120000.000 1.0
            220320 120000.400 2.0
            220320 120001.000 3.0
        "},
    );

    let data = read_counter_file(&path, 12, false, chrono_tz::Europe::Rome).unwrap();
    assert_eq!(data.t.len(), 2);
    assert_abs_diff_eq!(data.channels[(0, 0)], 1.0);
    assert_abs_diff_eq!(data.channels[(1, 0)], 3.0);
}

#[test]
fn summer_time_gap_is_closed() {
    let tmp = TempDir::new().unwrap();
    // Around the 2022-03-27 CET -> CEST change the counter's local tags jump
    // forward one hour.
    let path = write_file(
        tmp.path(),
        "220327_1_Frequ.txt",
        indoc! {"
            Date Time Ch1
            220327 015959.000 1.0
            220327 030000.000 2.0
            220327 030001.000 3.0
        "},
    );

    let data = read_counter_file(&path, 12, true, chrono_tz::Europe::Rome).unwrap();
    assert_abs_diff_eq!(data.t[1] - data.t[0], 1.0);
    assert_abs_diff_eq!(data.t[2] - data.t[1], 1.0);
}

#[test]
fn empty_file_is_a_no_data_error() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(tmp.path(), "220320_1_Frequ.txt", "Date Time Ch1\n");
    assert!(matches!(
        read_counter_file(&path, 12, false, chrono_tz::Europe::Rome),
        Err(ReadError::NoData { .. })
    ));
}

#[test]
fn max_columns_caps_the_channel_count() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(
        tmp.path(),
        "220320_1_Frequ.txt",
        indoc! {"
            Date Time Ch1 Ch2 Ch3
            220320 000000.000 1.0 2.0 3.0
        "},
    );

    let data = read_counter_file(&path, 2, false, chrono_tz::Europe::Rome).unwrap();
    assert_eq!(data.channels.shape(), [1, 2]);
}

#[test]
fn discovery_matches_one_day_and_sorts() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "220320_2_Frequ.txt", "h\n");
    write_file(tmp.path(), "220320_1_Frequ.txt", "h\n");
    write_file(tmp.path(), "220321_1_Frequ.txt", "h\n");
    write_file(tmp.path(), "notes.txt", "h\n");

    let date = NaiveDate::from_ymd_opt(2022, 3, 20).unwrap();
    let files = find_files(tmp.path(), date).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["220320_1_Frequ.txt", "220320_2_Frequ.txt"]);
}

#[test]
fn conflicted_files_are_renamed_with_backup() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "220320_1_Frequ.txt", "old\n");
    write_file(tmp.path(), "220320_1_Frequ (conflicted).txt", "complete\n");

    let date = NaiveDate::from_ymd_opt(2022, 3, 20).unwrap();
    fix_conflicted_files(tmp.path(), date).unwrap();

    assert_eq!(
        std::fs::read_to_string(tmp.path().join("220320_1_Frequ.txt")).unwrap(),
        "complete\n"
    );
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("wasconflicted_220320_1_Frequ.txt")).unwrap(),
        "old\n"
    );
    assert!(!tmp.path().join("220320_1_Frequ (conflicted).txt").exists());
}

#[test]
fn window_selects_a_half_open_range() {
    let data = CounterData {
        t: ndarray::array![10.0, 11.0, 12.0, 13.0],
        channels: ndarray::Array2::zeros((4, 1)),
    };
    assert_eq!(data.window(11.0, 13.0), 1..3);
    assert_eq!(data.window(0.0, 100.0), 0..4);
    assert_eq!(data.window(50.0, 60.0), 4..4);
}
