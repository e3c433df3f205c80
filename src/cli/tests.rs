// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use indoc::indoc;

use super::*;

fn parse_cli(args: &[&str]) -> CombLinks {
    CombLinks::try_parse_from(std::iter::once("comb_links").chain(args.iter().copied())).unwrap()
}

#[test]
fn defaults_match_the_documented_ones() {
    let cli = parse_cli(&["--do", "LoYb", "--start", "59658", "--stop", "59659"]);
    let params = cli.process_args.merge().unwrap().parse().unwrap();

    assert_eq!(params.dos.as_vec(), &vec!["LoYb".to_string()]);
    assert_eq!(params.start, 59658.0);
    assert_eq!(params.stop, 59659.0);
    assert_eq!(params.output_dir, PathBuf::from("./Outputs"));
    assert_eq!(params.comb_dir, PathBuf::from("./Data"));
    assert_eq!(params.setup_dir, PathBuf::from("./Data").join("Setup"));
    assert_eq!(params.time_format, TimeFormat::Mjd);
    assert_eq!(params.flag, 1);
    assert_eq!(params.max_columns, 12);
    assert_eq!(params.deglitch.median_window, 60);
    assert_eq!(params.deglitch.median_threshold, 250.0);
    assert!(params.fix_summer_time);
    assert_eq!(params.timezone, chrono_tz::Europe::Rome);
    assert_eq!(params.operator, "Marco Pizzocaro");
    assert!(!params.tracked.physical);
}

#[test]
fn multiple_dos_and_tracking_flags() {
    let cli = parse_cli(&[
        "--do",
        "LoYb",
        "LoSr",
        "--start",
        "59658",
        "--stop",
        "59659",
        "--track-maser",
        "--track-cirt",
        "--do-not-fix-summer-time",
    ]);
    let params = cli.process_args.merge().unwrap().parse().unwrap();

    assert_eq!(
        params.dos.as_vec(),
        &vec!["LoYb".to_string(), "LoSr".to_string()]
    );
    assert!(params.tracked.maser);
    assert!(params.tracked.cirt);
    assert!(!params.tracked.comb);
    assert!(!params.fix_summer_time);
}

#[test]
fn cli_arguments_override_the_args_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("args.toml");
    std::fs::write(
        &file,
        indoc! {r#"
            dos = ["LoSr"]
            start = "59000"
            stop = "59001"
            flag = 2
            track-comb = true
        "#},
    )
    .unwrap();

    let cli = parse_cli(&[file.to_str().unwrap(), "--do", "LoYb", "--flag", "1"]);
    let args = cli.process_args.merge().unwrap();
    assert_eq!(args.dos, ["LoYb".to_string()]);
    assert_eq!(args.flag, Some(1));
    // Unset on the command line, so the file values win.
    assert_eq!(args.start.as_deref(), Some("59000"));
    assert!(args.track_comb);

    let params = args.parse().unwrap();
    assert_eq!(params.start, 59000.0);
    assert_eq!(params.flag, 1);
}

#[test]
fn missing_dos_is_an_error() {
    let cli = parse_cli(&["--start", "59658", "--stop", "59659"]);
    let result = cli.process_args.merge().unwrap().parse();
    assert!(matches!(result, Err(CombLinksError::NoDesignedOscillators)));
}

#[test]
fn inverted_window_is_an_error() {
    let cli = parse_cli(&["--do", "LoYb", "--start", "59659", "--stop", "59658"]);
    let result = cli.process_args.merge().unwrap().parse();
    assert!(matches!(result, Err(CombLinksError::EmptyWindow { .. })));
}

#[test]
fn bad_timezone_is_an_error() {
    let cli = parse_cli(&[
        "--do",
        "LoYb",
        "--start",
        "59658",
        "--stop",
        "59659",
        "--timezone",
        "Europe/Atlantis",
    ]);
    let result = cli.process_args.merge().unwrap().parse();
    assert!(matches!(result, Err(CombLinksError::Timezone(_))));
}
