use seedoxide::charset::CharsetId;
use seedoxide::config::{PasswordLimit, RawConfig};
use seedoxide::output::write_wordlist;
use seedoxide::task::TimeWindow;
use seedoxide::{
    generate, AlgorithmTag, CancelToken, ConfigError, GeneratorConfig, SelectionMode,
};
use std::collections::HashSet;
use std::fs;
use tempfile::TempDir;

fn config(start: &str, end: &str) -> RawConfig {
    RawConfig {
        start_date: Some(start.to_string()),
        end_date: Some(end.to_string()),
        utc: Some(true),
        threads: Some(4),
        ..Default::default()
    }
}

fn build(raw: RawConfig) -> GeneratorConfig {
    raw.build().expect("valid configuration")
}

/// Keep only the first `seconds` of the configured window.
fn shorten(config: &mut GeneratorConfig, seconds: i64) {
    let start = config.window.start();
    config.window = TimeWindow::new(start, start + seconds);
}

#[test]
fn test_same_day_range_is_empty() {
    let dir = TempDir::new().unwrap();
    let mut raw = config("01.01.2020", "01.01.2020");
    raw.timezone_offsets = Some(vec![0.0]);
    raw.output_dir = Some(dir.path().to_path_buf());
    let config = build(raw);

    assert_eq!(config.task_space().len(), 0);
    let generation = generate(&config, CancelToken::new(), |_| {}).unwrap();
    assert_eq!(generation.report.total_tasks, 0);
    assert!(generation.results.is_empty());

    write_wordlist(&config.output, &generation.results).unwrap();
    assert_eq!(
        config.output,
        dir.path().join("passwords_01_01_2020_to_01_01_2020.txt")
    );
    assert_eq!(fs::read(&config.output).unwrap(), b"");
}

#[test]
fn test_one_day_of_lcg_digits() {
    let mut raw = config("01.01.2020", "02.01.2020");
    raw.algorithms = Some(vec![AlgorithmTag::Lcg]);
    raw.lengths = Some(vec![8]);
    raw.charset = Some("digits".to_string());
    raw.timezone_offsets = Some(vec![0.0]);
    let config = build(raw);

    assert_eq!(config.task_space().len(), 86_400);
    let generation = generate(&config, CancelToken::new(), |_| {}).unwrap();
    assert_eq!(generation.report.succeeded, 86_400);
    assert_eq!(generation.report.failed, 0);
    let distinct = generation.distinct.expect("unbounded sink counts candidates");
    assert!(distinct <= 86_400 * 5);
    assert_eq!(generation.results.len(), distinct);
    for password in &generation.results {
        assert_eq!(password.len(), 8);
        assert!(password.bytes().all(|b| b.is_ascii_digit()));
    }
}

#[test]
fn test_candidates_stay_within_lengths_and_charset() {
    let mut raw = config("01.01.2020", "02.01.2020");
    raw.lengths = Some(vec![4, 7]);
    raw.charset = Some("special".to_string());
    raw.timezone_offsets = Some(vec![0.0, 5.5, -8.0]);
    raw.max_tasks = Some(10_000_000);
    let mut config = build(raw);
    // Keep the run short: one hour per offset.
    shorten(&mut config, 3_600);

    let generation = generate(&config, CancelToken::new(), |_| {}).unwrap();
    assert_eq!(generation.report.succeeded, 3_600 * 3 * 3 * 2);
    let special: HashSet<u8> = CharsetId::Special.chars().iter().copied().collect();
    for password in &generation.results {
        assert!(password.len() == 4 || password.len() == 7);
        assert!(password.bytes().all(|b| special.contains(&b)));
    }
}

#[test]
fn test_unknown_charset_behaves_like_alnum() {
    let run = |charset: &str| {
        let mut raw = config("01.01.2020", "02.01.2020");
        raw.charset = Some(charset.to_string());
        raw.lengths = Some(vec![10]);
        let mut config = build(raw);
        shorten(&mut config, 600);
        generate(&config, CancelToken::new(), |_| {}).unwrap().results
    };
    assert_eq!(run("emoji"), run("alnum"));
}

#[test]
fn test_truncation_is_bounded_and_a_subset() {
    let mut raw = config("01.01.2020", "02.01.2020");
    raw.lengths = Some(vec![12]);
    let mut full = build(raw.clone());
    shorten(&mut full, 300);

    raw.num_passwords = Some(PasswordLimit::AtMost(100));
    let mut bounded = build(raw);
    bounded.window = full.window;

    let everything = generate(&full, CancelToken::new(), |_| {}).unwrap().results;
    let limited = generate(&bounded, CancelToken::new(), |_| {}).unwrap().results;

    assert_eq!(limited.len(), 100);
    let all: HashSet<&String> = everything.iter().collect();
    assert!(limited.iter().all(|p| all.contains(p)));
    // The bounded list is a prefix of the full, ordered list.
    assert_eq!(limited.as_slice(), &everything.as_slice()[..100]);
}

#[test]
fn test_low_memory_run_keeps_the_same_passwords() {
    let mut raw = config("01.01.2020", "02.01.2020");
    raw.lengths = Some(vec![4]);
    raw.charset = Some("digits".to_string());
    raw.timezone_offsets = Some(vec![0.0, -5.0]);
    raw.num_passwords = Some(PasswordLimit::AtMost(250));
    raw.batch_size = Some(16);
    let mut regular = build(raw.clone());
    shorten(&mut regular, 900);

    raw.low_memory = Some(true);
    let mut low_memory = build(raw);
    low_memory.window = regular.window;

    let expected = generate(&regular, CancelToken::new(), |_| {}).unwrap();
    let bounded = generate(&low_memory, CancelToken::new(), |_| {}).unwrap();

    assert!(expected.distinct.is_some());
    assert_eq!(bounded.distinct, None);
    assert_eq!(bounded.results.len(), 250);
    assert_eq!(bounded.results, expected.results);
}

#[test]
fn test_reruns_write_identical_files() {
    let dir = TempDir::new().unwrap();
    let mut raw = config("01.12.2008", "02.12.2008");
    raw.charset = Some("alnum_special".to_string());
    raw.lengths = Some(vec![10, 11]);
    raw.timezone_offsets = Some(vec![0.0, 5.5, -5.0, -8.0]);
    raw.num_passwords = Some(PasswordLimit::AtMost(2_000));
    raw.selection = Some(SelectionMode::Stream);
    let mut config = build(raw);
    shorten(&mut config, 120);

    let first = dir.path().join("first.txt");
    let second = dir.path().join("second.txt");

    let a = generate(&config, CancelToken::new(), |_| {}).unwrap();
    write_wordlist(&first, &a.results).unwrap();

    config.threads = 1;
    config.batch_size = 3;
    let b = generate(&config, CancelToken::new(), |_| {}).unwrap();
    write_wordlist(&second, &b.results).unwrap();

    let first = fs::read(&first).unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, fs::read(&second).unwrap());
}

#[test]
fn test_configuration_errors() {
    let mut raw = config("01.01.2020", "02.01.2020");
    raw.algorithms = Some(Vec::new());
    assert_eq!(raw.build().unwrap_err(), ConfigError::NoAlgorithms);

    let raw = config("2020/01/01", "02.01.2020");
    assert!(matches!(raw.build(), Err(ConfigError::InvalidDate { .. })));
}
