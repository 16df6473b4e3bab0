//! Run configuration.
//!
//! Settings come from an optional TOML file and from command-line flags; flags
//! win. Both are collected into a [`RawConfig`] of optional fields, which is
//! validated once into an immutable [`GeneratorConfig`].

use crate::charset::CharsetId;
use crate::error::ConfigError;
use crate::executor::{
    CancelToken, Executor, SelectionMode, DEFAULT_BATCH_SIZE, DEFAULT_SAMPLES_PER_TASK,
};
use crate::output::default_file_name;
use crate::sink::CandidateSink;
use crate::stream::AlgorithmTag;
use crate::task::{SpaceEstimate, TaskSpace, TimeWindow};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, TimeZone, Utc};
use log::warn;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DATE_FORMAT: &str = "%d.%m.%Y";
pub const DEFAULT_LENGTHS: [usize; 7] = [10, 11, 12, 13, 14, 15, 16];

/// Upper bound on the number of passwords written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordLimit {
    #[default]
    Unbounded,
    AtMost(usize),
}

impl PasswordLimit {
    pub fn as_option(self) -> Option<usize> {
        match self {
            PasswordLimit::Unbounded => None,
            PasswordLimit::AtMost(n) => Some(n),
        }
    }
}

impl FromStr for PasswordLimit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unbounded" | "all" | "none" => Ok(PasswordLimit::Unbounded),
            other => match other.parse::<usize>() {
                Ok(n) if n > 0 => Ok(PasswordLimit::AtMost(n)),
                _ => Err(ConfigError::InvalidLimit(s.to_string())),
            },
        }
    }
}

impl<'de> Deserialize<'de> for PasswordLimit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Count(u64),
            Word(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Count(n) => usize::try_from(n)
                .map(PasswordLimit::AtMost)
                .map_err(serde::de::Error::custom),
            Repr::Word(word) => word.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Unvalidated settings, as read from a config file or the command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub algorithms: Option<Vec<AlgorithmTag>>,
    pub num_passwords: Option<PasswordLimit>,
    pub charset: Option<String>,
    pub lengths: Option<Vec<usize>>,
    pub timezone_offsets: Option<Vec<f64>>,
    pub threads: Option<usize>,
    pub batch_size: Option<usize>,
    pub samples_per_task: Option<usize>,
    pub selection: Option<SelectionMode>,
    pub max_tasks: Option<u64>,
    /// Hold only the `num_passwords` earliest candidates during the run.
    pub low_memory: Option<bool>,
    /// Convert dates at UTC midnight instead of local midnight.
    pub utc: Option<bool>,
    pub output: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl RawConfig {
    /// Parse a TOML configuration file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: RawConfig =
            ::toml::from_str(contents).context("Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Layer `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merge(self, overrides: RawConfig) -> RawConfig {
        RawConfig {
            start_date: overrides.start_date.or(self.start_date),
            end_date: overrides.end_date.or(self.end_date),
            algorithms: overrides.algorithms.or(self.algorithms),
            num_passwords: overrides.num_passwords.or(self.num_passwords),
            charset: overrides.charset.or(self.charset),
            lengths: overrides.lengths.or(self.lengths),
            timezone_offsets: overrides.timezone_offsets.or(self.timezone_offsets),
            threads: overrides.threads.or(self.threads),
            batch_size: overrides.batch_size.or(self.batch_size),
            samples_per_task: overrides.samples_per_task.or(self.samples_per_task),
            selection: overrides.selection.or(self.selection),
            max_tasks: overrides.max_tasks.or(self.max_tasks),
            low_memory: overrides.low_memory.or(self.low_memory),
            utc: overrides.utc.or(self.utc),
            output: overrides.output.or(self.output),
            output_dir: overrides.output_dir.or(self.output_dir),
        }
    }

    /// Validate and resolve defaults.
    pub fn build(self) -> Result<GeneratorConfig, ConfigError> {
        let start_date = self.start_date.ok_or(ConfigError::Missing("start_date"))?;
        let end_date = self.end_date.ok_or(ConfigError::Missing("end_date"))?;
        let utc = self.utc.unwrap_or(false);
        let window = TimeWindow::new(
            midnight_timestamp(&start_date, utc)?,
            midnight_timestamp(&end_date, utc)?,
        );

        let algorithms = self.algorithms.unwrap_or_else(|| AlgorithmTag::ALL.to_vec());
        if algorithms.is_empty() {
            return Err(ConfigError::NoAlgorithms);
        }

        let lengths = self.lengths.unwrap_or_else(|| DEFAULT_LENGTHS.to_vec());
        if lengths.is_empty() {
            return Err(ConfigError::NoLengths);
        }
        if lengths.contains(&0) {
            return Err(ConfigError::ZeroLength);
        }

        let charset_name = self.charset.unwrap_or_else(|| CharsetId::Alnum.name().to_string());
        let charset = CharsetId::resolve(&charset_name);
        if CharsetId::lookup(&charset_name).is_none() {
            warn!("Unknown charset {:?}, falling back to {}", charset_name, charset);
        }

        let mut timezone_offsets = self.timezone_offsets.unwrap_or_default();
        if timezone_offsets.is_empty() {
            timezone_offsets.push(0.0);
        }
        if let Some(&bad) = timezone_offsets.iter().find(|o| !o.is_finite()) {
            return Err(ConfigError::InvalidTimezoneOffset(bad));
        }

        let num_passwords = self.num_passwords.unwrap_or_default();
        if num_passwords == PasswordLimit::AtMost(0) {
            return Err(ConfigError::ZeroPasswords);
        }
        let low_memory = self.low_memory.unwrap_or(false);
        if low_memory && num_passwords == PasswordLimit::Unbounded {
            warn!("low_memory has no effect without a bounded num_passwords");
        }

        let threads = positive("threads", self.threads, num_cpus::get())?;
        let batch_size = positive("batch_size", self.batch_size, DEFAULT_BATCH_SIZE)?;
        let samples_per_task = positive(
            "samples_per_task",
            self.samples_per_task,
            DEFAULT_SAMPLES_PER_TASK,
        )?;

        let output = match self.output {
            Some(path) => path,
            None => self
                .output_dir
                .unwrap_or_default()
                .join(default_file_name(&start_date, &end_date)),
        };

        let config = GeneratorConfig {
            start_date: start_date.trim().to_string(),
            end_date: end_date.trim().to_string(),
            window,
            algorithms,
            lengths,
            charset,
            timezone_offsets,
            num_passwords,
            threads,
            batch_size,
            samples_per_task,
            selection: self.selection.unwrap_or_default(),
            max_tasks: self.max_tasks,
            low_memory,
            output,
        };

        if let Some(limit) = config.max_tasks {
            let tasks = config.task_space().size();
            if tasks > u128::from(limit) {
                return Err(ConfigError::TaskSpaceTooLarge {
                    tasks,
                    limit: u128::from(limit),
                });
            }
        }
        Ok(config)
    }
}

fn positive(
    field: &'static str,
    value: Option<usize>,
    default: usize,
) -> Result<usize, ConfigError> {
    match value {
        Some(0) => Err(ConfigError::ZeroParameter { field }),
        Some(n) => Ok(n),
        None => Ok(default),
    }
}

/// Parse a `DD.MM.YYYY` date.
pub fn parse_date(input: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|_| ConfigError::InvalidDate {
        input: input.to_string(),
    })
}

/// Unix timestamp of midnight on `input`, in local time or UTC.
pub fn midnight_timestamp(input: &str, utc: bool) -> Result<i64, ConfigError> {
    let midnight = parse_date(input)?
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ConfigError::InvalidDate {
            input: input.to_string(),
        })?;

    if utc {
        return Ok(Utc.from_utc_datetime(&midnight).timestamp());
    }
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| ConfigError::NoLocalMidnight {
            input: input.to_string(),
        })
}

/// Validated, immutable settings for one generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub start_date: String,
    pub end_date: String,
    /// Unshifted `[start midnight, end midnight)`.
    pub window: TimeWindow,
    pub algorithms: Vec<AlgorithmTag>,
    pub lengths: Vec<usize>,
    pub charset: CharsetId,
    pub timezone_offsets: Vec<f64>,
    pub num_passwords: PasswordLimit,
    pub threads: usize,
    pub batch_size: usize,
    pub samples_per_task: usize,
    pub selection: SelectionMode,
    pub max_tasks: Option<u64>,
    pub low_memory: bool,
    pub output: PathBuf,
}

impl GeneratorConfig {
    pub fn task_space(&self) -> TaskSpace {
        TaskSpace::new(
            self.window,
            &self.timezone_offsets,
            &self.algorithms,
            &self.lengths,
            self.charset,
        )
    }

    /// The sink a run collects into: bounded to `num_passwords` in
    /// low-memory mode, unbounded otherwise.
    pub fn sink(&self) -> CandidateSink {
        match (self.low_memory, self.num_passwords) {
            (true, PasswordLimit::AtMost(limit)) => CandidateSink::bounded(limit),
            _ => CandidateSink::new(),
        }
    }

    pub fn estimate(&self) -> SpaceEstimate {
        self.task_space().estimate(self.samples_per_task)
    }

    pub fn executor(&self, cancel: CancelToken) -> Executor {
        Executor::new(self.threads)
            .with_batch_size(self.batch_size)
            .with_samples_per_task(self.samples_per_task)
            .with_selection(self.selection)
            .with_cancel_token(cancel)
    }
}
