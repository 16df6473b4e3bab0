//! seedoxide - time-seeded password candidate generator
//!
//! Rebuilds wordlists for wallets whose password was produced by a weak,
//! time-seeded generator. Given a date range, a set of timezone offsets and a
//! set of historical PRNG emulations, every second of the range seeds each
//! generator and a handful of candidates is drawn per seed. The deduplicated
//! list is meant for an external cracker.
//!
//! # Architecture
//!
//! - **charset**: fixed character sets, permissive lookup
//! - **stream**: LCG, SHA-1 hash chain and MT19937 seed streams
//! - **task**: time windows and the lazily enumerated task space
//! - **executor**: rayon worker pool, per-task failure accounting, cancellation
//! - **sink**: deduplication and deterministic truncation
//! - **scan**: recovers plausible creation timestamps from a wallet file

pub mod charset;
pub mod config;
pub mod error;
pub mod executor;
pub mod generate;
pub mod output;
pub mod scan;
pub mod sink;
pub mod stream;
pub mod task;

pub use config::{GeneratorConfig, RawConfig};
pub use error::{ConfigError, RunError, TaskError};
pub use executor::{CancelToken, Executor, RunReport, SelectionMode};
pub use generate::{generate, Generation};
pub use stream::AlgorithmTag;
