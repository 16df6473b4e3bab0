//! A complete generation run: build the task space, execute it, bound the
//! result.

use crate::config::GeneratorConfig;
use crate::error::RunError;
use crate::executor::{CancelToken, RunReport};
use crate::sink::ResultList;
use log::info;

/// What a run produced.
#[derive(Debug, Clone)]
pub struct Generation {
    pub results: ResultList,
    pub report: RunReport,
    /// Distinct candidates before truncation. `None` in low-memory mode,
    /// where the sink never holds them all.
    pub distinct: Option<usize>,
}

pub fn generate<F>(
    config: &GeneratorConfig,
    cancel: CancelToken,
    on_progress: F,
) -> Result<Generation, RunError>
where
    F: Fn(u64) + Sync,
{
    let space = config.task_space();
    let sink = config.sink();
    let report = config.executor(cancel).run(&space, &sink, on_progress)?;

    let distinct = match sink.capacity() {
        Some(_) => None,
        None => Some(sink.len()),
    };
    let results = sink.into_results(config.num_passwords.as_option());
    match distinct {
        Some(distinct) => info!(
            "{} distinct candidates from {} tasks, keeping {}",
            distinct,
            report.succeeded,
            results.len()
        ),
        None => info!(
            "Kept the {} earliest candidates from {} tasks",
            results.len(),
            report.succeeded
        ),
    }

    Ok(Generation {
        results,
        report,
        distinct,
    })
}
