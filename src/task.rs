//! Task space construction.
//!
//! A run is the cross product of every second in the (timezone shifted) time
//! window, every algorithm and every password length. The space is never
//! materialised: [`TaskSpace::iter`] enumerates it lazily and
//! [`TaskSpace::batches`] cuts it into contiguous runs of timestamps that a
//! worker processes in one go.
//!
//! Enumeration order is timezone offset, then timestamp, then algorithm, then
//! length. A task's position in that order is its *ordinal*; the sink uses it
//! to break ties deterministically.

use crate::charset::CharsetId;
use crate::stream::AlgorithmTag;
use std::fmt;
use std::ops::Range;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Half-open interval `[start, end)` of Unix timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: i64,
    end: i64,
}

impl TimeWindow {
    /// A reversed window (`start > end`) collapses to an empty one.
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Smallest window containing every timestamp, `None` when there are none.
    pub fn covering<I>(timestamps: I) -> Option<Self>
    where
        I: IntoIterator<Item = i64>,
    {
        let mut bounds: Option<(i64, i64)> = None;
        for ts in timestamps {
            bounds = Some(match bounds {
                None => (ts, ts),
                Some((lo, hi)) => (lo.min(ts), hi.max(ts)),
            });
        }
        bounds.map(|(lo, hi)| Self::new(lo, hi.saturating_add(1)))
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn seconds(&self) -> u64 {
        self.end.abs_diff(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Shift both bounds by a (possibly fractional) number of hours.
    /// Each bound is truncated toward zero after the shift.
    pub fn shifted(&self, offset_hours: f64) -> Self {
        let shift = offset_hours * SECONDS_PER_HOUR;
        Self::new(
            (self.start as f64 + shift) as i64,
            (self.end as f64 + shift) as i64,
        )
    }

    pub fn timestamps(&self) -> Range<i64> {
        self.start..self.end
    }
}

/// One independently executable unit of candidate generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationTask {
    pub seed_timestamp: i64,
    pub algorithm: AlgorithmTag,
    pub length: usize,
    pub charset: CharsetId,
    pub timezone_offset: f64,
}

#[derive(Debug, Clone, Copy)]
struct ShiftedWindow {
    offset_hours: f64,
    window: TimeWindow,
}

/// The full enumeration of tasks implied by a configuration.
#[derive(Debug, Clone)]
pub struct TaskSpace {
    windows: Vec<ShiftedWindow>,
    algorithms: Vec<AlgorithmTag>,
    lengths: Vec<usize>,
    charset: CharsetId,
}

impl TaskSpace {
    pub fn new(
        window: TimeWindow,
        timezone_offsets: &[f64],
        algorithms: &[AlgorithmTag],
        lengths: &[usize],
        charset: CharsetId,
    ) -> Self {
        let windows = timezone_offsets
            .iter()
            .map(|&offset_hours| ShiftedWindow {
                offset_hours,
                window: window.shifted(offset_hours),
            })
            .collect();
        Self {
            windows,
            algorithms: algorithms.to_vec(),
            lengths: lengths.to_vec(),
            charset,
        }
    }

    fn tasks_per_timestamp(&self) -> u128 {
        self.algorithms.len() as u128 * self.lengths.len() as u128
    }

    /// Exact number of tasks, without overflow.
    pub fn size(&self) -> u128 {
        let seconds: u128 = self
            .windows
            .iter()
            .map(|w| w.window.seconds() as u128)
            .sum();
        seconds * self.tasks_per_timestamp()
    }

    /// Number of tasks, saturating at `u64::MAX`.
    pub fn len(&self) -> u64 {
        u64::try_from(self.size()).unwrap_or(u64::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Pre-flight figures for a run drawing `samples_per_task` candidates
    /// from every task.
    pub fn estimate(&self, samples_per_task: usize) -> SpaceEstimate {
        let tasks = self.size();
        SpaceEstimate {
            seconds: self.windows.iter().map(|w| w.window.seconds() as u128).sum(),
            tasks,
            max_candidates: tasks.saturating_mul(samples_per_task as u128),
        }
    }

    /// Lazily enumerate every task in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = GenerationTask> + '_ {
        self.windows.iter().flat_map(move |w| {
            w.window.timestamps().flat_map(move |ts| {
                self.algorithms.iter().flat_map(move |&algorithm| {
                    self.lengths.iter().map(move |&length| GenerationTask {
                        seed_timestamp: ts,
                        algorithm,
                        length,
                        charset: self.charset,
                        timezone_offset: w.offset_hours,
                    })
                })
            })
        })
    }

    /// Cut the space into batches of at most `timestamps_per_batch`
    /// consecutive timestamps (each crossed with every algorithm and length).
    /// Batches come out in ordinal order and never span two timezones.
    pub fn batches(
        &self,
        timestamps_per_batch: usize,
    ) -> impl Iterator<Item = TaskBatch<'_>> + Send + '_ {
        let step = timestamps_per_batch.clamp(1, i64::MAX as usize) as i64;
        let per_timestamp = u64::try_from(self.tasks_per_timestamp()).unwrap_or(u64::MAX);

        self.windows
            .iter()
            .scan(0u64, move |base, w| {
                let first = *base;
                *base = base.saturating_add(w.window.seconds().saturating_mul(per_timestamp));
                Some((first, *w))
            })
            .flat_map(move |(first, w)| {
                let window = w.window;
                window.timestamps().step_by(step as usize).map(move |chunk_start| {
                    let chunk_end = chunk_start.saturating_add(step).min(window.end());
                    let skipped = chunk_start.abs_diff(window.start());
                    TaskBatch {
                        first_ordinal: first.saturating_add(skipped.saturating_mul(per_timestamp)),
                        timestamps: chunk_start..chunk_end,
                        timezone_offset: w.offset_hours,
                        algorithms: &self.algorithms,
                        lengths: &self.lengths,
                        charset: self.charset,
                    }
                })
            })
    }
}

/// A contiguous slice of the task space handed to one worker invocation.
#[derive(Debug, Clone)]
pub struct TaskBatch<'a> {
    first_ordinal: u64,
    timestamps: Range<i64>,
    timezone_offset: f64,
    algorithms: &'a [AlgorithmTag],
    lengths: &'a [usize],
    charset: CharsetId,
}

impl<'a> TaskBatch<'a> {
    pub fn first_ordinal(&self) -> u64 {
        self.first_ordinal
    }

    pub fn len(&self) -> u64 {
        let per_timestamp = (self.algorithms.len() * self.lengths.len()) as u64;
        self.timestamps.end.abs_diff(self.timestamps.start) * per_timestamp
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The batch's tasks paired with their ordinals.
    pub fn tasks(&self) -> impl Iterator<Item = (u64, GenerationTask)> + 'a {
        let algorithms = self.algorithms;
        let lengths = self.lengths;
        let charset = self.charset;
        let timezone_offset = self.timezone_offset;
        self.timestamps
            .clone()
            .flat_map(move |ts| {
                algorithms.iter().flat_map(move |&algorithm| {
                    lengths.iter().map(move |&length| GenerationTask {
                        seed_timestamp: ts,
                        algorithm,
                        length,
                        charset,
                        timezone_offset,
                    })
                })
            })
            .zip(self.first_ordinal..)
            .map(|(task, ordinal)| (ordinal, task))
    }
}

/// Size of a task space, reported before committing to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceEstimate {
    /// Seconds enumerated, summed over all timezone offsets.
    pub seconds: u128,
    pub tasks: u128,
    /// Upper bound on distinct candidates.
    pub max_candidates: u128,
}

impl fmt::Display for SpaceEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} seconds, {} tasks, at most {} candidates",
            self.seconds, self.tasks, self.max_candidates
        )
    }
}
