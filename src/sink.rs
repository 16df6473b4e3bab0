//! Deduplicating candidate sink.
//!
//! Workers merge whole batches under a single lock. Every candidate carries
//! the ordinal it would have had in a sequential run; the sink keeps the
//! smallest ordinal per distinct password and orders the final list by it.
//! Truncation to `num_passwords` therefore keeps the candidates a sequential
//! run would have produced first, whatever order the workers finish in.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

/// A generated password together with its position in enumeration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub ordinal: u64,
    pub password: String,
}

#[derive(Debug, Default)]
struct Entries {
    by_password: HashMap<String, u64>,
    /// Reverse index, only maintained by bounded sinks.
    by_ordinal: BTreeMap<u64, String>,
}

impl Entries {
    fn insert(&mut self, ordinal: u64, password: String) {
        self.by_password
            .entry(password)
            .and_modify(|first| *first = (*first).min(ordinal))
            .or_insert(ordinal);
    }

    /// Keep at most `capacity` passwords, those with the smallest ordinals.
    ///
    /// An evicted password is readmitted if it shows up again with an
    /// ordinal below the current maximum, so the retained set always equals
    /// the first `capacity` entries of the unbounded ordering.
    fn insert_bounded(&mut self, ordinal: u64, password: String, capacity: usize) {
        if let Some(first) = self.by_password.get_mut(&password) {
            if ordinal < *first {
                self.by_ordinal.remove(&*first);
                *first = ordinal;
                self.by_ordinal.insert(ordinal, password);
            }
            return;
        }

        if self.by_password.len() >= capacity {
            match self.by_ordinal.last_key_value() {
                Some((&last, _)) if ordinal < last => {
                    if let Some((_, evicted)) = self.by_ordinal.pop_last() {
                        self.by_password.remove(&evicted);
                    }
                }
                _ => return,
            }
        }
        self.by_ordinal.insert(ordinal, password.clone());
        self.by_password.insert(password, ordinal);
    }
}

/// The shared set of distinct candidates.
#[derive(Debug, Default)]
pub struct CandidateSink {
    entries: Mutex<Entries>,
    capacity: Option<usize>,
}

impl CandidateSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that only ever holds the `capacity` earliest candidates.
    ///
    /// `into_results(Some(capacity))` returns the same list as an unbounded
    /// sink fed the same candidates, but `len` no longer counts every
    /// distinct password.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            entries: Mutex::default(),
            capacity: Some(capacity),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Merge one worker's output. Takes the lock once per call.
    pub fn merge(&self, candidates: Vec<Candidate>) {
        if candidates.is_empty() {
            return;
        }
        // Entries are inserted whole, so a poisoned map is still consistent.
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for Candidate { ordinal, password } in candidates {
            match self.capacity {
                Some(capacity) => entries.insert_bounded(ordinal, password, capacity),
                None => entries.insert(ordinal, password),
            }
        }
    }

    /// Number of candidates currently held.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_password
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialise the final list, ordered by first ordinal and truncated to
    /// `limit` entries (`None` keeps everything).
    pub fn into_results(self, limit: Option<usize>) -> ResultList {
        let entries = self.entries.into_inner().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<(u64, String)> =
            entries.by_password.into_iter().map(|(p, o)| (o, p)).collect();

        if let Some(limit) = limit {
            if limit == 0 {
                return ResultList::default();
            }
            if limit < entries.len() {
                entries.select_nth_unstable_by_key(limit - 1, |(ordinal, _)| *ordinal);
                entries.truncate(limit);
            }
        }
        // Ordinals are unique per password, so this order is total.
        entries.sort_unstable_by_key(|(ordinal, _)| *ordinal);

        ResultList(entries.into_iter().map(|(_, p)| p).collect())
    }
}

/// Final, ordered list of candidates handed to the writer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultList(Vec<String>);

impl ResultList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl<'a> IntoIterator for &'a ResultList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn c(ordinal: u64, password: &str) -> Candidate {
        Candidate {
            ordinal,
            password: password.to_string(),
        }
    }

    #[test]
    fn test_dedup_keeps_smallest_ordinal() {
        let sink = CandidateSink::new();
        sink.merge(vec![c(7, "b"), c(3, "a")]);
        sink.merge(vec![c(1, "b"), c(9, "c"), c(5, "a")]);
        assert_eq!(sink.len(), 3);

        let results = sink.into_results(None);
        assert_eq!(results.as_slice(), &["b", "a", "c"]);
    }

    #[test]
    fn test_truncation_keeps_earliest() {
        let sink = CandidateSink::new();
        sink.merge((0..100).rev().map(|i| c(i, &format!("p{i:03}"))).collect());

        let results = sink.into_results(Some(10));
        assert_eq!(results.len(), 10);
        let expected: Vec<String> = (0..10).map(|i| format!("p{i:03}")).collect();
        assert_eq!(results.into_inner(), expected);
    }

    #[test]
    fn test_limit_larger_than_set() {
        let sink = CandidateSink::new();
        sink.merge(vec![c(2, "x"), c(1, "y")]);
        assert_eq!(sink.into_results(Some(50)).as_slice(), &["y", "x"]);
    }

    #[test]
    fn test_empty_sink() {
        let sink = CandidateSink::new();
        sink.merge(Vec::new());
        assert!(sink.is_empty());
        assert!(sink.into_results(Some(5)).is_empty());
    }

    #[test]
    fn test_merge_order_does_not_matter() {
        let batches: Vec<Vec<Candidate>> = (0..8)
            .map(|b| (0..50).map(|i| c(b * 50 + i, &format!("{}", (b * 50 + i) % 97))).collect())
            .collect();

        let forward = CandidateSink::new();
        for batch in batches.iter().cloned() {
            forward.merge(batch);
        }
        let backward = CandidateSink::new();
        for batch in batches.iter().rev().cloned() {
            backward.merge(batch);
        }
        assert_eq!(forward.into_results(Some(40)), backward.into_results(Some(40)));
    }

    #[test]
    fn test_bounded_sink_matches_truncated_unbounded() {
        // Passwords repeat with both larger and smaller ordinals, and batches
        // arrive out of order, so evicted passwords come back.
        let batches: Vec<Vec<Candidate>> = (0..10u64)
            .rev()
            .map(|b| {
                (0..60u64)
                    .map(|i| {
                        let ordinal = b * 60 + i;
                        c(ordinal, &format!("{}", (ordinal * 7) % 113))
                    })
                    .collect()
            })
            .collect();

        for capacity in [1, 5, 40, 113, 500] {
            let full = CandidateSink::new();
            let bounded = CandidateSink::bounded(capacity);
            for batch in batches.iter().cloned() {
                full.merge(batch.clone());
                bounded.merge(batch);
            }
            assert!(bounded.len() <= capacity);
            assert_eq!(
                bounded.into_results(Some(capacity)),
                full.into_results(Some(capacity)),
                "capacity {}",
                capacity
            );
        }
    }

    #[test]
    fn test_bounded_sink_readmits_smaller_ordinal() {
        let sink = CandidateSink::bounded(2);
        sink.merge(vec![c(10, "a"), c(11, "b"), c(12, "c")]);
        assert_eq!(sink.len(), 2);
        sink.merge(vec![c(1, "c"), c(50, "d")]);
        assert_eq!(sink.into_results(Some(2)).as_slice(), &["c", "a"]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let sink = CandidateSink::bounded(0);
        sink.merge(vec![c(0, "a")]);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_concurrent_merges() {
        let sink = Arc::new(CandidateSink::new());
        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for i in 0..250u64 {
                        let ordinal = t * 1_000 + i;
                        sink.merge(vec![c(ordinal, &format!("{}", i % 100))]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let sink = Arc::try_unwrap(sink).unwrap();
        assert_eq!(sink.len(), 100);
        let results = sink.into_results(None);
        // Thread 0 produced every password first.
        let expected: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        assert_eq!(results.into_inner(), expected);
    }
}
