//! Fixed, weight-balanced partitioning of an index range across threads.
//!
//! Each chunk of the range carries a non-negative weight (for the pairwise
//! kernels, the neighbor count of an atom). Walking the chunks in order, a
//! thread's range is closed once its accumulated weight exceeds
//! `total * load_balance / threads`, or once the remaining chunks are only
//! just enough to give every remaining thread one. The last thread absorbs
//! whatever is left. The partition is computed once per [`LoadBalancedSchedule::start`]
//! and handed out without stealing.

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};

/// An inclusive range of chunk indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkRange {
    pub lb: usize,
    pub ub: usize,
}

impl WorkRange {
    pub fn new(lb: usize, ub: usize) -> Self {
        Self { lb, ub }
    }

    /// The full range `[0, n)`, or `None` when `n` is zero.
    pub fn of_len(n: usize) -> Option<Self> {
        (n > 0).then(|| Self::new(0, n - 1))
    }

    pub fn len(&self) -> usize {
        self.ub + 1 - self.lb
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> RangeInclusive<usize> {
        self.lb..=self.ub
    }
}

#[derive(Debug)]
pub struct LoadBalancedSchedule {
    weights: Vec<usize>,
    load_balance: f64,
    ranges: Vec<Option<WorkRange>>,
    taken: Vec<AtomicBool>,
}

impl LoadBalancedSchedule {
    /// Creates a schedule over per-chunk `weights`.
    ///
    /// A `load_balance` outside `(0.01, 1]` is replaced by 1.
    pub fn new(threads: usize, weights: Vec<usize>, load_balance: f64) -> Self {
        let threads = threads.max(1);
        let load_balance = if load_balance > 0.01 && load_balance <= 1.0 {
            load_balance
        } else {
            1.0
        };
        Self {
            weights,
            load_balance,
            ranges: vec![None; threads],
            taken: (0..threads).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    pub fn load_balance(&self) -> f64 {
        self.load_balance
    }

    pub fn threads(&self) -> usize {
        self.ranges.len()
    }

    pub fn set_weights(&mut self, weights: Vec<usize>) {
        self.weights = weights;
    }

    pub fn weights(&self) -> &[usize] {
        &self.weights
    }

    /// Partitions `range` across `threads` and resets the hand-out flags.
    ///
    /// Chunks beyond the end of the weight array count as zero weight.
    pub fn start(&mut self, threads: usize, range: Option<WorkRange>) {
        let threads = threads.max(1);
        if threads != self.taken.len() {
            self.taken = (0..threads).map(|_| AtomicBool::new(false)).collect();
        } else {
            self.taken.iter().for_each(|flag| flag.store(false, Ordering::Release));
        }
        self.ranges = vec![None; threads];
        if let Some(range) = range {
            self.define_ranges(range);
        }
    }

    /// Returns this thread's range on the first call, and `None` afterwards.
    pub fn next(&self, thread: usize) -> Option<WorkRange> {
        let flag = self.taken.get(thread)?;
        if flag.swap(true, Ordering::AcqRel) {
            return None;
        }
        self.ranges[thread]
    }

    /// The ranges of the current partition, one slot per thread.
    pub fn ranges(&self) -> &[Option<WorkRange>] {
        &self.ranges
    }

    fn weight(&self, chunk: usize) -> usize {
        self.weights.get(chunk).copied().unwrap_or(0)
    }

    fn define_ranges(&mut self, range: WorkRange) {
        let threads = self.ranges.len();
        let (lb, ub) = (range.lb, range.ub);
        let total: usize = range.iter().map(|i| self.weight(i)).sum();
        let goal = ((total as f64 * self.load_balance) / threads as f64).floor() as usize;
        if threads == 1 {
            self.ranges[0] = Some(range);
            return;
        }

        let mut thread = 0;
        let mut start = lb;
        let mut accumulated = 0;
        for i in lb..=ub {
            let chunks_left = ub - i + 1;
            let threads_left = threads - thread;
            accumulated += self.weight(i);
            if accumulated > goal || chunks_left <= threads_left {
                self.ranges[thread] = Some(WorkRange::new(start, i));
                thread += 1;
                start = i + 1;
                accumulated = 0;
                if thread == threads - 1 {
                    self.ranges[thread] = (start <= ub).then(|| WorkRange::new(start, ub));
                    return;
                }
            } else if i == ub {
                self.ranges[thread] = Some(WorkRange::new(start, ub));
                return;
            }
        }
    }
}
