//! Virtual-clock timer collection with run-id cancellation.
//!
//! Every timer is tagged with the run that scheduled it. Minting a new run
//! clears the collection; a timer from any earlier run is never handed out.

use tracing::debug;

#[derive(Debug, Clone)]
struct Timer<T> {
    due_ms: f64,
    seq: u64,
    run_id: u64,
    task: T,
}

/// A timer that has come due.
#[derive(Debug, Clone, PartialEq)]
pub struct Due<T> {
    pub due_ms: f64,
    pub run_id: u64,
    pub task: T,
}

#[derive(Debug)]
pub struct Scheduler<T> {
    run_id: u64,
    seq: u64,
    timers: Vec<Timer<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            run_id: 0,
            seq: 0,
            timers: Vec::new(),
        }
    }
}

impl<T> Scheduler<T> {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Invalidates every pending timer and returns the new run id.
    pub fn new_run(&mut self) -> u64 {
        let dropped = self.timers.len();
        self.timers.clear();
        self.run_id += 1;
        if dropped > 0 {
            debug!(run_id = self.run_id, dropped, "Cancelled pending timers");
        }
        self.run_id
    }

    pub fn schedule(&mut self, due_ms: f64, task: T) {
        self.seq += 1;
        self.timers.push(Timer {
            due_ms,
            seq: self.seq,
            run_id: self.run_id,
            task,
        });
    }

    /// Earliest due time among pending timers.
    pub fn next_due_ms(&self) -> Option<f64> {
        self.timers.iter().map(|t| t.due_ms).reduce(f64::min)
    }

    /// Removes and returns the earliest timer due at or before `now_ms`.
    /// Ties go to the timer scheduled first.
    pub fn pop_due(&mut self, now_ms: f64) -> Option<Due<T>> {
        loop {
            let (index, _) = self
                .timers
                .iter()
                .enumerate()
                .filter(|(_, t)| t.due_ms <= now_ms)
                .min_by(|(_, a), (_, b)| a.due_ms.total_cmp(&b.due_ms).then(a.seq.cmp(&b.seq)))?;
            let timer = self.timers.swap_remove(index);
            if timer.run_id != self.run_id {
                debug!(stale = timer.run_id, current = self.run_id, "Discarded stale timer");
                continue;
            }
            return Some(Due {
                due_ms: timer.due_ms,
                run_id: timer.run_id,
                task: timer.task,
            });
        }
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }
}
