//! Delayed, coalescing work on a single queue.
//!
//! Each `Task` is a purpose key: scheduling a task that is already pending
//! moves its deadline instead of queueing a second copy. Nothing runs on
//! its own; the host calls `Engine::tick` and due tasks run in deadline
//! order on the caller's thread.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};

use crate::model::note::NotePath;

/// Source of time for the scheduler and for `last update` dates
pub trait Clock {
    /// Monotonic time since some fixed origin
    fn now(&self) -> Duration;

    /// Local calendar date
    fn today(&self) -> NaiveDate;
}

/// Wall clock
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Virtual clock for tests. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
    today: Rc<Cell<NaiveDate>>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        ManualClock {
            now: Rc::new(Cell::new(Duration::ZERO)),
            today: Rc::new(Cell::new(today)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set_today(&self, today: NaiveDate) {
        self.today.set(today);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn today(&self) -> NaiveDate {
        self.today.get()
    }
}

/// Purpose of a delayed action. At most one of each is pending.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {
    Repaint,
    /// Apply the auto-detected template to a note renamed into the hierarchy
    TemplateOnRename(NotePath),
    /// Stamp today's date into a note's `last update` keys
    TouchLastUpdate(NotePath),
    PeriodicRefresh,
    BulkNormalize,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    pending: HashMap<Task, Duration>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` at `at`, replacing any earlier deadline for the same task.
    /// Returns `true` when the task was already pending.
    pub fn schedule(&mut self, task: Task, at: Duration) -> bool {
        self.pending.insert(task, at).is_some()
    }

    pub fn cancel(&mut self, task: &Task) -> bool {
        self.pending.remove(task).is_some()
    }

    pub fn is_scheduled(&self, task: &Task) -> bool {
        self.pending.contains_key(task)
    }

    pub fn deadline(&self, task: &Task) -> Option<Duration> {
        self.pending.get(task).copied()
    }

    /// Earliest pending deadline
    pub fn next_due(&self) -> Option<Duration> {
        self.pending.values().min().copied()
    }

    /// Remove and return every task due at `now`, earliest first
    pub fn take_due(&mut self, now: Duration) -> Vec<Task> {
        let mut due: Vec<(Duration, Task)> = self
            .pending
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(task, at)| (*at, task.clone()))
            .collect();
        due.sort();
        for (_, task) in &due {
            self.pending.remove(task);
        }
        due.into_iter().map(|(_, task)| task).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
