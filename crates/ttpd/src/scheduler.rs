//! Single-threaded cooperative scheduler.
//!
//! Tasks are registered once with an interval and run, in registration
//! order, whenever that interval has elapsed since their previous run. The
//! loop sleeps a fixed quantum between ticks and ends when the stop
//! predicate holds. A task runs to completion before the next one is
//! considered, so a slow task delays every other task on the same tick.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

pub(crate) const SCHEDULER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::scheduler");

/// Sleep between two ticks.
pub const TICK: Duration = Duration::from_millis(100);

type TaskFn<C> = Box<dyn FnMut(&mut C)>;
type StopFn<C> = Box<dyn Fn(&C) -> bool>;

struct ScheduledTask<C> {
    name: &'static str,
    interval: Duration,
    last_run: Instant,
    function: TaskFn<C>,
}

/// Runs registered tasks against a shared context `C`.
pub struct Scheduler<C> {
    tasks: Vec<ScheduledTask<C>>,
    stop: Option<StopFn<C>>,
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Scheduler<C> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            stop: None,
        }
    }

    /// Appends a task; its first run is due one `interval` from now.
    pub fn register_task<F>(&mut self, name: &'static str, interval: Duration, function: F)
    where
        F: FnMut(&mut C) + 'static,
    {
        debug!(
            target: SCHEDULER_TARGET,
            task = name,
            interval_ms = interval.as_millis(),
            "task registered"
        );
        self.tasks.push(ScheduledTask {
            name,
            interval,
            last_run: Instant::now(),
            function: Box::new(function),
        });
    }

    /// Installs the stop predicate, replacing any previous one.
    pub fn register_stop_predicate<F>(&mut self, predicate: F)
    where
        F: Fn(&C) -> bool + 'static,
    {
        self.stop = Some(Box::new(predicate));
    }

    /// Names of the registered tasks, in registration order.
    #[must_use]
    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|task| task.name).collect()
    }

    /// Loops until the stop predicate holds, returning the number of ticks
    /// performed. Without a predicate the loop never ends.
    pub fn run(&mut self, context: &mut C) -> u64 {
        let mut ticks = 0_u64;
        loop {
            if self.stop.as_ref().is_some_and(|stop| stop(context)) {
                debug!(target: SCHEDULER_TARGET, ticks, "stop predicate satisfied");
                return ticks;
            }
            self.tick(context);
            ticks += 1;
            thread::sleep(TICK);
        }
    }

    /// Runs every task that is due.
    fn tick(&mut self, context: &mut C) {
        for task in &mut self.tasks {
            let now = Instant::now();
            if now.duration_since(task.last_run) >= task.interval {
                trace!(target: SCHEDULER_TARGET, task = task.name, "running task");
                (task.function)(context);
                task.last_run = now;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Ledger {
        runs: Vec<&'static str>,
        stop_after: usize,
    }

    #[test]
    fn due_tasks_run_in_registration_order() {
        let mut scheduler = Scheduler::new();
        scheduler.register_task("first", Duration::ZERO, |ledger: &mut Ledger| {
            ledger.runs.push("first");
        });
        scheduler.register_task("second", Duration::ZERO, |ledger: &mut Ledger| {
            ledger.runs.push("second");
        });
        scheduler.register_stop_predicate(|ledger: &Ledger| ledger.runs.len() >= ledger.stop_after);

        let mut ledger = Ledger {
            stop_after: 4,
            ..Ledger::default()
        };
        let ticks = scheduler.run(&mut ledger);

        assert_eq!(ticks, 2);
        assert_eq!(ledger.runs, ["first", "second", "first", "second"]);
    }

    #[test]
    fn tasks_wait_for_their_interval() {
        let mut scheduler = Scheduler::new();
        scheduler.register_task("fast", Duration::ZERO, |ledger: &mut Ledger| {
            ledger.runs.push("fast");
        });
        scheduler.register_task("slow", Duration::from_secs(3_600), |ledger: &mut Ledger| {
            ledger.runs.push("slow");
        });
        scheduler.register_stop_predicate(|ledger: &Ledger| ledger.runs.len() >= ledger.stop_after);

        let mut ledger = Ledger {
            stop_after: 3,
            ..Ledger::default()
        };
        scheduler.run(&mut ledger);

        assert_eq!(ledger.runs, ["fast", "fast", "fast"]);
        assert_eq!(scheduler.task_names(), ["fast", "slow"]);
    }

    #[test]
    fn satisfied_predicate_runs_nothing() {
        let mut scheduler = Scheduler::new();
        scheduler.register_task("never", Duration::ZERO, |ledger: &mut Ledger| {
            ledger.runs.push("never");
        });
        scheduler.register_stop_predicate(|_: &Ledger| true);

        let mut ledger = Ledger::default();
        assert_eq!(scheduler.run(&mut ledger), 0);
        assert!(ledger.runs.is_empty());
    }

    #[test]
    fn last_predicate_wins() {
        let mut scheduler = Scheduler::new();
        scheduler.register_task("count", Duration::ZERO, |ledger: &mut Ledger| {
            ledger.runs.push("count");
        });
        scheduler.register_stop_predicate(|_: &Ledger| false);
        scheduler.register_stop_predicate(|ledger: &Ledger| !ledger.runs.is_empty());

        let mut ledger = Ledger::default();
        assert_eq!(scheduler.run(&mut ledger), 1);
    }
}
