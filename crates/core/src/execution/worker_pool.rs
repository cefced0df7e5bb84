use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use crate::shared::cancellation::CancellationToken;

/// Result of one submitted task.
#[derive(Debug, PartialEq)]
pub enum TaskOutcome<T, E> {
    Succeeded(T),
    Failed(E),
    /// The task panicked; the payload message is kept for logging.
    Panicked(String),
    /// Cancellation fired before the task was started.
    Abandoned,
}

impl<T, E> TaskOutcome<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            TaskOutcome::Succeeded(value) => Some(value),
            _ => None,
        }
    }
}

/// Bounded-concurrency executor.
///
/// Runs at most `max_workers` tasks at once on scoped threads pulling from a
/// shared queue. Every task's outcome is captured on its own, so one failure
/// or panic never aborts its siblings. Outcomes come back in submission order.
#[derive(Clone, Debug)]
pub struct WorkerPool {
    label: &'static str,
    max_workers: usize,
}

impl WorkerPool {
    pub fn new(label: &'static str, max_workers: usize) -> Self {
        Self {
            label,
            max_workers: max_workers.max(1),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Runs every task and returns one outcome per task, indexed like `tasks`.
    ///
    /// Once `cancel` fires, tasks not yet started are reported as
    /// [`TaskOutcome::Abandoned`]; running tasks see the same token and are
    /// expected to stop on their own.
    pub fn run<T, E, F>(&self, tasks: Vec<F>, cancel: &CancellationToken) -> Vec<TaskOutcome<T, E>>
    where
        F: FnOnce() -> Result<T, E> + Send,
        T: Send,
        E: Send,
    {
        let total = tasks.len();
        if total == 0 {
            return Vec::new();
        }
        let workers = self.max_workers.min(total);
        let started = Instant::now();
        log::debug!("{}: running {total} tasks on {workers} workers", self.label);

        let (task_tx, task_rx) = crossbeam_channel::unbounded::<(usize, F)>();
        for entry in tasks.into_iter().enumerate() {
            // The receiver lives until the scope below ends.
            let _ = task_tx.send(entry);
        }
        drop(task_tx);

        let mut slots: Vec<Option<TaskOutcome<T, E>>> = (0..total).map(|_| None).collect();

        std::thread::scope(|scope| {
            let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, TaskOutcome<T, E>)>();

            for _ in 0..workers {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for (index, task) in task_rx.iter() {
                        let outcome = if cancel.is_cancelled() {
                            TaskOutcome::Abandoned
                        } else {
                            run_guarded(task)
                        };
                        if result_tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            for (index, outcome) in result_rx.iter() {
                slots[index] = Some(outcome);
            }
        });

        let outcomes: Vec<TaskOutcome<T, E>> = slots
            .into_iter()
            .map(|slot| slot.unwrap_or(TaskOutcome::Abandoned))
            .collect();

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let abandoned = outcomes
            .iter()
            .filter(|o| matches!(o, TaskOutcome::Abandoned))
            .count();
        log::info!(
            "{}: {succeeded}/{total} tasks succeeded in {:.2}s",
            self.label,
            started.elapsed().as_secs_f64()
        );
        if abandoned > 0 {
            log::warn!("{}: {abandoned} tasks abandoned after cancellation", self.label);
        }
        outcomes
    }
}

fn run_guarded<T, E, F>(task: F) -> TaskOutcome<T, E>
where
    F: FnOnce() -> Result<T, E>,
{
    match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(value)) => TaskOutcome::Succeeded(value),
        Ok(Err(error)) => TaskOutcome::Failed(error),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::error!("Task panicked: {message}");
            TaskOutcome::Panicked(message)
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_empty_input_returns_empty() {
        let pool = WorkerPool::new("test", 4);
        let tasks: Vec<fn() -> Result<u32, String>> = Vec::new();
        assert!(pool.run(tasks, &CancellationToken::new()).is_empty());
    }

    #[test]
    fn test_outcomes_follow_submission_order() {
        let pool = WorkerPool::new("test", 3);
        let tasks: Vec<_> = (0..10u64)
            .map(|i| {
                move || -> Result<u64, String> {
                    // Later tasks finish first.
                    std::thread::sleep(Duration::from_millis((10 - i) * 3));
                    Ok(i * 10)
                }
            })
            .collect();

        let outcomes = pool.run(tasks, &CancellationToken::new());
        let values: Vec<u64> = outcomes.into_iter().filter_map(TaskOutcome::ok).collect();
        assert_eq!(values, (0..10).map(|i| i * 10).collect::<Vec<_>>());
    }

    #[test]
    fn test_concurrency_never_exceeds_limit() {
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let pool = WorkerPool::new("test", 2);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let active = &active;
                let peak = &peak;
                move || -> Result<(), String> {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .collect();

        let outcomes = pool.run(tasks, &CancellationToken::new());
        assert!(outcomes.iter().all(TaskOutcome::is_success));
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_failure_does_not_abort_siblings() {
        let pool = WorkerPool::new("test", 4);
        let tasks: Vec<_> = (0..5)
            .map(|i| {
                move || -> Result<usize, String> {
                    if i == 1 {
                        Err(format!("segment {i} failed"))
                    } else {
                        Ok(i)
                    }
                }
            })
            .collect();

        let outcomes = pool.run(tasks, &CancellationToken::new());
        assert_eq!(outcomes.len(), 5);
        assert_eq!(outcomes[0], TaskOutcome::Succeeded(0));
        assert_eq!(outcomes[1], TaskOutcome::Failed("segment 1 failed".to_string()));
        assert_eq!(outcomes[4], TaskOutcome::Succeeded(4));
    }

    #[test]
    fn test_panic_is_captured_per_task() {
        let pool = WorkerPool::new("test", 2);
        let tasks: Vec<_> = (0..3)
            .map(|i| {
                move || -> Result<usize, String> {
                    if i == 2 {
                        panic!("boom");
                    }
                    Ok(i)
                }
            })
            .collect();

        let outcomes = pool.run(tasks, &CancellationToken::new());
        assert_eq!(outcomes[0], TaskOutcome::Succeeded(0));
        assert_eq!(outcomes[1], TaskOutcome::Succeeded(1));
        assert_eq!(outcomes[2], TaskOutcome::Panicked("boom".to_string()));
    }

    #[test]
    fn test_cancelled_before_start_abandons_everything() {
        let token = CancellationToken::new();
        token.cancel();
        let ran = AtomicUsize::new(0);
        let pool = WorkerPool::new("test", 2);
        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let ran = &ran;
                move || -> Result<(), String> {
                    ran.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .collect();

        let outcomes = pool.run(tasks, &token);
        assert!(outcomes.iter().all(|o| matches!(o, TaskOutcome::Abandoned)));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_mid_run_abandons_pending_tasks() {
        let token = CancellationToken::new();
        let pool = WorkerPool::new("test", 1);
        let tasks: Vec<_> = (0..5)
            .map(|i| {
                let token = token.clone();
                move || -> Result<usize, String> {
                    if i == 1 {
                        token.cancel();
                    }
                    Ok(i)
                }
            })
            .collect();

        let outcomes = pool.run(tasks, &token);
        assert_eq!(outcomes[0], TaskOutcome::Succeeded(0));
        assert_eq!(outcomes[1], TaskOutcome::Succeeded(1));
        assert!(outcomes[2..]
            .iter()
            .all(|o| matches!(o, TaskOutcome::Abandoned)));
    }

    #[test]
    fn test_zero_workers_is_raised_to_one() {
        assert_eq!(WorkerPool::new("test", 0).max_workers(), 1);
    }
}
