//! Worker Pool: executes installer tasks in parallel with bounded
//! concurrency and progress reporting (`spec.md §4.5`, `§5`).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct InstallTaskResult {
    pub name: String,
    pub version: String,
    pub success: bool,
    pub error_message: Option<String>,
    pub elapsed_ms: u64,
}

/// Worker count per `spec.md §5`: bounded by `min(logical_cpus, 32)` and by
/// the number of tasks. Clamps at 32 even for huge task counts, and at 1
/// for a single task (`spec.md §8`).
pub fn worker_count(task_count: usize) -> usize {
    let cpu_cap = num_cpus::get().min(32);
    task_count.min(cpu_cap).max(if task_count == 0 { 0 } else { 1 })
}

/// Runs `task_fn` once per item in `tasks`, in parallel, bounded by
/// [`worker_count`]. `task_fn` must be safe to call concurrently from
/// multiple OS threads.
///
/// Scheduling: every worker (including the calling thread, which
/// participates after spawning the helpers) pulls the next index from a
/// shared atomic counter until none remain. Each result is stored at its
/// input index in a pre-allocated buffer so the caller can report results
/// in input order with no channel contention (`spec.md §4.5`).
///
/// `on_progress` is invoked periodically from the calling thread with
/// `(completed, total)`, driving a progress spinner.
pub fn run_parallel<T, F>(
    tasks: &[T],
    task_fn: F,
    mut on_progress: impl FnMut(usize, usize),
) -> Vec<InstallTaskResult>
where
    T: Sync,
    F: Fn(&T) -> InstallTaskResult + Sync,
{
    let total = tasks.len();
    if total == 0 {
        return Vec::new();
    }

    let next_index = AtomicUsize::new(0);
    let completed = AtomicUsize::new(0);
    let results: Vec<OnceLock<InstallTaskResult>> = (0..total).map(|_| OnceLock::new()).collect();
    let workers = worker_count(total);

    let drain = |task_fn: &F| {
        loop {
            let idx = next_index.fetch_add(1, Ordering::SeqCst);
            if idx >= total {
                break;
            }
            let start = Instant::now();
            let mut result = task_fn(&tasks[idx]);
            result.elapsed_ms = start.elapsed().as_millis() as u64;
            let _ = results[idx].set(result);
            completed.fetch_add(1, Ordering::SeqCst);
        }
    };

    std::thread::scope(|scope| {
        // Spawn workers-1 helper threads; the calling thread is the
        // remaining worker and also drives the progress spinner.
        for _ in 1..workers {
            scope.spawn(|| drain(&task_fn));
        }

        let spinner_interval = Duration::from_millis(80);
        loop {
            let done = completed.load(Ordering::SeqCst);
            on_progress(done, total);
            if done >= total {
                break;
            }
            std::thread::sleep(spinner_interval);
            // The calling thread also does real work between progress
            // samples instead of only polling.
            if next_index.load(Ordering::SeqCst) < total {
                drain(&task_fn);
            }
        }
    });

    results
        .into_iter()
        .map(|cell| cell.into_inner().expect("every index is written exactly once"))
        .collect()
}
