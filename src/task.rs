//! Cancellable periodic tasks.
//!
//! `PeriodicTask` runs a closure on a fixed deadline grid in its own thread.
//! Cancellation is prompt (the idle thread re-checks a shared flag every
//! 50 ms) and guaranteed: both `stop` and drop join the thread, so a task
//! never outlives its handle.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const POLL_SLICE: Duration = Duration::from_millis(50);

pub struct PeriodicTask {
    name: String,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawn a task that ticks every `period`, first tick one period from now.
    ///
    /// Deadlines stay on the original grid. When a tick overruns, the
    /// deadlines that elapsed meanwhile are skipped rather than queued, so
    /// ticks never pile up and two ticks never overlap.
    pub fn spawn<F>(name: &str, period: Duration, tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let thread_name = name.to_string();
        let join = std::thread::spawn(move || run(&thread_name, period, tick, shutdown_thread));
        log::debug!("periodic task '{}' started (period {:?})", name, period);
        Self {
            name: name.to_string(),
            shutdown,
            join: Some(join),
        }
    }

    /// Cancel the task and wait for its thread to finish.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        match self.join.take() {
            Some(join) => join
                .join()
                .map_err(|_| anyhow!("periodic task '{}' panicked", self.name)),
            None => Ok(()),
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                log::error!("periodic task '{}' panicked", self.name);
            }
        }
    }
}

fn run<F>(name: &str, period: Duration, mut tick: F, shutdown: Arc<AtomicBool>)
where
    F: FnMut(),
{
    let mut next_deadline = Instant::now() + period;
    while !shutdown.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now < next_deadline {
            std::thread::sleep((next_deadline - now).min(POLL_SLICE));
            continue;
        }

        tick();

        next_deadline += period;
        let now = Instant::now();
        let mut skipped = 0u32;
        while next_deadline <= now {
            next_deadline += period;
            skipped += 1;
        }
        if skipped > 0 {
            log::debug!(
                "periodic task '{}' overran; skipped {} deadlines",
                name,
                skipped
            );
        }
    }
    log::debug!("periodic task '{}' stopped", name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn ticks_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_task = count.clone();
        let task = PeriodicTask::spawn("test-tick", Duration::from_millis(10), move || {
            count_task.fetch_add(1, Ordering::SeqCst);
        });

        std::thread::sleep(Duration::from_millis(120));
        task.stop().unwrap();

        let stopped_at = count.load(Ordering::SeqCst);
        assert!(stopped_at >= 3, "expected ticks, got {}", stopped_at);

        // No tick fires after stop has joined.
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(count.load(Ordering::SeqCst), stopped_at);
    }

    #[test]
    fn drop_cancels_the_task() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_task = count.clone();
        {
            let _task = PeriodicTask::spawn("test-drop", Duration::from_millis(10), move || {
                count_task.fetch_add(1, Ordering::SeqCst);
            });
            std::thread::sleep(Duration::from_millis(40));
        }

        let after_drop = count.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(count.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn first_tick_waits_one_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_task = count.clone();
        let task = PeriodicTask::spawn("test-delay", Duration::from_millis(200), move || {
            count_task.fetch_add(1, Ordering::SeqCst);
        });

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        task.stop().unwrap();
    }
}
