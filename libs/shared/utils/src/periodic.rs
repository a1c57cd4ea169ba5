use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Running,
    Paused,
    Stopped,
}

/// A repeating job tied to the lifetime of its owner.
///
/// The job runs on the first tick and then every `period`. A run is awaited
/// before the next tick is considered, so runs never overlap; ticks missed
/// while a run was in flight are skipped. `pause` suspends runs (hidden view),
/// `resume` restarts the cadence with an immediate run, and `stop` or dropping
/// the handle ends the task.
pub struct PeriodicTask {
    name: String,
    control: watch::Sender<TaskState>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    pub fn spawn<F, Fut>(name: impl Into<String>, period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let (control, mut state_rx) = watch::channel(TaskState::Running);
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if *state_rx.borrow() == TaskState::Running {
                            job().await;
                        }
                    }
                    changed = state_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = *state_rx.borrow_and_update();
                        match state {
                            TaskState::Stopped => break,
                            TaskState::Running => ticker.reset_immediately(),
                            TaskState::Paused => {}
                        }
                    }
                }
            }

            debug!("Periodic task {} finished", task_name);
        });

        debug!("Periodic task {} started with period {:?}", name, period);
        Self {
            name,
            control,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pause(&self) {
        self.control.send_replace(TaskState::Paused);
    }

    pub fn resume(&self) {
        self.control.send_replace(TaskState::Running);
    }

    pub fn is_paused(&self) -> bool {
        *self.control.borrow() == TaskState::Paused
    }

    /// Stops the task, waiting for a run in flight to complete.
    pub async fn stop(mut self) {
        self.control.send_replace(TaskState::Stopped);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.control.send_replace(TaskState::Stopped);
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_task(counter: Arc<AtomicUsize>) -> PeriodicTask {
        PeriodicTask::spawn("test", Duration::from_millis(10), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    #[tokio::test]
    async fn test_runs_repeatedly() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = counting_task(counter.clone());

        tokio::time::sleep(Duration::from_millis(60)).await;
        task.stop().await;

        assert!(counter.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_pause_and_resume() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = counting_task(counter.clone());

        tokio::time::sleep(Duration::from_millis(25)).await;
        task.pause();
        assert!(task.is_paused());
        tokio::time::sleep(Duration::from_millis(20)).await;

        let paused_count = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), paused_count);

        task.resume();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(counter.load(Ordering::SeqCst) > paused_count);
        task.stop().await;
    }

    #[tokio::test]
    async fn test_stop_ends_runs() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = counting_task(counter.clone());
        assert_eq!(task.name(), "test");

        tokio::time::sleep(Duration::from_millis(15)).await;
        task.stop().await;
        let stopped_count = counter.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(counter.load(Ordering::SeqCst), stopped_count);
    }
}
