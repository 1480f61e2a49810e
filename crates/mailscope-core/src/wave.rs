//! Bounded concurrent probe waves.
//!
//! A wave spawns one tokio task per probe, gated by a semaphore. The timeout
//! of a task starts once it holds a permit, so queued tasks are not charged
//! for waiting. Every task ends in exactly one [`ProbeOutcome`]: its own
//! result, a timeout, or an abort when the task panicked.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{debug, instrument};

use crate::error::{ProbeError, ProbeResult};
use crate::model::outcome::ProbeOutcome;
use crate::telemetry::emit_probe_failed;

/// A boxed probe invocation owning all of its inputs.
pub type ProbeTask<T> = BoxFuture<'static, ProbeResult<T>>;

#[derive(Debug, Clone, Copy)]
pub struct WaveConfig {
    /// Maximum number of tasks running at once.
    pub max_workers: usize,
    /// Bound applied to each task individually.
    pub task_timeout: Duration,
}

impl WaveConfig {
    pub fn new(max_workers: usize, task_timeout: Duration) -> Self {
        Self {
            max_workers: max_workers.max(1),
            task_timeout,
        }
    }
}

/// Run `tasks` concurrently and return one outcome per key, in completion
/// order. No task failure cancels a sibling.
#[instrument(skip_all, fields(wave = %label, tasks = tasks.len()))]
pub async fn run_wave<K, T>(
    label: &str,
    tasks: Vec<(K, ProbeTask<T>)>,
    config: &WaveConfig,
) -> Vec<(K, ProbeOutcome<T>)>
where
    K: Display + Send + 'static,
    T: Send + 'static,
{
    let sem = Arc::new(Semaphore::new(config.max_workers.max(1)));
    let task_timeout = config.task_timeout;
    let mut running = FuturesUnordered::new();

    for (key, task) in tasks {
        let sem = Arc::clone(&sem);
        let probe = key.to_string();

        let handle = tokio::spawn(async move {
            // The semaphore is never closed, so acquisition only fails on shutdown.
            let _permit = sem.acquire_owned().await.ok();
            match tokio::time::timeout(task_timeout, task).await {
                Ok(result) => result,
                Err(_) => Err(ProbeError::Timeout {
                    probe,
                    seconds: task_timeout.as_secs_f64(),
                }),
            }
        });

        running.push(async move { (key, handle.await) });
    }

    let mut outcomes = Vec::with_capacity(running.len());
    while let Some((key, joined)) = running.next().await {
        let result = joined.unwrap_or_else(|err| Err(aborted(err)));
        match &result {
            Ok(_) => debug!(probe = %key, "probe completed"),
            Err(err) => emit_probe_failed(&key.to_string(), err),
        }
        outcomes.push((key, ProbeOutcome::from(result)));
    }
    outcomes
}

/// Run a single task under the same discipline as a wave.
pub async fn run_single<T>(
    label: &str,
    task: ProbeTask<T>,
    task_timeout: Duration,
) -> ProbeOutcome<T>
where
    T: Send + 'static,
{
    let config = WaveConfig::new(1, task_timeout);
    run_wave(label, vec![(label.to_string(), task)], &config)
        .await
        .into_iter()
        .next()
        .map(|(_, outcome)| outcome)
        .unwrap_or_else(|| ProbeOutcome::failure(format!("{label} produced no outcome"), None))
}

fn aborted(err: JoinError) -> ProbeError {
    if err.is_cancelled() {
        return ProbeError::Aborted("task cancelled".to_string());
    }
    let payload = err.into_panic();
    let reason = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    ProbeError::Aborted(format!("task panicked: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{sleep, Instant};

    fn task<T: Send + 'static>(delay: Duration, result: ProbeResult<T>) -> ProbeTask<T> {
        async move {
            sleep(delay).await;
            result
        }
        .boxed()
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_task_yields_one_outcome() {
        let tasks = vec![
            ("a", task(Duration::from_millis(30), Ok(1))),
            ("b", task(Duration::from_millis(10), Err(ProbeError::Dns("SERVFAIL".into())))),
            ("c", task(Duration::from_millis(20), Ok(3))),
        ];
        let outcomes = run_wave("test", tasks, &WaveConfig::new(4, Duration::from_secs(5))).await;

        let keys: Vec<&str> = outcomes.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["b", "c", "a"], "completion order");
        assert!(outcomes[0].1.is_failure());
        assert_eq!(outcomes[1].1.success(), Some(&3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_isolated_and_wall_time_bounded() {
        let started = Instant::now();
        let tasks = vec![
            ("slow", task(Duration::from_secs(60), Ok(1))),
            ("fast", task(Duration::from_millis(5), Ok(2))),
        ];
        let outcomes = run_wave("test", tasks, &WaveConfig::new(4, Duration::from_secs(1))).await;

        assert!(started.elapsed() < Duration::from_secs(2));
        let (_, fast) = outcomes.iter().find(|(k, _)| *k == "fast").unwrap();
        assert_eq!(fast.success(), Some(&2));
        let (_, slow) = outcomes.iter().find(|(k, _)| *k == "slow").unwrap();
        assert!(slow.failure_message().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_panicking_task_becomes_failure() {
        let tasks: Vec<(&str, ProbeTask<u32>)> = vec![
            ("boom", async { panic!("probe exploded") }.boxed()),
            ("ok", async { Ok::<u32, ProbeError>(7) }.boxed()),
        ];
        let outcomes = run_wave("test", tasks, &WaveConfig::new(2, Duration::from_secs(5))).await;

        assert_eq!(outcomes.len(), 2);
        let (_, boom) = outcomes.iter().find(|(k, _)| *k == "boom").unwrap();
        let message = boom.failure_message().unwrap();
        assert!(message.contains("panicked"));
        assert!(message.contains("probe exploded"));
        let (_, ok) = outcomes.iter().find(|(k, _)| *k == "ok").unwrap();
        assert_eq!(ok.success(), Some(&7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_ceiling_respected() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<(usize, ProbeTask<()>)> = (0..10)
            .map(|i| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                let fut = async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    sleep(Duration::from_millis(50)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<(), ProbeError>(())
                };
                (i, fut.boxed())
            })
            .collect();

        let outcomes = run_wave("test", tasks, &WaveConfig::new(3, Duration::from_secs(5))).await;
        assert_eq!(outcomes.len(), 10);
        assert!(outcomes.iter().all(|(_, o)| o.is_success()));
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_task_timeout_starts_at_permit() {
        // One worker: the second task waits 800ms, then gets its full second.
        let tasks = vec![
            ("first", task(Duration::from_millis(800), Ok(1))),
            ("second", task(Duration::from_millis(800), Ok(2))),
        ];
        let outcomes = run_wave("test", tasks, &WaveConfig::new(1, Duration::from_secs(1))).await;
        assert!(outcomes.iter().all(|(_, o)| o.is_success()));
    }

    #[tokio::test]
    async fn test_run_single() {
        let task = async { Ok::<_, ProbeError>("done") }.boxed();
        let outcome = run_single("mailbox", task, Duration::from_secs(1)).await;
        assert_eq!(outcome.success(), Some(&"done"));
    }
}
