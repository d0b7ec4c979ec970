use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskmill_continuation::{
    Clock, Continuation, ContinuationContext, ContinuationFactory, ImmediateRetryStrategy, RecordingScheduler,
    RetryForEverExceptionStrategy, TokioScheduler,
};
use tokio::time::Instant;

/// Epoch millis that follow tokio's (possibly paused) clock.
struct TokioClock {
    base: u64,
    start: Instant,
}

impl TokioClock {
    fn new(base: u64) -> Self {
        Self {
            base,
            start: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_epoch_ms(&self) -> u64 {
        self.base + self.start.elapsed().as_millis() as u64
    }
}

#[tokio::test]
async fn test_step_fails_once_then_succeeds() {
    let factory = ContinuationFactory::new().with_strategy(Arc::new(ImmediateRetryStrategy));
    let continuation = factory.get("wf-1").await;
    let seen = Arc::new(Mutex::new(Vec::new()));

    let block_seen = seen.clone();
    let value: String = continuation
        .exec_block("step1", move |ctx: ContinuationContext| {
            block_seen.lock().unwrap().push(ctx.attempts);
            async move {
                if ctx.attempts == 0 {
                    return Err(anyhow::anyhow!("first attempt fails"));
                }
                Ok(format!("done after {} retries", ctx.attempts))
            }
        })
        .await
        .unwrap();

    assert_eq!(value, "done after 1 retries");
    assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    assert!(continuation.is_done("step1").await);

    // remembered: a block that would fail is never invoked
    let again: String = factory
        .get("wf-1")
        .await
        .exec_block("step1", |_| async { Err(anyhow::anyhow!("not called")) })
        .await
        .unwrap();
    assert_eq!(again, value);
}

#[tokio::test(start_paused = true)]
async fn test_delayed_retry_never_runs_early() {
    let clock = Arc::new(TokioClock::new(1_000_000));
    let scheduler = Arc::new(RecordingScheduler::new(Arc::new(TokioScheduler::with_clock(clock.clone()))));
    let continuation = Continuation::new("wf-delayed")
        .with_strategy(Arc::new(RetryForEverExceptionStrategy::new(500).with_clock(clock.clone())))
        .with_scheduler(scheduler.clone());
    let invoked_at = Arc::new(Mutex::new(Vec::new()));

    let block_clock = clock.clone();
    let block_invoked_at = invoked_at.clone();
    let value: u32 = continuation
        .exec_block("slow", move |ctx: ContinuationContext| {
            block_invoked_at.lock().unwrap().push(block_clock.now_epoch_ms());
            async move {
                if ctx.attempts < 3 {
                    return Err(anyhow::anyhow!("attempt {} failed", ctx.attempts));
                }
                Ok(ctx.attempts)
            }
        })
        .await
        .unwrap();
    assert_eq!(value, 3);

    let schedules = scheduler.schedules().await;
    let invoked_at = invoked_at.lock().unwrap().clone();
    assert_eq!(schedules.len(), 3);
    assert_eq!(invoked_at.len(), 4);
    assert_eq!(invoked_at[0], 1_000_000);

    for (n, schedule) in schedules.iter().enumerate() {
        let failed_at = invoked_at[n];
        assert_eq!(schedule.key, "slow");
        assert_eq!(schedule.ctx, ContinuationContext { attempts: n as u32 + 1 });
        // linear: the n-th retry waits n delay units
        assert_eq!(schedule.scheduled_time, failed_at + n as u64 * 500);
        assert!(
            invoked_at[n + 1] >= schedule.scheduled_time,
            "retry ran at {}, scheduled for {}",
            invoked_at[n + 1],
            schedule.scheduled_time
        );
    }
    assert!(invoked_at[3] >= 1_001_500);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_run_block_once() {
    let continuation = Arc::new(Continuation::new("wf-concurrent"));
    let calls = Arc::new(AtomicU32::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let continuation = continuation.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                continuation
                    .exec_block("shared", move |_| {
                        let calls = calls.clone();
                        async move {
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(calls.fetch_add(1, Ordering::SeqCst) + 100)
                        }
                    })
                    .await
            })
        })
        .collect();

    for handle in handles {
        let value: u32 = handle.await.unwrap().unwrap();
        assert_eq!(value, 100);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_workflows_are_independent() {
    let factory = ContinuationFactory::new();
    let a = factory.get("wf-a").await;
    let b = factory.get("wf-b").await;

    let _: i32 = a.exec_block("step1", |_| async { Ok(1) }).await.unwrap();
    let from_b: i32 = b.exec_block("step1", |_| async { Ok(2) }).await.unwrap();

    assert_eq!(from_b, 2);
    assert_eq!(a.done_steps().await, vec!["step1".to_string()]);
}
