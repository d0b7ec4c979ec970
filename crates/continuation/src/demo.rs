//! A three step workflow for demos and tests.
//!
//! `step1` squares the input, `step2` adds one, `step3` doubles. Each step
//! runs through the same [`Continuation`], so running the workflow again
//! after a failure only repeats the steps that did not finish.

use crate::continuation::Continuation;
use crate::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use taskmill_core::LogLevel;
use taskmill_execution::ExecutionContext;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Makes chosen steps fail a number of times before they succeed.
#[derive(Debug, Default)]
pub struct Chaos {
    failures: Mutex<HashMap<String, u32>>,
}

impl Chaos {
    /// No failures planned.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `step` the next `times` times it runs.
    pub fn fail(self, step: &str, times: u32) -> Self {
        lock(&self.failures).insert(step.to_string(), times);
        self
    }

    fn check(&self, step: &str) -> anyhow::Result<()> {
        match lock(&self.failures).get_mut(step) {
            Some(left) if *left > 0 => {
                *left -= 1;
                anyhow::bail!("chaos in {step}")
            }
            _ => Ok(()),
        }
    }
}

/// Records which steps actually ran, in order.
#[derive(Debug, Default)]
pub struct Spy {
    runs: Mutex<Vec<String>>,
}

impl Spy {
    /// Nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Step names, one entry per invocation.
    pub fn runs(&self) -> Vec<String> {
        lock(&self.runs).clone()
    }

    fn record(&self, step: &str) {
        lock(&self.runs).push(step.to_string());
    }
}

/// square, add one, double
pub struct ThreeStepWorkflow {
    continuation: Arc<Continuation>,
    chaos: Arc<Chaos>,
    spy: Arc<Spy>,
}

impl ThreeStepWorkflow {
    /// Run steps through `continuation`.
    pub fn new(continuation: Arc<Continuation>) -> Self {
        Self {
            continuation,
            chaos: Arc::new(Chaos::new()),
            spy: Arc::new(Spy::new()),
        }
    }

    /// Inject failures.
    pub fn with_chaos(mut self, chaos: Arc<Chaos>) -> Self {
        self.chaos = chaos;
        self
    }

    /// Record invocations.
    pub fn with_spy(mut self, spy: Arc<Spy>) -> Self {
        self.spy = spy;
        self
    }

    /// Run the workflow for `start`.
    pub async fn run(&self, ctx: &ExecutionContext, start: i64) -> Result<i64> {
        let step1 = self
            .step(ctx, "step1", move || {
                start
                    .checked_mul(start)
                    .ok_or_else(|| anyhow::anyhow!("square of {start} overflows"))
            })
            .await?;
        let step2 = self
            .step(ctx, "step2", move || {
                step1
                    .checked_add(1)
                    .ok_or_else(|| anyhow::anyhow!("{step1} + 1 overflows"))
            })
            .await?;
        let step3 = self
            .step(ctx, "step3", move || {
                step2
                    .checked_add(step2)
                    .ok_or_else(|| anyhow::anyhow!("{step2} * 2 overflows"))
            })
            .await?;
        ctx.log(LogLevel::Info, format!("Workflow finished with {step3}"));
        Ok(step3)
    }

    async fn step<F>(&self, ctx: &ExecutionContext, name: &str, compute: F) -> Result<i64>
    where
        F: Fn() -> anyhow::Result<i64>,
    {
        let chaos = &self.chaos;
        let spy = &self.spy;
        let compute = &compute;
        self.continuation
            .exec_block(name, move |attempt| async move {
                spy.record(name);
                ctx.log(LogLevel::Info, format!("Running {name} (retry {})", attempt.attempts));
                chaos.check(name)?;
                compute()
            })
            .await
    }
}
