//! Scheduler loop: the timer-driven driver for the engine.
//!
//! One "tick" snapshots the pending-active tasks, builds the windowed
//! execution plan and hands it to the executor. The loop runs in a spawned
//! task at a fixed polling cadence; `start` performs one immediate tick
//! before arming the timer, `stop` cancels it, and `trigger` forces a tick
//! outside the cadence. A tick that fails wholesale (repository
//! unreachable) is logged and dropped; the next tick proceeds unaffected.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use eyre::Result;
use tokio::task::JoinHandle;

use crate::content::ContentGenerator;
use crate::notify::Notifier;
use crate::scheduler::executor::{Executor, ExecutorConfig};
use crate::scheduler::priority::PriorityConfig;
use crate::scheduler::queue::build_queue;
use crate::store::TaskRepository;

/// Configuration for the scheduler loop.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often to run a tick.
    pub poll_interval: Duration,
    /// Executor limits.
    pub executor: ExecutorConfig,
    /// Priority policy table.
    pub priorities: PriorityConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            executor: ExecutorConfig::default(),
            priorities: PriorityConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Set the polling cadence.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the executor limits.
    pub fn with_executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    /// Set the priority policy table.
    pub fn with_priorities(mut self, priorities: PriorityConfig) -> Self {
        self.priorities = priorities;
        self
    }
}

/// Timer-driven scheduler over a task repository.
pub struct TaskScheduler {
    config: SchedulerConfig,
    repo: Arc<dyn TaskRepository>,
    executor: Arc<Executor>,
    handle: Option<JoinHandle<()>>,
}

impl TaskScheduler {
    pub fn new(
        repo: Arc<dyn TaskRepository>,
        generator: Arc<dyn ContentGenerator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_config(repo, generator, notifier, SchedulerConfig::default())
    }

    pub fn with_config(
        repo: Arc<dyn TaskRepository>,
        generator: Arc<dyn ContentGenerator>,
        notifier: Arc<dyn Notifier>,
        config: SchedulerConfig,
    ) -> Self {
        let executor = Arc::new(Executor::with_config(
            repo.clone(),
            generator,
            notifier,
            config.executor.clone(),
        ));
        Self {
            config,
            repo,
            executor,
            handle: None,
        }
    }

    /// Check whether the polling loop is armed.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Start the scheduler: one immediate tick, then the timer loop.
    /// No-op if already running.
    pub async fn start(&mut self) {
        if self.is_running() {
            return;
        }

        tracing::info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "Starting task scheduler"
        );

        if let Err(e) = self.trigger().await {
            tracing::error!(error = %e, "Initial scheduler tick failed");
        }

        let repo = self.repo.clone();
        let executor = self.executor.clone();
        let priorities = self.config.priorities.clone();
        let poll_interval = self.config.poll_interval;

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first interval tick fires immediately; the start path
            // already ran one, so consume it.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(e) = run_tick(&repo, &executor, &priorities).await {
                    tracing::error!(error = %e, "Scheduler tick failed");
                }
            }
        }));
    }

    /// Stop the scheduler. No-op if not running.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::info!("Task scheduler stopped");
        }
    }

    /// Force one tick outside the timer cadence. Returns the number of
    /// tasks that executed.
    pub async fn trigger(&self) -> Result<usize> {
        run_tick(&self.repo, &self.executor, &self.config.priorities).await
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One scan-and-execute cycle.
async fn run_tick(
    repo: &Arc<dyn TaskRepository>,
    executor: &Arc<Executor>,
    priorities: &PriorityConfig,
) -> Result<usize> {
    let now = Utc::now();
    let pending = repo.find_pending_active().await?;
    if pending.is_empty() {
        return Ok(0);
    }

    tracing::debug!(pending = pending.len(), "Scheduler tick");

    let queue = build_queue(pending, now, priorities);
    if queue.is_empty() {
        return Ok(0);
    }

    tracing::info!(due = queue.len(), "Dispatching due tasks");
    Ok(executor.run_queue(queue, now).await)
}
