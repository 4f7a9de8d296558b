//! Concurrency-controlled task executor.
//!
//! Consumes the per-tick execution plan and drives each task through its
//! lifecycle: persist `running`, publish a start event, render the payload
//! (content-bearing kinds go through the generator under a deadline),
//! persist the outcome and the next occurrence, publish the result event.
//!
//! Guarantees:
//! - single-flight per task id, enforced by an in-flight set whose guard
//!   releases on drop, success or failure alike
//! - at most `max_concurrent_tasks` dispatched per tick, run fan-out/fan-in
//! - one task's failure never aborts the rest of the batch

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;

use crate::content::ContentGenerator;
use crate::domain::{Task, TaskParameters, TaskStatus};
use crate::error::{Result, SchedrError};
use crate::notify::{NotifyLevel, Notifier, TaskEventKind, notification_content};
use crate::scheduler::queue::QueueItem;
use crate::scheduler::recurrence::next_occurrence;
use crate::store::TaskRepository;

/// Configuration for the executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum queue items dispatched per tick.
    pub max_concurrent_tasks: usize,
    /// Deadline for a single task execution.
    pub task_timeout: Duration,
    /// Consecutive failures before a recurring task is parked as failed.
    pub max_failures: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 10,
            task_timeout: Duration::from_secs(120),
            max_failures: 5,
        }
    }
}

impl ExecutorConfig {
    /// Set the concurrency limit.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = max;
        self
    }

    /// Set the per-task execution deadline.
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Set the consecutive-failure cap.
    pub fn with_max_failures(mut self, max: u32) -> Self {
        self.max_failures = max;
        self
    }
}

/// Process-wide set of task ids currently executing.
///
/// Injected into the executor rather than held as a global so tests can
/// construct independent instances.
#[derive(Clone, Default)]
pub struct InflightSet {
    ids: Arc<Mutex<HashSet<String>>>,
}

impl InflightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an id for execution. Returns `None` when it is already held.
    pub fn try_acquire(&self, id: &str) -> Option<InflightGuard> {
        let mut ids = self.ids.lock().unwrap();
        if !ids.insert(id.to_string()) {
            return None;
        }
        Some(InflightGuard {
            ids: Arc::clone(&self.ids),
            id: id.to_string(),
        })
    }

    /// Check whether an id is currently executing.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.lock().unwrap().contains(id)
    }

    /// Number of ids currently in flight.
    pub fn len(&self) -> usize {
        self.ids.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases the claimed id when dropped, on every exit path.
pub struct InflightGuard {
    ids: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.ids.lock().unwrap().remove(&self.id);
    }
}

/// What happened to one dispatched queue item.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    /// One-shot task finished; no further occurrences.
    Completed,
    /// Recurring task finished; next occurrence persisted.
    Rescheduled(DateTime<Utc>),
    /// Execution failed; message carries the cause.
    Failed(String),
    /// Not executed: already in flight or no longer eligible.
    Skipped,
}

/// Executes queue items against the repository, generator and notifier.
pub struct Executor {
    repo: Arc<dyn TaskRepository>,
    generator: Arc<dyn ContentGenerator>,
    notifier: Arc<dyn Notifier>,
    inflight: InflightSet,
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(
        repo: Arc<dyn TaskRepository>,
        generator: Arc<dyn ContentGenerator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_config(repo, generator, notifier, ExecutorConfig::default())
    }

    pub fn with_config(
        repo: Arc<dyn TaskRepository>,
        generator: Arc<dyn ContentGenerator>,
        notifier: Arc<dyn Notifier>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            repo,
            generator,
            notifier,
            inflight: InflightSet::new(),
            config,
        }
    }

    /// The in-flight set shared by all executions on this executor.
    pub fn inflight(&self) -> &InflightSet {
        &self.inflight
    }

    /// Dispatch the head of the plan, at most `max_concurrent_tasks` items,
    /// and wait for all of them. Items past the limit stay pending and are
    /// reconsidered next tick. Returns the number of items that executed.
    pub async fn run_queue(&self, queue: Vec<QueueItem>, now: DateTime<Utc>) -> usize {
        let batch: Vec<QueueItem> = queue
            .into_iter()
            .take(self.config.max_concurrent_tasks)
            .collect();

        if batch.is_empty() {
            return 0;
        }

        let results = join_all(batch.iter().map(|item| self.execute(item, now))).await;

        let mut executed = 0;
        for (item, result) in batch.iter().zip(results) {
            match result {
                Ok(ExecOutcome::Skipped) => {}
                Ok(_) => executed += 1,
                // Repository trouble for one task; its prior persisted state
                // stands and the rest of the batch is unaffected.
                Err(e) => {
                    tracing::error!(task_id = %item.task.id, error = %e, "Task processing failed");
                }
            }
        }
        executed
    }

    /// Execute a single queue item through its full lifecycle.
    pub async fn execute(&self, item: &QueueItem, now: DateTime<Utc>) -> Result<ExecOutcome> {
        let id = item.task.id.as_str();

        let Some(_guard) = self.inflight.try_acquire(id) else {
            tracing::debug!(task_id = %id, "Task already in flight, skipping");
            return Ok(ExecOutcome::Skipped);
        };

        // Re-read the record: the snapshot may be stale and the task may
        // have been edited or deactivated since the scan.
        let Some(task) = self.repo.get(id).await? else {
            return Ok(ExecOutcome::Skipped);
        };
        if !task.is_active || !task.status.is_schedulable() {
            return Ok(ExecOutcome::Skipped);
        }

        self.repo
            .update_status(id, TaskStatus::Running, Some(now), None)
            .await?;
        self.notifier.publish(
            TaskEventKind::TaskStarted,
            notification_content(
                &task,
                &format!("Task \"{}\" is starting", task.description),
                NotifyLevel::Info,
            ),
        );

        match self.render_payload(&task).await {
            Ok(content) => self.finish_success(&task, now, &content).await,
            Err(e) => self.finish_failure(&task, now, e).await,
        }
    }

    /// Render the payload for a task. Reminder and fetch kinds use a
    /// templated message; content-bearing kinds go through the generator
    /// under the execution deadline.
    async fn render_payload(&self, task: &Task) -> Result<String> {
        match &task.params {
            TaskParameters::Reminder { .. } => Ok(format!("Time for: {}", task.description)),
            TaskParameters::Fetch { target, .. } => Ok(format!("Content fetched: {}", target)),
            params => {
                let deadline = self.config.task_timeout;
                match tokio::time::timeout(deadline, self.generator.generate(params)).await {
                    Ok(result) => result,
                    Err(_) => Err(SchedrError::Timeout(deadline.as_millis() as u64)),
                }
            }
        }
    }

    async fn finish_success(
        &self,
        task: &Task,
        now: DateTime<Utc>,
        content: &str,
    ) -> Result<ExecOutcome> {
        if task.failure_count > 0 {
            self.repo.reset_failures(&task.id).await?;
        }

        let outcome = match task
            .schedule
            .as_ref()
            .filter(|s| s.frequency.is_recurring())
            .and_then(|s| next_occurrence(s, now))
        {
            Some(next) => {
                self.repo
                    .set_next_execution(&task.id, Some(next))
                    .await?;
                self.repo
                    .update_status(&task.id, TaskStatus::Recurring, None, Some(content))
                    .await?;
                ExecOutcome::Rescheduled(next)
            }
            None => {
                self.repo.set_next_execution(&task.id, None).await?;
                self.repo
                    .update_status(&task.id, TaskStatus::Completed, None, Some(content))
                    .await?;
                ExecOutcome::Completed
            }
        };

        self.notifier.publish(
            TaskEventKind::TaskCompleted,
            notification_content(
                task,
                &format!("Task \"{}\" completed successfully", task.description),
                NotifyLevel::Success,
            ),
        );

        tracing::info!(task_id = %task.id, outcome = ?outcome, "Task executed");
        Ok(outcome)
    }

    async fn finish_failure(
        &self,
        task: &Task,
        now: DateTime<Utc>,
        error: SchedrError,
    ) -> Result<ExecOutcome> {
        tracing::error!(task_id = %task.id, error = %error, "Task execution failed");

        let failures = self.repo.record_failure(&task.id).await?;

        // Recurring tasks retry at their natural cadence until the cap;
        // then they are parked and need operator attention.
        let rescheduled = task
            .schedule
            .as_ref()
            .filter(|s| s.frequency.is_recurring() && failures < self.config.max_failures)
            .and_then(|s| next_occurrence(s, now));

        match rescheduled {
            Some(next) => {
                self.repo
                    .set_next_execution(&task.id, Some(next))
                    .await?;
                self.repo
                    .update_status(&task.id, TaskStatus::Recurring, None, None)
                    .await?;
            }
            None => {
                self.repo
                    .update_status(&task.id, TaskStatus::Failed, None, None)
                    .await?;
            }
        }

        self.notifier.publish(
            TaskEventKind::TaskFailed,
            notification_content(
                task,
                &format!("Error in task \"{}\": {}", task.description, error),
                NotifyLevel::Error,
            ),
        );

        Ok(ExecOutcome::Failed(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::TemplateGenerator;
    use crate::domain::Schedule;
    use crate::notify::TaskNotification;
    use crate::scheduler::priority::PriorityConfig;
    use crate::scheduler::queue::build_queue;
    use crate::store::MemoryTaskRepository;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, NaiveTime, TimeZone};

    struct FailingGenerator;

    #[async_trait]
    impl ContentGenerator for FailingGenerator {
        async fn generate(&self, _params: &TaskParameters) -> Result<String> {
            Err(SchedrError::Content("generator down".to_string()))
        }
    }

    struct SlowGenerator(Duration);

    #[async_trait]
    impl ContentGenerator for SlowGenerator {
        async fn generate(&self, _params: &TaskParameters) -> Result<String> {
            tokio::time::sleep(self.0).await;
            Ok("slow content".to_string())
        }
    }

    #[derive(Default)]
    struct CollectingNotifier {
        events: Mutex<Vec<TaskNotification>>,
    }

    impl Notifier for CollectingNotifier {
        fn publish(&self, event: TaskEventKind, content: crate::notify::NotificationContent) {
            self.events
                .lock()
                .unwrap()
                .push(TaskNotification { event, content });
        }
    }

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn item(task: &Task, now: DateTime<Utc>) -> QueueItem {
        QueueItem {
            task: task.clone(),
            priority: 0,
            scheduled_at: now,
            window_start: now - ChronoDuration::seconds(30),
            window_end: now + ChronoDuration::seconds(30),
        }
    }

    struct Harness {
        repo: Arc<MemoryTaskRepository>,
        notifier: Arc<CollectingNotifier>,
        executor: Executor,
    }

    fn harness(generator: Arc<dyn ContentGenerator>, config: ExecutorConfig) -> Harness {
        let repo = Arc::new(MemoryTaskRepository::new());
        let notifier = Arc::new(CollectingNotifier::default());
        let executor = Executor::with_config(
            repo.clone(),
            generator,
            notifier.clone(),
            config,
        );
        Harness {
            repo,
            notifier,
            executor,
        }
    }

    fn template_harness() -> Harness {
        harness(Arc::new(TemplateGenerator::new()), ExecutorConfig::default())
    }

    #[test]
    fn test_inflight_set_acquire_release() {
        let set = InflightSet::new();
        assert!(set.is_empty());

        let guard = set.try_acquire("a").unwrap();
        assert!(set.contains("a"));
        assert_eq!(set.len(), 1);

        // Second acquisition of the same id fails while held
        assert!(set.try_acquire("a").is_none());

        drop(guard);
        assert!(!set.contains("a"));
        assert!(set.try_acquire("a").is_some());
    }

    #[tokio::test]
    async fn test_once_task_completes_terminally() {
        let h = template_harness();
        let now = dt(2025, 3, 10, 14, 0, 0);
        let task = Task::new_summary(
            "Daily digest",
            "news",
            Some(Schedule::once(
                chrono::NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
                t(14, 0),
            )),
        );
        h.repo.create(&task).await.unwrap();

        let outcome = h.executor.execute(&item(&task, now), now).await.unwrap();
        assert_eq!(outcome, ExecOutcome::Completed);

        let stored = h.repo.get(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);
        assert!(stored.next_execution_at.is_none());
        assert_eq!(stored.last_execution_at, Some(now));
        assert!(stored.preview_result.is_some());
    }

    #[tokio::test]
    async fn test_recurring_task_reschedules() {
        let h = template_harness();
        let now = dt(2025, 3, 10, 8, 0, 0);
        let task = Task::new_summary("Morning digest", "news", Some(Schedule::daily(t(8, 0))));
        h.repo.create(&task).await.unwrap();

        let outcome = h.executor.execute(&item(&task, now), now).await.unwrap();
        let next = dt(2025, 3, 11, 8, 0, 0);
        assert_eq!(outcome, ExecOutcome::Rescheduled(next));

        let stored = h.repo.get(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Recurring);
        assert_eq!(stored.next_execution_at, Some(next));
    }

    #[tokio::test]
    async fn test_reminder_skips_content_generation() {
        // A failing generator does not matter for templated kinds
        let h = harness(Arc::new(FailingGenerator), ExecutorConfig::default());
        let now = dt(2025, 3, 10, 9, 0, 0);
        let task = Task::new_reminder("Standup", "standup", Some(Schedule::daily(t(9, 0))));
        h.repo.create(&task).await.unwrap();

        let outcome = h.executor.execute(&item(&task, now), now).await.unwrap();
        assert!(matches!(outcome, ExecOutcome::Rescheduled(_)));

        let stored = h.repo.get(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.preview_result.as_deref(), Some("Time for: Standup"));
    }

    #[tokio::test]
    async fn test_failed_recurring_task_retries_at_cadence() {
        let h = harness(Arc::new(FailingGenerator), ExecutorConfig::default());
        let now = dt(2025, 3, 10, 8, 0, 0);
        let task = Task::new_summary("Digest", "news", Some(Schedule::daily(t(8, 0))));
        h.repo.create(&task).await.unwrap();

        let outcome = h.executor.execute(&item(&task, now), now).await.unwrap();
        assert!(matches!(outcome, ExecOutcome::Failed(_)));

        let stored = h.repo.get(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.failure_count, 1);
        // Back in rotation at its natural cadence
        assert_eq!(stored.status, TaskStatus::Recurring);
        assert_eq!(stored.next_execution_at, Some(dt(2025, 3, 11, 8, 0, 0)));
    }

    #[tokio::test]
    async fn test_failure_cap_parks_task() {
        let h = harness(
            Arc::new(FailingGenerator),
            ExecutorConfig::default().with_max_failures(3),
        );
        let now = dt(2025, 3, 10, 8, 0, 0);
        let mut task = Task::new_summary("Digest", "news", Some(Schedule::daily(t(8, 0))));
        task.failure_count = 2;
        h.repo.create(&task).await.unwrap();

        h.executor.execute(&item(&task, now), now).await.unwrap();

        let stored = h.repo.get(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.failure_count, 3);
        assert_eq!(stored.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let h = template_harness();
        let now = dt(2025, 3, 10, 8, 0, 0);
        let mut task = Task::new_summary("Digest", "news", Some(Schedule::daily(t(8, 0))));
        task.failure_count = 2;
        h.repo.create(&task).await.unwrap();

        h.executor.execute(&item(&task, now), now).await.unwrap();

        let stored = h.repo.get(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.failure_count, 0);
        assert_eq!(stored.status, TaskStatus::Recurring);
    }

    #[tokio::test]
    async fn test_once_failure_is_terminal() {
        let h = harness(Arc::new(FailingGenerator), ExecutorConfig::default());
        let now = dt(2025, 3, 10, 14, 0, 0);
        let task = Task::new_summary(
            "One shot",
            "news",
            Some(Schedule::once(
                chrono::NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
                t(14, 0),
            )),
        );
        h.repo.create(&task).await.unwrap();

        h.executor.execute(&item(&task, now), now).await.unwrap();

        let stored = h.repo.get(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);
        assert!(stored.next_execution_at.is_none());
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let h = harness(
            Arc::new(SlowGenerator(Duration::from_millis(300))),
            ExecutorConfig::default().with_task_timeout(Duration::from_millis(50)),
        );
        let now = dt(2025, 3, 10, 8, 0, 0);
        let task = Task::new_summary("Digest", "news", Some(Schedule::daily(t(8, 0))));
        h.repo.create(&task).await.unwrap();

        let outcome = h.executor.execute(&item(&task, now), now).await.unwrap();
        match outcome {
            ExecOutcome::Failed(msg) => assert!(msg.contains("timed out")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(
            h.repo.get(&task.id).await.unwrap().unwrap().failure_count,
            1
        );
    }

    #[tokio::test]
    async fn test_single_flight_skips_held_id() {
        let h = template_harness();
        let now = dt(2025, 3, 10, 8, 0, 0);
        let task = Task::new_summary("Digest", "news", Some(Schedule::daily(t(8, 0))));
        h.repo.create(&task).await.unwrap();

        let _held = h.executor.inflight().try_acquire(&task.id).unwrap();
        let outcome = h.executor.execute(&item(&task, now), now).await.unwrap();
        assert_eq!(outcome, ExecOutcome::Skipped);

        // Nothing was persisted for the skipped attempt
        let stored = h.repo.get(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_single_flight_under_concurrent_dispatch() {
        let h = Arc::new(harness(
            Arc::new(SlowGenerator(Duration::from_millis(100))),
            ExecutorConfig::default(),
        ));
        let now = dt(2025, 3, 10, 8, 0, 0);
        let task = Task::new_summary("Digest", "news", Some(Schedule::daily(t(8, 0))));
        h.repo.create(&task).await.unwrap();

        // Two overlapping ticks dispatch the same id
        let h1 = h.clone();
        let h2 = h.clone();
        let item1 = item(&task, now);
        let item2 = item(&task, now);
        let (a, b) = tokio::join!(
            async move { h1.executor.execute(&item1, now).await.unwrap() },
            async move { h2.executor.execute(&item2, now).await.unwrap() },
        );

        let executed = [&a, &b]
            .iter()
            .filter(|o| matches!(o, ExecOutcome::Rescheduled(_)))
            .count();
        let skipped = [&a, &b]
            .iter()
            .filter(|o| matches!(o, ExecOutcome::Skipped))
            .count();
        assert_eq!(executed, 1);
        assert_eq!(skipped, 1);
    }

    #[tokio::test]
    async fn test_externally_deactivated_task_skipped_on_fresh_read() {
        let h = template_harness();
        let now = dt(2025, 3, 10, 8, 0, 0);
        let task = Task::new_summary("Digest", "news", Some(Schedule::daily(t(8, 0))));
        h.repo.create(&task).await.unwrap();

        let queue_item = item(&task, now);
        h.repo.set_active(&task.id, false).await.unwrap();

        let outcome = h.executor.execute(&queue_item, now).await.unwrap();
        assert_eq!(outcome, ExecOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_bounded_concurrency_across_ticks() {
        let h = harness(
            Arc::new(TemplateGenerator::new()),
            ExecutorConfig::default().with_max_concurrent(2),
        );
        let now = dt(2025, 3, 10, 8, 0, 0);
        for i in 0..5 {
            let task = Task::new_summary(
                &format!("Digest {}", i),
                "news",
                Some(Schedule::daily(t(8, 0))),
            );
            h.repo.create(&task).await.unwrap();
        }

        let priorities = PriorityConfig::default();

        // First tick runs exactly two tasks
        let snapshot = h.repo.find_pending_active().await.unwrap();
        let queue = build_queue(snapshot, now, &priorities);
        assert_eq!(queue.len(), 5);
        assert_eq!(h.executor.run_queue(queue, now).await, 2);

        // Second tick: the two executed tasks ran today, so only the
        // remaining three are still due
        let later = now + ChronoDuration::seconds(10);
        let snapshot = h.repo.find_pending_active().await.unwrap();
        let queue = build_queue(snapshot, later, &priorities);
        assert_eq!(queue.len(), 3);
        assert_eq!(h.executor.run_queue(queue, later).await, 2);

        // Third tick drains the last one
        let last = now + ChronoDuration::seconds(20);
        let snapshot = h.repo.find_pending_active().await.unwrap();
        let queue = build_queue(snapshot, last, &priorities);
        assert_eq!(queue.len(), 1);
        assert_eq!(h.executor.run_queue(queue, last).await, 1);
    }

    #[tokio::test]
    async fn test_notifications_emitted_in_order() {
        let h = template_harness();
        let now = dt(2025, 3, 10, 8, 0, 0);
        let task = Task::new_summary("Digest", "news", Some(Schedule::daily(t(8, 0))));
        h.repo.create(&task).await.unwrap();

        h.executor.execute(&item(&task, now), now).await.unwrap();

        let events = h.notifier.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, TaskEventKind::TaskStarted);
        assert_eq!(events[1].event, TaskEventKind::TaskCompleted);
        assert!(events[1].content.message.contains("completed successfully"));
    }

    #[tokio::test]
    async fn test_failure_notification_carries_cause() {
        let h = harness(Arc::new(FailingGenerator), ExecutorConfig::default());
        let now = dt(2025, 3, 10, 8, 0, 0);
        let task = Task::new_summary("Digest", "news", Some(Schedule::daily(t(8, 0))));
        h.repo.create(&task).await.unwrap();

        h.executor.execute(&item(&task, now), now).await.unwrap();

        let events = h.notifier.events.lock().unwrap();
        assert_eq!(events[1].event, TaskEventKind::TaskFailed);
        assert!(events[1].content.message.contains("generator down"));
    }
}
