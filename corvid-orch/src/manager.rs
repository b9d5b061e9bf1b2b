//! The task manager: creates, runs, tracks, and cancels tasks driven by
//! one [`corvid_loop::Agent`] (§4.7).
//!
//! Submission is non-blocking: once `max_parallel` tasks are already
//! running, a further `run_task_async` call fails immediately rather
//! than queuing behind the running ones (§5).

use std::collections::HashMap;
use std::sync::Arc;

use corvid_loop::Agent;
use corvid_types::{AgentConfig, CoreError, Provider, Task, TaskId, TaskStatus};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, Semaphore};

/// Default bound on tasks running concurrently under one manager.
pub const DEFAULT_MAX_PARALLEL: usize = 3;

/// Errors raised by the task manager itself, distinct from a task's own
/// terminal failure (which is recorded on the `Task`, not raised here).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ManagerError {
    /// No task registered under this id.
    #[error("no such task: {0}")]
    NotFound(TaskId),

    /// `max_parallel` running tasks are already in flight.
    #[error("at capacity: {0} tasks already running")]
    AtCapacity(usize),
}

impl ManagerError {
    /// Stable kind string, consistent with the rest of the error
    /// taxonomy even though this variant set is manager-local.
    pub fn kind(&self) -> &'static str {
        match self {
            ManagerError::NotFound(_) => "task-not-found",
            ManagerError::AtCapacity(_) => "task-manager-at-capacity",
        }
    }
}

/// Owns the agent and tool registry a batch of tasks runs against, and
/// tracks every task it has created through to a terminal state.
pub struct TaskManager<P: Provider> {
    agent: Arc<Agent<P>>,
    tasks: RwLock<HashMap<TaskId, Arc<Mutex<Task>>>>,
    capacity: Arc<Semaphore>,
    max_parallel: usize,
}

impl<P: Provider + 'static> TaskManager<P> {
    /// Build a manager around one agent, with the default concurrency
    /// bound.
    pub fn new(agent: Agent<P>) -> Self {
        Self::with_max_parallel(agent, DEFAULT_MAX_PARALLEL)
    }

    /// Build a manager with an explicit concurrency bound.
    pub fn with_max_parallel(agent: Agent<P>, max_parallel: usize) -> Self {
        Self {
            agent: Arc::new(agent),
            tasks: RwLock::new(HashMap::new()),
            capacity: Arc::new(Semaphore::new(max_parallel)),
            max_parallel,
        }
    }

    /// The configured concurrency bound.
    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Create a pending task for `prompt` and return its id without
    /// starting it.
    pub async fn create_task(&self, prompt: impl Into<String>, config: AgentConfig) -> TaskId {
        let task = Task::new(TaskId::generate(), prompt, config);
        let id = task.id.clone();
        self.tasks.write().await.insert(id.clone(), Arc::new(Mutex::new(task)));
        id
    }

    /// Run a task to completion and return a snapshot of its final
    /// state. Blocks the caller until the task reaches a terminal
    /// status.
    pub async fn run_task(&self, id: &TaskId) -> Result<Task, ManagerError> {
        let handle = self.task_handle(id).await?;
        self.drive(handle.clone()).await;
        Ok(handle.lock().await.clone())
    }

    /// Start a task running in the background. Fails immediately if
    /// `max_parallel` tasks are already running rather than queuing.
    pub async fn run_task_async(&self, id: &TaskId) -> Result<(), ManagerError> {
        let handle = self.task_handle(id).await?;
        let permit = self
            .capacity
            .clone()
            .try_acquire_owned()
            .map_err(|_| ManagerError::AtCapacity(self.max_parallel))?;

        let agent = Arc::clone(&self.agent);
        tokio::spawn(async move {
            let _permit = permit;
            let mut task = handle.lock().await;
            corvid_loop::run(&agent, &mut task).await;
        });
        Ok(())
    }

    /// Request cancellation of a running task. A no-op if the task has
    /// already reached a terminal status.
    pub async fn cancel(&self, id: &TaskId) -> Result<(), ManagerError> {
        let handle = self.task_handle(id).await?;
        let task = handle.lock().await;
        task.cancel_token.cancel();
        Ok(())
    }

    /// Remove a task's record. Cancels it first if still running.
    pub async fn delete(&self, id: &TaskId) -> Result<(), ManagerError> {
        self.cancel(id).await.ok();
        self.tasks
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ManagerError::NotFound(id.clone()))
    }

    /// Return a snapshot of a task's current state.
    pub async fn status(&self, id: &TaskId) -> Result<Task, ManagerError> {
        let handle = self.task_handle(id).await?;
        Ok(handle.lock().await.clone())
    }

    async fn task_handle(&self, id: &TaskId) -> Result<Arc<Mutex<Task>>, ManagerError> {
        self.tasks
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ManagerError::NotFound(id.clone()))
    }

    async fn drive(&self, handle: Arc<Mutex<Task>>) {
        let _permit = self.capacity.acquire().await.expect("semaphore never closed");
        let mut task = handle.lock().await;
        corvid_loop::run(&self.agent, &mut task).await;
    }
}

/// Classify a task's terminal status as a [`CoreError`] kind, for
/// callers that want to log a failed or cancelled task against the
/// shared error taxonomy.
pub fn terminal_kind(task: &Task) -> Option<&'static str> {
    match task.status {
        TaskStatus::Failed => Some("task-failed"),
        TaskStatus::Cancelled => Some(CoreError::ContextCancelled(String::new()).kind()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corvid_tool::ToolRegistry;
    use corvid_types::{GenerateOptions, Message, ProviderError};

    struct ImmediateProvider;

    impl Provider for ImmediateProvider {
        async fn generate(
            &self,
            _messages: &[Message],
            _options: GenerateOptions,
        ) -> Result<String, ProviderError> {
            Ok("Final Answer: done".to_string())
        }
    }

    async fn manager() -> TaskManager<ImmediateProvider> {
        let registry = Arc::new(ToolRegistry::new());
        TaskManager::new(Agent::new(ImmediateProvider, registry))
    }

    #[tokio::test]
    async fn run_task_completes_and_is_retrievable() {
        let manager = manager().await;
        let id = manager.create_task("hello", AgentConfig::default()).await;
        let task = manager.run_task(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.result.as_deref(), Some("done"));

        let fetched = manager.status(&id).await.unwrap();
        assert_eq!(fetched.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn unknown_task_id_is_not_found() {
        let manager = manager().await;
        let err = manager.status(&TaskId::new("missing")).await.unwrap_err();
        assert_eq!(err.kind(), "task-not-found");
    }

    #[tokio::test]
    async fn delete_removes_the_task() {
        let manager = manager().await;
        let id = manager.create_task("hello", AgentConfig::default()).await;
        manager.delete(&id).await.unwrap();
        assert!(manager.status(&id).await.is_err());
    }

    #[tokio::test]
    async fn run_task_async_respects_max_parallel() {
        let manager = Arc::new(TaskManager::with_max_parallel(
            Agent::new(ImmediateProvider, Arc::new(ToolRegistry::new())),
            1,
        ));
        let a = manager.create_task("first", AgentConfig::default()).await;
        let b = manager.create_task("second", AgentConfig::default()).await;

        let held = manager.capacity.clone().try_acquire_owned().unwrap();
        let err = manager.run_task_async(&b).await.unwrap_err();
        assert_eq!(err.kind(), "task-manager-at-capacity");
        drop(held);

        manager.run_task_async(&a).await.unwrap();
    }
}
