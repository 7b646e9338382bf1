use tokio::task::JoinHandle;
use std::collections::HashMap;
use crate::error::{Error, Result};
use tracing::{info, error};

/// Task Supervisor - Monitors background tasks and detects failures
///
/// ## Purpose
/// Tracks spawned background tasks by name and provides health monitoring.
/// A task that finishes while it is still registered is reported as failed,
/// since every supervised task is expected to run until stopped.
///
/// ## Usage
/// ```ignore
/// let mut supervisor = TaskSupervisor::new();
///
/// supervisor.spawn("market_data_refresh", async move {
///     // refresh loop
/// });
///
/// if let Err(e) = supervisor.check_health() {
///     error!("Task failure detected: {:?}", e);
/// }
/// ```
pub struct TaskSupervisor {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        TaskSupervisor {
            tasks: HashMap::new(),
        }
    }

    /// Spawn a new background task and register it for monitoring.
    /// A task already registered under `name` is aborted first.
    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F) -> &mut Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        if let Some(previous) = self.tasks.remove(&name) {
            previous.abort();
        }
        let handle = tokio::spawn(future);

        info!("Spawned background task: {}", name);
        self.tasks.insert(name, handle);
        self
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.tasks
            .get(name)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Abort one task. Returns false if no such task was registered.
    pub fn stop(&mut self, name: &str) -> bool {
        match self.tasks.remove(name) {
            Some(handle) => {
                handle.abort();
                info!("Aborted task: {}", name);
                true
            }
            None => false,
        }
    }

    /// Check health of all registered tasks
    /// Returns error if any task has terminated unexpectedly
    pub fn check_health(&mut self) -> Result<()> {
        let failed_tasks: Vec<String> = self
            .tasks
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(name, _)| name.clone())
            .collect();

        if !failed_tasks.is_empty() {
            let error_msg = format!("Tasks terminated unexpectedly: {:?}", failed_tasks);
            error!("{}", error_msg);

            for name in &failed_tasks {
                self.tasks.remove(name);
            }

            return Err(Error::TaskFailed(error_msg));
        }

        Ok(())
    }

    /// Abort every registered task
    pub fn shutdown_all(&mut self) {
        info!("Shutting down {} background tasks", self.tasks.len());

        for (name, handle) in self.tasks.drain() {
            handle.abort();
            info!("Aborted task: {}", name);
        }
    }
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskSupervisor {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_spawn_and_stop() {
        let mut supervisor = TaskSupervisor::new();
        supervisor.spawn("sleeper", async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });

        assert!(supervisor.is_running("sleeper"));
        assert!(supervisor.check_health().is_ok());

        assert!(supervisor.stop("sleeper"));
        assert!(!supervisor.is_running("sleeper"));
        assert!(!supervisor.stop("sleeper"));
    }

    #[tokio::test]
    async fn test_finished_task_is_reported() {
        let mut supervisor = TaskSupervisor::new();
        supervisor.spawn("short", async {});
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = supervisor.check_health().unwrap_err();
        assert!(matches!(err, Error::TaskFailed(_)));
        assert!(supervisor.check_health().is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_all_aborts_everything() {
        let mut supervisor = TaskSupervisor::new();
        for name in ["a", "b"] {
            supervisor.spawn(name, async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            });
        }

        supervisor.shutdown_all();
        assert!(!supervisor.is_running("a"));
        assert!(!supervisor.is_running("b"));
        assert!(!supervisor.stop("a"));
    }
}
