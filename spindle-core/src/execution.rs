//! Task result model

use crate::error::TaskFailure;
use crate::task::TaskId;

/// Outcome of one accepted task
///
/// Exactly one result is produced per accepted task. The output is present
/// iff the task succeeded; the failure is present iff it did not.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult<O> {
    pub task_id: TaskId,
    pub outcome: Result<O, TaskFailure>,
}

impl<O> TaskResult<O> {
    pub fn success(task_id: TaskId, output: O) -> Self {
        Self {
            task_id,
            outcome: Ok(output),
        }
    }

    pub fn failure(task_id: TaskId, failure: TaskFailure) -> Self {
        Self {
            task_id,
            outcome: Err(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn output(&self) -> Option<&O> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&TaskFailure> {
        self.outcome.as_ref().err()
    }

    pub fn into_output(self) -> Option<O> {
        self.outcome.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_and_error_are_exclusive() {
        let ok = TaskResult::success(TaskId(1), "done");
        assert!(ok.is_success());
        assert_eq!(ok.output(), Some(&"done"));
        assert!(ok.error().is_none());

        let failed: TaskResult<&str> = TaskResult::failure(TaskId(2), TaskFailure::Cancelled);
        assert!(!failed.is_success());
        assert!(failed.output().is_none());
        assert_eq!(failed.error(), Some(&TaskFailure::Cancelled));
        assert_eq!(failed.into_output(), None);
    }
}
