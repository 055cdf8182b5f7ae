//! Fan-out / fan-in over a batch of inputs

use std::sync::Arc;
use tracing::{debug, trace};

use spindle_core::{SharedHandler, Task, TaskHandler, TaskId, TaskResult};

use crate::sink::{ResultSink, ResultStream};
use crate::worker::execute_task;

/// Run `stage` over `inputs` on `branches` parallel branches
///
/// Inputs are dealt round-robin; each branch processes its share in order
/// under the same panic guard as pool workers. Every input yields one
/// [`TaskResult`] whose id is the input's position. The returned stream ends
/// once every branch has finished. Must be called from within a Tokio runtime.
pub fn fan_out<I, O, H>(
    inputs: impl IntoIterator<Item = I>,
    branches: usize,
    stage: H,
) -> ResultStream<TaskResult<O>>
where
    I: Send + 'static,
    O: Send + 'static,
    H: TaskHandler<I, O> + 'static,
{
    let stage: SharedHandler<I, O> = Arc::new(stage);
    let branches = branches.max(1);

    let mut lanes: Vec<Vec<(TaskId, I)>> = (0..branches).map(|_| Vec::new()).collect();
    for (index, input) in inputs.into_iter().enumerate() {
        lanes[index % branches].push((TaskId(index as u64), input));
    }

    let (sink, stream) = ResultSink::new();
    let mut spawned = 0;

    for (branch, lane) in lanes.into_iter().enumerate() {
        if lane.is_empty() {
            continue;
        }
        // The sink is not sealed yet, so registration cannot fail
        let Ok(producer) = sink.register() else {
            break;
        };

        let stage = stage.clone();
        tokio::spawn(async move {
            for (task_id, input) in lane {
                let result = execute_task(Task::new(task_id, input, stage.clone())).await;
                if producer.send(result).is_err() {
                    trace!(branch, "Result stream dropped; abandoning branch");
                    break;
                }
            }
            producer.complete();
        });
        spawned += 1;
    }

    sink.seal();
    debug!(branches = spawned, "Fan-out started");
    stream
}
