//! Deadline-boxed execution of one stage's unit of work.
//!
//! The executor races the work against an optional deadline clock. On expiry
//! it returns [`StageResult::TimedOut`] and drops the in-flight future —
//! tokio's cooperative model means the work is cancelled at its next await
//! point. True preemption of an unresponsive call requires the underlying
//! transport to support cancellation; dropping the future is the strongest
//! signal available here. The executor never retries; retry policy (if any)
//! belongs to the caller.

use std::future::Future;

use pipeline::{StageError, StageOutput, StageResult};
use tokio::time::{timeout, Duration};
use tracing::debug;

/// Runs one stage's work under an optional deadline.
pub struct StageExecutor;

impl StageExecutor {
    /// Executes `work`, mapping the three possible endings onto the
    /// [`StageResult`] tags: deadline expiry → `TimedOut`, work error →
    /// `Failed`, otherwise `Success`.
    pub async fn run<F>(deadline: Option<Duration>, work: F) -> StageResult
    where
        F: Future<Output = Result<StageOutput, StageError>>,
    {
        let finished = match deadline {
            Some(limit) => match timeout(limit, work).await {
                Ok(finished) => finished,
                Err(_) => {
                    debug!(deadline_secs = limit.as_secs(), "stage deadline expired");
                    return StageResult::TimedOut;
                }
            },
            None => work.await,
        };
        match finished {
            Ok(output) => StageResult::Success { output },
            Err(error) => StageResult::Failed { error },
        }
    }
}
