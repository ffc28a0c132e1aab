//! Completion broker: races long-running operations against a wait budget
//! and hands out correlation ids for the ones that outlive it.
//!
//! Every started operation runs to completion on its own task and writes
//! exactly one [`Outcome`] into a single-slot channel. Whoever ends up
//! holding the receiving half, the triggering request or a later poll,
//! reads it exactly once.

use std::{collections::HashMap, future::Future, sync::Mutex, time::Duration};

use relay_core::{CorrelationId, Outcome};
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{BrokerConfig, BrokerError};

/// What a triggering request gets back from [`CompletionBroker::start_and_wait`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartResult {
    /// The operation finished inside the wait budget.
    Completed(Outcome),
    /// The operation is still running; poll with this id.
    Pending(CorrelationId),
}

/// Registry of in-flight operations whose outcome has not been read yet.
///
/// The lock guards map membership only and is never held across an
/// `.await`, so a slow operation cannot stall unrelated requests.
#[derive(Debug, Default)]
pub struct CompletionBroker {
    config: BrokerConfig,
    pending: Mutex<HashMap<CorrelationId, oneshot::Receiver<Outcome>>>,
}

impl CompletionBroker {
    /// Create an empty broker.
    #[must_use]
    pub fn new(config: BrokerConfig) -> Self {
        Self { config, pending: Mutex::new(HashMap::new()) }
    }

    /// The broker's timing configuration.
    #[must_use]
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Start `work` on a detached task and wait up to `timeout` for its outcome.
    ///
    /// The work is never cancelled: if the timeout wins, it keeps running and
    /// its outcome is parked under the returned id for [`Self::retrieve`].
    /// A panic inside `work` is reported as an [`Outcome::Failure`].
    ///
    /// # Errors
    /// Returns [`BrokerError::Core`] if no correlation id could be generated;
    /// nothing is started in that case.
    /// Returns [`BrokerError::Abandoned`] if the result channel closes
    /// without an outcome (only possible during runtime shutdown).
    pub async fn start_and_wait<F>(
        &self,
        work: F,
        timeout: Duration,
    ) -> Result<StartResult, BrokerError>
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let id = CorrelationId::generate()?;
        let rx = supervise(id, tokio::spawn(work));
        self.race(id, rx, timeout).await
    }

    /// Like [`Self::start_and_wait`] for synchronous work, which runs on the
    /// blocking thread pool.
    ///
    /// # Errors
    /// Same as [`Self::start_and_wait`].
    pub async fn start_blocking_and_wait<F>(
        &self,
        work: F,
        timeout: Duration,
    ) -> Result<StartResult, BrokerError>
    where
        F: FnOnce() -> Outcome + Send + 'static,
    {
        let id = CorrelationId::generate()?;
        let rx = supervise(id, tokio::task::spawn_blocking(work));
        self.race(id, rx, timeout).await
    }

    /// Claim the outcome of a pending operation, waiting for it if needed.
    ///
    /// The entry is removed before waiting, so each id can be retrieved once.
    ///
    /// Without a configured [`BrokerConfig::retrieve_limit`] this waits until
    /// the operation finishes, with no upper bound. This is the only
    /// unbounded wait in the broker.
    ///
    /// # Errors
    /// Returns [`BrokerError::UnknownOperation`] immediately if `id` was never
    /// issued or was already retrieved.
    /// Returns [`BrokerError::StillPending`] if the retrieve limit elapsed; the
    /// operation is parked again and can be retrieved with the same id.
    /// Returns [`BrokerError::Abandoned`] if the result channel closed
    /// without an outcome.
    pub async fn retrieve(&self, id: CorrelationId) -> Result<Outcome, BrokerError> {
        let mut rx = self.take(id).ok_or(BrokerError::UnknownOperation(id))?;

        let received = match self.config.retrieve_limit {
            None => rx.await,
            Some(limit) => {
                let waited = tokio::time::timeout(limit, &mut rx).await;
                if let Ok(received) = waited {
                    received
                } else {
                    debug!(%id, limit_ms = limit.as_millis(), "retrieve limit elapsed, re-parking");
                    self.park(id, rx);
                    return Err(BrokerError::StillPending(id));
                }
            }
        };

        let outcome = received.map_err(|_| BrokerError::Abandoned(id))?;
        info!(%id, %outcome, "pending operation retrieved");
        Ok(outcome)
    }

    /// Number of operations parked and waiting to be retrieved.
    ///
    /// # Panics
    /// Panics if the internal `Mutex` is poisoned.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let pending = self.pending.lock().expect("pending registry lock poisoned");
        pending.len()
    }

    async fn race(
        &self,
        id: CorrelationId,
        mut rx: oneshot::Receiver<Outcome>,
        timeout: Duration,
    ) -> Result<StartResult, BrokerError> {
        let raced = tokio::time::timeout(timeout, &mut rx).await;
        match raced {
            Ok(Ok(outcome)) => {
                debug!(%id, %outcome, "operation finished inside wait budget");
                Ok(StartResult::Completed(outcome))
            }
            Ok(Err(_)) => Err(BrokerError::Abandoned(id)),
            Err(_) => {
                self.park(id, rx);
                info!(%id, timeout_ms = timeout.as_millis(), "operation outlived wait budget");
                Ok(StartResult::Pending(id))
            }
        }
    }

    fn park(&self, id: CorrelationId, rx: oneshot::Receiver<Outcome>) {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let previous = self
            .pending
            .lock()
            .expect("pending registry lock poisoned")
            .insert(id, rx);
        if previous.is_some() {
            warn!(%id, "correlation id collision, earlier pending operation dropped");
        }
    }

    fn take(&self, id: CorrelationId) -> Option<oneshot::Receiver<Outcome>> {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let mut pending = self.pending.lock().expect("pending registry lock poisoned");
        pending.remove(&id)
    }
}

/// Forward the task's result into a single-slot channel, converting a panic
/// or abort into a failure so that an outcome is always written.
fn supervise(id: CorrelationId, task: JoinHandle<Outcome>) -> oneshot::Receiver<Outcome> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(%id, error = %e, "operation task did not finish cleanly");
                Outcome::failure(format!("operation aborted: {e}"))
            }
        };
        if tx.send(outcome).is_err() {
            debug!(%id, "nobody is waiting for this outcome, discarding it");
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    const BUDGET: Duration = Duration::from_millis(100);

    fn broker() -> CompletionBroker {
        CompletionBroker::new(BrokerConfig::new())
    }

    async fn crash() -> Outcome {
        panic!("tunnel manager crashed")
    }

    async fn sleepy(delay: Duration, outcome: Outcome) -> Outcome {
        tokio::time::sleep(delay).await;
        outcome
    }

    #[tokio::test(start_paused = true)]
    async fn fast_work_completes_without_registering() {
        let broker = broker();
        let result = broker
            .start_and_wait(sleepy(Duration::from_millis(10), Outcome::success("/target")), BUDGET)
            .await;
        assert!(
            matches!(result, Ok(StartResult::Completed(Outcome::Success(ref t))) if t == "/target"),
            "expected Completed(Success), got {result:?}"
        );
        assert_eq!(broker.pending_count(), 0, "immediate path must not leave an entry behind");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_work_goes_pending_and_is_parked() {
        let broker = broker();
        let result = broker
            .start_and_wait(sleepy(Duration::from_millis(500), Outcome::success("/target")), BUDGET)
            .await;
        assert!(matches!(result, Ok(StartResult::Pending(_))), "got {result:?}");
        assert_eq!(broker.pending_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retrieve_removes_entry_before_waiting() {
        let broker = broker();
        let id = match broker
            .start_and_wait(sleepy(Duration::from_millis(500), Outcome::success("/")), BUDGET)
            .await
        {
            Ok(StartResult::Pending(id)) => id,
            other => panic!("expected Pending, got {other:?}"),
        };

        let retrieval = broker.retrieve(id);
        tokio::pin!(retrieval);
        // Poll once so the entry is taken, then check the registry.
        assert!(
            poll_once(retrieval.as_mut()).await.is_none(),
            "retrieve must still be waiting"
        );
        assert_eq!(broker.pending_count(), 0, "entry must be removed while the wait is in progress");

        let outcome = retrieval.await;
        assert!(matches!(outcome, Ok(Outcome::Success(_))), "got {outcome:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_work_is_reported_as_failure() {
        let broker = broker();
        let result = broker.start_and_wait(crash(), BUDGET).await;
        match result {
            Ok(StartResult::Completed(Outcome::Failure(reason))) => {
                assert!(reason.starts_with("operation aborted"), "got {reason}");
            }
            other => panic!("expected Completed(Failure), got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blocking_work_runs_on_blocking_pool() {
        let broker = broker();
        let result = broker
            .start_blocking_and_wait(|| Outcome::success("/#/tunnels"), Duration::from_secs(5))
            .await;
        assert!(
            matches!(result, Ok(StartResult::Completed(Outcome::Success(_)))),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn blocking_work_can_go_pending() {
        let broker = broker();
        let (release, gate) = mpsc::channel::<()>();
        let result = broker
            .start_blocking_and_wait(
                move || match gate.recv() {
                    Ok(()) => Outcome::success("/done"),
                    Err(_) => Outcome::failure("gate dropped"),
                },
                Duration::from_millis(20),
            )
            .await;
        let id = match result {
            Ok(StartResult::Pending(id)) => id,
            other => panic!("expected Pending, got {other:?}"),
        };

        if release.send(()).is_err() {
            panic!("blocking work exited early");
        }
        let outcome = broker.retrieve(id).await;
        assert!(matches!(outcome, Ok(Outcome::Success(ref t)) if t == "/done"), "got {outcome:?}");
    }

    /// Polls a future exactly once, returning its output if it was ready.
    async fn poll_once<F: Future + Unpin>(mut fut: F) -> Option<F::Output> {
        std::future::poll_fn(|cx| {
            std::task::Poll::Ready(match std::pin::Pin::new(&mut fut).poll(cx) {
                std::task::Poll::Ready(v) => Some(v),
                std::task::Poll::Pending => None,
            })
        })
        .await
    }
}
