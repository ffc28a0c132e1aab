//! Integration test: exactly-once delivery through the completion broker.
//!
//! Runs on a paused clock so the wait budget and the work delays are exact.

use std::{collections::HashSet, sync::Arc, time::Duration};

use relay_broker::{BrokerConfig, BrokerError, CompletionBroker, StartResult};
use relay_core::{CorrelationId, Outcome};
use tokio::time::Instant;

const BUDGET: Duration = Duration::from_millis(100);

async fn provision(delay: Duration, outcome: Outcome) -> Outcome {
    tokio::time::sleep(delay).await;
    outcome
}

async fn start_pending(broker: &CompletionBroker, delay: Duration, outcome: Outcome) -> CorrelationId {
    match broker.start_and_wait(provision(delay, outcome), BUDGET).await {
        Ok(StartResult::Pending(id)) => id,
        other => panic!("expected Pending, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn fast_success_is_returned_immediately() {
    let broker = CompletionBroker::default();
    let result = broker
        .start_and_wait(provision(Duration::from_millis(10), Outcome::success("/target")), BUDGET)
        .await;
    assert!(
        matches!(result, Ok(StartResult::Completed(ref o)) if *o == Outcome::success("/target")),
        "got {result:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn fast_failure_is_returned_immediately() {
    let broker = CompletionBroker::default();
    let result = broker
        .start_and_wait(
            provision(Duration::from_millis(10), Outcome::failure("quota exceeded")),
            BUDGET,
        )
        .await;
    assert!(
        matches!(result, Ok(StartResult::Completed(ref o)) if *o == Outcome::failure("quota exceeded")),
        "got {result:?}"
    );
    assert_eq!(broker.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_work_is_delivered_to_the_poll() {
    let broker = CompletionBroker::default();
    let started = Instant::now();
    let id = start_pending(&broker, Duration::from_millis(500), Outcome::success("/target")).await;
    assert!(started.elapsed() >= BUDGET, "pending must only be reported after the budget");
    assert!(started.elapsed() < Duration::from_millis(500));

    let outcome = broker.retrieve(id).await;
    assert!(
        matches!(outcome, Ok(ref o) if *o == Outcome::success("/target")),
        "got {outcome:?}"
    );
    assert!(
        started.elapsed() >= Duration::from_millis(500),
        "retrieve must wait for the work to finish"
    );
}

#[tokio::test(start_paused = true)]
async fn retrieve_after_completion_returns_stored_outcome() {
    let broker = CompletionBroker::default();
    let id = start_pending(&broker, Duration::from_millis(200), Outcome::failure("dns busy")).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    let outcome = broker.retrieve(id).await;
    assert!(
        matches!(outcome, Ok(ref o) if *o == Outcome::failure("dns busy")),
        "got {outcome:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn second_retrieve_fails_fast() {
    let broker = CompletionBroker::default();
    let id = start_pending(&broker, Duration::from_millis(500), Outcome::success("/target")).await;

    assert!(broker.retrieve(id).await.is_ok());
    let second = tokio::time::timeout(Duration::from_secs(60), broker.retrieve(id)).await;
    match second {
        Ok(Err(BrokerError::UnknownOperation(unknown))) => assert_eq!(unknown, id),
        Ok(other) => panic!("expected UnknownOperation, got {other:?}"),
        Err(_) => panic!("second retrieve must not hang"),
    }
}

#[tokio::test]
async fn never_issued_id_fails_fast() {
    let broker = CompletionBroker::default();
    let stranger = match CorrelationId::generate() {
        Ok(id) => id,
        Err(e) => panic!("entropy source failed: {e}"),
    };
    let result = broker.retrieve(stranger).await;
    assert!(
        matches!(result, Err(BrokerError::UnknownOperation(id)) if id == stranger),
        "got {result:?}"
    );
    let message = match result {
        Err(e) => e.to_string(),
        Ok(o) => panic!("unexpected outcome {o:?}"),
    };
    assert!(message.starts_with("no such pending operation"), "got {message}");
}

#[tokio::test(start_paused = true)]
async fn retrieve_limit_reparks_until_done() {
    let config = BrokerConfig::new().with_retrieve_limit(Duration::from_millis(150));
    let broker = CompletionBroker::new(config);
    let id = start_pending(&broker, Duration::from_millis(500), Outcome::success("/target")).await;

    let mut still_pending = 0;
    let outcome = loop {
        match broker.retrieve(id).await {
            Ok(outcome) => break outcome,
            Err(BrokerError::StillPending(again)) => {
                assert_eq!(again, id, "re-parked under the same id");
                assert_eq!(broker.pending_count(), 1, "entry must be back in the registry");
                still_pending += 1;
                assert!(still_pending < 10, "work should have finished by now");
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    };
    assert_eq!(outcome, Outcome::success("/target"));
    assert_eq!(still_pending, 2, "100ms + 2 * 150ms limits elapse before the 500ms work ends");
    assert_eq!(broker.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_operations_keep_their_own_outcomes() {
    let broker = Arc::new(CompletionBroker::default());

    let mut starts = Vec::new();
    for n in 0..50u64 {
        let broker = Arc::clone(&broker);
        starts.push(tokio::spawn(async move {
            let delay = Duration::from_millis(200 + n * 10);
            let target = format!("/tunnels/{n}");
            let id = start_pending(&broker, delay, Outcome::success(target.clone())).await;
            (id, target)
        }));
    }

    let mut issued = Vec::new();
    for start in starts {
        match start.await {
            Ok(pair) => issued.push(pair),
            Err(e) => panic!("start task failed: {e}"),
        }
    }
    let distinct: HashSet<CorrelationId> = issued.iter().map(|(id, _)| *id).collect();
    assert_eq!(distinct.len(), 50, "every start must get its own id");
    assert_eq!(broker.pending_count(), 50);

    // Retrieve in reverse order of completion to show ids are not positional.
    for (id, target) in issued.into_iter().rev() {
        let outcome = broker.retrieve(id).await;
        assert!(
            matches!(outcome, Ok(Outcome::Success(ref t)) if *t == target),
            "id {id} got {outcome:?}, expected {target}"
        );
    }
    assert_eq!(broker.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn abandoned_poll_leaves_work_running() {
    let broker = CompletionBroker::default();
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    let work = async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let _ = done_tx.send(());
        Outcome::success("/target")
    };
    let id = match broker.start_and_wait(work, BUDGET).await {
        Ok(StartResult::Pending(id)) => id,
        other => panic!("expected Pending, got {other:?}"),
    };

    // A client that gives up on its poll drops the retrieve future.
    let gave_up = tokio::time::timeout(Duration::from_millis(50), broker.retrieve(id)).await;
    assert!(gave_up.is_err(), "poll should still have been waiting");

    assert!(done_rx.await.is_ok(), "the work must run to completion regardless");
}
