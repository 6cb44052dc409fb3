//! Failure recording specs

use crate::prelude::*;

#[tokio::test]
async fn throwing_script_marks_the_chain_failed() {
    let stack = Stack::new();
    stack.runner.set_outcome(
        id(0x6),
        FakeOutcome::Fail(ScriptError::runtime("generic exception")),
    );
    stack
        .store
        .create_chain(
            TransactionData::new(id(0x6))
                .with_script("throw()")
                .with_expires_at(stack.overdue()),
        )
        .await
        .unwrap();

    let outcomes = stack
        .processor
        .process_due(&CancelToken::new())
        .await
        .unwrap();
    assert_eq!(
        outcomes,
        vec![ProcessOutcome::Failed(TransactionRevision::new(id(0x6), 2))]
    );

    let head = stack.store.fetch_head(id(0x6)).await.unwrap();
    assert_eq!(head.revision, 2);
    assert_eq!(head.status, Status::Failed);
    assert_eq!(head.error.as_ref().unwrap()["kind"], "runtime");
    assert_eq!(head.expires_at, None);
}

#[tokio::test]
async fn concurrent_advance_moves_the_failure_to_a_new_chain() {
    let stack = Stack::new();
    stack.runner.set_outcome(
        id(0x6),
        FakeOutcome::AdvanceThenFail(ScriptError::runtime("generic exception")),
    );
    stack
        .store
        .create_chain(
            TransactionData::new(id(0x6))
                .with_script("throw()")
                .with_expires_at(stack.overdue()),
        )
        .await
        .unwrap();

    stack
        .processor
        .process_due(&CancelToken::new())
        .await
        .unwrap();

    let records = stack
        .store
        .query()
        .await
        .unwrap()
        .filter(|t| t.parent == Some(TransactionRevision::new(id(0x6), 1)))
        .into_vec();
    assert_eq!(records.len(), 1);
    assert_ne!(records[0].chain_id, id(0x6));
    assert_eq!(records[0].status, Status::Failed);
    assert!(records[0].error.is_some());

    let head = stack.store.fetch_head(id(0x6)).await.unwrap();
    assert_eq!(head.revision, 2);
}

#[tokio::test]
async fn a_failing_chain_does_not_block_others() {
    let stack = Stack::new();
    stack.runner.set_outcome(
        id(1),
        FakeOutcome::Fail(ScriptError::compilation("syntax", vec![])),
    );
    for n in [1, 2] {
        stack
            .store
            .create_chain(
                TransactionData::new(id(n))
                    .with_script("work()")
                    .with_expires_at(stack.overdue()),
            )
            .await
            .unwrap();
    }

    let outcomes = stack
        .processor
        .process_due(&CancelToken::new())
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(
        stack.store.fetch_head(id(1)).await.unwrap().status,
        Status::Failed
    );
    assert_eq!(stack.runner.calls_for(id(2)).len(), 1);
}
