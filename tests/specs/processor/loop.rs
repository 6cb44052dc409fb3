//! Processor loop specs

use crate::prelude::*;

async fn settle(stack: &Stack, done: impl Fn(&Transaction) -> bool, n: u128) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if done(&stack.store.fetch_head(id(n)).await.unwrap()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("chain {n} never settled"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn running_workers_pick_up_new_deadlines() {
    let stack = Stack::new();
    stack.runner.set_outcome(id(1), FakeOutcome::Complete);
    let cancel = CancelToken::new();
    let mut workers = stack.processor.spawn(2, &cancel);

    stack
        .store
        .create_chain(
            TransactionData::new(id(1))
                .with_script("finish()")
                .with_expires_at(stack.overdue()),
        )
        .await
        .unwrap();
    stack
        .store
        .create_chain(TransactionData::new(id(2)).with_expires_at(stack.overdue()))
        .await
        .unwrap();

    settle(&stack, |t| t.status == Status::Completed, 1).await;
    settle(&stack, |t| t.expired_at.is_some(), 2).await;

    cancel.cancel();
    while let Some(joined) = workers.join_next().await {
        joined.unwrap().unwrap();
    }
    assert_eq!(stack.runner.calls_for(id(1)).len(), 1);
    assert!(stack.runner.calls_for(id(2)).is_empty());
}

#[tokio::test]
async fn configured_workers_stop_on_cancel() {
    let stack = Stack::new();
    let cancel = CancelToken::new();
    let run = {
        let processor = Arc::clone(&stack.processor);
        let cancel = cancel.clone();
        tokio::spawn(async move { processor.run_workers(&cancel).await })
    };

    tokio::task::yield_now().await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
