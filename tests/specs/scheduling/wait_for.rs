//! Predicate wait specs

use crate::prelude::*;

#[tokio::test]
async fn wait_for_resolves_first_matching_future_commit() {
    let stack = Stack::new();
    let first = stack
        .store
        .create_chain(TransactionData::new(id(0x6)).with_status(Status::Authorized))
        .await
        .unwrap();

    let waiter = {
        let store = stack.store.clone();
        tokio::spawn(async move {
            store
                .wait_for(
                    |t: &TransactionData| t.status == Status::Authorized,
                    Duration::from_secs(5),
                    &CancelToken::new(),
                )
                .await
        })
    };
    while stack.backend.bus().subscriber_count() == 0 {
        tokio::task::yield_now().await;
    }

    // The authorized revision that predates the wait is never returned
    let second = first
        .commit_delta(|next| next.payload = json!("later"))
        .await
        .unwrap();

    let seen = waiter.await.unwrap().unwrap().unwrap();
    assert_eq!(seen, second);
}

#[tokio::test]
async fn wait_for_times_out_and_unsubscribes() {
    let stack = Stack::new();
    let seen = stack
        .store
        .wait_for(
            |_: &TransactionData| true,
            Duration::from_millis(20),
            &CancelToken::new(),
        )
        .await
        .unwrap();
    assert!(seen.is_none());
    assert_eq!(stack.backend.bus().subscriber_count(), 0);
}

#[tokio::test]
async fn wait_for_yields_none_on_cancel() {
    let stack = Stack::new();
    let cancel = CancelToken::new();
    cancel.cancel();
    let seen = stack
        .store
        .wait_for(|_: &TransactionData| true, Duration::from_secs(5), &cancel)
        .await
        .unwrap();
    assert!(seen.is_none());
}
