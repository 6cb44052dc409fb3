//! Application lock specs

use crate::prelude::*;

#[tokio::test]
async fn lock_excludes_probes_until_freed() {
    let stack = Stack::new();
    stack
        .store
        .create_chain(TransactionData::new(id(0x6)))
        .await
        .unwrap();
    let cancel = CancelToken::new();

    // Worker A
    stack
        .store
        .lock(id(0x6), false, Duration::from_secs(1), &cancel)
        .await
        .unwrap();
    // Worker B
    assert!(!stack
        .store
        .try_lock(id(0x6), false, Duration::ZERO, &CancelToken::new())
        .await
        .unwrap());

    stack.store.free(id(0x6)).await.unwrap();
    assert!(stack
        .store
        .try_lock(id(0x6), false, Duration::ZERO, &CancelToken::new())
        .await
        .unwrap());
}

#[tokio::test]
async fn lock_wait_times_out() {
    let stack = Stack::new();
    stack
        .store
        .create_chain(TransactionData::new(id(0x6)))
        .await
        .unwrap();
    stack
        .store
        .try_lock(id(0x6), false, Duration::ZERO, &CancelToken::new())
        .await
        .unwrap();

    let err = stack
        .store
        .lock(id(0x6), false, Duration::from_millis(20), &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Timeout(_)));
}

#[tokio::test]
async fn lock_wait_is_cancellable() {
    let stack = Stack::new();
    stack
        .store
        .create_chain(TransactionData::new(id(0x6)))
        .await
        .unwrap();
    stack
        .store
        .try_lock(id(0x6), false, Duration::ZERO, &CancelToken::new())
        .await
        .unwrap();

    let cancel = CancelToken::new();
    let waiter = {
        let store = stack.store.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            store
                .lock(id(0x6), false, Duration::from_secs(30), &cancel)
                .await
        })
    };
    tokio::task::yield_now().await;
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(StoreError::Cancelled(_))));
}

#[tokio::test]
async fn unknown_chains_are_not_locked_implicitly() {
    let stack = Stack::new();
    let err = stack
        .store
        .try_lock(id(0x7), false, Duration::ZERO, &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ChainMissing(_)));

    assert!(stack
        .store
        .try_lock(id(0x7), true, Duration::ZERO, &CancelToken::new())
        .await
        .unwrap());
}
