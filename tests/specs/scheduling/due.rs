//! Due-chain scan specs

use crate::prelude::*;

#[tokio::test]
async fn overdue_chain_is_returned_without_waiting() {
    let stack = Stack::new();
    stack
        .store
        .create_chain(TransactionData::new(id(0x6)).with_expires_at(stack.overdue()))
        .await
        .unwrap();

    let due = tokio::time::timeout(
        Duration::from_millis(500),
        stack.store.due_chains(&CancelToken::new()),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].chain_id, id(0x6));
}

#[tokio::test]
async fn due_set_is_exact() {
    let stack = Stack::new();
    let now = stack.clock.now();
    for (n, offset) in [(1, -5), (2, 0), (3, 5), (4, 3600)] {
        stack
            .store
            .create_chain(
                TransactionData::new(id(n)).with_expires_at(now + ChronoDuration::seconds(offset)),
            )
            .await
            .unwrap();
    }
    stack
        .store
        .create_chain(TransactionData::new(id(5)))
        .await
        .unwrap();

    let mut due: Vec<_> = stack
        .store
        .due_chains(&CancelToken::new())
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.chain_id)
        .collect();
    due.sort();
    assert_eq!(due, vec![id(1), id(2)]);
    assert_eq!(
        stack.backend.expiry().next_deadline(),
        Some(now + ChronoDuration::seconds(5))
    );
}

#[tokio::test]
async fn scan_waits_instead_of_spinning() {
    let stack = Stack::new();
    stack
        .store
        .create_chain(
            TransactionData::new(id(0x6)).with_expires_at(stack.clock.now() + ChronoDuration::hours(1)),
        )
        .await
        .unwrap();

    let waited = tokio::time::timeout(
        Duration::from_millis(50),
        stack.store.due_chains(&CancelToken::new()),
    )
    .await;
    assert!(waited.is_err(), "scan returned before anything was due");
}

#[tokio::test]
async fn sooner_commit_wakes_a_waiting_scan() {
    let stack = Stack::new();
    stack
        .store
        .create_chain(
            TransactionData::new(id(1)).with_expires_at(stack.clock.now() + ChronoDuration::hours(1)),
        )
        .await
        .unwrap();

    let scan = {
        let store = stack.store.clone();
        tokio::spawn(async move { store.due_chains(&CancelToken::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    stack
        .store
        .create_chain(TransactionData::new(id(2)).with_expires_at(stack.overdue()))
        .await
        .unwrap();

    let due = tokio::time::timeout(Duration::from_secs(1), scan)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let ids: Vec<_> = due.iter().map(|t| t.chain_id).collect();
    assert_eq!(ids, vec![id(2)]);
}

#[tokio::test]
async fn cancelled_scan_returns_nothing() {
    let stack = Stack::new();
    let cancel = CancelToken::new();
    let scan = {
        let store = stack.store.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { store.due_chains(&cancel).await })
    };
    tokio::task::yield_now().await;
    cancel.cancel();

    let due = tokio::time::timeout(Duration::from_secs(1), scan)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(due.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_committers_never_strand_a_waiter() {
    for round in 0..20u128 {
        let stack = Stack::new();
        let scan = {
            let store = stack.store.clone();
            tokio::spawn(async move { store.due_chains(&CancelToken::new()).await })
        };

        let mut committers = Vec::new();
        for n in 0..8u128 {
            let store = stack.store.clone();
            let at = stack.clock.now() + ChronoDuration::seconds(if n == 7 { -1 } else { 600 });
            committers.push(tokio::spawn(async move {
                store
                    .create_chain(TransactionData::new(id(round * 100 + n)).with_expires_at(at))
                    .await
            }));
        }
        for committer in committers {
            committer.await.unwrap().unwrap();
        }

        let due = tokio::time::timeout(Duration::from_secs(2), scan)
            .await
            .unwrap_or_else(|_| panic!("round {round}: waiter stranded"))
            .unwrap()
            .unwrap();
        assert_eq!(due.len(), 1, "round {round}");
    }
}
