// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::id::ChainId;
use crate::transaction::Status;

fn commit(n: u128, revision: i64) -> TransactionData {
    let mut data = TransactionData::new(ChainId::from_u128(n));
    data.revision = revision;
    data
}

#[tokio::test]
async fn publish_to_matching_subscribers() {
    let bus = CommitBus::new();
    let target = ChainId::from_u128(1);
    let mut sub = bus.subscribe(Arc::new(move |c: &TransactionData| c.chain_id == target));

    bus.publish(&commit(1, 1));

    let received = sub.try_recv().unwrap();
    assert_eq!(received.chain_id, target);
}

#[tokio::test]
async fn non_matching_commits_not_delivered() {
    let bus = CommitBus::new();
    let mut sub = bus.subscribe(Arc::new(|c: &TransactionData| c.status == Status::Failed));

    bus.publish(&commit(1, 1));

    assert!(sub.try_recv().is_none());
}

#[tokio::test]
async fn commits_arrive_in_publish_order() {
    let bus = CommitBus::new();
    let mut sub = bus.subscribe_all();

    for revision in 1..=3 {
        bus.publish(&commit(1, revision));
    }

    let revisions: Vec<i64> = std::iter::from_fn(|| sub.try_recv())
        .map(|c| c.revision)
        .collect();
    assert_eq!(revisions, vec![1, 2, 3]);
}

#[test]
fn dropping_subscription_unsubscribes() {
    let bus = CommitBus::new();
    let sub = bus.subscribe_all();
    assert_eq!(bus.subscriber_count(), 1);

    drop(sub);
    assert_eq!(bus.subscriber_count(), 0);
}

#[test]
fn explicit_unsubscribe_removes_subscriber() {
    let bus = CommitBus::new();
    let sub = bus.subscribe_all();
    bus.unsubscribe(sub.id());
    assert_eq!(bus.subscriber_count(), 0);
}

#[test]
fn clone_shares_state() {
    let bus1 = CommitBus::new();
    let bus2 = bus1.clone();

    let _sub = bus1.subscribe_all();

    assert_eq!(bus1.subscriber_count(), 1);
    assert_eq!(bus2.subscriber_count(), 1);
}

#[tokio::test]
async fn wait_for_returns_first_matching_future_commit() {
    let bus = CommitBus::new();
    let cancel = CancelToken::new();

    // Published before the wait starts: must not be returned
    bus.publish(&commit(1, 2));

    let publisher = bus.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        publisher.publish(&commit(1, 1));
        publisher.publish(&commit(1, 2));
        publisher.publish(&commit(1, 3));
    });

    let found = bus
        .wait_for(
            Arc::new(|c: &TransactionData| c.revision >= 2),
            Duration::from_secs(2),
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(found.revision, 2);
    assert_eq!(bus.subscriber_count(), 0);
}

#[tokio::test]
async fn wait_for_times_out_without_leaking_listener() {
    let bus = CommitBus::new();
    let cancel = CancelToken::new();

    let found = bus
        .wait_for(Arc::new(|_: &TransactionData| true), Duration::from_millis(20), &cancel)
        .await;

    assert!(found.is_none());
    assert_eq!(bus.subscriber_count(), 0);
}

#[tokio::test]
async fn wait_for_yields_none_on_cancel() {
    let bus = CommitBus::new();
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let found = bus
        .wait_for(Arc::new(|_: &TransactionData| true), Duration::from_secs(10), &cancel)
        .await;

    assert!(found.is_none());
    assert_eq!(bus.subscriber_count(), 0);
}
