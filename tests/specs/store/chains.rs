//! Chain creation and optimistic append specs

use crate::prelude::*;

#[tokio::test]
async fn created_chain_starts_at_revision_one() {
    let stack = Stack::new();
    let created = stack
        .store
        .create_chain(TransactionData::new(id(0x6)))
        .await
        .unwrap();

    assert_eq!(created.revision, 1);
    assert_eq!(created.status, Status::Initialized);
    assert_eq!(stack.store.fetch_head(id(0x6)).await.unwrap(), created);
}

#[tokio::test]
async fn deltas_extend_the_chain_in_order() {
    let stack = Stack::new();
    let first = stack
        .store
        .create_chain(TransactionData::new(id(0x6)))
        .await
        .unwrap();
    first
        .commit_delta(|next| next.payload = json!({"step": 2}))
        .await
        .unwrap();

    let chain = stack.store.fetch_chain(id(0x6)).await.unwrap();
    let revisions: Vec<_> = chain.iter().map(|t| t.revision).collect();
    assert_eq!(revisions, vec![1, 2]);
    assert_eq!(chain[1].payload, json!({"step": 2}));
}

#[tokio::test]
async fn replaying_a_revision_loses_the_race() {
    let stack = Stack::new();
    let first = stack
        .store
        .create_chain(TransactionData::new(id(0x6)))
        .await
        .unwrap();
    let second = first.commit_delta(|_| {}).await.unwrap();

    let mut again = first.data().clone();
    again.revision = 1;
    let err = stack.store.commit_delta(&first, again).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::RevisionAlreadyExists { chain_id, revision: 1 } if chain_id == id(0x6)
    ));
    assert_eq!(stack.store.fetch_head(id(0x6)).await.unwrap(), second);
}

#[tokio::test]
async fn duplicate_creation_is_refused() {
    let stack = Stack::new();
    stack
        .store
        .create_chain(TransactionData::new(id(0x6)).with_payload(json!("original")))
        .await
        .unwrap();

    let err = stack
        .store
        .create_chain(TransactionData::new(id(0x6)).with_payload(json!("imposter")))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ChainExists(_)));
    let head = stack.store.fetch_head(id(0x6)).await.unwrap();
    assert_eq!(head.payload, json!("original"));
}

#[tokio::test]
async fn lifecycle_helpers_walk_a_chain_to_completion() {
    let stack = Stack::new();
    let parent = stack
        .store
        .create_chain(TransactionData::new(id(1)))
        .await
        .unwrap();
    let child = stack
        .store
        .create_chain(TransactionData::new(id(2)).with_parent(parent.revision_ref()))
        .await
        .unwrap();

    let done = child.authorize().await.unwrap().complete().await.unwrap();
    assert_eq!(done.revision, 3);

    let finished = parent.children(&[Status::Completed]).await.unwrap();
    assert_eq!(finished, vec![done]);
    assert!(parent.children(&[Status::Initialized]).await.unwrap().is_empty());
}
