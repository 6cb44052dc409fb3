//! Write-ahead log specs

use crate::prelude::*;

#[tokio::test]
async fn reopened_store_continues_every_chain() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("revisions.wal");

    {
        let stack = Stack::durable(&path);
        let first = stack
            .store
            .create_chain(TransactionData::new(id(1)).with_script("run()"))
            .await
            .unwrap();
        first.authorize().await.unwrap();
        stack
            .store
            .create_chain(TransactionData::new(id(2)))
            .await
            .unwrap();
    }

    let stack = Stack::durable(&path);
    let head = stack.store.fetch_head(id(1)).await.unwrap();
    assert_eq!(head.revision, 2);
    assert_eq!(head.status, Status::Authorized);
    assert!(stack.store.chain_exists(id(2)).await.unwrap());

    let err = stack
        .store
        .create_chain(TransactionData::new(id(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ChainExists(_)));
    assert_eq!(head.complete().await.unwrap().revision, 3);
}

#[tokio::test]
async fn store_built_from_config_is_durable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("store.wal");
    let config = Config::from_toml(&format!(
        "[store]\nwal_path = {:?}\nsync_writes = false\n\n[processor]\nworkers = 2\nlock_timeout = \"250ms\"\n",
        path.display().to_string()
    ))
    .unwrap();
    assert_eq!(config.processor.workers, 2);
    assert_eq!(config.processor.lock_timeout, Duration::from_millis(250));

    {
        let store = RevisionStore::from_config(&config.store).unwrap().into_store();
        store
            .create_chain(TransactionData::new(id(9)))
            .await
            .unwrap();
    }

    let store = RevisionStore::from_config(&config.store).unwrap().into_store();
    assert!(store.chain_exists(id(9)).await.unwrap());
}
