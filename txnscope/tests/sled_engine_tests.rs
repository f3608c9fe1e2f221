//! Transactions over the persistent Sled engine

#![cfg(feature = "sled-backend")]

#[path = "testutils/mod.rs"]
mod testutils;

use std::sync::Arc;

use tempfile::TempDir;
use testutils::init_logging;
use txnscope::{
    ChangePosition, ChangeRecord, KeyValueEngine, KvOperation, SessionTransactionState,
    SledEngine, StorageEngine, TransactionConfig, TransactionId, TransactionStatus,
};

#[test]
fn test_committed_transaction_survives_reopen() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();

    let txn_id = {
        let engine = Arc::new(SledEngine::open(temp_dir.path()).unwrap());
        let mut session = SessionTransactionState::new(engine, TransactionConfig::default());

        session.begin_transaction().unwrap();
        session.execute(KvOperation::put("alice", "100")).unwrap();
        session.savepoint("before_bob").unwrap();
        session.execute(KvOperation::put("bob", "50")).unwrap();
        session.rollback_to_savepoint("before_bob").unwrap();
        session.execute(KvOperation::put("carol", "75")).unwrap();
        session.commit_transaction().unwrap()
    };

    let engine = SledEngine::open(temp_dir.path()).unwrap();
    assert_eq!(engine.get(b"alice").unwrap(), Some(b"100".to_vec()));
    assert!(engine.get(b"bob").unwrap().is_none());
    assert_eq!(engine.get(b"carol").unwrap(), Some(b"75".to_vec()));

    let record = engine.commit_record(txn_id).unwrap().unwrap();
    assert_eq!(record.keys, vec![b"alice".to_vec(), b"carol".to_vec()]);
    assert_eq!(record.positions, vec![1, 2]);
}

#[test]
fn test_rollback_restores_previous_values() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let engine = Arc::new(SledEngine::open(temp_dir.path()).unwrap());
    let mut session = SessionTransactionState::new(Arc::clone(&engine), TransactionConfig::default());

    session.execute(KvOperation::put("k", "v1")).unwrap();

    session.begin_transaction().unwrap();
    session.execute(KvOperation::put("k", "v2")).unwrap();
    session.execute(KvOperation::delete("k")).unwrap();
    session.execute(KvOperation::put("new", "x")).unwrap();
    session.rollback_transaction().unwrap();

    assert_eq!(session.state(), TransactionStatus::RolledBack);
    assert_eq!(
        engine.scan().unwrap(),
        vec![(b"k".to_vec(), b"v1".to_vec())]
    );
    assert_eq!(engine.commit_count().unwrap(), 1);
}

#[test]
fn test_commit_records_survive_transaction_id_reuse() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    // A restarted process hands out the same transaction ids again
    let reused = TransactionId::from_u64(1);

    {
        let engine = SledEngine::open(temp_dir.path()).unwrap();
        let token = engine.apply(reused, KvOperation::put("a", "1")).unwrap();
        engine
            .finalize(reused, &[ChangeRecord { position: ChangePosition::new(1), token }])
            .unwrap();
    }

    let engine = SledEngine::open(temp_dir.path()).unwrap();
    assert_eq!(engine.recovered_transactions(), 0);
    let token = engine.apply(reused, KvOperation::put("b", "2")).unwrap();
    engine
        .finalize(reused, &[ChangeRecord { position: ChangePosition::new(1), token }])
        .unwrap();

    assert_eq!(engine.commit_count().unwrap(), 2);
    let keys: Vec<_> = engine
        .commit_records()
        .unwrap()
        .into_iter()
        .map(|record| record.keys)
        .collect();
    assert_eq!(keys, vec![vec![b"a".to_vec()], vec![b"b".to_vec()]]);
    assert_eq!(
        engine.commit_record(reused).unwrap().unwrap().keys,
        vec![b"b".to_vec()]
    );
    assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
}

#[test]
fn test_unfinished_transaction_rolled_back_on_reopen() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Arc::new(SledEngine::open(temp_dir.path()).unwrap());
        let mut session =
            SessionTransactionState::new(Arc::clone(&engine), TransactionConfig::default());
        session.execute(KvOperation::put("k", "v1")).unwrap();

        session.begin_transaction().unwrap();
        session.execute(KvOperation::put("ghost", "uncommitted")).unwrap();
        session.execute(KvOperation::put("k", "v2")).unwrap();
        session.savepoint("s1").unwrap();
        session.execute(KvOperation::delete("k")).unwrap();
        session.rollback_to_savepoint("s1").unwrap();
        session.execute(KvOperation::put("k", "v3")).unwrap();
        assert_eq!(engine.pending_changes(), 3);

        // Uncommitted writes reach disk, then the process goes away
        engine.flush().unwrap();
    }

    let engine = SledEngine::open(temp_dir.path()).unwrap();
    assert_eq!(engine.recovered_transactions(), 1);
    assert_eq!(engine.pending_changes(), 0);
    assert!(engine.get(b"ghost").unwrap().is_none());
    assert_eq!(
        engine.scan().unwrap(),
        vec![(b"k".to_vec(), b"v1".to_vec())]
    );
    assert_eq!(engine.commit_count().unwrap(), 1);

    drop(engine);
    let engine = SledEngine::open(temp_dir.path()).unwrap();
    assert_eq!(engine.recovered_transactions(), 0);
    assert_eq!(engine.get(b"k").unwrap(), Some(b"v1".to_vec()));
}
