//! Session layer: autocommit, failure recovery and the session registry

#[path = "testutils/mod.rs"]
mod testutils;

use std::sync::Arc;
use std::thread;

use testutils::init_logging;
use testutils::recording_engine::RecordingEngine;
use txnscope::{
    create_engine, EngineType, KeyValueEngine, KvOperation, MemoryEngine, SessionManager,
    SessionTransactionState, TransactionConfig, TransactionError, TransactionStatus,
};

fn memory_session(
    config: TransactionConfig,
) -> (Arc<MemoryEngine>, SessionTransactionState<MemoryEngine>) {
    init_logging();
    let engine = Arc::new(MemoryEngine::new());
    let session = SessionTransactionState::new(Arc::clone(&engine), config);
    (engine, session)
}

#[test]
fn test_autocommit_wraps_each_operation() {
    let (engine, mut session) = memory_session(TransactionConfig::default());

    session.execute(KvOperation::put("a", "1")).unwrap();
    session.execute(KvOperation::put("b", "2")).unwrap();

    assert_eq!(engine.commit_count().unwrap(), 2);
    assert_eq!(session.state(), TransactionStatus::Committed);
    assert_eq!(session.statistics().begun, 2);
}

#[test]
fn test_autocommit_fault_rolls_back_implicit_transaction() {
    init_logging();
    let engine = Arc::new(RecordingEngine::new());
    let mut session = SessionTransactionState::new(Arc::clone(&engine), TransactionConfig::default());
    engine.fail_apply("bad");

    let err = session.execute("bad".to_string()).unwrap_err();
    assert!(matches!(
        err,
        TransactionError::ApplyFault {
            state: TransactionStatus::RolledBack,
            ..
        }
    ));
    assert_eq!(session.state(), TransactionStatus::RolledBack);
    assert!(!session.has_active_transaction());
    assert!(engine.finalized().is_empty());
}

#[test]
fn test_implicit_rollback_fault_is_reported() {
    init_logging();
    let engine = Arc::new(RecordingEngine::new());
    let mut session = SessionTransactionState::new(Arc::clone(&engine), TransactionConfig::default());
    engine.fail_apply("bad");
    engine.fail_undo("good");

    let err = session
        .execute_with_auto_commit(|controller| {
            controller.apply("good".to_string())?;
            controller.apply("bad".to_string())
        })
        .unwrap_err();

    assert!(matches!(
        err,
        TransactionError::RollbackIncomplete {
            state: TransactionStatus::RolledBack,
            ..
        }
    ));
    assert_eq!(engine.undone(), vec!["good".to_string()]);
    assert!(!session.has_active_transaction());
    assert!(engine.finalized().is_empty());
}

#[test]
fn test_explicit_transaction_is_all_or_nothing() {
    let (engine, mut session) = memory_session(TransactionConfig::default());
    session.execute(KvOperation::put("k", "before")).unwrap();

    session.begin_transaction().unwrap();
    session.execute(KvOperation::put("k", "during")).unwrap();
    session.execute(KvOperation::delete("k")).unwrap();
    session.execute(KvOperation::put("other", "x")).unwrap();
    assert_eq!(engine.commit_count().unwrap(), 1);

    session.rollback_transaction().unwrap();
    assert_eq!(engine.get(b"k").unwrap(), Some(b"before".to_vec()));
    assert!(engine.get(b"other").unwrap().is_none());
    assert_eq!(engine.commit_count().unwrap(), 1);
}

#[test]
fn test_savepoints_through_session() {
    let (engine, mut session) = memory_session(TransactionConfig::default());

    session.begin_transaction().unwrap();
    session.execute(KvOperation::put("a", "1")).unwrap();
    session.savepoint("s1").unwrap();
    session.execute(KvOperation::put("a", "2")).unwrap();
    session.execute(KvOperation::put("b", "1")).unwrap();
    session.rollback_to_savepoint("s1").unwrap();
    session.commit_transaction().unwrap();

    assert_eq!(
        engine.scan().unwrap(),
        vec![(b"a".to_vec(), b"1".to_vec())]
    );
    let history = engine.commit_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].keys, vec![b"a".to_vec()]);
}

#[test]
fn test_failed_transaction_recovers_with_savepoint() {
    let (engine, mut session) = memory_session(TransactionConfig::default());
    session.execute(KvOperation::put("pinned", "v0")).unwrap();

    session.begin_transaction().unwrap();
    session.savepoint("start").unwrap();
    session.execute(KvOperation::put("pinned", "v1")).unwrap();
    engine.fail_undo_for_key("pinned");

    let err = session.rollback_to_savepoint("start").unwrap_err();
    assert!(matches!(err, TransactionError::UndoFault { .. }));
    assert_eq!(session.state(), TransactionStatus::Failed);

    // Operations are refused while failed, even with autocommit on
    let err = session.execute(KvOperation::put("x", "1")).unwrap_err();
    assert_eq!(err.state(), TransactionStatus::Failed);

    engine.clear_faults();
    session.rollback_to_savepoint("start").unwrap();
    assert_eq!(session.state(), TransactionStatus::Active);
    assert_eq!(engine.get(b"pinned").unwrap(), Some(b"v0".to_vec()));
    session.commit_transaction().unwrap();
}

#[test]
fn test_execute_without_transaction_when_autocommit_off() {
    let (engine, mut session) = memory_session(TransactionConfig::strict());

    let err = session.execute(KvOperation::put("a", "1")).unwrap_err();
    assert!(matches!(
        err,
        TransactionError::NoActiveTransaction {
            state: TransactionStatus::None,
            ..
        }
    ));
    assert!(engine.is_empty());

    session.set_auto_commit(true);
    session.execute(KvOperation::put("a", "1")).unwrap();
    assert_eq!(engine.len(), 1);
}

#[test]
fn test_execute_with_auto_commit_closure() {
    let (engine, mut session) = memory_session(TransactionConfig::default());

    let positions = session
        .execute_with_auto_commit(|controller| {
            let first = controller.apply(KvOperation::put("a", "1"))?;
            let second = controller.apply(KvOperation::put("b", "2"))?;
            Ok((first, second))
        })
        .unwrap();
    assert!(positions.1 > positions.0);
    assert_eq!(engine.commit_count().unwrap(), 1);
    assert_eq!(engine.commit_history()[0].keys.len(), 2);
}

#[test]
fn test_session_over_dynamic_engine() {
    init_logging();
    let engine = create_engine(EngineType::Memory, "unused").unwrap();
    let mut session = SessionTransactionState::new(Arc::clone(&engine), TransactionConfig::default());

    session.begin_transaction().unwrap();
    session.execute(KvOperation::put("a", "1")).unwrap();
    session.commit_transaction().unwrap();

    assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
}

#[test]
fn test_sessions_run_in_parallel() {
    init_logging();
    let engine = Arc::new(MemoryEngine::new());
    let manager = Arc::new(SessionManager::new(
        Arc::clone(&engine),
        TransactionConfig::default(),
    ));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                let id = manager.create_session();
                let session = manager.get_session(&id).unwrap();
                let mut session = session.lock();

                session.begin_transaction().unwrap();
                for i in 0..10 {
                    let key = format!("w{}-k{}", worker, i);
                    session.execute(KvOperation::put(key, "v")).unwrap();
                }
                session.savepoint("half").unwrap();
                session
                    .execute(KvOperation::put(format!("w{}-tmp", worker), "v"))
                    .unwrap();
                session.rollback_to_savepoint("half").unwrap();
                session.commit_transaction().unwrap();
                id
            })
        })
        .collect();

    let ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(manager.session_count(), 8);
    assert_eq!(engine.len(), 80);
    assert_eq!(engine.commit_count().unwrap(), 8);

    for id in &ids {
        assert!(manager.close_session(id).unwrap());
    }
    let stats = manager.statistics();
    assert_eq!(stats.begun, 8);
    assert_eq!(stats.committed, 8);
    assert_eq!(stats.undo_invocations, 8);
}

#[test]
fn test_close_session_rolls_back_live_transaction() {
    init_logging();
    let engine = Arc::new(MemoryEngine::new());
    let manager = SessionManager::new(Arc::clone(&engine), TransactionConfig::default());

    let id = manager.create_session();
    {
        let session = manager.get_session(&id).unwrap();
        let mut session = session.lock();
        session.begin_transaction().unwrap();
        session.execute(KvOperation::put("a", "1")).unwrap();
    }
    assert_eq!(engine.len(), 1);

    assert!(manager.close_session(&id).unwrap());
    assert!(engine.is_empty());
    assert!(manager.get_session(&id).is_none());
    assert!(manager.session_ids().is_empty());
}
