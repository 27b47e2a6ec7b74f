mod common;

use std::sync::{Arc, Mutex};

use common::{mock_connection, tx_calls};
use sql_gateway::prelude::*;

#[test]
fn nested_blocks_share_one_native_transaction() -> Result<(), Box<dyn std::error::Error>> {
    let (mut conn, log) = mock_connection();
    conn.transaction(|outer| {
        assert_eq!(outer.transaction_depth(), 1);
        outer.query("UPDATE a", ())?;
        outer.transaction(|inner| {
            assert_eq!(inner.transaction_depth(), 2);
            inner.transaction(|innermost| innermost.query("UPDATE b", ()).map(|_| ()))
        })?;
        outer.query("UPDATE c", ()).map(|_| ())
    })?;

    assert_eq!(tx_calls(&log), vec!["begin -", "commit -"]);
    assert_eq!(conn.transaction_depth(), 0);
    Ok(())
}

#[test]
fn inner_failure_rolls_back_once_and_propagates() {
    let (mut conn, log) = mock_connection();
    let err = conn
        .transaction(|outer| {
            outer.query("UPDATE a", ())?;
            outer.transaction(|inner| inner.query("FAIL here", ()).map(|_| ()))?;
            outer.query("UPDATE never", ()).map(|_| ())
        })
        .unwrap_err();

    assert!(matches!(err, SqlGatewayError::Other(ref msg) if msg.contains("FAIL here")));
    assert_eq!(tx_calls(&log), vec!["begin -", "rollback -"]);
    assert!(!log.lock().unwrap().iter().any(|e| e.contains("never")));
    assert_eq!(conn.transaction_depth(), 0);
}

#[test]
fn swallowed_inner_failure_still_commits_outer() -> Result<(), Box<dyn std::error::Error>> {
    let (mut conn, log) = mock_connection();
    conn.transaction(|outer| {
        let inner = outer.transaction(|inner| inner.query("FAIL quietly", ()).map(|_| ()));
        assert!(inner.is_err());
        assert_eq!(outer.transaction_depth(), 1);
        Ok(())
    })?;
    assert_eq!(tx_calls(&log), vec!["begin -", "commit -"]);
    Ok(())
}

#[test]
fn explicit_control_inside_block_is_a_logic_error() -> Result<(), Box<dyn std::error::Error>> {
    let (mut conn, log) = mock_connection();
    conn.transaction(|c| {
        assert!(matches!(c.begin_transaction(None), Err(SqlGatewayError::LogicError(_))));
        assert!(matches!(c.commit(None), Err(SqlGatewayError::LogicError(_))));
        assert!(matches!(c.rollback(Some("sp")), Err(SqlGatewayError::LogicError(_))));
        Ok(())
    })?;
    assert_eq!(tx_calls(&log), vec!["begin -", "commit -"]);

    conn.begin_transaction(None)?;
    conn.rollback(None)?;
    conn.begin_transaction(Some("sp1"))?;
    conn.commit(Some("sp1"))?;
    assert_eq!(
        tx_calls(&log),
        vec!["begin -", "commit -", "begin -", "rollback -", "begin sp1", "commit sp1"]
    );
    Ok(())
}

#[test]
fn lazy_connect_runs_hooks_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let (mut conn, log) = mock_connection();
    let order = Arc::new(Mutex::new(Vec::new()));
    let first = Arc::clone(&order);
    let second = Arc::clone(&order);
    conn.on_connect(move |driver| {
        first.lock().unwrap().push(format!("first:{}", driver.dialect().name));
        Ok(())
    })
    .on_connect(move |_| {
        second.lock().unwrap().push("second".to_owned());
        Ok(())
    });

    assert_eq!(conn.state(), ConnectionState::Disconnected);
    assert!(log.lock().unwrap().is_empty());
    conn.query("SELECT 1", ())?;
    assert_eq!(conn.state(), ConnectionState::Connected);
    assert_eq!(*order.lock().unwrap(), vec!["first:mock", "second"]);

    conn.query("SELECT 2", ())?;
    assert_eq!(log.lock().unwrap().iter().filter(|e| *e == "connect").count(), 1);

    conn.reconnect()?;
    assert_eq!(order.lock().unwrap().len(), 4);
    assert_eq!(log.lock().unwrap().iter().filter(|e| *e == "connect").count(), 2);
    Ok(())
}

#[test]
fn failing_connect_hook_leaves_connection_closed() {
    let (mut conn, _log) = mock_connection();
    conn.on_connect(|_| Err(SqlGatewayError::ConfigError("refused".into())));
    assert!(matches!(conn.connect(), Err(SqlGatewayError::ConfigError(_))));
    assert!(!conn.is_connected());
    assert_eq!(conn.state(), ConnectionState::Disconnected);
}

#[test]
fn disconnect_resets_depth() -> Result<(), Box<dyn std::error::Error>> {
    let (mut conn, _log) = mock_connection();
    let result = conn.transaction(|c| {
        c.disconnect();
        Ok(())
    });
    assert!(matches!(result, Err(SqlGatewayError::InvalidState(_))));
    assert_eq!(conn.transaction_depth(), 0);
    assert!(!conn.is_connected());
    Ok(())
}

#[test]
fn insert_id_without_generated_key_is_an_error() {
    let (mut conn, _log) = mock_connection();
    assert!(matches!(conn.insert_id(None), Err(SqlGatewayError::InvalidState(_))));
}

#[cfg(feature = "sqlite")]
#[test]
fn sqlite_transaction_commits_and_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = common::sqlite_memory()?;
    conn.query("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)", ())?;

    conn.transaction(|c| {
        c.query("INSERT INTO t (v) VALUES (?)", QueryArgs::new().arg("kept"))?;
        c.transaction(|inner| {
            inner
                .query("INSERT INTO t (v) VALUES (?)", QueryArgs::new().arg("kept too"))
                .map(|_| ())
        })
    })?;

    let failed: Result<(), SqlGatewayError> = conn.transaction(|c| {
        c.query("INSERT INTO t (v) VALUES (?)", QueryArgs::new().arg("discarded"))?;
        c.query("INSERT INTO missing VALUES (1)", ()).map(|_| ())
    });
    assert!(failed.is_err());
    assert!(!conn.driver()?.in_transaction());

    assert_eq!(
        conn.fetch_fields("SELECT v FROM t ORDER BY id", ())?,
        vec![RowValues::Text("kept".into()), RowValues::Text("kept too".into())]
    );
    Ok(())
}

#[cfg(feature = "sqlite")]
#[test]
fn sqlite_savepoints_through_explicit_calls() -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = common::sqlite_memory()?;
    conn.query("CREATE TABLE t (v INTEGER)", ())?;
    conn.begin_transaction(None)?;
    conn.query("INSERT INTO t VALUES (1)", ())?;
    conn.begin_transaction(Some("partial"))?;
    conn.query("INSERT INTO t VALUES (2)", ())?;
    conn.rollback(Some("partial"))?;
    conn.commit(None)?;
    assert_eq!(conn.fetch_fields("SELECT v FROM t", ())?, vec![RowValues::Int(1)]);
    Ok(())
}
