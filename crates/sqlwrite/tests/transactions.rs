//! Transaction policy, batching and ordering across a whole save.

mod common;

use common::{Event, ScriptedConnection, expect_err, new_user, rows, run, unwrap_outcome, users_table};
use sqlwrite::postgres::{self, PostgresOptions};
use sqlwrite::prelude::*;
use sqlwrite::sqlite::{self, SqliteOptions};
use sqlwrite::{AutoTransactions, IsolationLevel, ResultSet};

fn new_tag(slug: &str) -> TrackedEntry {
    let table = Arc::new(
        TableSchema::new("tags")
            .column(ColumnDef::new("slug", SqlType::Text).primary_key())
            .column(ColumnDef::new("label", SqlType::Text)),
    );
    let mut entry = TrackedEntry::added(table);
    entry.set("slug", Value::from(slug));
    entry.set("label", Value::from(slug.to_uppercase().as_str()));
    entry
}

fn id_row(id: i64) -> ResultSet {
    rows(&["id"], vec![vec![Value::BigInt(id)]])
}

#[test]
fn save_in_transaction_wraps_work_in_a_savepoint() {
    let conn = ScriptedConnection::new(Dialect::Postgres);
    conn.reply(vec![id_row(1)]);
    let pipeline = postgres::pipeline(PostgresOptions::default(), UpdateConfig::default()).unwrap();

    run(|cx| async move {
        let tx = unwrap_outcome(conn.begin(&cx).await);
        let commands = vec![ModificationCommand::from_entry(&new_user("Ada")).unwrap()];
        let saved = unwrap_outcome(pipeline.save_in_transaction(&cx, &tx, commands).await);
        unwrap_outcome(tx.commit(&cx).await);

        assert_eq!(saved.commands[0].value("id"), Some(&Value::BigInt(1)));
        assert_eq!(
            conn.transaction_events(),
            vec![
                Event::Begin(None),
                Event::Savepoint("sqlwrite_savepoint".to_string()),
                Event::Release("sqlwrite_savepoint".to_string()),
                Event::Commit,
            ]
        );
    });
}

#[test]
fn failed_save_rolls_back_to_the_savepoint_only() {
    let conn = ScriptedConnection::new(Dialect::Postgres);
    conn.fail_next("deadlock detected");
    let config = UpdateConfig::new().savepoint_name("before_orders");
    let pipeline = postgres::pipeline(PostgresOptions::default(), config).unwrap();

    run(|cx| async move {
        let tx = unwrap_outcome(conn.begin(&cx).await);
        let commands = vec![ModificationCommand::from_entry(&new_user("Ada")).unwrap()];
        expect_err(pipeline.save_in_transaction(&cx, &tx, commands).await);
        unwrap_outcome(tx.rollback(&cx).await);

        assert_eq!(
            conn.transaction_events(),
            vec![
                Event::Begin(None),
                Event::Savepoint("before_orders".to_string()),
                Event::RollbackTo("before_orders".to_string()),
                Event::Rollback,
            ]
        );
    });
}

#[test]
fn savepoints_can_be_disabled() {
    let conn = ScriptedConnection::new(Dialect::Postgres);
    conn.reply(vec![id_row(1)]);
    let config = UpdateConfig::new().use_savepoints(false);
    let pipeline = postgres::pipeline(PostgresOptions::default(), config).unwrap();

    run(|cx| async move {
        let tx = unwrap_outcome(conn.begin(&cx).await);
        let commands = vec![ModificationCommand::from_entry(&new_user("Ada")).unwrap()];
        unwrap_outcome(pipeline.save_in_transaction(&cx, &tx, commands).await);
        assert_eq!(conn.transaction_events(), vec![Event::Begin(None)]);
    });
}

#[test]
fn isolation_level_is_used_for_own_transactions() {
    let conn = ScriptedConnection::new(Dialect::Postgres);
    let config = UpdateConfig::new()
        .auto_transactions(AutoTransactions::Always)
        .isolation_level(IsolationLevel::Serializable);

    run(|cx| async move {
        let mut entries = [new_tag("rust")];
        unwrap_outcome(save_changes(&cx, &conn, &mut entries, config).await);
        assert_eq!(
            conn.transaction_events(),
            vec![Event::Begin(Some(IsolationLevel::Serializable)), Event::Commit]
        );
    });
}

#[test]
fn never_policy_skips_transactions() {
    let conn = ScriptedConnection::new(Dialect::Postgres);
    conn.reply(vec![id_row(1), id_row(2)]);
    let config = UpdateConfig::new().auto_transactions(AutoTransactions::Never);

    run(|cx| async move {
        let mut entries = [new_user("Ada"), new_user("Grace")];
        unwrap_outcome(save_changes(&cx, &conn, &mut entries, config).await);
        assert!(conn.transaction_events().is_empty());
        assert_eq!(conn.executed().len(), 1);
    });
}

#[test]
fn max_batch_size_splits_commands() {
    let conn = ScriptedConnection::new(Dialect::Postgres);
    let config = UpdateConfig::new().max_batch_size(2);

    run(|cx| async move {
        let mut entries = [new_tag("a"), new_tag("b"), new_tag("c")];
        let summary = unwrap_outcome(save_changes(&cx, &conn, &mut entries, config).await);
        assert_eq!(summary.batches, 2);
        assert_eq!(summary.inserted, 3);
        assert_eq!(
            conn.executed(),
            vec![
                "INSERT INTO \"tags\" (\"slug\", \"label\") VALUES ($1, $2),\n($3, $4);\n".to_string(),
                "INSERT INTO \"tags\" (\"slug\", \"label\") VALUES ($1, $2);\n".to_string(),
            ]
        );
        // Several batches always share one transaction.
        assert_eq!(conn.transaction_events(), vec![Event::Begin(None), Event::Commit]);
    });
}

#[test]
fn small_batches_are_split_into_single_commands() {
    let conn = ScriptedConnection::new(Dialect::Postgres);
    let config = UpdateConfig::new().min_batch_size(3);

    run(|cx| async move {
        let mut entries = [new_tag("a"), new_tag("b")];
        let summary = unwrap_outcome(save_changes(&cx, &conn, &mut entries, config).await);
        assert_eq!(summary.batches, 2);
        assert_eq!(conn.executed().len(), 2);
        assert!(entries.iter().all(|e| e.state() == EntityState::Unchanged));
    });
}

#[test]
fn inserts_follow_table_dependencies() {
    let orders = Arc::new(
        TableSchema::new("orders")
            .column(ColumnDef::new("id", SqlType::BigInt).primary_key().identity())
            .column(ColumnDef::new("user_id", SqlType::BigInt))
            .column(ColumnDef::new("total", SqlType::BigInt)),
    );
    let mut order = TrackedEntry::added(orders);
    order.set("user_id", Value::BigInt(1));
    order.set("total", Value::BigInt(30));

    let conn = ScriptedConnection::new(Dialect::Postgres);
    // The user row is inserted first, so its id comes back first.
    conn.reply(vec![id_row(1), id_row(500)]);
    let pipeline = postgres::pipeline(PostgresOptions::default(), UpdateConfig::default())
        .unwrap()
        .with_dependencies(TableDependencies::new().table("orders", ["users"]));

    run(|cx| async move {
        let mut entries = [order, new_user("Ada")];
        unwrap_outcome(pipeline.save_entries(&cx, &conn, &mut entries).await);

        let executed = conn.executed();
        assert!(executed[0].starts_with("INSERT INTO \"users\""), "{executed:?}");
        assert_eq!(entries[0].get("id"), Some(&Value::BigInt(500)));
        assert_eq!(entries[1].get("id"), Some(&Value::BigInt(1)));
    });
}

#[test]
fn unchanged_entries_produce_no_commands() {
    let conn = ScriptedConnection::new(Dialect::Postgres);
    let loaded = TrackedEntry::existing(
        users_table(),
        [("id", Value::BigInt(1)), ("name", Value::from("Ada"))],
    );

    run(|cx| async move {
        let mut entries = [loaded];
        let summary =
            unwrap_outcome(save_changes(&cx, &conn, &mut entries, UpdateConfig::default()).await);
        assert_eq!(summary.total(), 0);
        assert!(conn.events().is_empty());
    });
}

#[test]
fn legacy_sqlite_reads_back_through_rowid() {
    let conn = ScriptedConnection::new(Dialect::Sqlite);
    conn.reply(vec![id_row(7)]);
    let pipeline =
        sqlite::pipeline(SqliteOptions::for_version("3.31.1"), UpdateConfig::default()).unwrap();

    run(|cx| async move {
        let mut entries = [new_user("Ada")];
        unwrap_outcome(pipeline.save_entries(&cx, &conn, &mut entries).await);

        assert_eq!(
            conn.executed(),
            vec![
                "INSERT INTO \"users\" (\"name\") VALUES (?1);\n\
                 SELECT \"id\" FROM \"users\" WHERE changes() = 1 AND \"rowid\" = last_insert_rowid();\n"
                    .to_string()
            ]
        );
        assert_eq!(conn.transaction_events(), vec![Event::Begin(None), Event::Commit]);
        assert_eq!(entries[0].get("id"), Some(&Value::BigInt(7)));
    });
}

#[test]
fn invalid_config_is_rejected_before_touching_the_connection() {
    let conn = ScriptedConnection::new(Dialect::Sqlite);
    let config = UpdateConfig::new().max_batch_size(2).min_batch_size(5);

    run(|cx| async move {
        let mut entries = [new_user("Ada")];
        let err = expect_err(save_changes(&cx, &conn, &mut entries, config).await);
        assert!(matches!(err, Error::Config(_)), "unexpected error: {err:?}");
        assert!(conn.events().is_empty());
    });
}
