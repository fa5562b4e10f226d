//! End-to-end saves rendered for MySQL against a scripted connection.

mod common;

use common::{Event, ScriptedConnection, expect_err, new_user, rows, run, unwrap_outcome};
use sqlwrite::mysql::{MySqlOptions, pipeline};
use sqlwrite::prelude::*;
use sqlwrite::{CommandState, ProcedureParameter, StoredProcedureMapping};

/// `profiles(id key, bio text, stamp concurrency token)`.
fn loaded_profile(id: i64, stamp: i64) -> TrackedEntry {
    let table = Arc::new(
        TableSchema::new("profiles")
            .column(ColumnDef::new("id", SqlType::BigInt).primary_key())
            .column(ColumnDef::new("bio", SqlType::Text).nullable())
            .column(ColumnDef::new("stamp", SqlType::BigInt).concurrency_token()),
    );
    TrackedEntry::existing(
        table,
        [
            ("id", Value::BigInt(id)),
            ("bio", Value::Null),
            ("stamp", Value::BigInt(stamp)),
        ],
    )
}

fn adjust_balance(id: i64, balance: i64) -> ModificationCommand {
    ModificationCommand::new("accounts", EntityState::Modified)
        .column(ColumnModification::new("id").key().condition(id))
        .column(ColumnModification::new("balance").write(balance).read())
        .with_procedure(
            StoredProcedureMapping::new("adjust_balance")
                .parameter(ProcedureParameter::original("account_id", "id"))
                .parameter(ProcedureParameter::input_output("balance", "balance"))
                .parameter(ProcedureParameter::rows_affected("affected")),
        )
}

#[test]
fn insert_reads_identity_back() {
    let conn = ScriptedConnection::new(Dialect::MySql);
    conn.reply(vec![rows(&["id"], vec![vec![Value::BigInt(42)]])]);

    let entry = run(|cx| async move {
        let mut entries = [new_user("Ada")];
        unwrap_outcome(save_changes(&cx, &conn, &mut entries, UpdateConfig::default()).await);

        assert_eq!(
            conn.executed(),
            vec![
                "INSERT INTO `users` (`name`) VALUES (?);\n\
                 SELECT `id` FROM `users` WHERE ROW_COUNT() = 1 AND `id` = LAST_INSERT_ID();\n"
                    .to_string()
            ]
        );
        // Two statements that must see each other's effects.
        assert_eq!(conn.transaction_events(), vec![Event::Begin(None), Event::Commit]);
        let [entry] = entries;
        entry
    });

    assert_eq!(entry.get("id"), Some(&Value::BigInt(42)));
    assert_eq!(entry.state(), EntityState::Unchanged);
}

#[test]
fn zero_row_count_is_a_concurrency_conflict() {
    let conn = ScriptedConnection::new(Dialect::MySql);
    conn.reply(vec![rows(&["ROW_COUNT()"], vec![vec![Value::BigInt(0)]])]);
    let mut profile = loaded_profile(5, 12);
    profile.set("bio", Value::from("hello"));

    run(|cx| async move {
        let mut entries = [profile];
        let err = expect_err(save_changes(&cx, &conn, &mut entries, UpdateConfig::default()).await);

        let events = conn.events();
        assert_eq!(
            events[1],
            Event::Execute {
                sql: "UPDATE `profiles` SET `bio` = ? WHERE `id` = ? AND `stamp` = ?;\nSELECT ROW_COUNT();\n"
                    .to_string(),
                params: vec![Value::from("hello"), Value::BigInt(5), Value::BigInt(12)],
            }
        );
        assert_eq!(events.last(), Some(&Event::Rollback));

        let conflict = match err {
            Error::Concurrency(conflict) => conflict,
            other => panic!("expected a concurrency error, got {other:?}"),
        };
        assert_eq!(conflict.failures.len(), 1);
        assert_eq!(conflict.failures[0].entry, "profiles(id=5)");
        assert_eq!(conflict.failures[0].actual_rows, 0);
        assert_eq!(entries[0].state(), EntityState::Modified);
    });
}

#[test]
fn one_row_count_passes() {
    let conn = ScriptedConnection::new(Dialect::MySql);
    conn.reply(vec![rows(&["ROW_COUNT()"], vec![vec![Value::BigInt(1)]])]);
    let mut profile = loaded_profile(5, 12);
    profile.set("bio", Value::from("hello"));

    run(|cx| async move {
        let mut entries = [profile];
        let summary =
            unwrap_outcome(save_changes(&cx, &conn, &mut entries, UpdateConfig::default()).await);
        assert_eq!(summary.updated, 1);
        assert_eq!(entries[0].state(), EntityState::Unchanged);
        assert_eq!(entries[0].original("bio"), Some(&Value::from("hello")));
    });
}

#[test]
fn inserts_without_generated_values_share_one_statement() {
    let table = Arc::new(
        TableSchema::new("tags")
            .column(ColumnDef::new("slug", SqlType::Text).primary_key())
            .column(ColumnDef::new("label", SqlType::Text)),
    );
    let entries: Vec<TrackedEntry> = [("rust", "Rust"), ("sql", "SQL")]
        .into_iter()
        .map(|(slug, label)| {
            let mut entry = TrackedEntry::added(Arc::clone(&table));
            entry.set("slug", Value::from(slug));
            entry.set("label", Value::from(label));
            entry
        })
        .collect();
    let conn = ScriptedConnection::new(Dialect::MySql);

    run(|cx| async move {
        let mut entries = entries;
        let summary =
            unwrap_outcome(save_changes(&cx, &conn, &mut entries, UpdateConfig::default()).await);
        assert_eq!(summary.inserted, 2);
        assert_eq!(
            conn.executed(),
            vec!["INSERT INTO `tags` (`slug`, `label`) VALUES (?, ?),\n(?, ?);\n".to_string()]
        );
    });
}

#[test]
fn procedure_output_parameters_flow_back() {
    let conn = ScriptedConnection::new(Dialect::MySql);
    conn.reply(vec![rows(
        &["balance", "affected"],
        vec![vec![Value::BigInt(150), Value::BigInt(1)]],
    )]);
    let pipeline = pipeline(MySqlOptions::default(), UpdateConfig::default()).unwrap();

    run(|cx| async move {
        let saved = unwrap_outcome(pipeline.save(&cx, &conn, vec![adjust_balance(4, 100)]).await);
        assert_eq!(saved.summary.procedures, 1);

        let command = &saved.commands[0];
        assert_eq!(command.state(), CommandState::Propagated);
        assert_eq!(command.value("balance"), Some(&Value::BigInt(150)));
        assert_eq!(command.rows_affected(), Some(1));

        assert_eq!(
            conn.executed(),
            vec![
                "SET @_out_balance = ?;\n\
                 SET @_out_affected = NULL;\n\
                 CALL `adjust_balance`(?, @_out_balance, @_out_affected);\n\
                 SELECT @_out_balance AS `balance`, @_out_affected AS `affected`;\n"
                    .to_string()
            ]
        );
    });
}

#[test]
fn procedure_reporting_no_rows_fails() {
    let conn = ScriptedConnection::new(Dialect::MySql);
    conn.reply(vec![rows(
        &["balance", "affected"],
        vec![vec![Value::BigInt(100), Value::BigInt(0)]],
    )]);
    let pipeline = pipeline(MySqlOptions::default(), UpdateConfig::default()).unwrap();

    run(|cx| async move {
        let err = expect_err(pipeline.save(&cx, &conn, vec![adjust_balance(4, 100)]).await);
        assert!(err.is_concurrency_conflict(), "unexpected error: {err:?}");
        assert_eq!(conn.transaction_events(), vec![Event::Begin(None), Event::Rollback]);
    });
}

#[test]
fn parameter_limit_starts_a_new_batch() {
    let conn = ScriptedConnection::new(Dialect::MySql);
    conn.reply(vec![rows(&["id"], vec![vec![Value::BigInt(1)]])]);
    conn.reply(vec![rows(&["id"], vec![vec![Value::BigInt(2)]])]);
    // One insert binds one parameter; the limit leaves room for just one.
    let options = MySqlOptions {
        max_parameters: 1,
        ..MySqlOptions::default()
    };
    let pipeline = pipeline(options, UpdateConfig::default()).unwrap();

    run(|cx| async move {
        let mut entries = [new_user("Ada"), new_user("Grace")];
        let summary = unwrap_outcome(pipeline.save_entries(&cx, &conn, &mut entries).await);
        assert_eq!(summary.batches, 2);
        assert_eq!(conn.executed().len(), 2);
        assert_eq!(entries[0].get("id"), Some(&Value::BigInt(1)));
        assert_eq!(entries[1].get("id"), Some(&Value::BigInt(2)));
    });
}

#[test]
fn key_reread_parameters_move_an_insert_to_the_next_batch() {
    let pipeline = pipeline(MySqlOptions::new().max_parameters(2), UpdateConfig::default()).unwrap();
    let draft = ModificationCommand::new("docs", EntityState::Deleted)
        .column(ColumnModification::new("slug").key().condition("draft"));
    let intro = ModificationCommand::new("docs", EntityState::Added)
        .column(ColumnModification::new("slug").key().write("intro"))
        .column(ColumnModification::new("revision").read());

    let batches = pipeline.prepare(vec![draft, intro]).unwrap();
    assert_eq!(batches.len(), 2);
    assert!(batches.iter().all(|b| b.parameters().len() <= 2));
    assert_eq!(
        batches[1].sql(),
        "INSERT INTO `docs` (`slug`) VALUES (?);\n\
         SELECT `revision` FROM `docs` WHERE ROW_COUNT() = 1 AND `slug` = ?;\n"
    );
}
