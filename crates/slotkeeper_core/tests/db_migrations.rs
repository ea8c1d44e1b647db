use rusqlite::Connection;
use slotkeeper_core::db::migrations::{apply_migrations, latest_version, schema_version};
use slotkeeper_core::db::{open_db, open_db_in_memory, DbError};

const EVENT_COLUMNS: [&str; 8] = [
    "id",
    "title",
    "recurring",
    "recurring_days",
    "start_datetime",
    "end_datetime",
    "start_time",
    "end_time",
];

#[test]
fn fresh_store_has_event_table_at_latest_version() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    assert_eq!(event_columns(&conn), EVENT_COLUMNS);
}

#[test]
fn rerunning_migrations_reports_nothing_applied() {
    let mut conn = Connection::open_in_memory().unwrap();

    let first = apply_migrations(&mut conn).unwrap();
    assert_eq!(first.from_version, 0);
    assert_eq!(first.applied(), latest_version());

    let second = apply_migrations(&mut conn).unwrap();
    assert_eq!(second.applied(), 0);
    assert_eq!(second.to_version, latest_version());
}

#[test]
fn reopening_a_file_keeps_stored_events() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slotkeeper.db");

    let conn = open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO event (title, recurring, recurring_days, start_time, end_time)
         VALUES ('kept', 1, '0', 0, 60);",
        [],
    )
    .unwrap();
    drop(conn);

    let reopened = open_db(&path).unwrap();
    let titles: Vec<String> = reopened
        .prepare("SELECT title FROM event;")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(titles, ["kept"]);
}

#[test]
fn newer_schema_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch("PRAGMA user_version = 999;")
        .unwrap();

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failed_step_names_the_migration_and_leaves_version_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("foreign.db");
    // A pre-existing `event` table without the indexed columns.
    Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE event (id INTEGER PRIMARY KEY);")
        .unwrap();

    let err = open_db(&path).unwrap_err();
    assert!(
        matches!(err, DbError::MigrationFailed { version: 1, name: "create_event", .. }),
        "unexpected error: {err}"
    );
    assert!(std::error::Error::source(&err).is_some());

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), 0);
}

fn event_columns(conn: &Connection) -> Vec<String> {
    conn.prepare("PRAGMA table_info(event);")
        .unwrap()
        .query_map([], |row| row.get(1))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}
