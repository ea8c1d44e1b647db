//! Connection bootstrap for the event store.
//!
//! # Invariants
//! - Returned connections have a non-zero busy timeout, so a competing
//!   `IMMEDIATE` writer waits instead of failing instantly.
//! - Returned connections are at [`latest_version`](super::migrations::latest_version).

use super::migrations::{apply_migrations, MigrationReport};
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (creating if missing) the event store file at `path`.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with("file", || Connection::open(path))
}

/// Opens a private in-memory event store.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with("memory", Connection::open_in_memory)
}

fn open_with(
    mode: &'static str,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    let opened = connect().map_err(DbError::from).and_then(|mut conn| {
        let report = prepare(&mut conn)?;
        Ok((conn, report))
    });
    let duration_ms = started_at.elapsed().as_millis();

    match opened {
        Ok((conn, report)) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={} schema_version={} migrations_applied={}",
                mode,
                duration_ms,
                report.to_version,
                report.applied()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error={}",
                mode, duration_ms, err
            );
            Err(err)
        }
    }
}

fn prepare(conn: &mut Connection) -> DbResult<MigrationReport> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)
}
