//! Schema migrations for the event store.
//!
//! The applied version lives in `PRAGMA user_version`. All pending steps
//! run inside one transaction, so a failing step leaves the file at the
//! version it had before.

use log::{debug, info};
use rusqlite::{Connection, Transaction};

use crate::db::{DbError, DbResult};

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "create_event",
    sql: include_str!("0001_init.sql"),
}];

/// Schema versions observed before and after [`apply_migrations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: u32,
    pub to_version: u32,
}

impl MigrationReport {
    pub fn applied(&self) -> u32 {
        self.to_version - self.from_version
    }
}

/// Newest schema version this build can produce.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Reads the schema version stamped on `conn`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Brings `conn` up to [`latest_version`].
///
/// # Errors
/// - [`DbError::UnsupportedSchemaVersion`] when the file is newer than this build.
/// - [`DbError::MigrationFailed`] naming the first step that failed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<MigrationReport> {
    let from_version = schema_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let report = MigrationReport {
        from_version,
        to_version: latest,
    };
    if report.applied() == 0 {
        return Ok(report);
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS
        .iter()
        .filter(|migration| migration.version > from_version)
    {
        run_step(&tx, migration)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        report.from_version, report.to_version
    );
    Ok(report)
}

fn run_step(tx: &Transaction<'_>, migration: &Migration) -> DbResult<()> {
    debug!(
        "event=db_migrate_step module=db status=start version={} name={}",
        migration.version, migration.name
    );
    tx.execute_batch(migration.sql)
        .and_then(|()| tx.pragma_update(None, "user_version", migration.version))
        .map_err(|source| DbError::MigrationFailed {
            version: migration.version,
            name: migration.name,
            source,
        })
}
