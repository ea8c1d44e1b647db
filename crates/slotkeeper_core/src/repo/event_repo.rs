//! Event repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/list/delete over the `event` table.
//! - Provide the lookup queries the conflict detector runs.
//! - Offer an atomic scope so check-then-insert cannot interleave with
//!   another writer.
//!
//! # Invariants
//! - Write paths call `NewEvent::validate()` before SQL mutations.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::DbError;
use crate::model::event::{
    Event, EventId, EventSchedule, EventValidationError, NewEvent, WeekdaySet,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const EVENT_SELECT_SQL: &str = "SELECT
    id,
    title,
    recurring,
    recurring_days,
    start_datetime,
    end_datetime,
    start_time,
    end_time
FROM event";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for event persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Validation(EventValidationError),
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted event data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<EventValidationError> for RepoError {
    fn from(value: EventValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for event storage and conflict lookups.
pub trait EventRepository {
    /// Inserts one event and returns its store-assigned id.
    fn insert_event(&self, event: &NewEvent) -> RepoResult<EventId>;
    /// Hard-deletes one event. Missing ids are not an error.
    fn delete_event(&self, id: EventId) -> RepoResult<()>;
    /// Lists all events by ascending id.
    fn list_events(&self) -> RepoResult<Vec<Event>>;
    /// First non-recurring event whose absolute span intersects `(start, end)`.
    fn find_one_off_overlapping(&self, start: i64, end: i64) -> RepoResult<Option<Event>>;
    /// All recurring events.
    fn list_recurring(&self) -> RepoResult<Vec<Event>>;
    /// Non-recurring events starting strictly after `instant`.
    fn list_one_off_starting_after(&self, instant: i64) -> RepoResult<Vec<Event>>;
    /// Runs `op` as one write-locked unit; commits on `Ok`, rolls back on `Err`.
    fn atomically<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>;
}

/// SQLite-backed event repository.
pub struct SqliteEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn insert_event(&self, event: &NewEvent) -> RepoResult<EventId> {
        event.validate()?;
        let window = event.window();

        match &event.schedule {
            EventSchedule::OneOff { start, end } => {
                self.conn.execute(
                    "INSERT INTO event (
                        title,
                        recurring,
                        start_datetime,
                        end_datetime,
                        start_time,
                        end_time
                    ) VALUES (?1, 0, ?2, ?3, ?4, ?5);",
                    params![
                        event.title.as_str(),
                        start.timestamp(),
                        end.timestamp(),
                        window.start,
                        window.end,
                    ],
                )?;
            }
            EventSchedule::Weekly { days, .. } => {
                self.conn.execute(
                    "INSERT INTO event (
                        title,
                        recurring,
                        recurring_days,
                        start_time,
                        end_time
                    ) VALUES (?1, 1, ?2, ?3, ?4);",
                    params![
                        event.title.as_str(),
                        days.to_db_string(),
                        window.start,
                        window.end,
                    ],
                )?;
            }
        }

        Ok(self.conn.last_insert_rowid())
    }

    fn delete_event(&self, id: EventId) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM event WHERE id = ?1;", [id])?;
        Ok(())
    }

    fn list_events(&self) -> RepoResult<Vec<Event>> {
        self.query_events(&format!("{EVENT_SELECT_SQL} ORDER BY id ASC;"), [])
    }

    fn find_one_off_overlapping(&self, start: i64, end: i64) -> RepoResult<Option<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EVENT_SELECT_SQL}
             WHERE recurring = 0
               AND start_datetime < ?2
               AND end_datetime > ?1
             ORDER BY id ASC
             LIMIT 1;"
        ))?;
        let row = stmt
            .query_row(params![start, end], |row| Ok(parse_event_row(row)))
            .optional()?;
        row.transpose()
    }

    fn list_recurring(&self) -> RepoResult<Vec<Event>> {
        self.query_events(
            &format!("{EVENT_SELECT_SQL} WHERE recurring = 1 ORDER BY id ASC;"),
            [],
        )
    }

    fn list_one_off_starting_after(&self, instant: i64) -> RepoResult<Vec<Event>> {
        self.query_events(
            &format!(
                "{EVENT_SELECT_SQL}
                 WHERE recurring = 0
                   AND start_datetime > ?1
                 ORDER BY id ASC;"
            ),
            [instant],
        )
    }

    fn atomically<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        let value = op(self)?;
        tx.commit().map_err(RepoError::from)?;
        Ok(value)
    }
}

impl SqliteEventRepository<'_> {
    fn query_events<P: rusqlite::Params>(&self, sql: &str, params: P) -> RepoResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut events = Vec::new();

        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }

        Ok(events)
    }
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<Event> {
    let id: EventId = row.get("id")?;

    let recurring = match row.get::<_, i64>("recurring")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid recurring value `{other}` in event.recurring (id={id})"
            )));
        }
    };

    let recurring_days = match row.get::<_, Option<String>>("recurring_days")? {
        Some(value) => Some(WeekdaySet::parse_db_string(&value).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid weekday list `{value}` in event.recurring_days (id={id})"
            ))
        })?),
        None => None,
    };

    let start_datetime: Option<i64> = row.get("start_datetime")?;
    let end_datetime: Option<i64> = row.get("end_datetime")?;

    let shape_ok = if recurring {
        recurring_days.is_some_and(|days| !days.is_empty())
    } else {
        matches!((start_datetime, end_datetime), (Some(start), Some(end)) if end >= start)
    };
    if !shape_ok {
        return Err(RepoError::InvalidData(format!(
            "event row {id} does not match its recurring={} shape",
            u8::from(recurring)
        )));
    }

    Ok(Event {
        id,
        title: row.get("title")?,
        recurring,
        recurring_days,
        start_datetime,
        end_datetime,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
    })
}
