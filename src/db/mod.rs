mod init;
pub mod jobs;
pub mod publications;


use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

pub use init::{configure, migrate};
pub use jobs::{JobRecord, JobRepository, NewJob};
pub use publications::{
    NewPublication, PublicationRecord, PublicationRepository, PublicationStats, SpaceStats,
};

/// Shared handle to the publication database.
///
/// The connection sits behind a mutex. Callers get it for the span of one
/// closure and must not hold it across an await point.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = init::open_db(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        configure(&conn)?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))?;
        f(&conn)
    }
}

/// Current UTC time as RFC 3339 with microseconds, forced to sort strictly
/// after `previous` when one is given.
pub(crate) fn next_timestamp(previous: Option<&str>) -> String {
    let now = Utc::now();
    let next = match previous.and_then(|p| DateTime::parse_from_rfc3339(p).ok()) {
        Some(prev) => {
            let floor = prev.with_timezone(&Utc) + Duration::microseconds(1);
            now.max(floor)
        }
        None => now,
    };
    next.to_rfc3339_opts(SecondsFormat::Micros, true)
}
