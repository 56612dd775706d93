use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

pub fn open_db(db_path: &Path) -> Result<Connection> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let conn = Connection::open(db_path).context("Failed to open database connection")?;
    configure(&conn)?;
    migrate(&conn)?;

    Ok(conn)
}

pub fn configure(conn: &Connection) -> Result<()> {
    conn.busy_timeout(Duration::from_secs(30))
        .context("Failed to set busy timeout")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .context("Failed to enable foreign keys")?;
    Ok(())
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS jobs (
            job_id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            summary_file TEXT,
            status TEXT NOT NULL DEFAULT 'completed',
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create jobs table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS publications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id TEXT NOT NULL,
            remote_page_id TEXT,
            remote_page_url TEXT,
            remote_space_key TEXT NOT NULL,
            parent_page_id TEXT,
            title TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'published', 'failed', 'retrying')),
            error_message TEXT,
            retry_count INTEGER NOT NULL DEFAULT 0 CHECK (retry_count >= 0),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            last_retry_at TEXT,
            UNIQUE (job_id, remote_page_id),
            FOREIGN KEY (job_id) REFERENCES jobs (job_id) ON DELETE CASCADE
        )",
        [],
    )
    .context("Failed to create publications table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_publications_job_id ON publications(job_id)",
        [],
    )
    .context("Failed to create publications job_id index")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_publications_status ON publications(status)",
        [],
    )
    .context("Failed to create publications status index")?;

    Ok(())
}
