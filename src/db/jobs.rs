//! Job records.
//!
//! Jobs are produced by the external processing pipeline. Only the columns a
//! publication needs are kept here: where the summary document lives and a
//! file name to fall back on for page titles.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: String,
    pub filename: String,
    pub summary_file: Option<String>,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_id: String,
    pub filename: String,
    pub summary_file: Option<String>,
}

pub struct JobRepository;

impl JobRepository {
    pub fn insert(conn: &Connection, job: &NewJob) -> Result<()> {
        conn.execute(
            "INSERT INTO jobs (job_id, filename, summary_file) VALUES (?1, ?2, ?3)",
            params![job.job_id, job.filename, job.summary_file],
        )
        .with_context(|| format!("Failed to insert job {}", job.job_id))?;
        Ok(())
    }

    pub fn get(conn: &Connection, job_id: &str) -> Result<Option<JobRecord>> {
        let mut stmt = conn
            .prepare(
                "SELECT job_id, filename, summary_file, status, created_at \
                 FROM jobs WHERE job_id = ?1",
            )
            .context("Failed to prepare job query")?;

        let mut rows = stmt
            .query_map(params![job_id], map_row)
            .context("Failed to query job")?;

        match rows.next() {
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// List jobs, newest first.
    pub fn list(conn: &Connection, limit: usize) -> Result<Vec<JobRecord>> {
        let mut stmt = conn
            .prepare(
                "SELECT job_id, filename, summary_file, status, created_at \
                 FROM jobs ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            )
            .context("Failed to prepare jobs list query")?;

        let jobs = stmt
            .query_map(params![limit as i64], map_row)
            .context("Failed to list jobs")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to map jobs")?;

        Ok(jobs)
    }

    /// Delete a job. Its publications go with it.
    pub fn delete(conn: &Connection, job_id: &str) -> Result<bool> {
        let deleted = conn
            .execute("DELETE FROM jobs WHERE job_id = ?1", params![job_id])
            .context("Failed to delete job")?;
        Ok(deleted > 0)
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<JobRecord> {
    Ok(JobRecord {
        job_id: row.get(0)?,
        filename: row.get(1)?,
        summary_file: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
    })
}
