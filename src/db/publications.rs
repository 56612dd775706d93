//! Publication record persistence.
//!
//! CRUD and state transitions for the `publications` table. Raw SQL with
//! rusqlite, same as the jobs repository. Every mutation stamps a fresh
//! `updated_at` that is strictly later than the stored one.

use anyhow::{Context, Result};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::next_timestamp;
use crate::publication::status::PublicationStatus;

const COLUMNS: &str = "id, job_id, remote_page_id, remote_page_url, remote_space_key, \
     parent_page_id, title, status, error_message, retry_count, created_at, updated_at, \
     last_retry_at";

/// A publication record from the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicationRecord {
    pub id: i64,
    pub job_id: String,
    pub remote_page_id: Option<String>,
    pub remote_page_url: Option<String>,
    pub remote_space_key: String,
    pub parent_page_id: Option<String>,
    pub title: String,
    pub status: PublicationStatus,
    pub error_message: Option<String>,
    pub retry_count: i64,
    pub created_at: String,
    pub updated_at: String,
    pub last_retry_at: Option<String>,
}

/// Fields supplied when a publication row is created.
#[derive(Debug, Clone)]
pub struct NewPublication {
    pub job_id: String,
    pub remote_space_key: String,
    pub parent_page_id: Option<String>,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpaceStats {
    pub space_key: String,
    pub total: i64,
    pub published: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PublicationStats {
    pub total: i64,
    pub pending: i64,
    pub published: i64,
    pub failed: i64,
    pub retrying: i64,
    pub by_space: Vec<SpaceStats>,
}

pub struct PublicationRepository;

impl PublicationRepository {
    /// Insert a new pending publication. Returns the new row ID.
    pub fn insert(conn: &Connection, publication: &NewPublication) -> Result<i64> {
        let now = next_timestamp(None);
        conn.execute(
            "INSERT INTO publications \
             (job_id, remote_space_key, parent_page_id, title, status, retry_count, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)",
            params![
                publication.job_id,
                publication.remote_space_key,
                publication.parent_page_id,
                publication.title,
                PublicationStatus::Pending.as_str(),
                now,
            ],
        )
        .context("Failed to insert publication")?;

        Ok(conn.last_insert_rowid())
    }

    pub fn get(conn: &Connection, id: i64) -> Result<Option<PublicationRecord>> {
        let sql = format!("SELECT {} FROM publications WHERE id = ?1", COLUMNS);
        conn.query_row(&sql, params![id], map_row)
            .optional()
            .context("Failed to query publication")
    }

    /// All publications for a job, oldest first.
    pub fn list_for_job(conn: &Connection, job_id: &str) -> Result<Vec<PublicationRecord>> {
        let sql = format!(
            "SELECT {} FROM publications WHERE job_id = ?1 ORDER BY id ASC",
            COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .context("Failed to prepare publications query")?;

        let publications = stmt
            .query_map(params![job_id], map_row)
            .context("Failed to query publications")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to map publications")?;

        Ok(publications)
    }

    /// Publications in a given status, newest first.
    pub fn list_by_status(
        conn: &Connection,
        status: PublicationStatus,
        limit: usize,
    ) -> Result<Vec<PublicationRecord>> {
        let sql = format!(
            "SELECT {} FROM publications WHERE status = ?1 \
             ORDER BY created_at DESC, id DESC LIMIT ?2",
            COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .context("Failed to prepare publications status query")?;

        let publications = stmt
            .query_map(params![status.as_str(), limit as i64], map_row)
            .context("Failed to query publications by status")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to map publications")?;

        Ok(publications)
    }

    /// Record a successful publish and clear any previous error.
    pub fn mark_published(
        conn: &Connection,
        id: i64,
        page_id: &str,
        page_url: &str,
    ) -> Result<()> {
        let now = Self::next_updated_at(conn, id)?;
        conn.execute(
            "UPDATE publications SET status = ?1, remote_page_id = ?2, remote_page_url = ?3, \
             error_message = NULL, updated_at = ?4 WHERE id = ?5",
            params![
                PublicationStatus::Published.as_str(),
                page_id,
                page_url,
                now,
                id
            ],
        )
        .context("Failed to mark publication as published")?;
        Ok(())
    }

    /// Record a failed attempt.
    pub fn mark_failed(conn: &Connection, id: i64, error: &str) -> Result<()> {
        let now = Self::next_updated_at(conn, id)?;
        conn.execute(
            "UPDATE publications SET status = ?1, error_message = ?2, updated_at = ?3 WHERE id = ?4",
            params![PublicationStatus::Failed.as_str(), error, now, id],
        )
        .context("Failed to mark publication as failed")?;
        Ok(())
    }

    /// Record a failed attempt whose page was created remotely, so a later
    /// retry updates that page instead of creating another one.
    pub fn mark_failed_with_page(
        conn: &Connection,
        id: i64,
        page_id: &str,
        page_url: &str,
        error: &str,
    ) -> Result<()> {
        let now = Self::next_updated_at(conn, id)?;
        conn.execute(
            "UPDATE publications SET status = ?1, remote_page_id = ?2, remote_page_url = ?3, \
             error_message = ?4, updated_at = ?5 WHERE id = ?6",
            params![
                PublicationStatus::Failed.as_str(),
                page_id,
                page_url,
                error,
                now,
                id
            ],
        )
        .context("Failed to mark publication as failed")?;
        Ok(())
    }

    /// Move a failed publication to `retrying`, bumping its retry counter.
    ///
    /// The status check and the update are one statement, so of several
    /// concurrent callers only one gets `true`.
    pub fn begin_retry(conn: &Connection, id: i64) -> Result<bool> {
        let now = Self::next_updated_at(conn, id)?;
        let updated = conn
            .execute(
                "UPDATE publications SET status = ?1, retry_count = retry_count + 1, \
                 last_retry_at = ?2, updated_at = ?2 WHERE id = ?3 AND status = ?4",
                params![
                    PublicationStatus::Retrying.as_str(),
                    now,
                    id,
                    PublicationStatus::Failed.as_str()
                ],
            )
            .context("Failed to mark publication as retrying")?;
        Ok(updated == 1)
    }

    pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let deleted = conn
            .execute("DELETE FROM publications WHERE id = ?1", params![id])
            .context("Failed to delete publication")?;
        Ok(deleted > 0)
    }

    pub fn statistics(conn: &Connection) -> Result<PublicationStats> {
        let mut stats = PublicationStats::default();

        let mut stmt = conn
            .prepare("SELECT status, COUNT(*) FROM publications GROUP BY status")
            .context("Failed to prepare publication statistics query")?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .context("Failed to query publication statistics")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to map publication statistics")?;

        for (status, count) in counts {
            stats.total += count;
            match PublicationStatus::parse(&status) {
                Some(PublicationStatus::Pending) => stats.pending = count,
                Some(PublicationStatus::Published) => stats.published = count,
                Some(PublicationStatus::Failed) => stats.failed = count,
                Some(PublicationStatus::Retrying) => stats.retrying = count,
                None => {}
            }
        }

        let mut stmt = conn
            .prepare(
                "SELECT remote_space_key, COUNT(*), \
                 SUM(CASE WHEN status = 'published' THEN 1 ELSE 0 END) \
                 FROM publications GROUP BY remote_space_key ORDER BY remote_space_key",
            )
            .context("Failed to prepare per-space statistics query")?;
        stats.by_space = stmt
            .query_map([], |row| {
                Ok(SpaceStats {
                    space_key: row.get(0)?,
                    total: row.get(1)?,
                    published: row.get(2)?,
                })
            })
            .context("Failed to query per-space statistics")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to map per-space statistics")?;

        Ok(stats)
    }

    fn next_updated_at(conn: &Connection, id: i64) -> Result<String> {
        let previous: Option<String> = conn
            .query_row(
                "SELECT updated_at FROM publications WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read publication timestamp")?;
        Ok(next_timestamp(previous.as_deref()))
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<PublicationRecord> {
    let status: String = row.get(7)?;
    let status = PublicationStatus::parse(&status)
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(7, "status".to_string(), Type::Text))?;

    Ok(PublicationRecord {
        id: row.get(0)?,
        job_id: row.get(1)?,
        remote_page_id: row.get(2)?,
        remote_page_url: row.get(3)?,
        remote_space_key: row.get(4)?,
        parent_page_id: row.get(5)?,
        title: row.get(6)?,
        status,
        error_message: row.get(8)?,
        retry_count: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        last_retry_at: row.get(12)?,
    })
}
