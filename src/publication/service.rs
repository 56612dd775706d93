//! Publishes job summaries to the wiki and tracks each attempt.
//!
//! Every publish inserts a `pending` row before the remote call and resolves
//! it to `published` or `failed` afterwards, so a failed attempt is recorded
//! even though the error is still returned to the caller.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::confluence::api::{NewPage, PageInfo, WikiApi};
use crate::confluence::content::ContentProcessor;
use crate::confluence::error::{PublishError, Result};
use crate::db::{
    Database, JobRecord, JobRepository, NewPublication, PublicationRecord, PublicationRepository,
    PublicationStats,
};
use crate::publication::status::PublicationStatus;

/// Per-call overrides for [`PublicationService::publish`].
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Page title; derived from the document when absent
    pub title: Option<String>,
    pub space_key: Option<String>,
    pub parent_page_id: Option<String>,
    /// Title fallback when the document has no topic; defaults to the job's file name
    pub filename: Option<String>,
}

pub struct PublicationService<A: WikiApi> {
    db: Arc<Database>,
    api: A,
    content: ContentProcessor,
}

impl<A: WikiApi> PublicationService<A> {
    pub fn new(db: Arc<Database>, api: A) -> anyhow::Result<Self> {
        Ok(Self {
            db,
            api,
            content: ContentProcessor::new()?,
        })
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Publish a Markdown document for a job as a new page.
    pub async fn publish(
        &self,
        job_id: &str,
        content: &str,
        options: PublishOptions,
    ) -> Result<PublicationRecord> {
        if job_id.trim().is_empty() {
            return Err(PublishError::Validation("job id must not be empty".into()));
        }
        if content.trim().is_empty() {
            return Err(PublishError::Validation(
                "document content must not be empty".into(),
            ));
        }

        let job = self.require_job(job_id)?;

        let space_key = options
            .space_key
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.api.default_space().to_string());
        if space_key.trim().is_empty() {
            return Err(PublishError::Validation("no space key configured".into()));
        }
        let parent_page_id = options
            .parent_page_id
            .or_else(|| self.api.default_parent().map(str::to_string));

        let title = match options.title.filter(|t| !t.trim().is_empty()) {
            Some(title) => title,
            None => {
                let info = self.content.extract_meeting_info(content);
                let fallback = options.filename.unwrap_or_else(|| job.filename.clone());
                self.content.generate_page_title(
                    info.date.as_deref(),
                    info.topic.as_deref(),
                    Some(&fallback),
                )
            }
        };
        let body = self.content.markdown_to_storage(content);

        let id = self.db.with_conn(|conn| {
            PublicationRepository::insert(
                conn,
                &NewPublication {
                    job_id: job.job_id.clone(),
                    remote_space_key: space_key.clone(),
                    parent_page_id: parent_page_id.clone(),
                    title: title.clone(),
                },
            )
        })?;
        info!(
            "Publishing job {} as '{}' to space {} (publication {})",
            job.job_id, title, space_key, id
        );

        let outcome = self
            .api
            .create_page(NewPage {
                title: &title,
                body: &body,
                space_key: &space_key,
                parent_page_id: parent_page_id.as_deref(),
            })
            .await;

        self.resolve(id, outcome)
    }

    /// Re-attempt a failed publication using the job's stored summary.
    ///
    /// Rows that already reference a page (created remotely but never marked
    /// published) update it in place; others create a new page with the
    /// row's stored title, space and parent.
    pub async fn retry(&self, publication_id: i64) -> Result<PublicationRecord> {
        let record = self.require_publication(publication_id)?;
        if record.status.is_terminal() {
            return Err(PublishError::Validation(format!(
                "publication {} is already published; publish the job again for a new page",
                publication_id
            )));
        }
        if !record.status.can_transition_to(PublicationStatus::Retrying) {
            return Err(PublishError::Validation(format!(
                "publication {} is {}; only failed publications can be retried",
                publication_id, record.status
            )));
        }

        let job = self.require_job(&record.job_id)?;

        let claimed = self
            .db
            .with_conn(|conn| PublicationRepository::begin_retry(conn, publication_id))?;
        if !claimed {
            return Err(PublishError::Validation(format!(
                "publication {} is no longer failed; another retry may be in progress",
                publication_id
            )));
        }
        info!(
            "Retrying publication {} (attempt {})",
            publication_id,
            record.retry_count + 1
        );

        let content = match self.read_summary(&job).await {
            Ok(content) => content,
            Err(e) => {
                self.record_failure(publication_id, &e)?;
                return Err(e);
            }
        };
        let body = self.content.markdown_to_storage(&content);

        let outcome = match record.remote_page_id.as_deref() {
            Some(page_id) => self.update_existing(page_id, &record.title, &body).await,
            None => {
                self.api
                    .create_page(NewPage {
                        title: &record.title,
                        body: &body,
                        space_key: &record.remote_space_key,
                        parent_page_id: record.parent_page_id.as_deref(),
                    })
                    .await
            }
        };

        self.resolve(publication_id, outcome)
    }

    pub fn get(&self, publication_id: i64) -> Result<Option<PublicationRecord>> {
        Ok(self
            .db
            .with_conn(|conn| PublicationRepository::get(conn, publication_id))?)
    }

    pub fn list_for_job(&self, job_id: &str) -> Result<Vec<PublicationRecord>> {
        Ok(self
            .db
            .with_conn(|conn| PublicationRepository::list_for_job(conn, job_id))?)
    }

    pub fn list_by_status(
        &self,
        status: PublicationStatus,
        limit: usize,
    ) -> Result<Vec<PublicationRecord>> {
        Ok(self
            .db
            .with_conn(|conn| PublicationRepository::list_by_status(conn, status, limit))?)
    }

    pub fn statistics(&self) -> Result<PublicationStats> {
        Ok(self.db.with_conn(PublicationRepository::statistics)?)
    }

    /// Delete a publication row, optionally removing its page first.
    ///
    /// A page that is already gone does not block the row deletion; any
    /// other remote failure does, and the row is kept.
    pub async fn delete(&self, publication_id: i64, also_remote: bool) -> Result<bool> {
        let Some(record) = self.get(publication_id)? else {
            return Ok(false);
        };

        if also_remote {
            if let Some(page_id) = record.remote_page_id.as_deref() {
                match self.api.delete_page(page_id).await {
                    Ok(()) => {}
                    Err(PublishError::NotFound(_)) => {
                        warn!(
                            "Page {} for publication {} was already deleted",
                            page_id, publication_id
                        );
                    }
                    Err(e) => {
                        error!(
                            "Failed to delete page {} for publication {}: {}",
                            page_id, publication_id, e
                        );
                        return Err(e);
                    }
                }
            }
        }

        let deleted = self
            .db
            .with_conn(|conn| PublicationRepository::delete(conn, publication_id))?;
        if deleted {
            info!("Deleted publication {}", publication_id);
        }
        Ok(deleted)
    }

    async fn update_existing(&self, page_id: &str, title: &str, body: &str) -> Result<PageInfo> {
        let current = self.api.get_page_info(page_id).await?;
        self.api
            .update_page(page_id, title, body, current.version_number())
            .await
    }

    async fn read_summary(&self, job: &JobRecord) -> Result<String> {
        let path = job.summary_file.as_deref().ok_or_else(|| {
            PublishError::Validation(format!("job {} has no summary file", job.job_id))
        })?;
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            PublishError::Validation(format!("cannot read summary file {}: {}", path, e))
        })?;
        if content.trim().is_empty() {
            return Err(PublishError::Validation(format!(
                "summary file {} is empty",
                path
            )));
        }
        Ok(content)
    }

    fn resolve(&self, id: i64, outcome: Result<PageInfo>) -> Result<PublicationRecord> {
        match outcome {
            Ok(page) => {
                let url = self.api.page_url(&page);
                if let Err(db_err) = self.db.with_conn(|conn| {
                    PublicationRepository::mark_published(conn, id, &page.id, &url)
                }) {
                    return Err(self.record_unsaved_page(id, &page.id, &url, db_err));
                }
                info!("Publication {} published as page {} ({})", id, page.id, url);
                self.require_publication(id)
            }
            Err(e) => {
                error!("Publication {} failed: {}", id, e);
                self.record_failure(id, &e)?;
                Err(e)
            }
        }
    }

    /// The page exists remotely but the row could not be marked published.
    /// Leave the row failed so it can be retried, keeping the page reference
    /// when the database accepts it.
    fn record_unsaved_page(
        &self,
        id: i64,
        page_id: &str,
        url: &str,
        db_err: anyhow::Error,
    ) -> PublishError {
        error!(
            "Page {} was created but publication {} could not be marked published: {:#}",
            page_id, id, db_err
        );
        let err = PublishError::Storage(db_err.context(format!(
            "page {} was created but publication {} could not be marked published",
            page_id, id
        )));
        let message = err.to_string();

        let kept_page = self.db.with_conn(|conn| {
            PublicationRepository::mark_failed_with_page(conn, id, page_id, url, &message)
        });
        if let Err(e) = kept_page {
            warn!(
                "Could not keep page {} on publication {}: {:#}",
                page_id, id, e
            );
            if let Err(record_err) = self.record_failure(id, &err) {
                return record_err;
            }
        }
        err
    }

    fn record_failure(&self, id: i64, err: &PublishError) -> Result<()> {
        let message = err.to_string();
        self.db
            .with_conn(|conn| PublicationRepository::mark_failed(conn, id, &message))
            .map_err(|db_err| {
                error!("Could not record failure of publication {}: {:#}", id, db_err);
                PublishError::Storage(db_err.context(format!(
                    "failed to record publication {} failure: {}",
                    id, message
                )))
            })
    }

    fn require_job(&self, job_id: &str) -> Result<JobRecord> {
        self.db
            .with_conn(|conn| JobRepository::get(conn, job_id))?
            .ok_or_else(|| PublishError::NotFound(format!("job {} not found", job_id)))
    }

    fn require_publication(&self, id: i64) -> Result<PublicationRecord> {
        self.get(id)?
            .ok_or_else(|| PublishError::NotFound(format!("publication {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confluence::api::{PageLinks, PageVersion, SpaceInfo};
    use crate::db::NewJob;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    const SUMMARY: &str = "# Sprint planning\nDate: 02.09.2025\nTopic: Sprint planning\n\n- ship it\n";

    #[derive(Default)]
    struct FakeWiki {
        create_results: Mutex<VecDeque<Result<PageInfo>>>,
        update_results: Mutex<VecDeque<Result<PageInfo>>>,
        delete_results: Mutex<VecDeque<Result<()>>>,
        created: Mutex<Vec<(String, String, String, Option<String>)>>,
        updated: Mutex<Vec<(String, u64)>>,
        deleted: Mutex<Vec<String>>,
    }

    impl FakeWiki {
        fn push_create(&self, result: Result<PageInfo>) {
            self.create_results.lock().unwrap().push_back(result);
        }
    }

    fn page(id: &str) -> PageInfo {
        PageInfo {
            id: id.to_string(),
            title: String::new(),
            version: Some(PageVersion { number: 1 }),
            space: None,
            links: PageLinks {
                webui: Some(format!("/pages/{}", id)),
            },
        }
    }

    #[async_trait]
    impl WikiApi for FakeWiki {
        async fn create_page(&self, page_req: NewPage<'_>) -> Result<PageInfo> {
            self.created.lock().unwrap().push((
                page_req.title.to_string(),
                page_req.body.to_string(),
                page_req.space_key.to_string(),
                page_req.parent_page_id.map(str::to_string),
            ));
            self.create_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(page("100")))
        }

        async fn update_page(
            &self,
            page_id: &str,
            _title: &str,
            _body: &str,
            current_version: u64,
        ) -> Result<PageInfo> {
            self.updated
                .lock()
                .unwrap()
                .push((page_id.to_string(), current_version));
            self.update_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(page(page_id)))
        }

        async fn get_page_info(&self, page_id: &str) -> Result<PageInfo> {
            let mut info = page(page_id);
            info.version = Some(PageVersion { number: 3 });
            Ok(info)
        }

        async fn delete_page(&self, page_id: &str) -> Result<()> {
            self.deleted.lock().unwrap().push(page_id.to_string());
            self.delete_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        }

        async fn search_pages(
            &self,
            _query: &str,
            _space_key: Option<&str>,
            _limit: u32,
        ) -> Result<Vec<PageInfo>> {
            Ok(Vec::new())
        }

        async fn get_space_info(&self, space_key: Option<&str>) -> Result<SpaceInfo> {
            Ok(SpaceInfo {
                key: space_key.unwrap_or("TEAM").to_string(),
                ..Default::default()
            })
        }

        async fn test_connection(&self) -> bool {
            true
        }

        fn base_url(&self) -> &str {
            "https://wiki.example.com/"
        }

        fn default_space(&self) -> &str {
            "TEAM"
        }

        fn default_parent(&self) -> Option<&str> {
            Some("42")
        }
    }

    struct Fixture {
        service: PublicationService<FakeWiki>,
        db: Arc<Database>,
        _summary: Option<NamedTempFile>,
    }

    fn fixture_with_summary(summary: Option<&str>) -> Fixture {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let file = summary.map(|text| {
            let mut file = NamedTempFile::new().unwrap();
            file.write_all(text.as_bytes()).unwrap();
            file
        });
        let summary_file = file
            .as_ref()
            .map(|f| f.path().to_string_lossy().into_owned());

        db.with_conn(|conn| {
            JobRepository::insert(
                conn,
                &NewJob {
                    job_id: "job-1".to_string(),
                    filename: "planning.m4a".to_string(),
                    summary_file,
                },
            )
        })
        .unwrap();

        Fixture {
            service: PublicationService::new(db.clone(), FakeWiki::default()).unwrap(),
            db,
            _summary: file,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_summary(Some(SUMMARY))
    }

    fn network_error() -> PublishError {
        PublishError::Network("connection timed out".into())
    }

    #[tokio::test]
    async fn publish_success_records_published_row() {
        let f = fixture();
        f.service.api().push_create(Ok(page("555")));

        let record = f
            .service
            .publish("job-1", SUMMARY, PublishOptions::default())
            .await
            .unwrap();

        assert_eq!(record.status, PublicationStatus::Published);
        assert_eq!(record.remote_page_id.as_deref(), Some("555"));
        assert_eq!(
            record.remote_page_url.as_deref(),
            Some("https://wiki.example.com/pages/555")
        );
        assert_eq!(record.title, "2025-09-02 Sprint planning");
        assert_eq!(record.remote_space_key, "TEAM");
        assert_eq!(record.parent_page_id.as_deref(), Some("42"));
        assert!(record.error_message.is_none());
        assert_eq!(record.retry_count, 0);

        let created = f.service.api().created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert!(created[0].1.contains("<h1>Sprint planning</h1>"));
    }

    #[tokio::test]
    async fn publish_honours_overrides() {
        let f = fixture();
        let record = f
            .service
            .publish(
                "job-1",
                SUMMARY,
                PublishOptions {
                    title: Some("Custom title".into()),
                    space_key: Some("DOCS".into()),
                    parent_page_id: Some("7".into()),
                    filename: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(record.title, "Custom title");
        assert_eq!(record.remote_space_key, "DOCS");
        assert_eq!(record.parent_page_id.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn publish_failure_persists_failed_row_and_returns_error() {
        let f = fixture();
        f.service.api().push_create(Err(network_error()));

        let err = f
            .service
            .publish("job-1", SUMMARY, PublishOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Network(_)));

        let rows = f.service.list_for_job("job-1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, PublicationStatus::Failed);
        assert!(rows[0].remote_page_id.is_none());
        assert!(rows[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("connection timed out"));
    }

    #[tokio::test]
    async fn publish_validates_before_writing() {
        let f = fixture();

        let err = f
            .service
            .publish("  ", SUMMARY, PublishOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Validation(_)));

        let err = f
            .service
            .publish("job-1", " \n ", PublishOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Validation(_)));

        let err = f
            .service
            .publish("job-404", SUMMARY, PublishOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::NotFound(_)));

        assert_eq!(f.service.statistics().unwrap().total, 0);
        assert!(f.service.api().created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn retry_after_failure_publishes() {
        let f = fixture();
        f.service.api().push_create(Err(network_error()));
        let _ = f
            .service
            .publish("job-1", SUMMARY, PublishOptions::default())
            .await;
        let failed = f.service.list_for_job("job-1").unwrap().remove(0);

        f.service.api().push_create(Ok(page("777")));
        let record = f.service.retry(failed.id).await.unwrap();

        assert_eq!(record.status, PublicationStatus::Published);
        assert_eq!(record.retry_count, 1);
        assert!(record.error_message.is_none());
        assert!(record.last_retry_at.is_some());
        assert_eq!(record.remote_page_id.as_deref(), Some("777"));
        assert_eq!(record.title, failed.title);
        assert!(record.updated_at > failed.updated_at);

        let created = f.service.api().created.lock().unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(created[1].0, failed.title);
    }

    #[tokio::test]
    async fn retry_failure_keeps_counting() {
        let f = fixture();
        f.service.api().push_create(Err(network_error()));
        let _ = f
            .service
            .publish("job-1", SUMMARY, PublishOptions::default())
            .await;
        let id = f.service.list_for_job("job-1").unwrap()[0].id;

        f.service.api().push_create(Err(PublishError::Api {
            status: 500,
            message: "internal".into(),
        }));
        let err = f.service.retry(id).await.unwrap_err();
        assert!(matches!(err, PublishError::Api { status: 500, .. }));

        let record = f.service.get(id).unwrap().unwrap();
        assert_eq!(record.status, PublicationStatus::Failed);
        assert_eq!(record.retry_count, 1);
        assert!(record.error_message.unwrap().contains("internal"));

        f.service.api().push_create(Err(network_error()));
        let _ = f.service.retry(id).await;
        assert_eq!(f.service.get(id).unwrap().unwrap().retry_count, 2);
    }

    #[tokio::test]
    async fn unsaved_page_leaves_row_failed_and_retry_updates_it() {
        let f = fixture();
        f.db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER block_published BEFORE UPDATE OF status ON publications \
                 WHEN NEW.status = 'published' \
                 BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        let err = f
            .service
            .publish("job-1", SUMMARY, PublishOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Storage(_)), "got {:?}", err);

        let rows = f.service.list_for_job("job-1").unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.status, PublicationStatus::Failed);
        assert_eq!(row.remote_page_id.as_deref(), Some("100"));
        assert!(row
            .error_message
            .as_deref()
            .unwrap()
            .contains("could not be marked published"));

        f.db.with_conn(|conn| {
            conn.execute_batch("DROP TRIGGER block_published;")?;
            Ok(())
        })
        .unwrap();

        let record = f.service.retry(row.id).await.unwrap();

        assert_eq!(record.status, PublicationStatus::Published);
        assert_eq!(record.remote_page_id.as_deref(), Some("100"));
        assert_eq!(record.retry_count, 1);
        assert!(record.error_message.is_none());
        assert_eq!(
            *f.service.api().updated.lock().unwrap(),
            vec![("100".to_string(), 3)]
        );
        assert_eq!(f.service.api().created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_page_id_leaves_row_retryable() {
        let f = fixture();
        f.service
            .publish("job-1", SUMMARY, PublishOptions::default())
            .await
            .unwrap();

        let err = f
            .service
            .publish("job-1", SUMMARY, PublishOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Storage(_)), "got {:?}", err);

        let rows = f.service.list_for_job("job-1").unwrap();
        assert_eq!(rows.len(), 2);
        let second = &rows[1];
        assert_eq!(second.status, PublicationStatus::Failed);
        assert!(second.remote_page_id.is_none());
        assert!(second.error_message.is_some());

        f.service.api().push_create(Ok(page("200")));
        let record = f.service.retry(second.id).await.unwrap();

        assert_eq!(record.status, PublicationStatus::Published);
        assert_eq!(record.remote_page_id.as_deref(), Some("200"));
        assert_eq!(record.retry_count, 1);
    }

    #[tokio::test]
    async fn retry_rejects_non_failed_and_missing() {
        let f = fixture();
        let record = f
            .service
            .publish("job-1", SUMMARY, PublishOptions::default())
            .await
            .unwrap();

        let err = f.service.retry(record.id).await.unwrap_err();
        assert!(matches!(err, PublishError::Validation(_)));

        let err = f.service.retry(9999).await.unwrap_err();
        assert!(matches!(err, PublishError::NotFound(_)));
    }

    #[tokio::test]
    async fn retry_without_summary_file_fails_row() {
        let f = fixture_with_summary(None);
        f.service.api().push_create(Err(network_error()));
        let _ = f
            .service
            .publish("job-1", SUMMARY, PublishOptions::default())
            .await;
        let id = f.service.list_for_job("job-1").unwrap()[0].id;

        let err = f.service.retry(id).await.unwrap_err();
        assert!(matches!(err, PublishError::Validation(_)));

        let record = f.service.get(id).unwrap().unwrap();
        assert_eq!(record.status, PublicationStatus::Failed);
        assert_eq!(record.retry_count, 1);
        assert!(record.error_message.unwrap().contains("no summary file"));
    }

    #[tokio::test]
    async fn concurrent_retries_have_one_winner() {
        let f = fixture();
        f.service.api().push_create(Err(network_error()));
        let _ = f
            .service
            .publish("job-1", SUMMARY, PublishOptions::default())
            .await;
        let id = f.service.list_for_job("job-1").unwrap()[0].id;

        let (first, second) = tokio::join!(f.service.retry(id), f.service.retry(id));

        let outcomes = [first.is_ok(), second.is_ok()];
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        let loser = if first.is_ok() { second } else { first };
        assert!(matches!(loser, Err(PublishError::Validation(_))));

        let record = f.service.get(id).unwrap().unwrap();
        assert_eq!(record.status, PublicationStatus::Published);
        assert_eq!(record.retry_count, 1);
    }

    #[tokio::test]
    async fn delete_ignores_missing_remote_page() {
        let f = fixture();
        let record = f
            .service
            .publish("job-1", SUMMARY, PublishOptions::default())
            .await
            .unwrap();
        f.service
            .api()
            .delete_results
            .lock()
            .unwrap()
            .push_back(Err(PublishError::NotFound("gone".into())));

        assert!(f.service.delete(record.id, true).await.unwrap());
        assert!(f.service.get(record.id).unwrap().is_none());
        assert!(!f.service.delete(record.id, true).await.unwrap());
    }

    #[tokio::test]
    async fn delete_keeps_row_when_remote_delete_fails() {
        let f = fixture();
        let record = f
            .service
            .publish("job-1", SUMMARY, PublishOptions::default())
            .await
            .unwrap();
        f.service
            .api()
            .delete_results
            .lock()
            .unwrap()
            .push_back(Err(PublishError::Permission("read only".into())));

        let err = f.service.delete(record.id, true).await.unwrap_err();
        assert!(matches!(err, PublishError::Permission(_)));
        assert!(f.service.get(record.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_local_only_leaves_page() {
        let f = fixture();
        let record = f
            .service
            .publish("job-1", SUMMARY, PublishOptions::default())
            .await
            .unwrap();

        assert!(f.service.delete(record.id, false).await.unwrap());
        assert!(f.service.api().deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_by_status_and_statistics() {
        let f = fixture();
        f.service.api().push_create(Ok(page("1")));
        f.service.api().push_create(Err(network_error()));
        f.service.api().push_create(Err(network_error()));
        for _ in 0..3 {
            let _ = f
                .service
                .publish("job-1", SUMMARY, PublishOptions::default())
                .await;
        }

        let failed = f
            .service
            .list_by_status(PublicationStatus::Failed, 10)
            .unwrap();
        assert_eq!(failed.len(), 2);

        let stats = f.service.statistics().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.published, 1);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.by_space.len(), 1);
        assert_eq!(stats.by_space[0].space_key, "TEAM");
    }
}
