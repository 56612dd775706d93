//! Publish and retry against an in-memory database and a scripted wiki.

use async_trait::async_trait;
use minutebook::confluence::api::{NewPage, PageInfo, PageLinks, SpaceInfo, WikiApi};
use minutebook::confluence::error::Result;
use minutebook::confluence::PublishError;
use minutebook::db::{Database, JobRepository, NewJob};
use minutebook::publication::{PublicationService, PublicationStatus, PublishOptions};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

const SUMMARY: &str = "# Weekly sync\nDate: 2025-09-02\n\n- item one\n- item two\n";

struct ScriptedWiki {
    responses: Mutex<VecDeque<Result<PageInfo>>>,
}

impl ScriptedWiki {
    fn new(responses: Vec<Result<PageInfo>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl WikiApi for ScriptedWiki {
    async fn create_page(&self, _page: NewPage<'_>) -> Result<PageInfo> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected create_page call")
    }

    async fn update_page(&self, _: &str, _: &str, _: &str, _: u64) -> Result<PageInfo> {
        Err(PublishError::Validation("update not scripted".into()))
    }

    async fn get_page_info(&self, page_id: &str) -> Result<PageInfo> {
        Err(PublishError::NotFound(page_id.to_string()))
    }

    async fn delete_page(&self, _page_id: &str) -> Result<()> {
        Ok(())
    }

    async fn search_pages(&self, _: &str, _: Option<&str>, _: u32) -> Result<Vec<PageInfo>> {
        Ok(Vec::new())
    }

    async fn get_space_info(&self, _: Option<&str>) -> Result<SpaceInfo> {
        Ok(SpaceInfo::default())
    }

    async fn test_connection(&self) -> bool {
        true
    }

    fn base_url(&self) -> &str {
        "https://x/wiki"
    }

    fn default_space(&self) -> &str {
        "ENG"
    }

    fn default_parent(&self) -> Option<&str> {
        None
    }
}

fn published_page(id: &str) -> PageInfo {
    PageInfo {
        id: id.to_string(),
        links: PageLinks {
            webui: Some(format!("/display/ENG/{}", id)),
        },
        ..Default::default()
    }
}

fn setup(wiki: ScriptedWiki) -> (PublicationService<ScriptedWiki>, NamedTempFile) {
    let mut summary = NamedTempFile::new().unwrap();
    summary.write_all(SUMMARY.as_bytes()).unwrap();

    let db = Arc::new(Database::open_in_memory().unwrap());
    db.with_conn(|conn| {
        JobRepository::insert(
            conn,
            &NewJob {
                job_id: "J1".to_string(),
                filename: "weekly.m4a".to_string(),
                summary_file: Some(summary.path().to_string_lossy().into_owned()),
            },
        )
    })
    .unwrap();

    (PublicationService::new(db, wiki).unwrap(), summary)
}

#[tokio::test]
async fn test_failed_publish_then_successful_retry() {
    let (service, _summary) = setup(ScriptedWiki::new(vec![
        Err(PublishError::Network("operation timed out".into())),
        Ok(published_page("4242")),
    ]));

    let err = service
        .publish("J1", SUMMARY, PublishOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::Network(_)));

    let rows = service.list_for_job("J1").unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.status, PublicationStatus::Failed);
    assert_eq!(row.retry_count, 0);
    assert!(row
        .error_message
        .as_deref()
        .unwrap()
        .contains("operation timed out"));

    let retried = service.retry(row.id).await.unwrap();
    assert_eq!(retried.status, PublicationStatus::Published);
    assert_eq!(retried.retry_count, 1);
    assert_eq!(retried.error_message, None);
    assert_eq!(
        retried.remote_page_url.as_deref(),
        Some("https://x/wiki/display/ENG/4242")
    );

    let stored = service.get(row.id).unwrap().unwrap();
    assert_eq!(stored, retried);
}

#[tokio::test]
async fn test_authentication_failure_is_recorded_and_raised() {
    let (service, _summary) = setup(ScriptedWiki::new(vec![Err(
        PublishError::Authentication("Confluence rejected the access token".into()),
    )]));

    let err = service
        .publish("J1", SUMMARY, PublishOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::Authentication(_)));

    let failed = service
        .list_by_status(PublicationStatus::Failed, 10)
        .unwrap();
    assert_eq!(failed.len(), 1);
    assert!(failed[0]
        .error_message
        .as_deref()
        .unwrap()
        .contains("rejected the access token"));
}

#[tokio::test]
async fn test_successful_publish_has_no_error() {
    let (service, _summary) = setup(ScriptedWiki::new(vec![Ok(published_page("1"))]));

    let record = service
        .publish("J1", SUMMARY, PublishOptions::default())
        .await
        .unwrap();
    assert_eq!(record.status, PublicationStatus::Published);
    assert!(record.error_message.is_none());
    assert_eq!(record.title, "2025-09-02 Weekly sync");

    let err = service.retry(record.id).await.unwrap_err();
    assert!(matches!(err, PublishError::Validation(_)));

    let err = service.retry(record.id + 100).await.unwrap_err();
    assert!(matches!(err, PublishError::NotFound(_)));
}
