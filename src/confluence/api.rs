use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageVersion {
    pub number: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageLinks {
    #[serde(default)]
    pub webui: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceRef {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A page as returned by `/rest/api/content`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: Option<PageVersion>,
    #[serde(default)]
    pub space: Option<SpaceRef>,
    #[serde(rename = "_links", default)]
    pub links: PageLinks,
}

impl PageInfo {
    pub fn version_number(&self) -> u64 {
        self.version.as_ref().map(|v| v.number).unwrap_or(1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceInfo {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub space_type: Option<String>,
    #[serde(rename = "_links", default)]
    pub links: PageLinks,
}

/// Content to write to a page.
#[derive(Debug, Clone)]
pub struct NewPage<'a> {
    pub title: &'a str,
    /// Confluence storage-format body
    pub body: &'a str,
    pub space_key: &'a str,
    pub parent_page_id: Option<&'a str>,
}

/// Remote wiki operations the publication service depends on.
#[async_trait]
pub trait WikiApi: Send + Sync {
    async fn create_page(&self, page: NewPage<'_>) -> Result<PageInfo>;

    /// Replace a page's title and body. `current_version` is the version the
    /// page has now; the update is written as the next one.
    async fn update_page(
        &self,
        page_id: &str,
        title: &str,
        body: &str,
        current_version: u64,
    ) -> Result<PageInfo>;

    async fn get_page_info(&self, page_id: &str) -> Result<PageInfo>;

    async fn delete_page(&self, page_id: &str) -> Result<()>;

    async fn search_pages(
        &self,
        query: &str,
        space_key: Option<&str>,
        limit: u32,
    ) -> Result<Vec<PageInfo>>;

    async fn get_space_info(&self, space_key: Option<&str>) -> Result<SpaceInfo>;

    async fn test_connection(&self) -> bool;

    fn base_url(&self) -> &str;

    fn default_space(&self) -> &str;

    fn default_parent(&self) -> Option<&str>;

    /// Absolute browser URL for a page.
    fn page_url(&self, page: &PageInfo) -> String {
        format!(
            "{}{}",
            self.base_url().trim_end_matches('/'),
            page.links.webui.as_deref().unwrap_or("")
        )
    }
}
