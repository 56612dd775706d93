//! Confluence Server integration: REST client, error taxonomy, and Markdown
//! conversion for meeting summaries.

pub mod api;
pub mod client;
pub mod content;
pub mod error;

pub use api::{NewPage, PageInfo, SpaceInfo, WikiApi};
pub use client::{ClientConfig, ConfluenceClient};
pub use content::{ContentProcessor, MeetingInfo};
pub use error::PublishError;
