use anyhow::{bail, Result};

use super::args::{ConfluenceCliArgs, ConfluenceCommand};
use super::AppContext;
use crate::confluence::WikiApi;

pub async fn handle_confluence_command(args: ConfluenceCliArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    let client = ctx.client()?;

    match args.command {
        ConfluenceCommand::Test => {
            if client.test_connection().await {
                println!("Connected to {}", client.base_url());
            } else {
                bail!("Could not connect to {}", client.base_url());
            }
        }
        ConfluenceCommand::Space { key } => {
            let space = client.get_space_info(key.as_deref()).await?;
            println!("Key:  {}", space.key);
            println!("Name: {}", space.name);
            if let Some(kind) = space.space_type {
                println!("Type: {}", kind);
            }
            if let Some(url) = space.links.webui {
                println!("URL:  {}{}", client.base_url().trim_end_matches('/'), url);
            }
        }
        ConfluenceCommand::Search {
            query,
            space,
            limit,
        } => {
            let pages = client.search_pages(&query, space.as_deref(), limit).await?;
            if pages.is_empty() {
                println!("No pages matched '{}'.", query);
                return Ok(());
            }
            for page in pages {
                println!("{}  {}", page.id, page.title);
                println!("    {}", client.page_url(&page));
            }
        }
    }

    Ok(())
}
