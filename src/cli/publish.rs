//! CLI handlers for publishing and publication management.

use anyhow::{anyhow, Context, Result};

use super::args::{PublicationsCliArgs, PublicationsCommand, PublishCliArgs};
use super::AppContext;
use crate::confluence::ConfluenceClient;
use crate::db::{JobRepository, PublicationRecord, PublicationRepository};
use crate::publication::{PublicationService, PublicationStatus, PublishOptions};

fn service(ctx: &AppContext) -> Result<PublicationService<ConfluenceClient>> {
    let db = ctx.open_db()?;
    PublicationService::new(db, ctx.client()?)
}

pub async fn handle_publish_command(args: PublishCliArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    let db = ctx.open_db()?;

    let job = db
        .with_conn(|conn| JobRepository::get(conn, &args.job_id))?
        .ok_or_else(|| anyhow!("Job {} not found", args.job_id))?;
    let summary_path = job
        .summary_file
        .as_deref()
        .ok_or_else(|| anyhow!("Job {} has no summary file", job.job_id))?;
    let content = tokio::fs::read_to_string(summary_path)
        .await
        .with_context(|| format!("Failed to read summary file {}", summary_path))?;

    let service = PublicationService::new(db, ctx.client()?)?;
    let record = service
        .publish(
            &job.job_id,
            &content,
            PublishOptions {
                title: args.title,
                space_key: args.space,
                parent_page_id: args.parent,
                filename: None,
            },
        )
        .await
        .with_context(|| {
            format!(
                "Publishing job {} failed; the attempt was recorded, see `minutebook publications list {}`",
                job.job_id, job.job_id
            )
        })?;

    println!("Published: {}", record.title);
    print_record(&record);
    Ok(())
}

pub async fn handle_publications_command(args: PublicationsCliArgs) -> Result<()> {
    let ctx = AppContext::load()?;

    match args.command {
        PublicationsCommand::List { job_id } => {
            let db = ctx.open_db()?;
            let records = db.with_conn(|conn| {
                PublicationRepository::list_for_job(conn, &job_id)
            })?;
            print_records(&records, &format!("No publications for job {}.", job_id));
        }
        PublicationsCommand::Retry { id } => {
            let record = service(&ctx)?
                .retry(id)
                .await
                .with_context(|| format!("Retry of publication {} failed", id))?;
            println!("Publication {} is now {}", id, record.status);
            print_record(&record);
        }
        PublicationsCommand::Delete { id, remote } => {
            let deleted = if remote {
                service(&ctx)?.delete(id, true).await?
            } else {
                let db = ctx.open_db()?;
                db.with_conn(|conn| PublicationRepository::delete(conn, id))?
            };
            if deleted {
                println!("Deleted publication {}", id);
            } else {
                println!("Publication {} not found", id);
            }
        }
        PublicationsCommand::Stats => {
            let db = ctx.open_db()?;
            let stats = db.with_conn(PublicationRepository::statistics)?;
            println!("Total:     {}", stats.total);
            println!("Published: {}", stats.published);
            println!("Failed:    {}", stats.failed);
            println!("Pending:   {}", stats.pending);
            println!("Retrying:  {}", stats.retrying);
            if !stats.by_space.is_empty() {
                println!("\nBy space:");
                for space in stats.by_space {
                    println!(
                        "  {:<12} {} total, {} published",
                        space.space_key, space.total, space.published
                    );
                }
            }
        }
        PublicationsCommand::Status { status, limit } => {
            let status = PublicationStatus::parse(&status).ok_or_else(|| {
                anyhow!(
                    "Unknown status '{}'; expected one of pending, published, failed, retrying",
                    status
                )
            })?;
            let db = ctx.open_db()?;
            let records = db.with_conn(|conn| {
                PublicationRepository::list_by_status(conn, status, limit)
            })?;
            print_records(&records, &format!("No {} publications.", status));
        }
    }

    Ok(())
}

fn print_records(records: &[PublicationRecord], empty_message: &str) {
    if records.is_empty() {
        println!("{}", empty_message);
        return;
    }
    println!("Found {} publication(s):\n", records.len());
    for record in records {
        print_record(record);
    }
}

fn print_record(record: &PublicationRecord) {
    println!("ID:      {}", record.id);
    println!("Job:     {}", record.job_id);
    println!("Title:   {}", record.title);
    println!("Space:   {}", record.remote_space_key);
    println!("Status:  {}", record.status);
    if let Some(url) = &record.remote_page_url {
        println!("URL:     {}", url);
    }
    if let Some(error) = &record.error_message {
        println!("Error:   {}", error);
    }
    if record.retry_count > 0 {
        println!(
            "Retries: {} (last {})",
            record.retry_count,
            record.last_retry_at.as_deref().unwrap_or("unknown")
        );
    }
    println!("Updated: {}", record.updated_at);
    println!("---");
}
