use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use super::args::{JobCliArgs, JobCommand};
use super::AppContext;
use crate::db::{JobRepository, NewJob};

pub fn handle_job_command(args: JobCliArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    match args.command {
        JobCommand::Add {
            summary_file,
            filename,
            id,
        } => handle_add(&ctx, &summary_file, filename, id),
        JobCommand::List { limit } => handle_list(&ctx, limit),
    }
}

fn handle_add(
    ctx: &AppContext,
    summary_file: &Path,
    filename: Option<String>,
    id: Option<String>,
) -> Result<()> {
    if !summary_file.is_file() {
        bail!("Summary file not found: {:?}", summary_file);
    }
    let summary_file = summary_file
        .canonicalize()
        .with_context(|| format!("Failed to resolve {:?}", summary_file))?;

    let filename = filename.unwrap_or_else(|| {
        summary_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let job_id = id.unwrap_or_else(|| Uuid::new_v4().to_string());

    let db = ctx.open_db()?;
    db.with_conn(|conn| {
        JobRepository::insert(
            conn,
            &NewJob {
                job_id: job_id.clone(),
                filename: filename.clone(),
                summary_file: Some(summary_file.to_string_lossy().into_owned()),
            },
        )
    })?;

    info!("Registered job {} for {:?}", job_id, summary_file);
    println!("Job ID: {}", job_id);
    Ok(())
}

fn handle_list(ctx: &AppContext, limit: usize) -> Result<()> {
    let db = ctx.open_db()?;
    let jobs = db.with_conn(|conn| JobRepository::list(conn, limit))?;

    if jobs.is_empty() {
        println!("No jobs registered.");
        return Ok(());
    }

    for job in jobs {
        println!("ID:       {}", job.job_id);
        println!("File:     {}", job.filename);
        println!(
            "Summary:  {}",
            job.summary_file.as_deref().unwrap_or("<none>")
        );
        println!("Created:  {}", job.created_at);
        println!("---");
    }
    Ok(())
}
