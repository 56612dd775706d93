use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "minutebook")]
#[command(about = "Publish meeting summaries to Confluence", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Manage encrypted Confluence API tokens
    Token(TokenCliArgs),
    /// Register jobs whose summaries can be published
    Job(JobCliArgs),
    /// Publish a job's summary as a new Confluence page
    Publish(PublishCliArgs),
    /// Inspect, retry, or delete publications
    Publications(PublicationsCliArgs),
    /// Talk to the configured Confluence server
    Confluence(ConfluenceCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct TokenCliArgs {
    #[command(subcommand)]
    pub command: TokenCommand,
}

#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Encrypt and store a token (prompts, or reads MINUTEBOOK_API_TOKEN)
    Add(CredentialArgs),
    /// List stored credentials without secrets
    List,
    /// Remove a stored token
    Delete(CredentialArgs),
    /// Verify the token store file is well-formed
    Check,
}

#[derive(ClapArgs, Debug)]
pub struct CredentialArgs {
    /// Confluence base URL (default: confluence.base_url from config)
    #[arg(long)]
    pub url: Option<String>,
    /// Account name (default: confluence.username from config)
    #[arg(long)]
    pub username: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct JobCliArgs {
    #[command(subcommand)]
    pub command: JobCommand,
}

#[derive(Subcommand, Debug)]
pub enum JobCommand {
    /// Register a Markdown summary file as a job
    Add {
        /// Path to the Markdown summary
        summary_file: PathBuf,
        /// Original recording name, used when the summary has no topic
        #[arg(long)]
        filename: Option<String>,
        /// Job ID (default: random UUID)
        #[arg(long)]
        id: Option<String>,
    },
    /// List registered jobs
    List {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[derive(ClapArgs, Debug)]
pub struct PublishCliArgs {
    pub job_id: String,
    /// Page title (default: derived from the summary's date and topic)
    #[arg(long)]
    pub title: Option<String>,
    /// Target space key (default: confluence.space_key)
    #[arg(long)]
    pub space: Option<String>,
    /// Parent page ID (default: confluence.parent_page_id)
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct PublicationsCliArgs {
    #[command(subcommand)]
    pub command: PublicationsCommand,
}

#[derive(Subcommand, Debug)]
pub enum PublicationsCommand {
    /// Show every publication of a job
    List { job_id: String },
    /// Retry a failed publication
    Retry { id: i64 },
    /// Delete a publication record
    Delete {
        id: i64,
        /// Also delete the Confluence page
        #[arg(long)]
        remote: bool,
    },
    /// Publication counts by status and space
    Stats,
    /// Publications in a given status (pending, published, failed, retrying)
    Status {
        status: String,
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[derive(ClapArgs, Debug)]
pub struct ConfluenceCliArgs {
    #[command(subcommand)]
    pub command: ConfluenceCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfluenceCommand {
    /// Check that the server is reachable and the token is accepted
    Test,
    /// Show space details (default: configured space)
    Space { key: Option<String> },
    /// Full-text search in a space
    Search {
        query: String,
        #[arg(long)]
        space: Option<String>,
        #[arg(short, long, default_value = "25")]
        limit: u32,
    },
}
