use anyhow::Result;
use clap::Parser;
use minutebook::cli::{
    handle_confluence_command, handle_job_command, handle_publications_command,
    handle_publish_command, handle_token_command, Cli, CliCommand,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        CliCommand::Version => {
            println!("minutebook {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliCommand::Token(args) => handle_token_command(args),
        CliCommand::Job(args) => handle_job_command(args),
        CliCommand::Publish(args) => handle_publish_command(args).await,
        CliCommand::Publications(args) => handle_publications_command(args).await,
        CliCommand::Confluence(args) => handle_confluence_command(args).await,
    }
}
