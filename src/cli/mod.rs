use anyhow::{anyhow, bail, Result};
use dialoguer::Password;
use std::io::{self, IsTerminal};
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::confluence::{ClientConfig, ConfluenceClient};
use crate::db::Database;
use crate::vault::TokenVault;

pub mod args;
mod confluence;
mod job;
mod publish;
mod token;

pub use args::{Cli, CliCommand};
pub use confluence::handle_confluence_command;
pub use job::handle_job_command;
pub use publish::{handle_publications_command, handle_publish_command};
pub use token::handle_token_command;

pub const API_TOKEN_ENV: &str = "MINUTEBOOK_API_TOKEN";
pub const VAULT_PASSWORD_ENV: &str = "MINUTEBOOK_VAULT_PASSWORD";

/// Loaded config plus the stores it points at.
pub(crate) struct AppContext {
    pub config: Config,
    pub vault: TokenVault,
}

impl AppContext {
    pub fn load() -> Result<Self> {
        let config = Config::load()?;
        let vault = TokenVault::new(config.vault.resolve_path()?);
        debug!("Using token store {:?}", vault.path());
        Ok(Self { config, vault })
    }

    pub fn open_db(&self) -> Result<Arc<Database>> {
        let path = self.config.database.resolve_path()?;
        debug!("Using database {:?}", path);
        Ok(Arc::new(Database::open(&path)?))
    }

    /// Build a client from config and the vault's token for the configured account.
    pub fn client(&self) -> Result<ConfluenceClient> {
        let confluence = &self.config.confluence;
        if confluence.base_url.is_empty() || confluence.username.is_empty() {
            bail!(
                "confluence.base_url and confluence.username must be set in {:?}",
                crate::global::config_file()?
            );
        }

        let password = read_secret(VAULT_PASSWORD_ENV, "Vault password", false)?;
        let token = self
            .vault
            .load(&password, &confluence.base_url, &confluence.username)
            .ok_or_else(|| {
                anyhow!(
                    "No usable token for {} at {} (missing or wrong password). Run `minutebook token add` first.",
                    confluence.username,
                    confluence.base_url
                )
            })?;

        Ok(ConfluenceClient::new(ClientConfig::from_config(
            confluence, token,
        ))?)
    }
}

/// Read a secret from `env_var`, falling back to an interactive prompt.
pub(crate) fn read_secret(env_var: &str, prompt: &str, confirm: bool) -> Result<String> {
    if let Ok(value) = std::env::var(env_var) {
        if !value.is_empty() {
            debug!("Read {} from environment", prompt);
            return Ok(value);
        }
    }

    if !io::stdin().is_terminal() {
        bail!("{} required: set {} or run interactively", prompt, env_var);
    }

    loop {
        let mut input = Password::new().with_prompt(prompt);
        if confirm {
            input = input.with_confirmation("Confirm", "Values do not match");
        }
        let value = input.interact()?;
        if value.trim().is_empty() {
            println!("{} cannot be empty.", prompt);
            continue;
        }
        return Ok(value);
    }
}
