//! CLI handler for the encrypted token vault.

use anyhow::{anyhow, bail, Result};

use super::args::{CredentialArgs, TokenCliArgs, TokenCommand};
use super::{read_secret, AppContext, API_TOKEN_ENV, VAULT_PASSWORD_ENV};

pub fn handle_token_command(args: TokenCliArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    match args.command {
        TokenCommand::Add(creds) => handle_add(&ctx, creds),
        TokenCommand::List => handle_list(&ctx),
        TokenCommand::Delete(creds) => handle_delete(&ctx, creds),
        TokenCommand::Check => handle_check(&ctx),
    }
}

fn resolve_account(ctx: &AppContext, creds: CredentialArgs) -> Result<(String, String)> {
    let url = creds
        .url
        .or_else(|| Some(ctx.config.confluence.base_url.clone()))
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| anyhow!("No Confluence URL: pass --url or set confluence.base_url"))?;
    let username = creds
        .username
        .or_else(|| Some(ctx.config.confluence.username.clone()))
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| anyhow!("No username: pass --username or set confluence.username"))?;
    Ok((url, username))
}

fn handle_add(ctx: &AppContext, creds: CredentialArgs) -> Result<()> {
    let (url, username) = resolve_account(ctx, creds)?;
    let token = read_secret(API_TOKEN_ENV, "Confluence API token", false)?;
    let password = read_secret(VAULT_PASSWORD_ENV, "Vault password", true)?;

    if !ctx.vault.save(token.trim(), &password, &url, &username) {
        bail!(
            "Failed to save token to {:?}; see log output for details",
            ctx.vault.path()
        );
    }

    println!("Stored token for {} at {}", username, url);
    Ok(())
}

fn handle_list(ctx: &AppContext) -> Result<()> {
    let entries = ctx.vault.list();
    if entries.is_empty() {
        println!("No stored tokens.");
        return Ok(());
    }

    println!("Stored tokens ({}):\n", entries.len());
    for entry in entries {
        println!("URL:       {}", entry.confluence_url);
        println!("Username:  {}", entry.username);
        println!("Created:   {}", entry.created_at);
        println!(
            "Last used: {}",
            entry.last_used.as_deref().unwrap_or("never")
        );
        println!("---");
    }
    Ok(())
}

fn handle_delete(ctx: &AppContext, creds: CredentialArgs) -> Result<()> {
    let (url, username) = resolve_account(ctx, creds)?;
    if ctx.vault.delete(&url, &username) {
        println!("Deleted token for {} at {}", username, url);
    } else {
        println!("No token stored for {} at {}", username, url);
    }
    Ok(())
}

fn handle_check(ctx: &AppContext) -> Result<()> {
    if ctx.vault.validate_store_integrity() {
        println!("Token store {:?} is valid.", ctx.vault.path());
        Ok(())
    } else {
        bail!("Token store {:?} is corrupt or unreadable", ctx.vault.path())
    }
}
