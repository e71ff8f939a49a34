//! `repowatch token set|show|remove`

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use repowatch_core::settings::{self, TOKEN_ENV};

use super::home;

#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Store a GitHub personal access token.
    Set {
        token: String,
    },

    /// Show the stored token, masked.
    Show,

    /// Forget the stored token.
    Remove,
}

pub fn run(cmd: TokenCommand) -> Result<()> {
    let home = home()?;
    match cmd {
        TokenCommand::Set { token } => {
            if token.trim().is_empty() {
                bail!("token must not be empty");
            }
            settings::save_token_at(&home, &token).context("failed to save token")?;
            println!("✓ Token saved");
        }
        TokenCommand::Show => match settings::stored_token_at(&home) {
            Some(token) => println!("{}", mask(&token)),
            None if std::env::var(TOKEN_ENV).is_ok_and(|v| !v.trim().is_empty()) => {
                println!("No token stored (using ${TOKEN_ENV} from the environment)");
            }
            None => println!("No token stored"),
        },
        TokenCommand::Remove => {
            settings::remove_token_at(&home).context("failed to remove token")?;
            println!("✓ Token removed");
        }
    }
    Ok(())
}

/// Keep the first and last four characters of long tokens.
fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}
