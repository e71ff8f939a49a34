//! `repowatch folder set|show`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use repowatch_core::settings;

use super::home;

#[derive(Subcommand, Debug)]
pub enum FolderCommand {
    /// Set the folder that `repowatch update` clones into.
    Set { path: PathBuf },

    /// Print the configured folder.
    Show,
}

pub fn run(cmd: FolderCommand) -> Result<()> {
    let home = home()?;
    match cmd {
        FolderCommand::Set { path } => {
            let absolute = std::path::absolute(&path)
                .with_context(|| format!("cannot resolve path '{}'", path.display()))?;
            settings::save_update_folder_at(&home, &absolute)
                .context("failed to save update folder")?;
            println!("✓ Update folder set to {}", absolute.display());
        }
        FolderCommand::Show => match settings::update_folder_at(&home) {
            Some(folder) => println!("{}", folder.display()),
            None => println!("No update folder set. Run: repowatch folder set <PATH>"),
        },
    }
    Ok(())
}
