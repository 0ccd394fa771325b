use anyhow::{Context, Result};
use log::{info, trace};

use crate::{config::Config, store::SqliteStore};

pub fn nuke(config: &Config, folder: &str) -> Result<()> {
    let state = SqliteStore::folder_dir(config.statedir(), folder);
    if !state.try_exists().context("cannot read state directory")? {
        info!("no state for {folder}, nothing to remove");
        return Ok(());
    }
    trace!("removing {}", state.display());
    SqliteStore::remove(config.statedir(), folder)
        .with_context(|| format!("removing state of {folder} should succeed"))
}
