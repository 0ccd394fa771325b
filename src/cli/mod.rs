mod nuke;
mod sync;

pub use nuke::nuke;
pub use sync::sync_folder;

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use log::info;

use crate::{config::Config, repository::SequenceSet};

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Folder whose state is synced
    #[arg(short, long)]
    pub folder: String,

    /// Config file, defaults to $XDG_CONFIG_HOME/foldersync/config.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Recorded IMAP server responses to answer fetches from
    #[arg(short, long, required_unless_present = "nuke")]
    pub transcript: Option<PathBuf>,

    /// Uids to sync, e.g. 1:20,25
    #[arg(short, long, required_unless_present = "nuke")]
    pub uids: Option<SequenceSet>,

    /// Delete all state of the folder instead of syncing
    #[arg(long, conflicts_with_all = ["transcript", "uids"])]
    pub nuke: bool,
}

pub fn run(args: &Args, config: &Config) -> Result<()> {
    if args.nuke {
        return nuke(config, &args.folder);
    }
    let (Some(transcript), Some(uids)) = (&args.transcript, &args.uids) else {
        bail!("syncing needs --transcript and --uids");
    };
    let summary = sync_folder(config, &args.folder, transcript, uids)?;
    info!("{} done: {summary}", args.folder);

    Ok(())
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;

    #[rstest]
    fn test_sync_arguments() {
        let args = assert_ok!(Args::try_parse_from([
            "foldersync",
            "--folder",
            "inbox",
            "--transcript",
            "inbox.imap",
            "--uids",
            "1:3,7",
        ]));

        assert_eq!(args.folder, "inbox");
        assert_eq!(assert_some!(args.uids).iter().count(), 4);
        assert!(!args.nuke);
    }

    #[rstest]
    fn test_nuke_needs_no_transcript() {
        let args = assert_ok!(Args::try_parse_from(["foldersync", "-f", "inbox", "--nuke"]));

        assert!(args.nuke);
        assert_none!(args.transcript);
    }

    #[rstest]
    #[case::missing_uids(&["foldersync", "-f", "inbox", "-t", "inbox.imap"])]
    #[case::nuke_with_uids(&["foldersync", "-f", "inbox", "--nuke", "-u", "1"])]
    #[case::bad_uids(&["foldersync", "-f", "inbox", "-t", "inbox.imap", "-u", "3:1"])]
    fn test_rejects_invalid_arguments(#[case] args: &[&str]) {
        assert_err!(Args::try_parse_from(args));
    }

    #[rstest]
    fn test_nuke_removes_folder_state() {
        let dir = assert_ok!(tempfile::tempdir());
        let config = assert_ok!(toml::from_str::<Config>(&format!(
            "statedir = {:?}",
            dir.path().display().to_string()
        )));
        let state = crate::store::SqliteStore::folder_dir(config.statedir(), "inbox");
        assert_ok!(std::fs::create_dir_all(&state));

        assert_ok!(nuke(&config, "inbox"));
        assert!(!state.exists());
        assert_ok!(nuke(&config, "inbox"));
    }
}
