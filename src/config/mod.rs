use std::{
    env,
    fs::read_to_string,
    io,
    path::{Path, PathBuf},
};

use derive_getters::Getters;
use log::debug;
use serde::Deserialize;
use thiserror::Error;

use crate::sync::{CostModel, DEFAULT_STARTING_PROGRESS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("neither XDG_CONFIG_HOME nor HOME is set")]
    NoConfigHome,
    #[error("config file {path} is not readable: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("config file {path} is not parseable: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("starting_progress {0} is outside of [0, 1]")]
    StartingProgress(f64),
}

#[derive(Debug, Deserialize, Getters)]
#[serde(default)]
pub struct Config {
    statedir: PathBuf,
    log_level: String,
    starting_progress: f64,
    cost: CostModel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            statedir: statedir(),
            log_level: "info".to_string(),
            starting_progress: DEFAULT_STARTING_PROGRESS,
            cost: CostModel::default(),
        }
    }
}

impl Config {
    /// Loads `file`, or the default location when none is given. A missing
    /// default file means the defaults apply.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(file) = file {
            return Self::load_from_file(file);
        }
        let file = default_location()?;
        if file.exists() {
            Self::load_from_file(&file)
        } else {
            debug!("no config at {}, using defaults", file.display());
            Ok(Self::default())
        }
    }

    pub fn load_from_file(file: &Path) -> Result<Self, ConfigError> {
        let contents = read_to_string(file).map_err(|source| ConfigError::Read {
            path: file.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: file.to_path_buf(),
            source,
        })?;
        if !(0.0..=1.0).contains(&config.starting_progress) {
            return Err(ConfigError::StartingProgress(config.starting_progress));
        }

        Ok(config)
    }
}

fn home() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}

fn default_location() -> Result<PathBuf, ConfigError> {
    let mut config_dir = if let Some(config_home) = env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(config_home)
    } else {
        let mut config_home = home().ok_or(ConfigError::NoConfigHome)?;
        config_home.push(".config");
        config_home
    };
    config_dir.push(env!("CARGO_PKG_NAME"));
    config_dir.push("config.toml");

    Ok(config_dir)
}

fn statedir() -> PathBuf {
    let mut state_home = if let Some(state_home) = env::var_os("XDG_STATE_HOME") {
        PathBuf::from(state_home)
    } else if let Some(mut state_home) = home() {
        state_home.push(".local/state");
        state_home
    } else {
        PathBuf::new()
    };
    state_home.push(env!("CARGO_PKG_NAME"));
    state_home
}

#[cfg(test)]
mod tests {
    use std::fs;

    use assertables::*;
    use rstest::*;
    use tempfile::TempDir;

    use super::*;

    #[fixture]
    fn dir() -> TempDir {
        assert_ok!(tempfile::tempdir())
    }

    fn write(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        assert_ok!(fs::write(&path, contents));
        path
    }

    #[rstest]
    fn test_load_full_config(dir: TempDir) {
        let path = write(
            &dir,
            r#"
statedir = "/var/lib/foldersync"
log_level = "debug"
starting_progress = 0.5

[cost]
known_batch = 10
new_item = 2
"#,
        );

        let config = assert_ok!(Config::load(Some(&path)));

        assert_eq!(config.statedir(), Path::new("/var/lib/foldersync"));
        assert_eq!(config.log_level(), "debug");
        assert_in_delta!(config.starting_progress(), 0.5, 1e-9);
        assert_eq!(config.cost().known_batch(), 10);
        assert_eq!(config.cost().new_item(), 2);
        assert_eq!(config.cost().new_batch(), 20);
    }

    #[rstest]
    fn test_empty_config_uses_defaults(dir: TempDir) {
        let path = write(&dir, "");

        let config = assert_ok!(Config::load(Some(&path)));

        assert_eq!(config.log_level(), "info");
        assert_in_delta!(config.starting_progress(), DEFAULT_STARTING_PROGRESS, 1e-9);
        assert_eq!(config.cost(), &CostModel::default());
        assert!(config.statedir().ends_with(env!("CARGO_PKG_NAME")));
    }

    #[rstest]
    fn test_starting_progress_must_be_a_fraction(dir: TempDir) {
        let path = write(&dir, "starting_progress = 1.5");

        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::StartingProgress(_))
        ));
    }

    #[rstest]
    fn test_unknown_types_are_rejected(dir: TempDir) {
        let path = write(&dir, "starting_progress = \"half\"");

        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[rstest]
    fn test_explicit_missing_file_is_an_error(dir: TempDir) {
        let path = dir.path().join("missing.toml");

        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::Read { .. })
        ));
    }
}
