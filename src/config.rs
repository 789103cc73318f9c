//! Settings read from ~/.config/ical2vdir/config.toml and ICAL2VDIR_* variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat, FileSourceFile};
use serde::Deserialize;

const ENV_PREFIX: &str = "ICAL2VDIR";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory the items are written to
    pub output_dir: Option<PathBuf>,

    /// Remove files that are no longer in the input
    pub delete: bool,
}

impl Settings {
    /// The default config path, `None` when the platform has no config directory.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ical2vdir").join("config.toml"))
    }

    /// Load settings. An explicitly passed file must exist, the default one may be absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let file = match explicit {
            Some(path) => Some(File::from(path).required(true)),
            None => Self::config_path().map(|path| File::from(path).required(false)),
        };

        Self::from_sources(file, Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn from_sources(
        file: Option<File<FileSourceFile, FileFormat>>,
        env: Environment,
    ) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(file);
        }

        builder
            .add_source(env)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// The configured output directory with `~` expanded.
    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output_dir.as_ref().map(|dir| {
            PathBuf::from(shellexpand::tilde(&dir.to_string_lossy()).into_owned())
        })
    }
}
