//! Settings layered from defaults, an optional TOML file and `YTFETCH_*`
//! environment variables.

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, Environment, File, FileFormat, Map};
use miette::{Context, IntoDiagnostic};
use serde::Deserialize;
use tracing::debug;

use crate::{result::Result, thumbnail::DEFAULT_BASE_URL};

pub const ENV_PREFIX: &str = "YTFETCH";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// ffmpeg program, found in the PATH when unset
    pub ffmpeg: Option<String>,
    /// yt-dlp compatible program, `yt-dlp` then `youtube-dl` when unset
    pub ytdlp: Option<String>,
    /// Folder used when no other location is given
    pub downloads_dir: Option<PathBuf>,
    /// Where job workspaces are created
    pub temp_dir: Option<PathBuf>,
    pub thumbnail_timeout_secs: u64,
    pub cover_timeout_secs: u64,
    pub thumbnail_base_url: String,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: SocketAddr,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ffmpeg: None,
            ytdlp: None,
            downloads_dir: None,
            temp_dir: None,
            thumbnail_timeout_secs: 3,
            cover_timeout_secs: 5,
            thumbnail_base_url: DEFAULT_BASE_URL.to_owned(),
            server: ServerSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
        }
    }
}

impl Settings {
    /// Load the settings.
    ///
    /// An explicit `path` must exist, the default configuration file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, None)
    }

    fn load_with(path: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                debug!("Reading configuration from {}", path.display());
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
            None => {
                if let Some(path) = default_path() {
                    debug!("Reading configuration from {} if present", path.display());
                    builder = builder.add_source(
                        File::from(path.as_path())
                            .format(FileFormat::Toml)
                            .required(false),
                    );
                }
            }
        }

        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(env),
            )
            .build()
            .and_then(Config::try_deserialize)
            .into_diagnostic()
            .wrap_err("Invalid configuration")
            .map_err(Into::into)
    }

    pub fn thumbnail_timeout(&self) -> Duration {
        Duration::from_secs(self.thumbnail_timeout_secs)
    }

    pub fn cover_timeout(&self) -> Duration {
        Duration::from_secs(self.cover_timeout_secs)
    }
}

/// `<config dir>/ytfetch/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ytfetch").join("config.toml"))
}
