use std::{net::SocketAddr, path::PathBuf};

use clap::{Parser, Subcommand};
use tracing::Level;

use crate::{output::SaveMode, types::QualityTier};

macro_rules! arg_env {
    ($v:literal) => {
        concat!("YTFETCH_", $v)
    };
}

/// Fetch web videos as tagged MP3 or muxed MP4 files.
///
/// Needs `yt-dlp` (or `youtube-dl`) and `ffmpeg` to be installed.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Configuration file. Defaults to `<config dir>/ytfetch/config.toml`
    #[arg(long, global = true, env = arg_env!("CONFIG"))]
    pub config: Option<PathBuf>,

    /// Maximum level of the logs written to stderr
    #[arg(long, global = true, default_value_t = Level::INFO, env = arg_env!("LOG_LEVEL"))]
    pub log_level: Level,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download the audio of a video as a tagged MP3 file
    Mp3 {
        /// URL of the video
        url: String,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Download a video as an MP4 file
    Mp4 {
        /// URL of the video
        url: String,

        /// Quality: a level from 1 (144p) to 5 (maximum), or a label like `1080p` or `max`
        #[arg(
            short,
            long,
            visible_alias = "calidad",
            default_value_t = QualityTier::P720,
            env = arg_env!("QUALITY")
        )]
        quality: QualityTier,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Show the information of a video
    Info {
        /// URL of the video
        url: String,
    },

    /// List the streams offered by a video
    Streams {
        /// URL of the video
        url: String,
    },

    /// Interactive menu
    Menu,

    /// Serve the HTTP API
    Serve {
        /// Address to listen on, overrides the `server.bind` setting
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct SaveArgs {
    /// Save to the downloads folder instead of asking with the save dialog
    #[arg(long, env = arg_env!("NO_DIALOG"))]
    pub no_dialog: bool,

    /// Save to this file, or into this existing folder
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Open the containing folder once the file is saved
    #[arg(long)]
    pub open: bool,

    /// Play the file once saved
    #[arg(long)]
    pub play: bool,
}

impl SaveArgs {
    pub fn mode(&self) -> SaveMode {
        match &self.output {
            Some(path) => SaveMode::Explicit {
                path: path.clone(),
                create_parents: true,
            },
            None if self.no_dialog => SaveMode::DefaultFolder,
            None => SaveMode::Dialog,
        }
    }
}
