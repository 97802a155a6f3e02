//! Fetch web videos as tagged MP3 or muxed MP4 files.
//!
//! The pipeline asks a [`outside::StreamCatalog`] for the video streams,
//! picks them with the [`selector`], decides the destination with the
//! [`output::OutputResolver`] and lets the [`orchestrator::Fetcher`] download,
//! convert and tag the file in a temporary workspace.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod io;
pub mod logging;
pub mod menu;
pub mod orchestrator;
pub mod output;
pub mod outside;
pub mod report;
pub mod result;
pub mod selector;
pub mod server;
pub mod tagger;
pub mod terminal;
pub mod thumbnail;
pub mod types;
pub mod url;
mod utils;

pub use app::App;
pub use result::{Error, Result};
