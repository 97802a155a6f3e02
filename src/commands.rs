//! The `mp3`, `mp4`, `info` and `streams` terminal commands.

use std::{ffi::OsStr, io::IsTerminal, path::Path};

use tracing::warn;

use crate::{
    app::App,
    cli::SaveArgs,
    orchestrator::Target,
    output::Collision,
    outside::Desktop,
    report,
    result::Result,
    terminal::{Prompter, Terminal},
    url::check_url,
};

/// Download the video as `target`, then open or play it as asked
pub fn download(app: &App, url: &str, target: Target, save: &SaveArgs) -> Result<()> {
    let url = check_url(url)?;
    let prompter = Terminal;

    println!("Fetching the video information...");
    let job = app.plan(url, target)?;
    println!("{}", report::summary(&job.metadata));

    let collision = collision(&prompter, std::io::stdin().is_terminal());
    let outcome = app.save(&job, &save.mode(), collision)?;
    print!(
        "{}",
        report::completed(&outcome.path, job.effective_tier(), &outcome.warnings)
    );

    after_download(app.desktop(), &outcome.path, save.open, save.play);
    Ok(())
}

/// Ask before overwriting only when someone can answer, else suffix the name
fn collision(prompter: &dyn Prompter, interactive: bool) -> Collision<'_> {
    if interactive {
        Collision::Prompt(prompter)
    } else {
        Collision::Suffix
    }
}

/// Open the containing folder and/or play the file, only warning on failures
pub fn after_download(desktop: &dyn Desktop, path: &Path, open: bool, play: bool) {
    if open {
        println!("Opening the folder...");
        if let Err(err) = desktop.reveal(path) {
            warn!("Could not open the folder of {}: {err}", path.display());
        }
    }
    if play {
        println!("Playing the file...");
        if let Err(err) = desktop.open(path.as_os_str()) {
            warn!("Could not play {}: {err}", path.display());
        }
    }
}

/// Show the video information, offering to open the thumbnail
pub fn info(app: &App, url: &str) -> Result<()> {
    let url = check_url(url)?;
    let metadata = app.catalog().fetch_metadata(url)?;
    print!("{}", report::info(&metadata));

    if std::io::stdin().is_terminal()
        && !metadata.thumbnail_url.is_empty()
        && Terminal.confirm("Open the thumbnail in the browser?")?
    {
        app.desktop().open(OsStr::new(&metadata.thumbnail_url))?;
    }
    Ok(())
}

/// Show every stream the video offers
pub fn streams(app: &App, url: &str) -> Result<()> {
    let url = check_url(url)?;
    let (metadata, streams) = app.catalog().probe(url)?;
    print!("{}", report::summary(&metadata));
    print!("{}", report::streams(&streams, metadata.duration));
    Ok(())
}
