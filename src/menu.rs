//! Interactive menu driven terminal tool.

use std::{
    ops::RangeInclusive,
    path::{Path, PathBuf},
};

use indoc::indoc;
use owo_colors::{OwoColorize, Stream::Stdout};

use crate::{
    app::App,
    commands::after_download,
    orchestrator::Target,
    output::{default_downloads_dir, output_stem, Collision, SaveMode},
    report::{self, BANNER},
    result::{Error, Result},
    terminal::Prompter,
    types::QualityTier,
    url::check_url,
};

const MAIN_MENU: &str = indoc! {"
    What do you want to do?
       1. Download as MP3
       2. Download as MP4
       3. Show the video information
       4. List the available streams
       5. Exit
"};

const QUALITY_MENU: &str = indoc! {"
    Video quality:
       1. 144p   low
       2. 360p   standard
       3. 720p   HD (default)
       4. 1080p  Full HD, 720p when not available
       5. max    best available
"};

pub struct Menu<'a> {
    app: &'a App,
    prompter: &'a dyn Prompter,
}

impl<'a> Menu<'a> {
    pub fn new(app: &'a App, prompter: &'a dyn Prompter) -> Self {
        Self { app, prompter }
    }

    /// Show the menu until the user exits.
    ///
    /// Failed actions are reported and the menu is shown again, only
    /// an unusable terminal stops it.
    pub fn run(&self) -> Result<()> {
        println!("{BANNER}");

        loop {
            println!("{MAIN_MENU}");
            let res = match choose(self.prompter, "Choose an option (1-5): ", 1..=5, None)? {
                1 => self.download(Target::Mp3),
                2 => {
                    println!("{QUALITY_MENU}");
                    let level =
                        choose(self.prompter, "Choose a quality (1-5): ", 1..=5, Some(3))?;
                    let tier = QualityTier::from_level(level).unwrap_or_default();
                    self.download(Target::Mp4(tier))
                }
                3 => self.info(),
                4 => self.streams(),
                _ => return Ok(()),
            };

            match res {
                Ok(()) => (),
                Err(Error::DialogCancelled) => println!("Cancelled, nothing was saved"),
                Err(err) => {
                    println!("{} {err}", "Error:".if_supports_color(Stdout, |t| t.red()))
                }
            }
            println!();
        }
    }

    fn ask_url(&self) -> Result<String> {
        loop {
            let answer = self.prompter.ask("Video URL: ")?;
            match check_url(&answer) {
                Ok(url) => return Ok(url.to_owned()),
                Err(err) => println!("{err}"),
            }
        }
    }

    fn download(&self, target: Target) -> Result<()> {
        let url = self.ask_url()?;
        println!("Fetching the video information...");
        let job = self.app.plan(&url, target)?;
        println!("{}", report::summary(&job.metadata));

        let file_name = format!(
            "{}{}",
            output_stem(&job.metadata.title, job.effective_tier()),
            job.extension().with_dot()
        );
        let configured = self
            .app
            .settings()
            .downloads_dir
            .clone()
            .unwrap_or_else(|| default_downloads_dir(None));
        let mode = ask_location(
            self.prompter,
            &file_name,
            &configured,
            &default_downloads_dir(None),
        )?;

        println!("Downloading, this can take a while...");
        let outcome = self
            .app
            .save(&job, &mode, Collision::Prompt(self.prompter))?;
        print!(
            "{}",
            report::completed(&outcome.path, job.effective_tier(), &outcome.warnings)
        );

        let open = self.prompter.confirm("Open the folder?")?;
        let play = self.prompter.confirm("Play the file now?")?;
        after_download(self.app.desktop(), &outcome.path, open, play);
        Ok(())
    }

    fn info(&self) -> Result<()> {
        let url = self.ask_url()?;
        let metadata = self.app.catalog().fetch_metadata(&url)?;
        print!("{}", report::info(&metadata));

        if !metadata.thumbnail_url.is_empty()
            && self.prompter.confirm("Open the thumbnail in the browser?")?
        {
            self.app
                .desktop()
                .open(std::ffi::OsStr::new(&metadata.thumbnail_url))?;
        }
        Ok(())
    }

    fn streams(&self) -> Result<()> {
        let url = self.ask_url()?;
        let (metadata, streams) = self.app.catalog().probe(&url)?;
        print!("{}", report::streams(&streams, metadata.duration));
        Ok(())
    }
}

/// Ask for a number in `range` until a valid one is given.
/// An empty answer selects `default` when there is one.
fn choose(
    prompter: &dyn Prompter,
    question: &str,
    range: RangeInclusive<u8>,
    default: Option<u8>,
) -> Result<u8> {
    loop {
        let answer = prompter.ask(question)?;
        if answer.is_empty() {
            if let Some(default) = default {
                return Ok(default);
            }
        }
        match answer.parse::<u8>() {
            Ok(n) if range.contains(&n) => return Ok(n),
            _ => println!("Invalid option, try again"),
        }
    }
}

/// Ask where to save `file_name`
fn ask_location(
    prompter: &dyn Prompter,
    file_name: &str,
    configured: &Path,
    system: &Path,
) -> Result<SaveMode> {
    let current = std::env::current_dir()?;
    println!("Where to save '{file_name}'?");
    println!("   1. Current folder\n      {}", current.display());
    println!("   2. Configured downloads folder\n      {}", configured.display());
    println!("   3. System downloads folder\n      {}", system.display());
    println!("   4. Another folder");
    println!("   5. Choose with the file explorer");

    let folder = match choose(prompter, "Choose an option (1-5): ", 1..=5, None)? {
        1 => current,
        2 => configured.to_path_buf(),
        3 => system.to_path_buf(),
        4 => ask_folder(prompter)?,
        _ => return Ok(SaveMode::Dialog),
    };
    // A missing folder would be taken as a file name
    std::fs::create_dir_all(&folder)?;

    Ok(SaveMode::Explicit {
        path: folder,
        create_parents: true,
    })
}

/// Ask for an existing folder, offering to create missing ones
fn ask_folder(prompter: &dyn Prompter) -> Result<PathBuf> {
    loop {
        let answer = prompter.ask("Full path of the folder: ")?;
        if answer.is_empty() {
            println!("The path cannot be empty");
            continue;
        }

        let folder = expand_home(&answer);
        if !folder.exists() {
            if !prompter.confirm(&format!("{} does not exist. Create it?", folder.display()))? {
                continue;
            }
            match std::fs::create_dir_all(&folder) {
                Ok(()) => println!("Created {}", folder.display()),
                Err(err) => {
                    println!("Could not create {}: {err}", folder.display());
                    continue;
                }
            }
        }

        if folder.is_dir() {
            return Ok(folder);
        }
        println!("The path must be a folder, not a file");
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest.trim_start_matches(['/', '\\'])),
        _ => PathBuf::from(path),
    }
}
