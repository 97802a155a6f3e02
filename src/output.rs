//! Choice of the final location of a produced file.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use miette::{miette, Context, IntoDiagnostic};
use tracing::{debug, info, warn};

use crate::{
    io::{remove_file_logged, reserve_unused_path, sanitize_filename, LiveWorkspaces},
    outside::{Desktop, DialogOutcome},
    result::{Error, Result},
    terminal::Prompter,
    types::{Extension, QualityTier},
};

/// Where the user asked to save the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveMode {
    /// A file path, or an existing directory to save into
    Explicit { path: PathBuf, create_parents: bool },
    /// Ask with the native "save as" dialog
    Dialog,
    /// The downloads folder
    DefaultFolder,
}

/// What to do when the chosen path already exists
#[derive(Debug, Clone, Copy)]
pub enum Collision<'a> {
    /// Ask whether to overwrite, suffix the name when declined
    Prompt(&'a dyn Prompter),
    /// Always suffix the name
    Suffix,
}

/// A resolved output path.
///
/// When the path was reserved with an empty placeholder file, the
/// placeholder is deleted on drop unless [`ResolvedPath::keep`] is called.
/// It is also tracked in [`LiveWorkspaces`] when the resolver has them, so
/// that an interrupted process removes it too.
#[derive(Debug)]
pub struct ResolvedPath {
    path: PathBuf,
    placeholder: bool,
    live: Option<Arc<LiveWorkspaces>>,
}

impl ResolvedPath {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an empty file was created to reserve the path
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// The path now holds the real file, stop guarding it
    pub fn keep(mut self) -> PathBuf {
        self.release();
        self.placeholder = false;
        std::mem::take(&mut self.path)
    }

    fn release(&mut self) {
        if let Some(live) = self.live.take() {
            live.unregister_placeholder(&self.path);
        }
    }
}

impl Drop for ResolvedPath {
    fn drop(&mut self) {
        self.release();
        if self.placeholder {
            debug!("Releasing reserved path {}", self.path.display());
            remove_file_logged(&self.path);
        }
    }
}

/// File name without extension: the sanitized title, followed by the
/// quality label for videos
pub fn output_stem(title: &str, tier: Option<QualityTier>) -> String {
    let title = sanitize_filename(title);
    match tier {
        Some(tier) => format!("{title}_{}", tier.label()),
        None => title,
    }
}

/// The downloads folder: the configured one, else the platform one
pub fn default_downloads_dir(configured: Option<&Path>) -> PathBuf {
    if let Some(dir) = configured {
        return dir.to_path_buf();
    }
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Debug)]
pub struct OutputResolver<'a> {
    desktop: &'a dyn Desktop,
    downloads_dir: PathBuf,
    collision: Collision<'a>,
    live: Option<Arc<LiveWorkspaces>>,
}

impl<'a> OutputResolver<'a> {
    pub fn new(
        desktop: &'a dyn Desktop,
        downloads_dir: PathBuf,
        collision: Collision<'a>,
    ) -> Self {
        Self {
            desktop,
            downloads_dir,
            collision,
            live: None,
        }
    }

    /// Track the placeholders in `live` until they are kept or dropped
    pub fn with_live(mut self, live: Arc<LiveWorkspaces>) -> Self {
        self.live = Some(live);
        self
    }

    /// Decide where to save the file named after `title` (and `tier` for videos).
    ///
    /// Fail with [`Error::DialogCancelled`] when the user closes the dialog.
    pub fn resolve(
        &self,
        title: &str,
        tier: Option<QualityTier>,
        ext: Extension,
        mode: &SaveMode,
    ) -> Result<ResolvedPath> {
        let file_name = format!("{}{}", output_stem(title, tier), ext.with_dot());

        let path = match mode {
            SaveMode::Explicit {
                path,
                create_parents,
            } => explicit_path(path, &file_name, ext, *create_parents)?,
            SaveMode::Dialog => match self.desktop.prompt_save_path(&file_name)? {
                DialogOutcome::Chosen(path) => with_extension(path, ext),
                DialogOutcome::Cancelled => return Err(Error::DialogCancelled),
                DialogOutcome::Unavailable => {
                    warn!("No native save dialog available, saving to the downloads folder");
                    self.in_downloads_dir(&file_name)?
                }
            },
            SaveMode::DefaultFolder => self.in_downloads_dir(&file_name)?,
        };

        self.settle(path)
    }

    fn in_downloads_dir(&self, file_name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.downloads_dir)
            .into_diagnostic()
            .wrap_err_with(|| {
                format!(
                    "Could not create the downloads folder {}",
                    self.downloads_dir.display()
                )
            })?;
        Ok(self.downloads_dir.join(file_name))
    }

    /// Apply the collision policy
    fn settle(&self, path: PathBuf) -> Result<ResolvedPath> {
        if let Collision::Prompt(prompter) = self.collision {
            if path.exists() {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if prompter.confirm(&format!("The file {name} already exists. Overwrite it?"))? {
                    info!("Overwriting {}", path.display());
                    return Ok(ResolvedPath {
                        path,
                        placeholder: false,
                        live: None,
                    });
                }
            }
        }

        let reserved = reserve_unused_path(&path)?;
        if reserved != path {
            info!("{} exists, saving as {}", path.display(), reserved.display());
        }
        if let Some(live) = &self.live {
            live.register_placeholder(&reserved);
        }
        Ok(ResolvedPath {
            path: reserved,
            placeholder: true,
            live: self.live.clone(),
        })
    }
}

fn explicit_path(
    path: &Path,
    file_name: &str,
    ext: Extension,
    create_parents: bool,
) -> Result<PathBuf> {
    if path.is_dir() {
        return Ok(path.join(file_name));
    }

    let path = with_extension(path.to_path_buf(), ext);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if create_parents {
            std::fs::create_dir_all(parent)
                .into_diagnostic()
                .wrap_err_with(|| format!("Could not create {}", parent.display()))?;
        } else if !parent.is_dir() {
            return Err(miette!("The folder {} does not exist", parent.display()).into());
        }
    }
    Ok(path)
}

/// Append the extension unless the path already ends with it
fn with_extension(path: PathBuf, ext: Extension) -> PathBuf {
    if Extension::from_path(&path) == Some(ext) {
        return path;
    }
    let mut name = path.into_os_string();
    name.push(ext.with_dot());
    PathBuf::from(name)
}
