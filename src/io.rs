use std::{
    collections::BTreeSet,
    fs::OpenOptions,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use miette::{Context, IntoDiagnostic};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::{
    result::{bail, Result},
    utils::MutexUtils,
};

/// Characters refused by at least one common filesystem
const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const MAX_NAME_CHARS: usize = 100;

/// Make a video title usable as a file name (without extension).
///
/// Illegal characters are removed and the result is cut to 100 characters.
pub fn sanitize_filename(name: &str) -> String {
    let name: String = name
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c) && !c.is_control())
        .take(MAX_NAME_CHARS)
        .collect();

    if name.trim().is_empty() {
        "untitled".to_owned()
    } else {
        name
    }
}

/// Create the file only if it does not exist yet.
///
/// Return false if it already existed.
fn create_new(path: &Path) -> Result<bool> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// Reserve `path`, or the first free `<stem>_<n><.ext>` next to it, by
/// creating an empty placeholder file.
///
/// The placeholder creation is atomic, two calls never return the same path.
pub fn reserve_unused_path(path: &Path) -> Result<PathBuf> {
    if create_new(path)? {
        return Ok(path.to_path_buf());
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dot_ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut output = path.to_path_buf();
    for n in 1u32.. {
        output.set_file_name(format!("{stem}_{n}{dot_ext}"));
        if create_new(&output)? {
            return Ok(output);
        }
    }

    bail("Code is broken or you have really REALLY too much files with the same name")
}

/// Move a file, falling back to copying when renaming is not possible
/// (e.g. across filesystems).
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Err(err) = std::fs::rename(from, to) {
        debug!("Moving file failed ({err}), falling back to copying");
        std::fs::copy(from, to)
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not copy file to {}", to.display()))?;
        remove_file_logged(from);
    }
    Ok(())
}

/// Delete a file, only logging a failure
pub fn remove_file_logged(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        if err.kind() != ErrorKind::NotFound {
            warn!("Could not delete {}: {err}", path.display());
        }
    }
}

/// Workspaces and reserved output files currently alive in the process, so
/// that they can be removed when the process is interrupted.
#[derive(Debug, Default)]
pub struct LiveWorkspaces {
    dirs: Mutex<BTreeSet<PathBuf>>,
    placeholders: Mutex<BTreeSet<PathBuf>>,
}

impl LiveWorkspaces {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn register(&self, path: &Path) {
        self.dirs.with_lock(|mut set| set.insert(path.to_path_buf()));
    }

    fn unregister(&self, path: &Path) {
        self.dirs.with_lock(|mut set| set.remove(path));
    }

    /// Track an empty file reserving an output path until the job fills it
    pub fn register_placeholder(&self, path: &Path) {
        self.placeholders
            .with_lock(|mut set| set.insert(path.to_path_buf()));
    }

    pub fn unregister_placeholder(&self, path: &Path) {
        self.placeholders.with_lock(|mut set| set.remove(path));
    }

    /// Number of live workspaces and placeholders
    pub fn len(&self) -> usize {
        self.dirs.with_lock(|set| set.len()) + self.placeholders.with_lock(|set| set.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every live workspace directory and placeholder file.
    /// Return how many were removed.
    pub fn purge(&self) -> usize {
        let mut removed = 0;
        self.dirs.with_lock(|mut set| {
            for path in std::mem::take(&mut *set) {
                match std::fs::remove_dir_all(&path) {
                    Ok(()) => removed += 1,
                    Err(err) if err.kind() == ErrorKind::NotFound => (),
                    Err(err) => warn!("Could not remove workspace {}: {err}", path.display()),
                }
            }
        });
        self.placeholders.with_lock(|mut set| {
            for path in std::mem::take(&mut *set) {
                match std::fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(err) if err.kind() == ErrorKind::NotFound => (),
                    Err(err) => warn!("Could not delete {}: {err}", path.display()),
                }
            }
        });
        removed
    }
}

/// A uniquely named temporary directory owned by a single job.
///
/// The directory and everything inside it is removed when the workspace
/// is dropped, whatever the job outcome.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    live: Arc<LiveWorkspaces>,
}

impl Workspace {
    /// Create the workspace inside `root`, or the system temporary directory
    pub fn create(root: Option<&Path>, live: Arc<LiveWorkspaces>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("ytfetch-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)
                    .into_diagnostic()
                    .wrap_err("Could not create the temporary directory root")?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .into_diagnostic()
        .wrap_err("Could not create a job workspace")?;

        debug!("Created workspace {}", dir.path().display());
        live.register(dir.path());
        Ok(Self {
            dir: Some(dir),
            live,
        })
    }

    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }

    /// Path of a file inside the workspace
    pub fn file(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            self.live.unregister(&path);
            match dir.close() {
                Ok(()) => debug!("Removed workspace {}", path.display()),
                Err(err) => warn!("Could not remove workspace {}: {err}", path.display()),
            }
        }
    }
}
