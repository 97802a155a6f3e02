use std::{
    ffi::OsStr,
    fmt::Debug,
    path::{Path, PathBuf},
    process::Output,
};

use tracing::{debug, warn};

use super::command::{is_available, run_command, Capture};
use crate::result::{bail, Result};

/// What came out of a native "save as" dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    Chosen(PathBuf),
    Cancelled,
    /// No native dialog could be shown on this machine
    Unavailable,
}

/// Platform specific interactions with the user's desktop
pub trait Desktop: Sync + Send + Debug {
    /// Ask the user where to save a file, suggesting `suggested` as its name
    fn prompt_save_path(&self, suggested: &str) -> Result<DialogOutcome>;

    /// Open a file, a folder or a URL with the default application
    fn open(&self, target: &OsStr) -> Result<()>;

    /// Open the folder containing the file
    fn reveal(&self, file: &Path) -> Result<()> {
        match file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => self.open(parent.as_os_str()),
            _ => self.open(OsStr::new(".")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DialogProgram {
    Zenity,
    Kdialog,
    AppleScript,
    PowerShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opener {
    XdgOpen,
    Open,
    Explorer,
}

/// Dialogs and openers of the running platform, detected once
#[derive(Debug, Clone)]
pub struct NativeDesktop {
    dialog: Option<DialogProgram>,
    opener: Opener,
}

impl NativeDesktop {
    pub fn detect() -> Self {
        let (dialog, opener) = if cfg!(target_os = "windows") {
            let dialog = is_available("powershell", "-Help").then_some(DialogProgram::PowerShell);
            (dialog, Opener::Explorer)
        } else if cfg!(target_os = "macos") {
            (Some(DialogProgram::AppleScript), Opener::Open)
        } else if is_available("zenity", "--version") {
            (Some(DialogProgram::Zenity), Opener::XdgOpen)
        } else if is_available("kdialog", "--version") {
            (Some(DialogProgram::Kdialog), Opener::XdgOpen)
        } else {
            (None, Opener::XdgOpen)
        };

        debug!("Native dialog: {dialog:?}, opener: {opener:?}");
        Self { dialog, opener }
    }

    /// Only open things, never show a dialog. For non interactive contexts
    pub fn headless() -> Self {
        let opener = if cfg!(target_os = "windows") {
            Opener::Explorer
        } else if cfg!(target_os = "macos") {
            Opener::Open
        } else {
            Opener::XdgOpen
        };
        Self {
            dialog: None,
            opener,
        }
    }
}

impl Desktop for NativeDesktop {
    fn prompt_save_path(&self, suggested: &str) -> Result<DialogOutcome> {
        let Some(dialog) = self.dialog else {
            return Ok(DialogOutcome::Unavailable);
        };

        let ext = Path::new(suggested)
            .extension()
            .and_then(OsStr::to_str)
            .unwrap_or("*");

        let res = match dialog {
            DialogProgram::Zenity => run_command(
                "zenity",
                |cmd| {
                    cmd.args(["--file-selection", "--save"])
                        .arg("--title")
                        .arg(format!("Save {suggested}"))
                        .args(["--filename", suggested])
                },
                Capture::STDOUT | Capture::STDERR,
            )?,
            DialogProgram::Kdialog => run_command(
                "kdialog",
                |cmd| {
                    cmd.arg("--getsavefilename")
                        .arg(suggested)
                        .arg(format!("*.{ext}"))
                },
                Capture::STDOUT | Capture::STDERR,
            )?,
            DialogProgram::AppleScript => run_command(
                "osascript",
                |cmd| {
                    cmd.arg("-e")
                        .arg(format!(
                            r#"set f to choose file name with prompt "Save as" default name "{}""#,
                            suggested.replace('\\', "\\\\").replace('"', "\\\"")
                        ))
                        .args(["-e", "POSIX path of f"])
                },
                Capture::STDOUT | Capture::STDERR,
            )?,
            DialogProgram::PowerShell => run_command(
                "powershell",
                |cmd| {
                    cmd.args(["-NoProfile", "-Command"])
                        .arg(powershell_script(suggested, ext))
                },
                Capture::STDOUT | Capture::STDERR,
            )?,
        };

        Ok(interpret(dialog, &res))
    }

    fn open(&self, target: &OsStr) -> Result<()> {
        let program = match self.opener {
            Opener::XdgOpen => "xdg-open",
            Opener::Open => "open",
            Opener::Explorer => "explorer",
        };

        let res = run_command(program, |cmd| cmd.arg(target), Capture::empty())?;

        // explorer returns 1 even when it succeeded
        if res.status.success() || self.opener == Opener::Explorer {
            Ok(())
        } else {
            bail("Could not open with the default application")
        }
    }
}

fn powershell_script(suggested: &str, ext: &str) -> String {
    let quote = |s: &str| s.replace('\'', "''");
    format!(
        "Add-Type -AssemblyName System.Windows.Forms; \
        $d = New-Object System.Windows.Forms.SaveFileDialog; \
        $d.FileName = '{}'; \
        $d.OverwritePrompt = $false; \
        $d.Filter = 'Compatible files (*.{ext})|*.{ext}|All files (*.*)|*.*'; \
        if ($d.ShowDialog() -eq 'OK') {{ $d.FileName }}",
        quote(suggested),
        ext = quote(ext),
    )
}

/// Turn the dialog program output into an outcome.
///
/// Every program reports a user cancellation differently.
fn interpret(dialog: DialogProgram, res: &Output) -> DialogOutcome {
    let stdout = String::from_utf8_lossy(&res.stdout);
    let chosen = stdout.trim();

    if res.status.success() {
        return if chosen.is_empty() {
            DialogOutcome::Cancelled
        } else {
            DialogOutcome::Chosen(PathBuf::from(chosen))
        };
    }

    let code = res.status.code();
    let cancelled = match dialog {
        DialogProgram::Zenity | DialogProgram::Kdialog => code == Some(1),
        DialogProgram::AppleScript => String::from_utf8_lossy(&res.stderr).contains("-128"),
        DialogProgram::PowerShell => false,
    };

    if cancelled {
        DialogOutcome::Cancelled
    } else {
        warn!(
            "{dialog:?} dialog failed with {}: {}",
            res.status,
            String::from_utf8_lossy(&res.stderr).trim()
        );
        DialogOutcome::Unavailable
    }
}
