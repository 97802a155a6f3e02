use std::fmt::Display;

use miette::{miette, Diagnostic};
use thiserror::Error;

use crate::types::QualityTier;

/// Why the stream provider refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The URL is malformed, unsupported or its page could not be reached
    InvalidUrl,
    /// The video or the requested stream is no longer available
    Unavailable,
    /// Age, region or membership restriction
    Restricted,
    Other,
}

impl Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ProviderErrorKind::InvalidUrl => "invalid or unreachable URL",
            ProviderErrorKind::Unavailable => "video unavailable",
            ProviderErrorKind::Restricted => "video restricted",
            ProviderErrorKind::Other => "provider failure",
        })
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("{kind}: {message}")]
    #[diagnostic(code(ytfetch::provider))]
    Provider {
        kind: ProviderErrorKind,
        message: String,
    },

    #[error("No stream available for quality {tier}")]
    #[diagnostic(
        code(ytfetch::no_stream),
        help("run the `streams` command to list what the video offers")
    )]
    NoStreamAvailable { tier: QualityTier },

    #[error("Transcoding to MP3 failed (exit code {})", fmt_code(.code))]
    #[diagnostic(code(ytfetch::transcode))]
    Transcode { code: Option<i32>, stderr: String },

    #[error("Muxing audio and video failed (exit code {})", fmt_code(.code))]
    #[diagnostic(code(ytfetch::mux))]
    Mux { code: Option<i32>, stderr: String },

    #[error("{program} succeeded but did not produce {}", .path.display())]
    MissingOutput {
        program: String,
        path: std::path::PathBuf,
    },

    #[error("Save location selection was cancelled")]
    DialogCancelled,

    #[error("Could not write tags")]
    TagWrite(#[from] id3::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0:?}")]
    Miette(miette::Report),
}

fn fmt_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none, killed by a signal".to_owned(), |c| c.to_string())
}

impl From<miette::Report> for Error {
    fn from(err: miette::Report) -> Self {
        Error::Miette(err)
    }
}

impl Error {
    pub fn provider(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Error::Provider {
            kind,
            message: message.into(),
        }
    }

    /// Whether the failure comes from the request itself (bad URL, missing
    /// stream, unprocessable media) rather than from the local machine.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            Error::Provider { .. }
                | Error::NoStreamAvailable { .. }
                | Error::Transcode { .. }
                | Error::Mux { .. }
                | Error::MissingOutput { .. }
        )
    }

    /// One line description, with the context chain of wrapped reports
    pub fn summary(&self) -> String {
        match self {
            Error::Miette(report) => report
                .chain()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(": "),
            err => err.to_string(),
        }
    }

    /// Report shown when the error ends the program
    pub fn into_report(self) -> miette::Report {
        match self {
            Error::Miette(report) => report,
            err => err.into(),
        }
    }

    pub fn wrap_err_with<D, F>(self, f: F) -> Error
    where
        D: Display + Send + Sync + 'static,
        F: FnOnce() -> D,
    {
        match self {
            Error::Miette(report) => Error::Miette(report.wrap_err(f())),
            Error::Io(err) => Error::Miette(miette::Report::from_err(err).wrap_err(f())),
            err => err,
        }
    }
}

pub fn err_msg(msg: &'static str) -> Error {
    Error::Miette(miette!(msg))
}

pub fn bail<T>(msg: &'static str) -> Result<T> {
    Err(err_msg(msg))
}

pub type Result<T> = std::result::Result<T, Error>;
