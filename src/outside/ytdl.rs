use std::{
    ffi::OsStr,
    fmt::Debug,
    path::Path,
    process::{Command, Output},
};

use miette::{Context, IntoDiagnostic};
use serde::Deserialize;

use super::command::{is_available, run_command, tail, Capture, YT_DL, YT_DLP};
use crate::{
    result::{bail, Error, ProviderErrorKind, Result},
    types::{MediaKind, StreamDescriptor, VideoMetadata},
};

/// Interface for enumerating and downloading the streams of a video
pub trait StreamCatalog: Sync + Send + Debug {
    /// Get the video metadata along with every stream the provider offers
    fn probe(&self, url: &str) -> Result<(VideoMetadata, Vec<StreamDescriptor>)>;

    /// Get the video metadata
    fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata> {
        Ok(self.probe(url)?.0)
    }

    /// List the streams, in provider order
    fn list_streams(&self, url: &str) -> Result<Vec<StreamDescriptor>> {
        Ok(self.probe(url)?.1)
    }

    /// Download the exact stream described by `stream` into `dest`
    fn download_stream(&self, url: &str, stream: &StreamDescriptor, dest: &Path) -> Result<()>;
}

/// Interface for the [yt-dlp](https://github.com/yt-dlp/yt-dlp) program,
/// or its ancestor `youtube-dl`
#[derive(Debug, Clone)]
pub struct Ytdl {
    program: String,
}

impl Ytdl {
    /// Verify that the given program, or else `yt-dlp` or `youtube-dl`, is reachable
    pub fn new(program: Option<&str>) -> Result<Self> {
        if let Some(program) = program {
            return if is_available(program, "--version") {
                Ok(Self {
                    program: program.to_owned(),
                })
            } else {
                Err(miette::miette!("{program} is not reachable").into())
            };
        }

        if is_available(YT_DLP, "--version") {
            Ok(Self {
                program: YT_DLP.to_owned(),
            })
        } else if is_available(YT_DL, "--version") {
            Ok(Self {
                program: YT_DL.to_owned(),
            })
        } else {
            bail("Neither yt-dlp nor youtube-dl found")
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the command and turn a failure into a [`Error::Provider`]
    /// whose kind is guessed from the `ERROR:` lines of stderr.
    ///
    /// In other cases, return the output handle.
    pub fn run_check_availability<F>(&self, f: F, capture: Capture) -> Result<Output>
    where
        F: FnOnce(&mut Command) -> &mut Command,
    {
        let res = run_command(&self.program, f, capture | Capture::STDERR)?;

        if res.status.success() {
            return Ok(res);
        }

        let stderr = String::from_utf8_lossy(&res.stderr);
        let kind = classify_stderr(&stderr);
        let message = stderr
            .lines()
            .find(|line| line.starts_with("ERROR:"))
            .map(|line| line.trim_start_matches("ERROR:").trim().to_owned())
            .unwrap_or_else(|| tail(&res.stderr, 3));

        Err(Error::provider(kind, message))
    }
}

impl StreamCatalog for Ytdl {
    fn probe(&self, url: &str) -> Result<(VideoMetadata, Vec<StreamDescriptor>)> {
        let res = self.run_check_availability(
            |cmd| {
                cmd.arg("-q")
                    .arg("--no-warnings")
                    .arg("--no-playlist")
                    .arg("--skip-download")
                    .arg("-j")
                    .arg("--")
                    .arg(url)
            },
            Capture::STDOUT,
        )?;

        parse_probe(&res.stdout)
    }

    fn download_stream(&self, url: &str, stream: &StreamDescriptor, dest: &Path) -> Result<()> {
        self.run_check_availability(
            |cmd| {
                cmd.arg("-q")
                    .arg("--no-warnings")
                    .arg("--no-playlist")
                    .args([OsStr::new("-o"), dest.as_os_str()])
                    .arg("--no-continue") // Or else fails when file already exists, even an empty one
                    .arg("--no-part")
                    .args(["-f", stream.id.as_str()])
                    .arg("--")
                    .arg(url)
            },
            Capture::empty(),
        )?;

        if dest.is_file() {
            Ok(())
        } else {
            Err(Error::MissingOutput {
                program: self.program.clone(),
                path: dest.to_path_buf(),
            })
        }
    }
}

fn classify_stderr(stderr: &str) -> ProviderErrorKind {
    let errors: Vec<String> = stderr
        .lines()
        .filter(|line| line.starts_with("ERROR:"))
        .map(str::to_lowercase)
        .collect();

    let any = |needles: &[&str]| {
        errors
            .iter()
            .any(|line| needles.iter().any(|needle| line.contains(needle)))
    };

    if any(&[
        "sign in to confirm your age",
        "not available in your country",
        "members-only",
        "private video",
    ]) {
        ProviderErrorKind::Restricted
    } else if any(&[
        "unavailable",
        "requested format is not available",
        "has been removed",
    ]) {
        ProviderErrorKind::Unavailable
    } else if any(&[
        "is not a valid url",
        "unsupported url",
        "unable to download webpage",
        "incomplete youtube id",
        "name or service not known",
    ]) {
        ProviderErrorKind::InvalidUrl
    } else {
        ProviderErrorKind::Other
    }
}

/// Subset of the `-j` JSON output that is used
#[derive(Debug, Deserialize)]
struct YtdlInfo {
    id: String,
    title: String,
    uploader: Option<String>,
    channel: Option<String>,
    duration: Option<f64>,
    view_count: Option<u64>,
    thumbnail: Option<String>,
    #[serde(default)]
    formats: Vec<YtdlFormat>,
}

#[derive(Debug, Deserialize)]
struct YtdlFormat {
    format_id: String,
    ext: String,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<u32>,
    fps: Option<f32>,
    tbr: Option<f32>,
    abr: Option<f32>,
    vbr: Option<f32>,
    filesize: Option<u64>,
}

/// `none` and missing codecs both mean "no such track"
fn codec(codec: Option<String>) -> Option<String> {
    codec.filter(|c| c != "none" && !c.is_empty())
}

impl YtdlFormat {
    fn into_descriptor(self) -> Option<StreamDescriptor> {
        let video_codec = codec(self.vcodec);
        let audio_codec = codec(self.acodec);

        // Storyboards and other image-only formats carry neither
        let kind = match (&video_codec, &audio_codec) {
            (Some(_), _) => MediaKind::Video,
            (None, Some(_)) => MediaKind::Audio,
            (None, None) => return None,
        };

        let bitrate = match kind {
            MediaKind::Audio => self.abr.or(self.tbr),
            MediaKind::Video => self.vbr.or(self.tbr),
        };

        Some(StreamDescriptor {
            id: self.format_id,
            kind,
            container: self.ext,
            includes_audio: audio_codec.is_some(),
            progressive: video_codec.is_some() && audio_codec.is_some(),
            height: if kind == MediaKind::Video {
                self.height
            } else {
                None
            },
            fps: self.fps,
            bitrate,
            size: self.filesize,
            video_codec,
            audio_codec,
        })
    }
}

fn parse_probe(stdout: &[u8]) -> Result<(VideoMetadata, Vec<StreamDescriptor>)> {
    let info: YtdlInfo = serde_json::from_slice(stdout)
        .into_diagnostic()
        .wrap_err("Could not parse the video JSON description")?;

    let metadata = VideoMetadata {
        author: info.uploader.or(info.channel).unwrap_or_default(),
        duration: info.duration.map_or(0, |d| d.max(0.0).round() as u64),
        views: info.view_count.unwrap_or(0),
        thumbnail_url: info.thumbnail.unwrap_or_default(),
        title: info.title,
        video_id: info.id,
    };

    let streams = info
        .formats
        .into_iter()
        .filter_map(YtdlFormat::into_descriptor)
        .collect();

    Ok((metadata, streams))
}
