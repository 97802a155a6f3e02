use std::{
    fmt::Display,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, info, warn};

use crate::{
    io::{move_file, LiveWorkspaces, Workspace},
    output::ResolvedPath,
    outside::{StreamCatalog, StreamTransformer},
    result::Result,
    selector::{select, select_audio, Selection},
    tagger,
    thumbnail::ThumbnailSource,
    types::{Bitrate, Extension, QualityTier, StreamDescriptor, VideoMetadata},
};

/// The kind of file to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Mp3,
    Mp4(QualityTier),
}

impl Target {
    pub fn extension(self) -> Extension {
        match self {
            Target::Mp3 => Extension::Mp3,
            Target::Mp4(_) => Extension::Mp4,
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Mp3 => f.write_str("MP3"),
            Target::Mp4(tier) => write!(f, "MP4 {tier}"),
        }
    }
}

/// Everything known about a download before it starts
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub url: String,
    pub target: Target,
    pub metadata: VideoMetadata,
    pub selection: Selection,
}

impl DownloadJob {
    /// Quality of the produced video, after a possible fallback
    pub fn effective_tier(&self) -> Option<QualityTier> {
        self.selection.tier
    }

    pub fn extension(&self) -> Extension {
        self.target.extension()
    }
}

/// A successfully produced file
#[derive(Debug)]
pub struct Outcome {
    pub path: PathBuf,
    /// Non fatal failures, like tags that could not be written
    pub warnings: Vec<String>,
}

/// Runs download jobs, one at a time per call.
///
/// Each run owns a fresh workspace that is removed whatever the outcome.
#[derive(Debug)]
pub struct Fetcher<'a> {
    catalog: &'a dyn StreamCatalog,
    transformer: &'a dyn StreamTransformer,
    thumbnails: &'a dyn ThumbnailSource,
    live: Arc<LiveWorkspaces>,
    temp_root: Option<PathBuf>,
}

impl<'a> Fetcher<'a> {
    pub fn new(
        catalog: &'a dyn StreamCatalog,
        transformer: &'a dyn StreamTransformer,
        thumbnails: &'a dyn ThumbnailSource,
        live: Arc<LiveWorkspaces>,
    ) -> Self {
        Self {
            catalog,
            transformer,
            thumbnails,
            live,
            temp_root: None,
        }
    }

    /// Create the workspaces inside `root` instead of the system temporary directory
    pub fn with_temp_root(mut self, root: Option<PathBuf>) -> Self {
        self.temp_root = root;
        self
    }

    /// Fetch the video information and choose the streams to download
    pub fn plan(&self, url: &str, target: Target) -> Result<DownloadJob> {
        info!("Fetching information of {url}");
        let (metadata, streams) = self.catalog.probe(url)?;
        debug!("{} streams available for '{}'", streams.len(), metadata.title);

        let selection = match target {
            Target::Mp3 => select_audio(&streams)?,
            Target::Mp4(tier) => select(&streams, tier)?,
        };

        Ok(DownloadJob {
            url: url.to_owned(),
            target,
            metadata,
            selection,
        })
    }

    /// Produce the job file at `output`.
    ///
    /// On failure the reserved output is released and nothing is left behind.
    pub fn run(&self, job: &DownloadJob, output: ResolvedPath) -> Result<Outcome> {
        let warnings = self.produce(job, output.path())?;
        let path = output.keep();
        info!("Saved '{}' to {}", job.metadata.title, path.display());
        Ok(Outcome { path, warnings })
    }

    fn produce(&self, job: &DownloadJob, dest: &Path) -> Result<Vec<String>> {
        let workspace = Workspace::create(self.temp_root.as_deref(), self.live.clone())?;
        let mut warnings = Vec::new();

        let artifact = match (&job.target, &job.selection.video) {
            (Target::Mp4(_), Some(video)) => self.produce_mp4(job, video, &workspace)?,
            _ => {
                let artifact = self.produce_mp3(job, &workspace)?;
                if let Err(err) = self.tag(&artifact, &job.metadata) {
                    warn!("Could not tag '{}': {err}", job.metadata.title);
                    warnings.push(format!("Tags were not written: {err}"));
                }
                artifact
            }
        };

        move_file(&artifact, dest)?;
        Ok(warnings)
    }

    fn download(&self, job: &DownloadJob, stream: &StreamDescriptor, dest: &Path) -> Result<()> {
        info!(
            "Downloading {} stream {} ({})",
            stream.kind, stream.id, stream.container
        );
        self.catalog.download_stream(&job.url, stream, dest)
    }

    fn produce_mp3(&self, job: &DownloadJob, workspace: &Workspace) -> Result<PathBuf> {
        let audio = &job.selection.audio;
        let input = workspace.file(&format!("audio.{}", audio.container));
        let output = workspace.file("output.mp3");

        self.download(job, audio, &input)?;
        info!("Converting to MP3 at {}", Bitrate::MP3);
        self.transformer.transcode_mp3(&input, &output, Bitrate::MP3)?;

        Ok(output)
    }

    fn produce_mp4(
        &self,
        job: &DownloadJob,
        video: &StreamDescriptor,
        workspace: &Workspace,
    ) -> Result<PathBuf> {
        let audio = &job.selection.audio;
        let video_file = workspace.file(&format!("video.{}", video.container));
        let audio_file = workspace.file(&format!("audio.{}", audio.container));
        let output = workspace.file("output.mp4");

        self.download(job, video, &video_file)?;
        self.download(job, audio, &audio_file)?;
        info!("Merging audio and video");
        self.transformer.mux(&video_file, &audio_file, &output)?;

        Ok(output)
    }

    fn tag(&self, file: &Path, metadata: &VideoMetadata) -> Result<()> {
        let cover = self.cover(metadata);
        tagger::tag(file, metadata, cover.as_deref())
    }

    /// The cover image, if it could be downloaded
    fn cover(&self, metadata: &VideoMetadata) -> Option<Vec<u8>> {
        let url = self.thumbnails.best_url(metadata);
        if url.is_empty() {
            return None;
        }

        match self.thumbnails.fetch(&url) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!("Could not download the cover {url}: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        output::{Collision, OutputResolver, SaveMode},
        outside::NativeDesktop,
        result::Error,
        types::MediaKind,
        utils::MutexUtils,
    };

    fn stream(
        id: &str,
        kind: MediaKind,
        container: &str,
        height: Option<u32>,
    ) -> StreamDescriptor {
        StreamDescriptor {
            id: id.into(),
            kind,
            container: container.into(),
            video_codec: None,
            audio_codec: None,
            height,
            fps: None,
            bitrate: Some(128.),
            size: None,
            includes_audio: kind == MediaKind::Audio,
            progressive: false,
        }
    }

    #[derive(Debug, Default)]
    struct Fake {
        calls: Mutex<Vec<String>>,
        fail_mux: bool,
        /// Produce an MP3 whose ID3 header cannot be parsed
        corrupt_mp3: bool,
    }

    impl Fake {
        fn calls(&self) -> Vec<String> {
            self.calls.with_lock(|calls| calls.clone())
        }

        fn record(&self, call: String) {
            self.calls.with_lock(|mut calls| calls.push(call));
        }
    }

    impl StreamCatalog for Fake {
        fn probe(&self, _url: &str) -> Result<(VideoMetadata, Vec<StreamDescriptor>)> {
            let metadata = VideoMetadata {
                title: "Title".into(),
                author: "Author".into(),
                video_id: "id".into(),
                duration: 10,
                views: 1,
                thumbnail_url: String::new(),
            };
            let streams = vec![
                stream("137", MediaKind::Video, "mp4", Some(1080)),
                stream("136", MediaKind::Video, "mp4", Some(720)),
                stream("140", MediaKind::Audio, "m4a", None),
            ];
            Ok((metadata, streams))
        }

        fn download_stream(
            &self,
            _url: &str,
            stream: &StreamDescriptor,
            dest: &Path,
        ) -> Result<()> {
            self.record(format!("download {}", stream.id));
            std::fs::write(dest, stream.id.as_bytes())?;
            Ok(())
        }
    }

    impl StreamTransformer for Fake {
        fn transcode_mp3(&self, input: &Path, output: &Path, bitrate: Bitrate) -> Result<()> {
            self.record(format!("transcode {bitrate}"));
            if self.corrupt_mp3 {
                std::fs::write(output, b"ID3\x09\xFF\xFFgarbage")?;
                return Ok(());
            }
            // An MPEG frame header is enough for the tagger
            let mut data = vec![0xFF, 0xFB, 0x90, 0x64];
            data.extend(std::fs::read(input)?);
            std::fs::write(output, data)?;
            Ok(())
        }

        fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
            self.record("mux".into());
            if self.fail_mux {
                return Err(Error::Mux {
                    code: Some(1),
                    stderr: "broken".into(),
                });
            }
            let mut data = std::fs::read(video)?;
            data.extend(std::fs::read(audio)?);
            std::fs::write(output, data)?;
            Ok(())
        }
    }

    impl ThumbnailSource for Fake {
        fn best_url(&self, _metadata: &VideoMetadata) -> String {
            "http://thumbnail".into()
        }

        fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            self.record("cover".into());
            Ok(vec![0xFF, 0xD8, 0xFF, 0xE0])
        }
    }

    fn reserve(dir: &Path, file_name: &str) -> ResolvedPath {
        let desktop = NativeDesktop::headless();
        let path = dir.join(file_name);
        let ext = Extension::from_path(&path).unwrap();
        OutputResolver::new(&desktop, dir.to_path_buf(), Collision::Suffix)
            .resolve(
                "",
                None,
                ext,
                &SaveMode::Explicit {
                    path,
                    create_parents: false,
                },
            )
            .unwrap()
    }

    #[test]
    fn mp4_downloads_video_then_audio_and_muxes() {
        let fake = Fake::default();
        let temp = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let live = LiveWorkspaces::new();
        let fetcher = Fetcher::new(&fake, &fake, &fake, live.clone())
            .with_temp_root(Some(temp.path().to_path_buf()));

        let job = fetcher
            .plan("https://youtu.be/id", Target::Mp4(QualityTier::P720))
            .unwrap();
        assert_eq!(job.effective_tier(), Some(QualityTier::P720));

        let dest = reserve(out.path(), "clip.mp4");
        let outcome = fetcher.run(&job, dest).unwrap();

        assert_eq!(fake.calls(), ["download 136", "download 140", "mux"]);
        assert_eq!(std::fs::read(&outcome.path).unwrap(), b"136140");
        assert!(outcome.warnings.is_empty());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
        assert!(live.is_empty());
    }

    #[test]
    fn mp3_is_transcoded_and_tagged() {
        let fake = Fake::default();
        let temp = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(&fake, &fake, &fake, LiveWorkspaces::new())
            .with_temp_root(Some(temp.path().to_path_buf()));

        let job = fetcher.plan("https://youtu.be/id", Target::Mp3).unwrap();
        assert_eq!(job.selection.video, None);
        assert_eq!(job.extension(), Extension::Mp3);

        let outcome = fetcher.run(&job, reserve(out.path(), "song.mp3")).unwrap();

        assert_eq!(fake.calls(), ["download 140", "transcode 192k", "cover"]);
        let tag = id3::Tag::read_from_path(&outcome.path).unwrap();
        assert_eq!(id3::TagLike::title(&tag), Some("Title"));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn tag_failure_is_only_a_warning() {
        let fake = Fake {
            corrupt_mp3: true,
            ..Fake::default()
        };
        let temp = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(&fake, &fake, &fake, LiveWorkspaces::new())
            .with_temp_root(Some(temp.path().to_path_buf()));

        let job = fetcher.plan("https://youtu.be/id", Target::Mp3).unwrap();
        let outcome = fetcher.run(&job, reserve(out.path(), "song.mp3")).unwrap();

        assert_eq!(outcome.warnings.len(), 1);
        assert!(
            outcome.warnings[0].starts_with("Tags were not written: "),
            "{:?}",
            outcome.warnings
        );
        // The untagged file is still saved
        assert_eq!(
            std::fs::read(&outcome.path).unwrap(),
            b"ID3\x09\xFF\xFFgarbage"
        );
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn failure_removes_workspace_and_placeholder() {
        let fake = Fake {
            fail_mux: true,
            ..Fake::default()
        };
        let temp = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let live = LiveWorkspaces::new();
        let fetcher = Fetcher::new(&fake, &fake, &fake, live.clone())
            .with_temp_root(Some(temp.path().to_path_buf()));

        let job = fetcher
            .plan("https://youtu.be/id", Target::Mp4(QualityTier::P1080))
            .unwrap();
        let dest = reserve(out.path(), "clip.mp4");
        assert!(dest.path().exists());

        let err = fetcher.run(&job, dest).unwrap_err();
        assert!(matches!(err, Error::Mux { code: Some(1), .. }));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
        assert!(live.is_empty());
    }

    #[test]
    fn missing_tier_fails_at_planning() {
        let fake = Fake::default();
        let fetcher = Fetcher::new(&fake, &fake, &fake, LiveWorkspaces::new());

        let err = fetcher
            .plan("https://youtu.be/id", Target::Mp4(QualityTier::P144))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NoStreamAvailable {
                tier: QualityTier::P144
            }
        ));
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn target_display() {
        assert_eq!(Target::Mp3.to_string(), "MP3");
        assert_eq!(Target::Mp4(QualityTier::Max).to_string(), "MP4 max");
    }
}
