//! Fake external programs shared by the integration tests

#![allow(dead_code)]

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use ytfetch::{
    config::Settings,
    io::LiveWorkspaces,
    outside::{Desktop, DialogOutcome, StreamCatalog, StreamTransformer},
    result::{Error, ProviderErrorKind, Result},
    thumbnail::ThumbnailSource,
    types::{Bitrate, MediaKind, StreamDescriptor, VideoMetadata},
    App,
};

pub const VIDEO_ID: &str = "dQw4w9WgXcQ";
pub const JPEG: [u8; 8] = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];

pub fn metadata(title: &str) -> VideoMetadata {
    VideoMetadata {
        title: title.to_owned(),
        author: "Rick Astley".to_owned(),
        video_id: VIDEO_ID.to_owned(),
        duration: 213,
        views: 1_600_000_000,
        thumbnail_url: format!("https://i.ytimg.com/vi/{VIDEO_ID}/hqdefault.jpg"),
    }
}

pub fn video(id: &str, height: u32) -> StreamDescriptor {
    StreamDescriptor {
        id: id.to_owned(),
        kind: MediaKind::Video,
        container: "mp4".to_owned(),
        video_codec: Some("avc1.4d401f".to_owned()),
        audio_codec: None,
        height: Some(height),
        fps: Some(30.),
        bitrate: Some(1500.),
        size: None,
        includes_audio: false,
        progressive: false,
    }
}

pub fn audio(id: &str, container: &str, bitrate: f32) -> StreamDescriptor {
    StreamDescriptor {
        id: id.to_owned(),
        kind: MediaKind::Audio,
        container: container.to_owned(),
        video_codec: None,
        audio_codec: Some("mp4a.40.2".to_owned()),
        height: None,
        fps: None,
        bitrate: Some(bitrate),
        size: Some(3_400_000),
        includes_audio: true,
        progressive: false,
    }
}

/// Streams of a typical video, up to 1080p
pub fn typical_streams() -> Vec<StreamDescriptor> {
    vec![
        video("160", 144),
        video("134", 360),
        video("136", 720),
        video("137", 1080),
        audio("251", "webm", 160.),
        audio("140", "m4a", 128.),
    ]
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Mutex<Vec<String>>,
}

/// Catalog, transformer and thumbnail source writing recognizable bytes.
///
/// Clones share the recorded calls.
#[derive(Debug, Clone)]
pub struct Fake {
    pub metadata: VideoMetadata,
    pub streams: Vec<StreamDescriptor>,
    pub fail_mux: bool,
    /// Answer every probe with this provider error
    pub provider_error: Option<ProviderErrorKind>,
    state: Arc<FakeState>,
}

impl Fake {
    pub fn new(title: &str) -> Self {
        Self {
            metadata: metadata(title),
            streams: typical_streams(),
            fail_mux: false,
            provider_error: None,
            state: Arc::default(),
        }
    }

    pub fn failing_mux(mut self) -> Self {
        self.fail_mux = true;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.provider_error = Some(ProviderErrorKind::Unavailable);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.state.calls.lock().unwrap().push(call);
    }
}

impl StreamCatalog for Fake {
    fn probe(&self, url: &str) -> Result<(VideoMetadata, Vec<StreamDescriptor>)> {
        self.record(format!("probe {url}"));
        match self.provider_error {
            Some(kind) => Err(Error::provider(kind, "This video is unavailable")),
            None => Ok((self.metadata.clone(), self.streams.clone())),
        }
    }

    fn download_stream(&self, _url: &str, stream: &StreamDescriptor, dest: &Path) -> Result<()> {
        self.record(format!("download {}", stream.id));
        std::fs::write(dest, stream.id.as_bytes())?;
        Ok(())
    }
}

impl StreamTransformer for Fake {
    fn transcode_mp3(&self, input: &Path, output: &Path, bitrate: Bitrate) -> Result<()> {
        self.record(format!("transcode {bitrate}"));
        // One MPEG audio frame header, enough to be taken as an MP3 file
        let mut data = vec![0xFF, 0xFB, 0x90, 0x64];
        data.extend(std::fs::read(input)?);
        data.resize(data.len() + 413, 0);
        std::fs::write(output, data)?;
        Ok(())
    }

    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        self.record("mux".to_owned());
        if self.fail_mux {
            return Err(Error::Mux {
                code: Some(1),
                stderr: "Invalid data found when processing input".to_owned(),
            });
        }
        let mut data = std::fs::read(video)?;
        data.push(b'+');
        data.extend(std::fs::read(audio)?);
        std::fs::write(output, data)?;
        Ok(())
    }
}

impl ThumbnailSource for Fake {
    fn best_url(&self, metadata: &VideoMetadata) -> String {
        format!("https://i.ytimg.com/vi/{}/maxresdefault.jpg", metadata.video_id)
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.record(format!("cover {url}"));
        Ok(JPEG.to_vec())
    }
}

/// Desktop without any dialog, recording what it opens
#[derive(Debug, Default)]
pub struct FakeDesktop {
    pub chosen: Option<PathBuf>,
    pub opened: Mutex<Vec<String>>,
}

impl Desktop for FakeDesktop {
    fn prompt_save_path(&self, _suggested: &str) -> Result<DialogOutcome> {
        Ok(match &self.chosen {
            Some(path) => DialogOutcome::Chosen(path.clone()),
            None => DialogOutcome::Unavailable,
        })
    }

    fn open(&self, target: &OsStr) -> Result<()> {
        self.opened
            .lock()
            .unwrap()
            .push(target.to_string_lossy().into_owned());
        Ok(())
    }
}

/// Settings keeping every file of the test inside `root`
pub fn settings(root: &Path) -> Settings {
    Settings {
        downloads_dir: Some(root.join("downloads")),
        temp_dir: Some(root.join("tmp")),
        ..Settings::default()
    }
}

pub fn app(fake: &Fake, settings: Settings) -> App {
    App::new(
        settings,
        Box::new(fake.clone()),
        Box::new(fake.clone()),
        Box::new(fake.clone()),
        Box::new(FakeDesktop::default()),
        LiveWorkspaces::new(),
    )
}

/// Names of the entries of a folder, sorted
pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}
