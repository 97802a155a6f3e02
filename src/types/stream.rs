use std::fmt::Display;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        })
    }
}

/// One downloadable audio or video track variant of a video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamDescriptor {
    /// Opaque token used to request this exact stream from the provider
    pub id: String,
    pub kind: MediaKind,
    /// Container tag, e.g. `mp4`, `webm` or `m4a`
    pub container: String,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    /// Pixel height, video streams only
    pub height: Option<u32>,
    pub fps: Option<f32>,
    /// Average bitrate in kbps
    pub bitrate: Option<f32>,
    /// Declared size in bytes, the provider may not know it
    pub size: Option<u64>,
    pub includes_audio: bool,
    /// Audio and video are already combined in this stream
    pub progressive: bool,
}

impl StreamDescriptor {
    pub fn mime_type(&self) -> String {
        let subtype = match self.container.as_str() {
            "m4a" => "mp4",
            other => other,
        };
        format!("{}/{subtype}", self.kind)
    }

    pub fn is_audio_only(&self) -> bool {
        self.kind == MediaKind::Audio && !self.progressive
    }

    pub fn resolution_label(&self) -> Option<String> {
        self.height.map(|h| format!("{h}p"))
    }

    /// Size in bytes, either declared or estimated from the bitrate.
    ///
    /// The boolean is true when the value is an estimation.
    pub fn effective_size(&self, duration: u64) -> Option<(u64, bool)> {
        if let Some(size) = self.size {
            return Some((size, false));
        }

        let kbps = match (self.kind, self.bitrate, self.height) {
            (MediaKind::Audio, Some(bitrate), _) => bitrate as u64,
            (MediaKind::Video, _, Some(height)) => estimated_video_kbps(height),
            _ => return None,
        };

        if duration == 0 {
            return None;
        }
        Some((kbps * 1000 / 8 * duration, true))
    }
}

/// Typical bitrate of a video stream per resolution
fn estimated_video_kbps(height: u32) -> u64 {
    match height {
        144 => 150,
        240 => 300,
        360 => 800,
        480 => 1200,
        720 => 2500,
        1080 => 4500,
        _ => 2000,
    }
}
