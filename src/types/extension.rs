use std::path::Path;

/// Container format of a produced file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Mp3,
    Mp4,
}

impl Extension {
    /// Return the extension with the leading dot.
    /// e.g. ".ext"
    pub fn with_dot(self) -> &'static str {
        match self {
            Extension::Mp3 => ".mp3",
            Extension::Mp4 => ".mp4",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Extension::Mp3 => "audio/mpeg",
            Extension::Mp4 => "video/mp4",
        }
    }

    /// Parse the path file extension.
    /// Return None in case of no or invalid extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_ascii_lowercase().as_str() {
                "mp3" => Some(Self::Mp3),
                "mp4" => Some(Self::Mp4),
                _ => None,
            })
    }
}
