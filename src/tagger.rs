//! ID3 tagging of produced MP3 files.

use std::path::Path;

use id3::{
    frame::{Picture, PictureType},
    ErrorKind, Tag, TagLike, Version,
};
use tracing::debug;

use crate::{result::Result, types::VideoMetadata};

/// Album of every tagged file, naming where it comes from
pub const ALBUM: &str = "YouTube";

/// Tag revision understood by most players
const TAG_VERSION: Version = Version::Id3v23;

/// Image format detected by magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Unknown,
}

impl ImageFormat {
    pub fn detect(bytes: &[u8]) -> Self {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => ImageFormat::Jpeg,
            [0x89, b'P', b'N', b'G', ..] => ImageFormat::Png,
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => ImageFormat::WebP,
            _ => ImageFormat::Unknown,
        }
    }

    /// Unknown formats are declared as JPEG
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Jpeg | ImageFormat::Unknown => "image/jpeg",
        }
    }
}

/// Write title, artist, album and the optional front cover into the file tag.
///
/// A tag is created when the file has none, existing frames are replaced.
pub fn tag(path: &Path, metadata: &VideoMetadata, cover: Option<&[u8]>) -> Result<()> {
    let mut tag = match Tag::read_from_path(path) {
        Ok(tag) => tag,
        Err(err) if matches!(err.kind, ErrorKind::NoTag) => {
            debug!("No tag in {}, creating one", path.display());
            Tag::new()
        }
        Err(err) => return Err(err.into()),
    };

    tag.set_title(metadata.title.as_str());
    tag.set_artist(metadata.author.as_str());
    tag.set_album(ALBUM);

    if let Some(cover) = cover {
        tag.remove_picture_by_type(PictureType::CoverFront);
        tag.add_frame(Picture {
            mime_type: ImageFormat::detect(cover).mime_type().to_owned(),
            picture_type: PictureType::CoverFront,
            description: "Cover".to_owned(),
            data: cover.to_vec(),
        });
    }

    tag.write_to_path(path, TAG_VERSION)?;
    Ok(())
}
