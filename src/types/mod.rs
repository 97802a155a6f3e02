mod bitrate;
mod extension;
mod metadata;
mod quality;
mod stream;

pub use bitrate::Bitrate;
pub use extension::Extension;
pub use metadata::VideoMetadata;
pub use quality::QualityTier;
pub use stream::{MediaKind, StreamDescriptor};
