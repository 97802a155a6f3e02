use std::fmt::Display;

/// An audio bitrate in kilobits per second
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Bitrate(u16);

impl Bitrate {
    /// Constant target bitrate of produced MP3 files
    pub const MP3: Bitrate = Bitrate(192);
}

/// Formatted the way ffmpeg expects it, e.g. `192k`
impl Display for Bitrate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}k", self.0)
    }
}
