use std::{fmt::Display, str::FromStr};

use serde::Serialize;

/// User facing quality selector for video downloads.
///
/// Ordered from the lowest resolution to the best available one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum QualityTier {
    P144,
    P240,
    P360,
    P480,
    #[default]
    P720,
    P1080,
    /// Whatever the largest available resolution is
    Max,
}

impl QualityTier {
    pub const ALL: [QualityTier; 7] = [
        QualityTier::P144,
        QualityTier::P240,
        QualityTier::P360,
        QualityTier::P480,
        QualityTier::P720,
        QualityTier::P1080,
        QualityTier::Max,
    ];

    /// Target pixel height, `None` for [`QualityTier::Max`]
    pub fn height(self) -> Option<u32> {
        match self {
            QualityTier::P144 => Some(144),
            QualityTier::P240 => Some(240),
            QualityTier::P360 => Some(360),
            QualityTier::P480 => Some(480),
            QualityTier::P720 => Some(720),
            QualityTier::P1080 => Some(1080),
            QualityTier::Max => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityTier::P144 => "144p",
            QualityTier::P240 => "240p",
            QualityTier::P360 => "360p",
            QualityTier::P480 => "480p",
            QualityTier::P720 => "720p",
            QualityTier::P1080 => "1080p",
            QualityTier::Max => "max",
        }
    }

    /// Map the numeric levels of the menus and of the HTTP API
    /// (`1` = 144p ... `5` = max).
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(QualityTier::P144),
            2 => Some(QualityTier::P360),
            3 => Some(QualityTier::P720),
            4 => Some(QualityTier::P1080),
            5 => Some(QualityTier::Max),
            _ => None,
        }
    }

    /// The single lower tier to retry with when no stream matches exactly.
    ///
    /// Only 1080p has one; the retry never cascades further down.
    pub fn fallback(self) -> Option<Self> {
        match self {
            QualityTier::P1080 => Some(QualityTier::P720),
            _ => None,
        }
    }
}

impl Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();

        if let Ok(level) = s.parse::<u8>() {
            return Self::from_level(level)
                .ok_or_else(|| format!("Invalid quality level {level}, expected 1 to 5"));
        }

        match s.as_str() {
            "max" | "maximum" | "best" => return Ok(QualityTier::Max),
            _ => (),
        }

        let height = s
            .strip_suffix('p')
            .and_then(|h| h.parse::<u32>().ok())
            .ok_or_else(|| format!("Invalid quality '{s}'"))?;

        Self::ALL
            .into_iter()
            .find(|tier| tier.height() == Some(height))
            .ok_or_else(|| format!("Unsupported resolution {height}p"))
    }
}

impl Serialize for QualityTier {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}
