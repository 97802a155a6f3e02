//! Choice of the streams to download for a requested quality.

use std::cmp::Ordering;

use tracing::{debug, info};

use crate::{
    result::{Error, Result},
    types::{MediaKind, QualityTier, StreamDescriptor},
};

/// Provider identifier of the AAC 128 kbps audio stream, preferred when present
pub const PREFERRED_AUDIO_ID: &str = "140";

/// Container of the video streams that can be muxed into the output file
pub const VIDEO_CONTAINER: &str = "mp4";

/// The streams chosen for one download
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Video-only stream, absent for audio downloads
    pub video: Option<StreamDescriptor>,
    /// Audio-only stream
    pub audio: StreamDescriptor,
    /// Tier actually served, differs from the requested one after a fallback
    pub tier: Option<QualityTier>,
}

/// Select the audio-only stream for an audio download
pub fn select_audio(streams: &[StreamDescriptor]) -> Result<Selection> {
    let audio = best_audio(streams).ok_or(Error::NoStreamAvailable {
        tier: QualityTier::Max,
    })?;

    Ok(Selection {
        video: None,
        audio: audio.clone(),
        tier: None,
    })
}

/// Select a separate video stream for the tier and the audio stream to mux with it.
///
/// When 1080p is missing, 720p is tried once instead.
pub fn select(streams: &[StreamDescriptor], tier: QualityTier) -> Result<Selection> {
    let audio = best_audio(streams).ok_or(Error::NoStreamAvailable { tier })?;

    let candidates: Vec<&StreamDescriptor> = streams
        .iter()
        .filter(|s| s.kind == MediaKind::Video)
        .filter(|s| s.container == VIDEO_CONTAINER && !s.progressive)
        .collect();
    debug!("{} separate {VIDEO_CONTAINER} video streams", candidates.len());

    let (video, served) = match best_video(&candidates, tier) {
        Some(video) => (video, tier),
        None => {
            let fallback = tier.fallback().ok_or(Error::NoStreamAvailable { tier })?;
            let video =
                best_video(&candidates, fallback).ok_or(Error::NoStreamAvailable { tier })?;
            info!("No {tier} stream, falling back to {fallback}");
            (video, fallback)
        }
    };

    debug!(
        "Selected video stream {} ({:?}p) and audio stream {}",
        video.id, video.height, audio.id
    );

    Ok(Selection {
        video: Some(video.clone()),
        audio: audio.clone(),
        tier: Some(served),
    })
}

/// The preferred audio stream if offered, else the audio-only stream
/// with the highest bitrate. The first one in provider order wins ties.
fn best_audio(streams: &[StreamDescriptor]) -> Option<&StreamDescriptor> {
    let audio_only = || streams.iter().filter(|s| s.is_audio_only());

    if let Some(preferred) = audio_only().find(|s| s.id == PREFERRED_AUDIO_ID) {
        return Some(preferred);
    }

    audio_only().fold(None, |best, s| match best {
        Some(best) if cmp_opt(s.bitrate, best.bitrate) != Ordering::Greater => Some(best),
        _ => Some(s),
    })
}

fn best_video<'a>(
    candidates: &[&'a StreamDescriptor],
    tier: QualityTier,
) -> Option<&'a StreamDescriptor> {
    let matching: Vec<&StreamDescriptor> = match tier.height() {
        Some(height) => candidates
            .iter()
            .copied()
            .filter(|s| s.height == Some(height))
            .collect(),
        None => {
            let max = candidates.iter().filter_map(|s| s.height).max()?;
            candidates
                .iter()
                .copied()
                .filter(|s| s.height == Some(max))
                .collect()
        }
    };

    // Keep the first of equals: only replace on a strictly better stream
    matching.into_iter().fold(None, |best, s| match best {
        Some(best) if tie_break(s, best) != Ordering::Greater => Some(best),
        _ => Some(s),
    })
}

/// Higher frame rate first, then higher bitrate
fn tie_break(a: &StreamDescriptor, b: &StreamDescriptor) -> Ordering {
    cmp_opt(a.fps, b.fps).then_with(|| cmp_opt(a.bitrate, b.bitrate))
}

/// Compare optional measures, an unknown value being the lowest
fn cmp_opt(a: Option<f32>, b: Option<f32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
