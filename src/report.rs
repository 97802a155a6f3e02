//! Human readable output of the terminal tools.

use std::{cmp::Reverse, fmt::Write, path::Path};

use indoc::indoc;
use owo_colors::{OwoColorize, Stream::Stdout};

use crate::{
    selector::PREFERRED_AUDIO_ID,
    types::{MediaKind, QualityTier, StreamDescriptor, VideoMetadata},
};

const RULE_WIDTH: usize = 72;

pub const BANNER: &str = indoc! {"
    ╔══════════════════════════════════════════════════════╗
    ║                       ytfetch                        ║
    ║     YouTube videos as tagged MP3 or muxed MP4 files  ║
    ╚══════════════════════════════════════════════════════╝
"};

fn rule() -> String {
    "═".repeat(RULE_WIDTH)
}

fn heading(text: &str) -> String {
    text.if_supports_color(Stdout, |t| t.bold()).to_string()
}

/// Size in MB, with one decimal
pub fn megabytes(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / (1024. * 1024.))
}

/// Short summary shown before a download starts
pub fn summary(metadata: &VideoMetadata) -> String {
    format!(
        "{} {}\n{} {}\n{} {}\n",
        heading("Video:   "),
        metadata.title,
        heading("Channel: "),
        metadata.author,
        heading("Length:  "),
        metadata.length_formatted(),
    )
}

/// Everything known about the video
pub fn info(metadata: &VideoMetadata) -> String {
    let rule = rule();
    let mut out = String::new();
    let _ = writeln!(out, "{rule}\n{}\n{rule}", heading("VIDEO INFORMATION"));
    let _ = writeln!(out, "  Title:     {}", metadata.title);
    let _ = writeln!(out, "  Channel:   {}", metadata.author);
    let _ = writeln!(out, "  ID:        {}", metadata.video_id);
    let _ = writeln!(
        out,
        "  Length:    {} ({} seconds)",
        metadata.length_formatted(),
        metadata.duration
    );
    let _ = writeln!(out, "  Views:     {}", metadata.views_formatted());
    let _ = writeln!(out, "  Thumbnail: {}", metadata.thumbnail_url);
    let _ = writeln!(out, "{rule}");
    out
}

/// Colored yes/no, padded to `width` before coloring so that the escape
/// codes do not count in the column width
fn flag(value: bool, width: usize) -> String {
    let text = format!("{:<width$}", if value { "yes" } else { "no" });
    if value {
        text.if_supports_color(Stdout, |t| t.green()).to_string()
    } else {
        text.if_supports_color(Stdout, |t| t.red()).to_string()
    }
}

fn stream_row(out: &mut String, stream: &StreamDescriptor, duration: u64) {
    let size = match stream.effective_size(duration) {
        Some((bytes, false)) => megabytes(bytes),
        Some((bytes, true)) => format!("~{}", megabytes(bytes)),
        None => "N/A".to_owned(),
    };
    let detail = match stream.kind {
        MediaKind::Video => stream.resolution_label().unwrap_or_default(),
        MediaKind::Audio => stream
            .bitrate
            .map(|b| format!("{b:.0}kbps"))
            .unwrap_or_default(),
    };
    let fps = stream.fps.map(|f| format!("{f:.0}")).unwrap_or_default();

    let _ = writeln!(
        out,
        "{:<8} {:<12} {:<10} {:<5} {:<11} {} {}",
        stream.id,
        stream.mime_type(),
        detail,
        fps,
        size,
        flag(stream.includes_audio, 5),
        flag(stream.progressive, 0),
    );
}

/// Table of the streams: videos by resolution and frame rate, then audios
/// by bitrate, best first
pub fn streams(streams: &[StreamDescriptor], duration: u64) -> String {
    let mut videos: Vec<_> = streams
        .iter()
        .filter(|s| s.kind == MediaKind::Video)
        .collect();
    videos.sort_by_key(|s| {
        (
            Reverse(s.height.unwrap_or(0)),
            Reverse(s.fps.map_or(0, |f| (f * 100.) as u64)),
        )
    });

    let mut audios: Vec<_> = streams
        .iter()
        .filter(|s| s.kind == MediaKind::Audio)
        .collect();
    audios.sort_by_key(|s| Reverse(s.bitrate.map_or(0, |b| (b * 100.) as u64)));

    let rule = rule();
    let mut out = String::new();
    let _ = writeln!(out, "{rule}\n{}\n{rule}", heading("AVAILABLE STREAMS"));
    let _ = writeln!(
        out,
        "{:<8} {:<12} {:<10} {:<5} {:<11} {:<5} {}",
        "ID", "Type", "Quality", "FPS", "Size", "Audio", "Progressive"
    );

    let _ = writeln!(out, "\n{}", heading("Video"));
    for stream in videos {
        stream_row(&mut out, stream, duration);
    }
    let _ = writeln!(out, "\n{}", heading("Audio"));
    for stream in audios {
        stream_row(&mut out, stream, duration);
    }

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Total: {} streams", streams.len());
    let _ = writeln!(out, "\n{}", heading("Recommendations"));
    let _ = writeln!(out, "  - MP3: use an audio only stream");
    let _ = writeln!(
        out,
        "  - MP4: a non progressive video stream merged with a separate audio stream"
    );
    let _ = writeln!(
        out,
        "  - Best audio: ID {PREFERRED_AUDIO_ID} (AAC in MP4, 128kbps)"
    );
    out
}

/// Report of a saved file
pub fn completed(path: &Path, tier: Option<QualityTier>, warnings: &[String]) -> String {
    let rule = rule();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{rule}\n{}\n{rule}",
        heading("DOWNLOAD COMPLETED").if_supports_color(Stdout, |t| t.green())
    );

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let _ = writeln!(out, "  File:       {name}");
    if let Ok(meta) = std::fs::metadata(path) {
        let _ = writeln!(out, "  Size:       {}", megabytes(meta.len()));
    }
    if let Some(tier) = tier {
        let _ = writeln!(out, "  Quality:    {tier}");
    }
    if let Some(parent) = path.parent() {
        let _ = writeln!(out, "  Location:   {}", parent.display());
    }
    for warning in warnings {
        let _ = writeln!(
            out,
            "  {} {warning}",
            "Warning:".if_supports_color(Stdout, |t| t.yellow())
        );
    }
    let _ = writeln!(out, "{rule}");
    out
}
