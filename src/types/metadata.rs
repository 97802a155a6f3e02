use std::fmt::Display;

use serde::Serialize;

/// Information about a single video, as reported by the stream provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoMetadata {
    pub title: String,
    pub author: String,
    pub video_id: String,
    /// Length in seconds
    pub duration: u64,
    pub views: u64,
    pub thumbnail_url: String,
}

impl VideoMetadata {
    /// Format the duration as `M:SS`, or `H:MM:SS` from one hour on
    pub fn length_formatted(&self) -> String {
        let (h, m, s) = (
            self.duration / 3600,
            (self.duration % 3600) / 60,
            self.duration % 60,
        );
        if h > 0 {
            format!("{h}:{m:02}:{s:02}")
        } else {
            format!("{m}:{s:02}")
        }
    }

    /// Format the view count with thousands separators, e.g. `1,234,567`
    pub fn views_formatted(&self) -> String {
        let digits = self.views.to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(c);
        }
        out
    }
}

impl Display for VideoMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' by {} ({}, {})",
            self.title,
            self.author,
            self.video_id,
            self.length_formatted()
        )
    }
}
