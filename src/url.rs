use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::result::{Error, ProviderErrorKind, Result};

/// The 11 characters ID of a video
macro_rules! video_id {
    () => {
        r#"(?P<id>[A-Za-z0-9_-]{11})"#
    };
}
/// The hosts of the watch pages
macro_rules! long_host {
    () => {
        r#"(?:(?:www|m|music)\.)?youtube(?:-nocookie)?\.com"#
    };
}
/// The paths leading to a single video
macro_rules! video_path {
    () => {
        r#"/(?:watch\?(?:[^#]*&)?v=|shorts/|embed/|live/|v/)"#
    };
}

/// Example: "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42"
const LONG_URL: &str = concat!("^https?://", long_host!(), video_path!(), video_id!());

/// Example: "https://youtu.be/dQw4w9WgXcQ?si=abc"
const SHORT_URL: &str = concat!(r#"^https?://youtu\.be/"#, video_id!());

static URL_RE_LIST: OnceLock<[Regex; 2]> = OnceLock::new();

fn url_re_list() -> &'static [Regex] {
    URL_RE_LIST.get_or_init(|| {
        [LONG_URL, SHORT_URL].map(|pattern| Regex::new(pattern).expect("Invalid video URL regex"))
    })
}

/// The video ID of a YouTube video URL
pub fn video_id(url: &str) -> Option<&str> {
    url_re_list()
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.name("id"))
        .map(|id| id.as_str())
}

/// Check that the URL can be given to the stream provider and return it trimmed.
///
/// Only web URLs are accepted. URLs of other sites are let through as the
/// provider may support them.
pub fn check_url(url: &str) -> Result<&str> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::provider(
            ProviderErrorKind::InvalidUrl,
            "the URL must start with http:// or https://",
        ));
    }

    match video_id(url) {
        Some(id) => debug!("Video ID: {id}"),
        None => warn!("{url} does not look like a YouTube video URL, trying anyway"),
    }
    Ok(url)
}
