//! Discovery and download of video thumbnails, used as cover art.

use std::{fmt::Debug, time::Duration};

use miette::{miette, Context, IntoDiagnostic};
use reqwest::{blocking::Client, header::CONTENT_TYPE, StatusCode};
use tracing::{debug, trace};

use crate::{result::Result, types::VideoMetadata};

pub const DEFAULT_BASE_URL: &str = "https://i.ytimg.com/vi";

/// Thumbnail names from the best to the worst resolution
const CANDIDATES: [&str; 3] = ["maxresdefault.jpg", "sddefault.jpg", "hqdefault.jpg"];

pub trait ThumbnailSource: Sync + Send + Debug {
    /// URL of the best thumbnail of the video
    fn best_url(&self, metadata: &VideoMetadata) -> String;

    /// Download the image behind the URL
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct ThumbnailFetcher {
    client: Client,
    base_url: String,
    probe_timeout: Duration,
    fetch_timeout: Duration,
}

impl ThumbnailFetcher {
    /// Must not be called from an async context
    pub fn new(base_url: &str, probe_timeout: Duration, fetch_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .build()
            .into_diagnostic()
            .wrap_err("Could not build the HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            probe_timeout,
            fetch_timeout,
        })
    }

    /// Candidate URLs derived from the video ID, best resolution first
    pub fn candidates(&self, video_id: &str) -> Vec<String> {
        CANDIDATES
            .iter()
            .map(|name| format!("{}/{video_id}/{name}", self.base_url))
            .collect()
    }

    /// Whether the URL answers 200 with an image
    fn is_image(&self, url: &str) -> bool {
        let res = match self.client.get(url).timeout(self.probe_timeout).send() {
            Ok(res) => res,
            Err(err) => {
                trace!("Thumbnail candidate {url} failed: {err}");
                return false;
            }
        };

        let is_image = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("image/"));

        res.status() == StatusCode::OK && is_image
    }
}

impl ThumbnailSource for ThumbnailFetcher {
    fn best_url(&self, metadata: &VideoMetadata) -> String {
        if !metadata.video_id.is_empty() {
            if let Some(url) = self
                .candidates(&metadata.video_id)
                .into_iter()
                .find(|url| self.is_image(url))
            {
                debug!("Using thumbnail {url}");
                return url;
            }
        }

        debug!("No candidate thumbnail, using the provider one");
        metadata.thumbnail_url.clone()
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let res = self
            .client
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .into_diagnostic()
            .wrap_err("Could not download thumbnail")?;

        if res.status() != StatusCode::OK {
            return Err(miette!("Thumbnail request answered {}", res.status()).into());
        }

        let bytes = res
            .bytes()
            .into_diagnostic()
            .wrap_err("Could not read thumbnail")?;
        Ok(bytes.to_vec())
    }
}

/// Short name of the thumbnail flavor, e.g. `maxresdefault`
pub fn thumbnail_kind(url: &str) -> &'static str {
    CANDIDATES
        .iter()
        .map(|name| name.trim_end_matches(".jpg"))
        .find(|kind| url.contains(kind))
        .unwrap_or("provider")
}
