use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    config::Settings,
    io::LiveWorkspaces,
    orchestrator::{DownloadJob, Fetcher, Outcome, Target},
    output::{default_downloads_dir, Collision, OutputResolver, SaveMode},
    outside::{Desktop, Ffmpeg, StreamCatalog, StreamTransformer, Ytdl},
    result::{err_msg, Result},
    thumbnail::{ThumbnailFetcher, ThumbnailSource},
};

/// The components shared by every surface
#[derive(Debug)]
pub struct App {
    settings: Settings,
    catalog: Box<dyn StreamCatalog>,
    transformer: Box<dyn StreamTransformer>,
    thumbnails: Box<dyn ThumbnailSource>,
    desktop: Box<dyn Desktop>,
    live: Arc<LiveWorkspaces>,
}

impl App {
    pub fn new(
        settings: Settings,
        catalog: Box<dyn StreamCatalog>,
        transformer: Box<dyn StreamTransformer>,
        thumbnails: Box<dyn ThumbnailSource>,
        desktop: Box<dyn Desktop>,
        live: Arc<LiveWorkspaces>,
    ) -> Self {
        Self {
            settings,
            catalog,
            transformer,
            thumbnails,
            desktop,
            live,
        }
    }

    /// Build the application on the external programs.
    ///
    /// Fails when `yt-dlp` (or `youtube-dl`) or `ffmpeg` cannot be found.
    /// Must not be called from an async context.
    pub fn load(
        settings: Settings,
        desktop: Box<dyn Desktop>,
        live: Arc<LiveWorkspaces>,
    ) -> Result<Self> {
        // Check both programs concurrently, spawning them is not instantaneous
        let ytdl_program = settings.ytdlp.clone();
        let ytdl_thread = std::thread::spawn(move || Ytdl::new(ytdl_program.as_deref()));
        let ffmpeg_program = settings.ffmpeg.clone();
        let ffmpeg_thread = std::thread::spawn(move || Ffmpeg::new(ffmpeg_program.as_deref()));

        let ytdl = ytdl_thread
            .join()
            .map_err(|_| err_msg("Could not join the yt-dlp check thread"))??;
        let ffmpeg = ffmpeg_thread
            .join()
            .map_err(|_| err_msg("Could not join the ffmpeg check thread"))??;
        debug!("Using {}", ytdl.program());

        let thumbnails = ThumbnailFetcher::new(
            &settings.thumbnail_base_url,
            settings.thumbnail_timeout(),
            settings.cover_timeout(),
        )?;

        Ok(Self::new(
            settings,
            Box::new(ytdl),
            Box::new(ffmpeg),
            Box::new(thumbnails),
            desktop,
            live,
        ))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn catalog(&self) -> &dyn StreamCatalog {
        self.catalog.as_ref()
    }

    pub fn thumbnails(&self) -> &dyn ThumbnailSource {
        self.thumbnails.as_ref()
    }

    pub fn desktop(&self) -> &dyn Desktop {
        self.desktop.as_ref()
    }

    pub fn live_workspaces(&self) -> &Arc<LiveWorkspaces> {
        &self.live
    }

    pub fn fetcher(&self) -> Fetcher<'_> {
        Fetcher::new(
            self.catalog.as_ref(),
            self.transformer.as_ref(),
            self.thumbnails.as_ref(),
            self.live.clone(),
        )
        .with_temp_root(self.settings.temp_dir.clone())
    }

    pub fn resolver<'a>(&'a self, collision: Collision<'a>) -> OutputResolver<'a> {
        OutputResolver::new(
            self.desktop.as_ref(),
            default_downloads_dir(self.settings.downloads_dir.as_deref()),
            collision,
        )
        .with_live(self.live.clone())
    }

    /// Fetch the video information and choose the streams
    pub fn plan(&self, url: &str, target: Target) -> Result<DownloadJob> {
        let job = self.fetcher().plan(url, target)?;
        if let (Target::Mp4(requested), Some(effective)) = (target, job.effective_tier()) {
            if requested != effective {
                info!("{requested} is not available, using {effective}");
            }
        }
        Ok(job)
    }

    /// Decide where to save the planned job and run it
    pub fn save(
        &self,
        job: &DownloadJob,
        mode: &SaveMode,
        collision: Collision<'_>,
    ) -> Result<Outcome> {
        let output = self.resolver(collision).resolve(
            &job.metadata.title,
            job.effective_tier(),
            job.extension(),
            mode,
        )?;
        info!("Saving {} to {}", job.target, output.path().display());

        self.fetcher().run(job, output)
    }

    pub fn download(
        &self,
        url: &str,
        target: Target,
        mode: &SaveMode,
        collision: Collision<'_>,
    ) -> Result<(DownloadJob, Outcome)> {
        let job = self.plan(url, target)?;
        let outcome = self.save(&job, mode, collision)?;
        Ok((job, outcome))
    }
}
