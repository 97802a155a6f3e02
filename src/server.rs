//! HTTP API over the download pipeline.
//!
//! Every job is blocking (external programs, blocking HTTP client) and runs
//! on the blocking pool of the runtime.

use std::{fmt::Write, future::Future, net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use miette::{Context, IntoDiagnostic};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::{
    app::App,
    orchestrator::Target,
    output::{Collision, SaveMode},
    result::{Error, Result},
    thumbnail::thumbnail_kind,
    types::QualityTier,
    url::check_url,
};

#[derive(Clone)]
struct ServerState {
    app: Arc<App>,
}

/// Failure answered as `{"detail": ...}`
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }

    /// Requests that cannot be served are answered 400, local failures 500
    fn failed(context: &str, err: Error) -> Self {
        let detail = format!("{context}: {}", err.summary());
        if err.is_client_fault() {
            Self::bad_request(detail)
        } else {
            Self::internal(detail)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{}", self.detail);
        } else {
            warn!("{}", self.detail);
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Run the job on the blocking pool
async fn blocking<T, F>(job: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|err| ApiError::internal(format!("The job did not complete: {err}")))?
}

pub fn router(app: Arc<App>) -> Router {
    Router::new()
        .route("/request", get(video_info))
        .route("/conversion/mp3", get(convert_mp3))
        .route("/conversion/mp4", get(convert_mp4))
        .route("/debug/streams", post(debug_streams))
        .route("/health", get(health))
        .with_state(ServerState { app })
}

/// Serve the API on an already bound listener until `shutdown` resolves
pub async fn serve_on<F>(listener: TcpListener, app: Arc<App>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!("Listening on http://{addr}");
    info!("  GET  /request?urlVideo=       video information");
    info!("  GET  /conversion/mp3?url=     MP3 file");
    info!("  GET  /conversion/mp4?url=&calidad=1-5  MP4 file");
    info!("  POST /debug/streams?url=      available streams");

    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}

pub async fn serve<F>(app: Arc<App>, bind: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(bind)
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not listen on {bind}"))?;
    serve_on(listener, app, shutdown).await
}

#[derive(Deserialize)]
struct InfoQuery {
    #[serde(rename = "urlVideo")]
    url_video: String,
}

#[derive(Deserialize)]
struct UrlQuery {
    url: String,
}

#[derive(Deserialize)]
struct Mp4Query {
    url: String,
    calidad: String,
}

async fn video_info(
    State(state): State<ServerState>,
    Query(query): Query<InfoQuery>,
) -> ApiResult<Json<Value>> {
    let app = state.app;
    blocking(move || {
        let context = "Invalid URL or error";
        let url = check_url(&query.url_video).map_err(|err| ApiError::failed(context, err))?;
        let metadata = app
            .catalog()
            .fetch_metadata(url)
            .map_err(|err| ApiError::failed(context, err))?;
        let thumbnail = app.thumbnails().best_url(&metadata);

        Ok(Json(json!({
            "success": true,
            "thumbnail_type": thumbnail_kind(&thumbnail),
            "thumbnail": thumbnail,
            "titulo": metadata.title,
            "canal": metadata.author,
            "video_id": metadata.video_id,
            "duracion": metadata.duration,
            "views": metadata.views,
            "length_formatted": metadata.length_formatted(),
        })))
    })
    .await
}

async fn convert_mp3(
    State(state): State<ServerState>,
    Query(query): Query<UrlQuery>,
) -> ApiResult<Response> {
    let app = state.app;
    blocking(move || convert(&app, &query.url, Target::Mp3, "MP3 download failed")).await
}

async fn convert_mp4(
    State(state): State<ServerState>,
    Query(query): Query<Mp4Query>,
) -> ApiResult<Response> {
    let tier = parse_level(&query.calidad)
        .ok_or_else(|| ApiError::bad_request("Invalid quality, use 1-5"))?;

    let app = state.app;
    blocking(move || convert(&app, &query.url, Target::Mp4(tier), "MP4 download failed")).await
}

fn parse_level(level: &str) -> Option<QualityTier> {
    level.trim().parse().ok().and_then(QualityTier::from_level)
}

/// Produce the file in a directory of its own and answer with its bytes.
/// The directory is removed once the bytes are read.
fn convert(app: &App, url: &str, target: Target, context: &str) -> ApiResult<Response> {
    let url = check_url(url).map_err(|err| ApiError::failed(context, err))?;

    let mut builder = tempfile::Builder::new();
    builder.prefix("ytfetch-response-");
    let dir = match &app.settings().temp_dir {
        Some(root) => std::fs::create_dir_all(root).and_then(|()| builder.tempdir_in(root)),
        None => builder.tempdir(),
    }
    .map_err(|err| ApiError::failed(context, err.into()))?;

    let mode = SaveMode::Explicit {
        path: dir.path().to_path_buf(),
        create_parents: false,
    };
    let (job, outcome) = app
        .download(url, target, &mode, Collision::Suffix)
        .map_err(|err| ApiError::failed(context, err))?;
    for warning in &outcome.warnings {
        warn!("{warning}");
    }

    let bytes = std::fs::read(&outcome.path).map_err(|err| ApiError::failed(context, err.into()))?;
    let file_name = outcome
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!("Sending {file_name} ({} bytes)", bytes.len());

    Ok((
        [
            (header::CONTENT_TYPE, job.extension().mime_type().to_owned()),
            (header::CONTENT_DISPOSITION, content_disposition(&file_name)),
        ],
        bytes,
    )
        .into_response())
}

/// Attachment header with an ASCII fallback name and the exact UTF-8 one
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c == ' ' || c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect();

    let mut encoded = String::with_capacity(file_name.len());
    for byte in file_name.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }

    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

async fn debug_streams(
    State(state): State<ServerState>,
    Query(query): Query<UrlQuery>,
) -> ApiResult<Json<Value>> {
    let app = state.app;
    blocking(move || {
        let context = "Could not list the streams";
        let url = check_url(&query.url).map_err(|err| ApiError::failed(context, err))?;
        let streams = app
            .catalog()
            .list_streams(url)
            .map_err(|err| ApiError::failed(context, err))?;

        for stream in &streams {
            info!(
                "id={} | type={} | res={} | abr={} | audio={}",
                stream.id,
                stream.mime_type(),
                stream.resolution_label().unwrap_or_default(),
                stream.bitrate.map(|b| format!("{b:.0}kbps")).unwrap_or_default(),
                stream.includes_audio,
            );
        }

        Ok(Json(json!({
            "status": "Streams written to the server logs",
            "count": streams.len(),
            "streams": streams,
        })))
    })
    .await
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
