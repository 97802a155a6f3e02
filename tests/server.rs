mod common;

use std::{net::SocketAddr, sync::Arc};

use common::{app, entries, settings, Fake};
use pretty_assertions::assert_eq;
use reqwest::{header, StatusCode};
use serde_json::Value;
use tempfile::TempDir;
use tokio::{net::TcpListener, sync::oneshot};
use ytfetch::server;

const URL: &str = "https://youtu.be/dQw4w9WgXcQ";

struct TestServer {
    addr: SocketAddr,
    root: TempDir,
    stop: Option<oneshot::Sender<()>>,
}

impl TestServer {
    async fn start(fake: &Fake) -> Self {
        let root = tempfile::tempdir().unwrap();
        let app = Arc::new(app(fake, settings(root.path())));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        tokio::spawn(async move {
            server::serve_on(listener, app, async {
                let _ = stopped.await;
            })
            .await
            .unwrap();
        });

        Self {
            addr,
            root,
            stop: Some(stop),
        }
    }

    fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{path_and_query}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

async fn get(url: &str) -> reqwest::Response {
    reqwest::Client::new().get(url).send().await.unwrap()
}

async fn json(res: reqwest::Response) -> Value {
    serde_json::from_str(&res.text().await.unwrap()).unwrap()
}

#[tokio::test]
async fn health() {
    let server = TestServer::start(&Fake::new("Title")).await;
    let res = get(&server.url("/health")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn video_information() {
    let server = TestServer::start(&Fake::new("Never Gonna Give You Up")).await;
    let res = get(&server.url(&format!("/request?urlVideo={URL}"))).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["titulo"], "Never Gonna Give You Up");
    assert_eq!(body["canal"], "Rick Astley");
    assert_eq!(body["video_id"], "dQw4w9WgXcQ");
    assert_eq!(body["duracion"], 213);
    assert_eq!(body["length_formatted"], "3:33");
    assert_eq!(body["thumbnail_type"], "maxresdefault");
    assert_eq!(
        body["thumbnail"],
        "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg"
    );
}

#[tokio::test]
async fn invalid_url_is_a_bad_request() {
    let server = TestServer::start(&Fake::new("Title")).await;
    let res = get(&server.url("/request?urlVideo=not-a-url")).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = json(res).await;
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Invalid URL or error: "), "{detail}");
}

#[tokio::test]
async fn provider_failure_is_a_bad_request() {
    let fake = Fake::new("Title").unavailable();
    let server = TestServer::start(&fake).await;
    let res = get(&server.url(&format!("/conversion/mp3?url={URL}"))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = json(res).await;
    assert_eq!(
        body["detail"],
        "MP3 download failed: video unavailable: This video is unavailable"
    );
}

#[tokio::test]
async fn mp3_is_sent_as_attachment() {
    let server = TestServer::start(&Fake::new("Never Gonna Give You Up")).await;
    let res = get(&server.url(&format!("/conversion/mp3?url={URL}"))).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(
        res.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Never Gonna Give You Up.mp3\"; \
         filename*=UTF-8''Never%20Gonna%20Give%20You%20Up.mp3"
    );

    let body = res.bytes().await.unwrap();
    assert_eq!(&body[..3], b"ID3");

    // Nothing is kept once the response is sent
    assert_eq!(entries(&server.root.path().join("tmp")), Vec::<String>::new());
    assert!(!server.root.path().join("downloads").exists());
}

#[tokio::test]
async fn mp4_quality_level() {
    let fake = Fake::new("Clip");
    let server = TestServer::start(&fake).await;
    let res = get(&server.url(&format!("/conversion/mp4?url={URL}&calidad=2"))).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "video/mp4");
    assert!(res.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("filename=\"Clip_360p.mp4\""));
    assert_eq!(&res.bytes().await.unwrap()[..], b"134+140");
    assert!(fake.calls().contains(&"mux".to_owned()));
}

#[tokio::test]
async fn mp4_invalid_quality() {
    let fake = Fake::new("Clip");
    let server = TestServer::start(&fake).await;

    for level in ["0", "6", "high"] {
        let res = get(&server.url(&format!("/conversion/mp4?url={URL}&calidad={level}"))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(res).await["detail"], "Invalid quality, use 1-5");
    }
    assert_eq!(fake.calls(), Vec::<String>::new());
}

#[tokio::test]
async fn debug_streams_lists_everything() {
    let server = TestServer::start(&Fake::new("Title")).await;
    let res = reqwest::Client::new()
        .post(server.url(&format!("/debug/streams?url={URL}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = json(res).await;
    assert_eq!(body["count"], 6);
    let streams = body["streams"].as_array().unwrap();
    assert_eq!(streams.len(), 6);
    assert_eq!(streams[0]["id"], "160");
    assert_eq!(streams[0]["kind"], "video");
    assert_eq!(streams[5]["kind"], "audio");
}
