//! Static server: CORS and cache headers on every response, bare `200` for
//! `OPTIONS`, plain file serving otherwise.

use question_aggregator::server;
use reqwest::{Method, StatusCode};
use std::fs;
use tempfile::TempDir;
use tokio::sync::oneshot;

/// Starts a server over `dir` on a random port. Dropping the sender stops it.
async fn start_server(dir: &TempDir) -> (String, oneshot::Sender<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = oneshot::channel::<()>();
    let root = dir.path().to_path_buf();

    tokio::spawn(async move {
        server::serve(listener, root, async {
            let _ = rx.await;
        })
        .await
        .unwrap();
    });

    (format!("http://127.0.0.1:{}", port), tx)
}

fn assert_cors_headers(resp: &reqwest::Response) {
    let headers = resp.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "GET, OPTIONS");
    assert_eq!(
        headers["cache-control"],
        "no-store, no-cache, must-revalidate"
    );
}

#[tokio::test]
async fn test_get_serves_file_with_headers() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("questions.json"), r#"{"subjects":[]}"#).unwrap();
    let (base, _stop) = start_server(&tmp).await;

    let resp = reqwest::get(format!("{}/questions.json", base)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_cors_headers(&resp);
    assert_eq!(resp.text().await.unwrap(), r#"{"subjects":[]}"#);
}

#[tokio::test]
async fn test_options_returns_empty_ok() {
    let tmp = TempDir::new().unwrap();
    let (base, _stop) = start_server(&tmp).await;

    let client = reqwest::Client::new();
    let resp = client
        .request(Method::OPTIONS, format!("{}/questions.json", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_cors_headers(&resp);
    assert!(resp.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_file_still_has_headers() {
    let tmp = TempDir::new().unwrap();
    let (base, _stop) = start_server(&tmp).await;

    let resp = reqwest::get(format!("{}/nope.json", base)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_cors_headers(&resp);
}

#[tokio::test]
async fn test_nested_files_served() {
    let tmp = TempDir::new().unwrap();
    let img_dir = tmp.path().join("alg").join("questions").join("q1");
    fs::create_dir_all(&img_dir).unwrap();
    fs::write(img_dir.join("quiz.svg"), "<svg/>").unwrap();
    let (base, _stop) = start_server(&tmp).await;

    let resp = reqwest::get(format!("{}/alg/questions/q1/quiz.svg", base))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "<svg/>");
}
