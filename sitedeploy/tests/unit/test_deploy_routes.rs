mod common;

use std::path::PathBuf;

use axum::body::Body;
use axum::http::{Request, StatusCode};

use common::{deploy_request, get_request, send, zip_of, TestSite, PLACEHOLDER};
use sitedeploy::secret::store::{INVALID_KEY, NO_KEY_CONFIGURED};
use sitedeploy::server::handlers::{DEPLOY_SUCCESS, INSUFFICIENT_SPACE};

const KEY: &str = "brave-blue-otter";

async fn site_with_old_deploy() -> TestSite {
    let site = TestSite::builder().secret(KEY).build().await;
    site.layout
        .public_dir()
        .file("old.html")
        .write_string("old")
        .await
        .unwrap();
    site
}

fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

#[tokio::test]
async fn test_deploy_without_configured_key_fails() {
    let site = TestSite::builder().build().await;
    let archive = zip_of(&[("index.html", "new")]);

    let (status, body) = send(site.router(), deploy_request(Some(KEY), None, &archive)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, NO_KEY_CONFIGURED);

    // Payload does not matter
    let garbage = Request::builder()
        .method("POST")
        .uri("/v1/deploy")
        .body(Body::from("not a zip"))
        .unwrap();
    let (status, _) = send(site.router(), garbage).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    assert!(site.public_files().await.is_empty());
}

#[tokio::test]
async fn test_deploy_with_wrong_key_is_rejected() {
    let site = site_with_old_deploy().await;
    let archive = zip_of(&[("index.html", "new")]);

    let (status, body) = send(
        site.router(),
        deploy_request(Some("brave-blue-otters"), None, &archive),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, INVALID_KEY);

    let (status, _) = send(site.router(), deploy_request(None, None, &archive)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(site.public_files().await, paths(&["old.html"]));
}

#[tokio::test]
async fn test_deploy_without_disc_space_is_rejected() {
    let site = TestSite::builder()
        .secret(KEY)
        .available(Some(1024))
        .build()
        .await;
    site.layout
        .public_dir()
        .file("old.html")
        .write_string("old")
        .await
        .unwrap();
    let archive = zip_of(&[("index.html", "new")]);

    let (status, body) = send(
        site.router(),
        deploy_request(Some(KEY), Some("1024"), &archive),
    )
    .await;
    assert_eq!(status, StatusCode::INSUFFICIENT_STORAGE);
    assert_eq!(body, INSUFFICIENT_SPACE);
    assert_eq!(site.public_files().await, paths(&["old.html"]));

    // Without a size hint there is nothing to check
    let (status, _) = send(site.router(), deploy_request(Some(KEY), None, &archive)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_deploy_replaces_site() {
    let site = site_with_old_deploy().await;
    let archive = zip_of(&[
        ("index.html", "<h1>hello</h1>"),
        ("css/site.css", "body {}"),
        ("img/icons/logo.svg", "<svg/>"),
    ]);

    let length = archive.len().to_string();
    let (status, body) = send(
        site.router(),
        deploy_request(Some(KEY), Some(length.as_str()), &archive),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, DEPLOY_SUCCESS);

    let expected = paths(&["css/site.css", "img/icons/logo.svg", "index.html"]);
    assert_eq!(site.public_files().await, expected);
    assert_eq!(site.read_public("index.html").await, "<h1>hello</h1>");

    // Same archive again gives the same tree
    let (status, _) = send(site.router(), deploy_request(Some(KEY), None, &archive)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(site.public_files().await, expected);
}

#[tokio::test]
async fn test_deploy_accepts_raw_body() {
    let site = site_with_old_deploy().await;
    let archive = zip_of(&[("index.html", "raw")]);

    let request = Request::builder()
        .method("POST")
        .uri("/v1/deploy")
        .header("content-type", "application/zip")
        .header("deployment_key", KEY)
        .body(Body::from(archive))
        .unwrap();

    let (status, _) = send(site.router(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(site.public_files().await, paths(&["index.html"]));
    assert_eq!(site.read_public("index.html").await, "raw");
}

#[tokio::test]
async fn test_corrupt_archive_leaves_placeholder() {
    let site = site_with_old_deploy().await;

    let (status, _) = send(
        site.router(),
        deploy_request(Some(KEY), None, b"definitely not a zip archive"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(site.public_files().await, paths(&["index.html"]));
    assert_eq!(site.read_public("index.html").await, PLACEHOLDER);
}

#[tokio::test]
async fn test_unparseable_zip_length_is_ignored() {
    let site = TestSite::builder()
        .secret(KEY)
        .available(Some(0))
        .build()
        .await;
    let archive = zip_of(&[("index.html", "new")]);

    let (status, _) = send(
        site.router(),
        deploy_request(Some(KEY), Some("big"), &archive),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_zip_length_with_trailing_text_is_checked() {
    let site = TestSite::builder()
        .secret(KEY)
        .available(Some(1024))
        .build()
        .await;
    let archive = zip_of(&[("index.html", "new")]);

    let (status, _) = send(
        site.router(),
        deploy_request(Some(KEY), Some("2048bytes"), &archive),
    )
    .await;
    assert_eq!(status, StatusCode::INSUFFICIENT_STORAGE);
    assert!(site.public_files().await.is_empty());
}

#[tokio::test]
async fn test_unknown_disc_space_allows_deploy() {
    let site = TestSite::builder().secret(KEY).available(None).build().await;
    let archive = zip_of(&[("index.html", "new")]);

    let (status, _) = send(
        site.router(),
        deploy_request(Some(KEY), Some("999999999999"), &archive),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_deployed_site_is_served() {
    let site = TestSite::builder().secret(KEY).build().await;
    let archive = zip_of(&[
        ("index.html", "<h1>home</h1>"),
        ("docs/guide.html", "<p>guide</p>"),
    ]);
    let (status, _) = send(site.router(), deploy_request(Some(KEY), None, &archive)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(site.router(), get_request("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<h1>home</h1>");

    let (status, body) = send(site.router(), get_request("/docs/guide.html")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<p>guide</p>");

    let (status, _) = send(site.router(), get_request("/missing.html")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let site = TestSite::builder().build().await;

    let (status, body) = send(site.router(), get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "sitedeploy");
}

#[tokio::test]
async fn test_concurrent_deploys_leave_one_complete_site() {
    let site = TestSite::builder().secret(KEY).build().await;
    let first = zip_of(&[("index.html", "first"), ("a.html", "a")]);
    let second = zip_of(&[("index.html", "second"), ("b.html", "b")]);

    let (one, two) = tokio::join!(
        send(site.router(), deploy_request(Some(KEY), None, &first)),
        send(site.router(), deploy_request(Some(KEY), None, &second)),
    );
    assert_eq!(one.0, StatusCode::OK);
    assert_eq!(two.0, StatusCode::OK);

    let files = site.public_files().await;
    let index = site.read_public("index.html").await;
    match index.as_str() {
        "first" => assert_eq!(files, paths(&["a.html", "index.html"])),
        "second" => assert_eq!(files, paths(&["b.html", "index.html"])),
        other => panic!("unexpected index.html: {other}"),
    }
}
