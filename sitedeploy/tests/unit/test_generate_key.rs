mod common;

use axum::http::StatusCode;

use common::{deploy_request, generate_key_request, send, zip_of, TestSite};
use sitedeploy::secret::store::{KeyReloadPolicy, ENV_FILE_MISSING, KEY_EXISTS};
use sitedeploy::secret::words::is_word_secret;
use sitedeploy::storage::env_file::find_deploy_key;

#[tokio::test]
async fn test_generate_key_writes_env_file() {
    let mut site = TestSite::builder()
        .env_file("PORT=3010\n")
        .build()
        .await;

    let (status, secret) = send(site.router(), generate_key_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(is_word_secret(&secret), "not a word secret: {secret}");

    let contents = site.env_contents().await;
    assert!(contents.starts_with("PORT=3010\n"));
    assert_eq!(find_deploy_key(&contents), Some(secret.as_str()));

    // The run loop is asked to restart
    assert!(site.restart_rx.try_recv().is_ok());
}

#[tokio::test]
async fn test_generate_key_only_once() {
    let site = TestSite::builder().env_file("").build().await;

    let (status, _) = send(site.router(), generate_key_request()).await;
    assert_eq!(status, StatusCode::OK);
    let written = site.env_contents().await;

    let (status, body) = send(site.router(), generate_key_request()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, KEY_EXISTS);
    assert_eq!(site.env_contents().await, written);
}

#[tokio::test]
async fn test_generate_key_without_env_file() {
    let site = TestSite::builder().build().await;

    let (status, body) = send(site.router(), generate_key_request()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, ENV_FILE_MISSING);
    assert!(!site.layout.env_file().exists().await);
}

#[tokio::test]
async fn test_generate_key_with_configured_key() {
    let site = TestSite::builder()
        .secret("calm-red-fox")
        .env_file("DEPLOY_KEY=calm-red-fox\n")
        .build()
        .await;

    let (status, body) = send(site.router(), generate_key_request()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, KEY_EXISTS);
    assert_eq!(site.env_contents().await, "DEPLOY_KEY=calm-red-fox\n");
}

#[tokio::test]
async fn test_concurrent_generation_issues_one_key() {
    let site = TestSite::builder().env_file("").build().await;

    let (one, two) = tokio::join!(
        send(site.router(), generate_key_request()),
        send(site.router(), generate_key_request()),
    );

    let issued: Vec<_> = [&one, &two]
        .into_iter()
        .filter(|(status, _)| *status == StatusCode::OK)
        .collect();
    assert_eq!(issued.len(), 1);

    let refused = if one.0 == StatusCode::OK { &two } else { &one };
    assert_eq!(refused.0, StatusCode::UNAUTHORIZED);

    let contents = site.env_contents().await;
    assert_eq!(find_deploy_key(&contents), Some(issued[0].1.as_str()));
}

#[tokio::test]
async fn test_in_memory_key_is_usable_immediately() {
    let mut site = TestSite::builder()
        .env_file("")
        .key_reload(KeyReloadPolicy::InMemory)
        .build()
        .await;

    let (status, secret) = send(site.router(), generate_key_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(site.restart_rx.try_recv().is_err());

    let archive = zip_of(&[("index.html", "live")]);
    let (status, _) = send(site.router(), deploy_request(Some(secret.as_str()), None, &archive)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(site.read_public("index.html").await, "live");
}
