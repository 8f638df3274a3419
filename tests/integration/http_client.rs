//! HTTP client against a mock Comtrade server

use crate::support::scripted_api::*;
use comtrade_downloader::directory::{load_directories, DirectoryError, DirectoryKind};
use comtrade_downloader::downloader::{
    DelayTable, DownloadError, DownloadExecutor, DownloadJob, QueryDescriptor,
};
use comtrade_downloader::fetcher::comtrade_config::ComtradeConfig;
use comtrade_downloader::fetcher::comtrade_http::ComtradeHttpClient;
use comtrade_downloader::fetcher::{ComtradeApi, FetcherError};
use comtrade_downloader::partition::YearMonth;
use comtrade_downloader::Frequency;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, token: &str) -> ComtradeHttpClient {
    let config = ComtradeConfig::default()
        .with_base_url(server.uri())
        .with_token(token);
    ComtradeHttpClient::new(config).expect("client should build")
}

#[tokio::test]
async fn test_query_sends_all_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get"))
        .and(query_param("max", "50000"))
        .and(query_param("type", "C"))
        .and(query_param("freq", "M"))
        .and(query_param("px", "HS"))
        .and(query_param("ps", "201506"))
        .and(query_param("r", "156,392"))
        .and(query_param("p", "490"))
        .and(query_param("rg", "1"))
        .and(query_param("cc", "AG6"))
        .and(query_param("fmt", "csv"))
        .and(query_param("token", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string(csv_body(&["row"])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "secret");
    let query = QueryDescriptor::new("156,392", "490", "201506", Frequency::Monthly);
    let response = client.fetch_query(&query).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, csv_body(&["row"]));
}

#[tokio::test]
async fn test_query_returns_error_status_as_reply() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let client = client_for(&server, "");
    let query = QueryDescriptor::new("156", "0", "2012", Frequency::Annual);
    let response = client.fetch_query(&query).await.unwrap();
    assert_eq!(response.status, 503);
    assert_eq!(response.body, "Service Unavailable");

    let requests = server.received_requests().await.unwrap();
    let url = &requests[0].url;
    assert!(url.query_pairs().any(|(k, v)| k == "token" && v.is_empty()));
    assert!(url.query_pairs().any(|(k, v)| k == "freq" && v == "A"));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let config = ComtradeConfig::default().with_base_url("http://127.0.0.1:1");
    let client = ComtradeHttpClient::new(config).unwrap();

    let query = QueryDescriptor::new("156", "0", "2012", Frequency::Annual);
    let err = client.fetch_query(&query).await.unwrap_err();
    assert!(matches!(err, FetcherError::TransportError(_)));
}

#[tokio::test]
async fn test_directories_loaded_from_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/cache/reporterAreas.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"results":[{"id":"all","text":"All"},{"id":"156","text":"China"}]}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/cache/partnerAreas.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"results":[{"id":"all","text":"All"},{"id":"4","text":"Afghanistan"},{"id":"0","text":"World"}]}"#,
        ))
        .mount(&server)
        .await;

    let client = client_for(&server, "");
    let dirs = load_directories(&client).await.unwrap();
    assert_eq!(dirs.reporters.codes(), ["156"]);
    assert_eq!(dirs.partners.codes(), ["4"]);
    assert_eq!(dirs.partners.name("0"), Some("World"));
}

#[tokio::test]
async fn test_missing_directory_is_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/cache/reporterAreas.json"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let client = client_for(&server, "");
    let err = load_directories(&client).await.unwrap_err();
    match err {
        DirectoryError::FetchError { kind, message } => {
            assert_eq!(kind, DirectoryKind::Reporters);
            assert!(message.contains("404"), "message: {message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_executor_over_http_retries_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RATE_LIMIT_BODY))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/get"))
        .and(query_param("r", "1,2,3,4,5"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(csv_body(&["HS,2015,201506,1,1,490,01,1"])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/get"))
        .and(query_param("r", "6"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NO_DATA_BODY))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let reporters: Vec<String> = (1..=6).map(|i| i.to_string()).collect();
    let job = DownloadJob::partner_monthly(
        "490",
        YearMonth::new(2015, 6).unwrap(),
        &reporters,
        dir.path(),
    )
    .unwrap();

    let client = Arc::new(client_for(&server, ""));
    let executor = DownloadExecutor::new(client).with_delays(DelayTable::immediate());
    let progress = executor.execute(job).await.unwrap();

    assert_eq!(progress.api_requests, 3);
    assert_eq!(progress.retries, 1);
    assert_eq!(progress.succeeded, 1);
    assert_eq!(progress.skipped, ["r=6 p=490 ps=201506"]);

    let content = std::fs::read_to_string(dir.path().join("2015-06.csv")).unwrap();
    assert_eq!(content, csv_body(&["HS,2015,201506,1,1,490,01,1"]));
}

#[tokio::test]
async fn test_executor_over_http_gives_up_when_unreachable() {
    let dir = TempDir::new().unwrap();
    let config = ComtradeConfig::default().with_base_url("http://127.0.0.1:1");
    let client = Arc::new(ComtradeHttpClient::new(config).unwrap());

    let job = DownloadJob::world_imports("156", "china", &[2012], dir.path()).unwrap();
    let executor = DownloadExecutor::new(client)
        .with_delays(DelayTable::immediate())
        .with_max_retries(1);

    let err = executor.execute(job).await.unwrap_err();
    assert!(matches!(err, DownloadError::TransportExhausted { attempts: 2, .. }));
    assert!(!dir.path().join("china.csv").exists());
}
