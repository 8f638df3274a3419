//! End-to-end behaviour of the fetch-retry-append loop against a scripted API

use crate::support::scripted_api::*;
use comtrade_downloader::downloader::{
    DelayTable, DownloadError, DownloadExecutor, DownloadJob, QueryDescriptor,
};
use comtrade_downloader::partition::YearMonth;
use std::sync::Arc;
use tempfile::TempDir;

fn executor(api: Arc<ScriptedApi>) -> DownloadExecutor {
    DownloadExecutor::new(api)
        .with_delays(DelayTable::immediate())
        .with_max_retries(2)
}

fn reporters(n: usize) -> Vec<String> {
    (1..=n).map(|i| i.to_string()).collect()
}

#[tokio::test]
async fn test_six_reporters_two_batches_single_header() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(ScriptedApi::new(vec![
        ok(csv_body(&["HS,2015,201506,1,1,490,010121,100", "HS,2015,201506,1,2,490,010121,200"])),
        ok(csv_body(&["HS,2015,201506,1,6,490,010121,600"])),
    ]));

    let job = DownloadJob::partner_monthly(
        "490",
        YearMonth::new(2015, 6).unwrap(),
        &reporters(6),
        dir.path(),
    )
    .unwrap();
    let output = job.output_path.clone();

    let progress = executor(api.clone()).execute(job).await.unwrap();

    let sent: Vec<String> = api.queries().into_iter().map(|q| q.reporters).collect();
    assert_eq!(sent, ["1,2,3,4,5", "6"]);

    assert_eq!(progress.succeeded, 2);
    assert_eq!(progress.rows_written, 3);
    assert!(!progress.has_gaps());
    assert_eq!(output, dir.path().join("2015-06.csv"));

    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(content.matches(HEADER).count(), 1);
    assert!(content.starts_with(HEADER));
    assert_eq!(content.lines().count(), 4);
    assert!(content.ends_with("HS,2015,201506,1,6,490,010121,600\r\n"));
}

#[tokio::test]
async fn test_header_kept_once_for_many_successes() {
    let dir = TempDir::new().unwrap();
    let replies = (0..7)
        .map(|i| ok(csv_body(&[&format!("HS,2015,201506,1,{i},490,01,1")])))
        .collect();
    let api = Arc::new(ScriptedApi::new(replies));

    let descriptors = (0..7)
        .map(|i| QueryDescriptor::new(i.to_string(), "490", "201506", comtrade_downloader::Frequency::Monthly))
        .collect();
    let job = DownloadJob::new(
        "many",
        comtrade_downloader::downloader::JobKind::Custom,
        dir.path().join("many.csv"),
        descriptors,
    );

    let progress = executor(api).execute(job).await.unwrap();
    assert_eq!(progress.succeeded, 7);

    let content = std::fs::read_to_string(dir.path().join("many.csv")).unwrap();
    assert_eq!(content.matches(HEADER).count(), 1);
    assert_eq!(content.lines().count(), 8);
}

#[tokio::test]
async fn test_no_data_is_skipped_not_written() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(ScriptedApi::new(vec![
        ok(NO_DATA_BODY),
        ok(csv_body(&["HS,2015,201506,1,6,490,010121,600"])),
    ]));

    let job = DownloadJob::partner_monthly(
        "490",
        YearMonth::new(2015, 6).unwrap(),
        &reporters(6),
        dir.path(),
    )
    .unwrap();

    let progress = executor(api).execute(job).await.unwrap();

    assert_eq!(progress.succeeded, 1);
    assert_eq!(progress.skipped, ["r=1,2,3,4,5 p=490 ps=201506"]);
    assert!(progress.has_gaps());
    assert_eq!(progress.rows_written, 1);

    // The first written reply keeps its header even though it came second
    let content = std::fs::read_to_string(dir.path().join("2015-06.csv")).unwrap();
    assert_eq!(content, csv_body(&["HS,2015,201506,1,6,490,010121,600"]));
    assert!(!content.contains("No data matches"));
}

#[tokio::test]
async fn test_no_data_only_leaves_empty_eager_file() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(ScriptedApi::new(vec![ok(NO_DATA_BODY)]));

    let job = DownloadJob::partner_monthly(
        "490",
        YearMonth::new(2015, 7).unwrap(),
        &reporters(3),
        dir.path(),
    )
    .unwrap();

    let progress = executor(api).execute(job).await.unwrap();
    assert_eq!(progress.succeeded, 0);
    assert_eq!(progress.skipped.len(), 1);

    let content = std::fs::read_to_string(dir.path().join("2015-07.csv")).unwrap();
    assert!(content.is_empty());
}

#[tokio::test]
async fn test_fail_twice_then_succeed() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(ScriptedApi::new(vec![
        transport_error(),
        transport_error(),
        ok(csv_body(&["HS,2012,2012,1,156,0,TOTAL,1000"])),
    ]));

    let job = DownloadJob::world_imports("156", "china", &[2012], dir.path()).unwrap();
    let progress = executor(api.clone()).execute(job).await.unwrap();

    assert_eq!(progress.succeeded, 1);
    assert_eq!(progress.retries, 2);
    assert_eq!(progress.api_requests, 3);
    assert_eq!(progress.rows_written, 1);
    assert_eq!(api.queries().len(), 3);

    let content = std::fs::read_to_string(dir.path().join("china.csv")).unwrap();
    assert_eq!(content, csv_body(&["HS,2012,2012,1,156,0,TOTAL,1000"]));
}

#[tokio::test]
async fn test_transport_ceiling_fails_job_and_keeps_written_rows() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(ScriptedApi::new(vec![
        ok(csv_body(&["HS,2015,201506,1,1,490,01,1"])),
        transport_error(),
        transport_error(),
        transport_error(),
    ]));

    let job = DownloadJob::partner_monthly(
        "490",
        YearMonth::new(2015, 6).unwrap(),
        &reporters(10),
        dir.path(),
    )
    .unwrap();

    let err = executor(api).execute(job).await.unwrap_err();
    match err {
        DownloadError::TransportExhausted { attempts, message } => {
            assert_eq!(attempts, 3);
            assert!(message.contains("connection reset"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let content = std::fs::read_to_string(dir.path().join("2015-06.csv")).unwrap();
    assert_eq!(content, csv_body(&["HS,2015,201506,1,1,490,01,1"]));
}

#[tokio::test]
async fn test_unknown_reply_retried_then_written() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(ScriptedApi::new(vec![
        status(200, "<html>maintenance</html>"),
        status(200, r#"{"validation":{"status":{"name":"Error"}}}"#),
        ok(csv_body(&["HS,2012,2012,1,156,0,TOTAL,1000"])),
    ]));

    let job = DownloadJob::world_imports("156", "china", &[2012], dir.path()).unwrap();
    let progress = executor(api).execute(job).await.unwrap();

    assert_eq!(progress.succeeded, 1);
    assert_eq!(progress.retries, 2);
    let content = std::fs::read_to_string(dir.path().join("china.csv")).unwrap();
    assert!(!content.contains("maintenance"));
}

#[tokio::test]
async fn test_unknown_reply_ceiling() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(ScriptedApi::new(vec![
        status(200, ""),
        status(200, ""),
        status(200, ""),
    ]));

    let job = DownloadJob::world_imports("156", "china", &[2012], dir.path()).unwrap();
    let err = executor(api).execute(job).await.unwrap_err();
    assert!(matches!(
        err,
        DownloadError::UnknownResponseExhausted { attempts: 3, .. }
    ));
    assert!(!dir.path().join("china.csv").exists());
}

#[tokio::test]
async fn test_world_imports_no_data_creates_no_file() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(ScriptedApi::new(vec![ok(NO_DATA_BODY)]));

    let job = DownloadJob::world_imports("704", "viet_nam", &[2012, 2013], dir.path()).unwrap();
    let progress = executor(api.clone()).execute(job).await.unwrap();

    assert_eq!(progress.succeeded, 0);
    assert_eq!(progress.skipped, ["r=704 p=0 ps=2012,2013"]);
    assert!(!dir.path().join("viet_nam.csv").exists());

    let query = &api.queries()[0];
    assert_eq!(query.partners, "0");
    assert_eq!(query.periods, "2012,2013");
}

#[tokio::test]
async fn test_world_imports_skipped_when_output_exists() {
    let dir = TempDir::new().unwrap();
    let existing = dir.path().join("viet_nam.csv");
    std::fs::write(&existing, "kept\r\n").unwrap();

    let api = Arc::new(ScriptedApi::new(vec![ok(csv_body(&["new"]))]));
    let job = DownloadJob::world_imports("704", "viet_nam", &[2012, 2013], dir.path()).unwrap();
    let progress = executor(api.clone()).execute(job).await.unwrap();

    assert!(progress.already_present);
    assert_eq!(progress.api_requests, 0);
    assert!(api.queries().is_empty());
    assert_eq!(api.remaining(), 1);
    assert_eq!(std::fs::read_to_string(&existing).unwrap(), "kept\r\n");
}

#[tokio::test]
async fn test_partner_annual_skips_on_server_busy() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(ScriptedApi::new(vec![
        ok(BUSY_BODY),
        ok(csv_body(&["HS,2016,2016,1,2,490,01,5"])),
        status(503, "Service Unavailable"),
    ]));

    let job = DownloadJob::partner_annual("490", 2016, &reporters(3), dir.path()).unwrap();
    let progress = executor(api.clone()).execute(job).await.unwrap();

    assert_eq!(progress.succeeded, 1);
    assert_eq!(
        progress.skipped,
        ["r=1 p=490 ps=2016", "r=3 p=490 ps=2016"]
    );
    assert_eq!(progress.api_requests, 3);
    assert_eq!(api.queries().len(), 3);

    let content = std::fs::read_to_string(dir.path().join("2016.csv")).unwrap();
    assert_eq!(content, csv_body(&["HS,2016,2016,1,2,490,01,5"]));
}

#[tokio::test]
async fn test_reporter_imports_descriptor_order() {
    let dir = TempDir::new().unwrap();
    let periods = ["201001", "201002", "201003", "201004"];
    let partners = reporters(6);
    let replies = (0..4).map(|i| ok(csv_body(&[&format!("row{i}")]))).collect();
    let api = Arc::new(ScriptedApi::new(replies));

    let job =
        DownloadJob::reporter_imports("156", "china", &periods, &partners, dir.path()).unwrap();
    let progress = executor(api.clone()).execute(job).await.unwrap();
    assert_eq!(progress.succeeded, 4);

    let order: Vec<(String, String)> = api
        .queries()
        .into_iter()
        .map(|q| (q.periods, q.partners))
        .collect();
    assert_eq!(
        order,
        [
            ("201001,201002,201003".to_string(), "1,2,3,4,5".to_string()),
            ("201001,201002,201003".to_string(), "6".to_string()),
            ("201004".to_string(), "1,2,3,4,5".to_string()),
            ("201004".to_string(), "6".to_string()),
        ]
    );

    let content = std::fs::read_to_string(dir.path().join("china.csv")).unwrap();
    let rows: Vec<&str> = content.lines().skip(1).collect();
    assert_eq!(rows, ["row0", "row1", "row2", "row3"]);
}
