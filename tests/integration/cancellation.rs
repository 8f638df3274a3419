use crate::support::scripted_api::*;
use comtrade_downloader::downloader::{DelayTable, DownloadError, DownloadExecutor, DownloadJob};
use comtrade_downloader::partition::YearMonth;
use comtrade_downloader::shutdown::ShutdownCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_shutdown_before_run_issues_no_requests() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(ScriptedApi::new(vec![ok(csv_body(&["row"]))]));
    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();

    let job = DownloadJob::partner_monthly(
        "490",
        YearMonth::new(2015, 6).unwrap(),
        &["156", "392"],
        dir.path(),
    )
    .unwrap();
    let executor = DownloadExecutor::new(api.clone())
        .with_delays(DelayTable::immediate())
        .with_shutdown(shutdown);

    let err = executor.execute(job).await.unwrap_err();
    assert!(matches!(err, DownloadError::Cancelled));
    assert!(api.queries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_server_busy_pause() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(ScriptedApi::new(vec![
        ok(csv_body(&["HS,2015,201506,1,156,490,01,1"])),
        ok(BUSY_BODY),
        ok(csv_body(&["never requested"])),
    ]));
    let shutdown = ShutdownCoordinator::shared();

    let reporters: Vec<String> = (1..=10).map(|i| i.to_string()).collect();
    let job = DownloadJob::partner_monthly(
        "490",
        YearMonth::new(2015, 6).unwrap(),
        &reporters,
        dir.path(),
    )
    .unwrap();
    let executor = DownloadExecutor::new(api.clone()).with_shutdown(shutdown.clone());

    let trigger = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            // Inside the 600s server-busy pause (37s after the first write)
            tokio::time::sleep(Duration::from_secs(100)).await;
            shutdown.request_shutdown();
        }
    });

    let started = tokio::time::Instant::now();
    let err = executor.execute(job).await.unwrap_err();
    trigger.await.unwrap();

    assert!(matches!(err, DownloadError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(600));
    assert_eq!(api.queries().len(), 2);
    assert_eq!(api.remaining(), 1);

    // Rows written before the interruption stay on disk
    let content = std::fs::read_to_string(dir.path().join("2015-06.csv")).unwrap();
    assert_eq!(content, csv_body(&["HS,2015,201506,1,156,490,01,1"]));
}
