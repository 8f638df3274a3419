use crate::support::scripted_api::{csv_body, HEADER};
use comtrade_downloader::output::sink::{count_rows, strip_header};
use comtrade_downloader::output::{OpenMode, OutputWriter, ResponseSink, ResponseWriter};
use tempfile::TempDir;

#[test]
fn test_single_header_for_many_responses() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("2015-06.csv");
    let mut sink = ResponseSink::new(&path, OpenMode::Eager).unwrap();

    let bodies: Vec<String> = (0..5)
        .map(|i| csv_body(&[&format!("HS,2015,201506,1,{i},490,01,1"), "HS,2015,201506,1,9,490,02,2"]))
        .collect();
    let rows: u64 = bodies
        .iter()
        .map(|body| sink.append_response(body).unwrap())
        .sum();
    assert_eq!(rows, 10);
    assert_eq!(sink.responses_written(), 5);
    assert_eq!(sink.rows_written(), 10);
    sink.close().unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.matches(HEADER).count(), 1);
    assert_eq!(content.lines().count(), 11);
    assert!(content.starts_with(HEADER));
}

#[test]
fn test_first_response_may_be_header_only() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.csv");
    let mut sink = ResponseSink::new(&path, OpenMode::Eager).unwrap();

    assert_eq!(sink.append_response(HEADER).unwrap(), 0);
    assert_eq!(sink.append_response(&csv_body(&["a"])).unwrap(), 1);
    sink.close().unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines, [HEADER, "a"]);
}

#[test]
fn test_missing_terminator_is_added() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.csv");
    let mut sink = ResponseSink::new(&path, OpenMode::Eager).unwrap();

    sink.append_response("h1,h2\nx,1").unwrap();
    sink.append_response("h1,h2\ny,2").unwrap();
    sink.close().unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "h1,h2\nx,1\ny,2\n");
}

#[test]
fn test_eager_creates_empty_file_and_truncates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("2016.csv");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "stale contents\n").unwrap();

    let sink = ResponseSink::new(&path, OpenMode::Eager).unwrap();
    assert!(sink.is_open());
    sink.close().unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
}

#[test]
fn test_lazy_creates_file_on_first_append() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("viet_nam.csv");

    let mut sink = ResponseSink::new(&path, OpenMode::Lazy).unwrap();
    assert!(!sink.is_open());
    assert!(!path.exists());

    sink.append_response(&csv_body(&["row"])).unwrap();
    assert!(sink.is_open());
    assert!(path.exists());
    sink.close().unwrap();
}

#[test]
fn test_lazy_close_without_data_leaves_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("viet_nam.csv");

    let sink = ResponseSink::new(&path, OpenMode::Lazy).unwrap();
    sink.close().unwrap();
    assert!(!path.exists());
}

#[test]
fn test_header_helpers() {
    assert_eq!(strip_header("h\r\na\r\nb\r\n"), "a\r\nb\r\n");
    assert_eq!(strip_header("header only"), "");
    assert_eq!(count_rows("h\r\na\r\n\r\nb"), 2);
    assert_eq!(count_rows("h"), 0);
}
