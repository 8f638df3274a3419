use crate::support::scripted_api::*;
use comtrade_downloader::fetcher::classify::classify_response;
use comtrade_downloader::fetcher::{classify, RawResponse, ResponseOutcome};

#[test]
fn test_fixture_bodies_classify_as_expected() {
    assert!(classify(ok(csv_body(&["HS,2015,201506,1,4,490,010121,1"]))).is_success());
    assert_eq!(classify(ok(NO_DATA_BODY)), ResponseOutcome::NoDataMatch);
    assert_eq!(classify(ok(BUSY_BODY)), ResponseOutcome::ServerError);
    assert_eq!(classify(ok(RATE_LIMIT_BODY)), ResponseOutcome::RateLimited);
    assert_eq!(classify(transport_error()).label(), "transport_failure");
}

#[test]
fn test_rate_limit_checked_before_status() {
    // A 500 carrying the rate-limit text is still a rate limit
    let outcome = classify_response(RawResponse::new(500, RATE_LIMIT_BODY));
    assert_eq!(outcome, ResponseOutcome::RateLimited);
}

#[test]
fn test_busy_body_with_surrounding_whitespace() {
    let body = format!("  {BUSY_BODY}\r\n");
    assert_eq!(
        classify_response(RawResponse::ok(body)),
        ResponseOutcome::ServerError
    );
}

#[test]
fn test_no_data_with_lf_terminators() {
    let body = NO_DATA_BODY.replace("\r\n", "\n");
    assert_eq!(
        classify_response(RawResponse::ok(body)),
        ResponseOutcome::NoDataMatch
    );
}

#[test]
fn test_no_data_text_on_third_line_is_data() {
    let body = csv_body(&[
        "HS,2015,201506,1,4,490,010121,1",
        "No data matches your query,,,,,,,",
    ]);
    assert!(classify_response(RawResponse::ok(body)).is_success());
}

#[test]
fn test_other_json_message_is_unknown() {
    let outcome = classify_response(RawResponse::ok(r#"{"Message":"Bad request"}"#));
    match outcome {
        ResponseOutcome::Unknown { status, snippet } => {
            assert_eq!(status, 200);
            assert!(snippet.contains("Bad request"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_unknown_snippet_is_truncated() {
    let body = "x".repeat(5_000);
    match classify_response(RawResponse::new(302, body)) {
        ResponseOutcome::Unknown { status, snippet } => {
            assert_eq!(status, 302);
            assert!(snippet.len() < 5_000);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_descriptions_are_readable() {
    assert_eq!(ResponseOutcome::ServerError.description(), "server busy");
    assert_eq!(
        ResponseOutcome::NoDataMatch.description(),
        "no data matches the query"
    );
    let unknown = ResponseOutcome::Unknown {
        status: 404,
        snippet: "Not Found".to_string(),
    };
    assert_eq!(
        unknown.description(),
        "unrecognized response (HTTP 404): Not Found"
    );
}

#[test]
fn test_html_page_with_ok_status_is_unknown() {
    let outcome = classify_response(RawResponse::ok(
        "<html><body>Service maintenance</body></html>",
    ));
    assert!(matches!(outcome, ResponseOutcome::Unknown { status: 200, .. }));
    assert!(!outcome.is_success());
}

#[test]
fn test_plain_text_with_ok_status_is_unknown() {
    let outcome = classify_response(RawResponse::ok("Please try again later.\r\n"));
    assert_eq!(outcome.label(), "unknown");
}

#[test]
fn test_header_only_table_is_success() {
    assert!(classify_response(RawResponse::ok(HEADER)).is_success());
}
