use super::*;

fn test_client(base: &str) -> HashtagClient {
    HashtagClient::new(base, "token", 5, "tagpulse-test/0.1").expect("valid test client")
}

#[test]
fn page_url_without_cursor() {
    let url = test_client("https://collector.example.com")
        .page_url("ootd", 50, None)
        .unwrap();
    assert_eq!(
        url.as_str(),
        "https://collector.example.com/v1/hashtags/ootd/posts?limit=50"
    );
}

#[test]
fn page_url_with_cursor() {
    let url = test_client("https://collector.example.com/")
        .page_url("ootd", 20, Some("abc=="))
        .unwrap();
    assert_eq!(
        url.as_str(),
        "https://collector.example.com/v1/hashtags/ootd/posts?limit=20&cursor=abc%3D%3D"
    );
}

#[test]
fn page_url_keeps_base_path_prefix() {
    let url = test_client("https://example.com/scraper")
        .page_url("ootd", 10, None)
        .unwrap();
    assert_eq!(
        url.as_str(),
        "https://example.com/scraper/v1/hashtags/ootd/posts?limit=10"
    );
}

#[test]
fn page_url_encodes_non_ascii_and_slashes() {
    let url = test_client("https://collector.example.com")
        .page_url("여행/맛집", 10, None)
        .unwrap();
    assert!(url.path().starts_with("/v1/hashtags/"));
    assert!(url.path().ends_with("/posts"));
    assert!(!url.path().contains("여행"), "tag must be percent-encoded");
    assert_eq!(url.path_segments().unwrap().count(), 4);
}

#[test]
fn new_rejects_relative_base_url() {
    let result = HashtagClient::new("not a url", "token", 5, "ua");
    assert!(
        matches!(result, Err(CollectorError::InvalidBaseUrl { .. })),
        "expected InvalidBaseUrl"
    );
}

#[test]
fn collect_status_reason() {
    assert_eq!(CollectStatus::Complete.reason(), None);
    let failed = CollectStatus::Failed {
        reason: "down".to_owned(),
    };
    assert!(failed.is_failed());
    assert_eq!(failed.reason(), Some("down"));
}
