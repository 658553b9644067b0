//! Wikipedia adapter tests against a mocked MediaWiki API
//!
//! Validates request shape, result mapping, snippet cleanup and the
//! classification of HTTP failures into recoverable search errors.

use delve::search::{SearchError, SearchProvider, WikipediaProvider, WikipediaSettings};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============= Helper Functions =============

fn provider_for(server: &MockServer, timeout: Duration) -> WikipediaProvider {
    WikipediaProvider::new(WikipediaSettings {
        base_url: server.uri(),
        user_agent: "delve-tests/1.0".to_string(),
        timeout,
    })
    .expect("valid settings")
}

fn mock_search_response(items: &[(&str, &str)]) -> serde_json::Value {
    let search: Vec<serde_json::Value> = items
        .iter()
        .map(|(title, snippet)| json!({ "ns": 0, "title": title, "snippet": snippet }))
        .collect();
    json!({
        "batchcomplete": "",
        "query": { "searchinfo": { "totalhits": search.len() }, "search": search }
    })
}

// ============= Success Paths =============

#[tokio::test]
async fn test_search_maps_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("action", "query"))
        .and(query_param("list", "search"))
        .and(query_param("srsearch", "caffeine half-life"))
        .and(query_param("format", "json"))
        .and(query_param("srlimit", "2"))
        .and(header("user-agent", "delve-tests/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_search_response(&[
            (
                "Caffeine",
                "<span class=\"searchmatch\">Caffeine</span> has a &quot;half-life&quot; of 5 hours",
            ),
            ("Sleep deprivation", "Lack of <span class=\"searchmatch\">sleep</span>"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server, Duration::from_secs(5));
    let hits = provider.search("caffeine half-life", 2).await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].title, "Caffeine");
    assert_eq!(hits[0].url, format!("{}/wiki/Caffeine", server.uri()));
    assert_eq!(hits[0].snippet, "Caffeine has a \"half-life\" of 5 hours");
    assert_eq!(hits[1].url, format!("{}/wiki/Sleep_deprivation", server.uri()));
    assert_eq!(provider.name(), "wikipedia");
}

#[tokio::test]
async fn test_missing_query_block_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "batchcomplete": "" })))
        .mount(&server)
        .await;

    let hits = provider_for(&server, Duration::from_secs(5))
        .search("nothing", 3)
        .await
        .unwrap();
    assert!(hits.is_empty());
}

// ============= Failure Classification =============

#[tokio::test]
async fn test_http_429_is_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let result = provider_for(&server, Duration::from_secs(5))
        .search("caffeine", 3)
        .await;
    assert!(matches!(result, Err(SearchError::RateLimited(_))));
}

#[tokio::test]
async fn test_server_error_is_transport() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = provider_for(&server, Duration::from_secs(5))
        .search("caffeine", 3)
        .await;
    assert!(matches!(result, Err(SearchError::Transport(msg)) if msg.contains("503")));
}

#[tokio::test]
async fn test_malformed_body_is_transport() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let result = provider_for(&server, Duration::from_secs(5))
        .search("caffeine", 3)
        .await;
    assert!(matches!(result, Err(SearchError::Transport(_))));
}

#[tokio::test]
async fn test_slow_response_is_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(mock_search_response(&[("Caffeine", "")]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let result = provider_for(&server, Duration::from_millis(200))
        .search("caffeine", 3)
        .await;
    assert!(matches!(result, Err(SearchError::Timeout(_))));
}
