//! Integration tests for OverpassClient and the search engine using wiremock.

use citylens_core::{AppError, ProviderConfig, ProviderError};
use citylens_geo::Coordinate;
use citylens_services::{
    OverpassClient, PoiCategory, PoiProvider, PoiQuery, PoiSearchEngine, RetryPolicy,
};
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> OverpassClient {
    OverpassClient::new(&ProviderConfig {
        overpass_url: server.uri(),
        ..ProviderConfig::default()
    })
    .unwrap()
}

fn springfield() -> Coordinate {
    Coordinate::new(39.7817, -89.6501).unwrap()
}

fn restaurants(count: i64) -> serde_json::Value {
    let elements: Vec<_> = (1..=count)
        .map(|i| {
            serde_json::json!({
                "type": "node",
                "id": i,
                "lat": 39.78 + i as f64 * 0.001,
                "lon": -89.65,
                "tags": {"name": format!("Diner {}", i), "amenity": "restaurant"}
            })
        })
        .collect();
    serde_json::json!({ "version": 0.6, "elements": elements })
}

#[tokio::test]
async fn test_query_posts_overpass_ql() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .and(body_string_contains(r#"node["amenity"="restaurant"](around:2000,"#))
        .and(body_string_contains("out center 20;"))
        .respond_with(ResponseTemplate::new(200).set_body_json(restaurants(2)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let query = PoiQuery::new(PoiCategory::Restaurant, springfield());
    let elements = client(&mock_server).query(&query).await.unwrap();

    assert_eq!(elements.len(), 2);
    assert_eq!(elements[0].id, Some(1));
}

#[tokio::test]
async fn test_way_center_is_used() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "elements": [
                {"type": "way", "id": 88, "center": {"lat": 39.79, "lon": -89.64},
                 "tags": {"name": "Washington Park", "leisure": "park"}},
                {"type": "way", "id": 89, "tags": {"name": "No geometry"}}
            ]
        })))
        .mount(&mock_server)
        .await;

    let engine = PoiSearchEngine::new(Arc::new(client(&mock_server)));
    let records = engine.search(springfield(), PoiCategory::Park).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "way/88");
    assert_eq!(records[0].name, "Washington Park");
    assert_eq!(records[0].coordinate.lat(), 39.79);
}

#[tokio::test]
async fn test_missing_elements_is_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"remark": "runtime error"})),
        )
        .mount(&mock_server)
        .await;

    let query = PoiQuery::new(PoiCategory::Shop, springfield());
    let err = client(&mock_server).query(&query).await.unwrap_err();

    assert!(matches!(err, ProviderError::Malformed(_)));
}

#[tokio::test]
async fn test_engine_recovers_after_two_server_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(restaurants(5)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let engine = PoiSearchEngine::new(Arc::new(client(&mock_server)))
        .with_policy(RetryPolicy::new(3, 10));
    let mut retries = Vec::new();
    let records = engine
        .search_with_progress(springfield(), PoiCategory::Restaurant, |p| {
            retries.push(p.to_string())
        })
        .await
        .unwrap();

    assert_eq!(records.len(), 5);
    assert_eq!(records[4].name, "Diner 5");
    assert_eq!(retries, vec!["retry 2/3", "retry 3/3"]);
}

#[tokio::test]
async fn test_engine_gives_up_after_three_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&mock_server)
        .await;

    let engine = PoiSearchEngine::new(Arc::new(client(&mock_server)))
        .with_policy(RetryPolicy::new(3, 10));
    let err = engine
        .search(springfield(), PoiCategory::Hotel)
        .await
        .unwrap_err();

    match err {
        AppError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(
                last,
                ProviderError::Unavailable {
                    status: Some(429),
                    ..
                }
            ));
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_elements_is_single_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"elements": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let engine = PoiSearchEngine::new(Arc::new(client(&mock_server)));
    let records = engine.search(springfield(), PoiCategory::Hotel).await.unwrap();

    assert!(records.is_empty());
}
