//! Integration tests for OpenWeatherClient using wiremock.

use citylens_core::{ProviderConfig, ProviderError, ProviderMode, UnitSystem};
use citylens_geo::{
    Coordinate, GeoProvider, LocationQuery, LocationResolver, OpenWeatherClient,
    ResolutionOutcome, WeatherBinder,
};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn direct_client(server: &MockServer) -> OpenWeatherClient {
    OpenWeatherClient::new(&ProviderConfig {
        mode: ProviderMode::Direct,
        openweather_url: server.uri(),
        api_key: Some("test-key".to_string()),
        ..ProviderConfig::default()
    })
    .unwrap()
}

fn proxy_client(server: &MockServer) -> OpenWeatherClient {
    OpenWeatherClient::new(&ProviderConfig {
        mode: ProviderMode::Proxy,
        openweather_url: server.uri(),
        ..ProviderConfig::default()
    })
    .unwrap()
}

fn paris_candidates() -> serde_json::Value {
    serde_json::json!([
        {"name": "Paris", "country": "FR", "lat": 48.8589, "lon": 2.32},
        {"name": "Paris", "state": "Texas", "country": "US", "lat": 33.6609, "lon": -95.5555}
    ])
}

#[tokio::test]
async fn test_forward_geocode_sends_key_and_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "Paris"))
        .and(query_param("limit", "5"))
        .and(query_param("appid", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paris_candidates()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = direct_client(&mock_server);
    let candidates = client.geocode_forward("Paris", 5).await.unwrap();

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].label(), "Paris, FR");
    assert_eq!(candidates[1].label(), "Paris, Texas, US");
}

#[tokio::test]
async fn test_proxy_routes_without_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/geo/reverse"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": "Manhattan", "state": "New York", "country": "US", "lat": 40.7128, "lon": -74.006}
        ])))
        .mount(&mock_server)
        .await;

    let client = proxy_client(&mock_server);
    let coord = Coordinate::new(40.7128, -74.006).unwrap();
    let candidates = client.geocode_reverse(coord, 1).await.unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].name, "Manhattan");

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|r| !r.url.query().unwrap_or_default().contains("appid")));
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let client = direct_client(&mock_server);
    let err = client.geocode_forward("Paris", 5).await.unwrap_err();

    assert!(matches!(
        err,
        ProviderError::Unavailable {
            status: Some(503),
            ..
        }
    ));
}

#[tokio::test]
async fn test_unexpected_shape_is_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"cod": 401})),
        )
        .mount(&mock_server)
        .await;

    let client = direct_client(&mock_server);
    let err = client.geocode_forward("Paris", 5).await.unwrap_err();

    assert!(matches!(err, ProviderError::Malformed(_)));
}

#[tokio::test]
async fn test_weather_binder_requests_units() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("units", "imperial"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "coord": {"lat": 39.8017, "lon": -89.6437},
            "main": {"temp": 71.6, "humidity": 55, "feels_like": 70.2},
            "wind": {"speed": 10.36},
            "weather": [{"description": "scattered clouds", "icon": "03d"}],
            "name": "Springfield",
            "sys": {"country": "US"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let binder = WeatherBinder::new(Arc::new(direct_client(&mock_server)), UnitSystem::Imperial);
    let snapshot = binder
        .fetch(Coordinate::new(39.8017, -89.6437).unwrap())
        .await
        .unwrap();

    assert_eq!(snapshot.temperature, 71.6);
    assert_eq!(snapshot.display_temperature(), "72°F");
    assert_eq!(snapshot.description, "scattered clouds");
}

#[tokio::test]
async fn test_weather_failure_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let binder = WeatherBinder::new(Arc::new(direct_client(&mock_server)), UnitSystem::Imperial);
    let result = binder.fetch(Coordinate::new(0.0, 0.0).unwrap()).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_resolver_ambiguous_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paris_candidates()))
        .mount(&mock_server)
        .await;

    let resolver = LocationResolver::new(Arc::new(direct_client(&mock_server)));
    let outcome = resolver
        .resolve(LocationQuery::Text("Paris".to_string()))
        .await
        .unwrap();

    match outcome {
        ResolutionOutcome::Ambiguous(candidates) => {
            assert_eq!(candidates.len(), 2);
            assert_eq!(candidates[1].state.as_deref(), Some("Texas"));
        }
        other => panic!("expected ambiguous outcome, got {:?}", other),
    }
}
