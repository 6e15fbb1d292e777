//! Registry-backed selectors against a mock registry.

mod common;

use common::{names, project_graph};
use depquery_core::SpecOptions;
use depquery_query::{Query, QueryError, QueryOptions, RegistryClient};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn query_for(server: &MockServer) -> Query {
    let registry = RegistryClient::default()
        .with_retries(2)
        .with_retry_delay(Duration::from_millis(1));
    Query::new(
        QueryOptions::new(project_graph())
            .with_spec_options(SpecOptions::default().with_registry(server.uri()))
            .with_registry(registry),
    )
}

async fn mount_versions(server: &MockServer, name: &str, versions: &[&str]) {
    let versions: serde_json::Map<String, serde_json::Value> = versions
        .iter()
        .map(|v| (v.to_string(), json!({})))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/{}", name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": name,
            "versions": versions,
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_outdated_major_needs_a_greater_major() {
    let server = MockServer::start().await;
    // Only minor/patch updates for a; a new major for e; nothing newer for b
    mount_versions(&server, "a", &["1.0.0", "1.5.2", "1.0.1"]).await;
    mount_versions(&server, "b", &["2.0.0", "2.3.0"]).await;
    mount_versions(&server, "e", &["1.0.0", "2.0.0"]).await;

    let query = query_for(&server);
    let response = query.search(":root > :outdated(major)", None).await.unwrap();
    assert_eq!(names(&response), vec!["e"]);
}

#[tokio::test]
async fn test_outdated_shares_fetches_per_package() {
    let server = MockServer::start().await;
    mount_versions(&server, "a", &["1.0.0", "1.1.0"]).await;
    mount_versions(&server, "b", &["2.3.0"]).await;
    mount_versions(&server, "e", &["1.0.0"]).await;

    // Second clause hits the memoized packuments (mocks expect one call each)
    let query = query_for(&server);
    let response = query
        .search(":root > :outdated, :root > :outdated(minor)", None)
        .await
        .unwrap();
    assert_eq!(names(&response), vec!["a"]);
}

#[tokio::test]
async fn test_registry_failures_fail_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    mount_versions(&server, "e", &["1.0.0"]).await;

    let query = query_for(&server);
    let response = query.search(":root > :outdated", None).await.unwrap();
    // a and b could not be checked and are kept; e is current
    assert_eq!(names(&response), vec!["a", "b"]);
}

#[tokio::test]
async fn test_cancel_in_flight_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "versions": {} }))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let query = query_for(&server);
    let signal = CancellationToken::new();
    let canceller = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let err = query
        .search(":root > :outdated", Some(signal))
        .await
        .unwrap_err();
    assert_eq!(err, QueryError::Cancelled);
    assert!(query.cached(":root > :outdated").is_none());
}

#[tokio::test]
async fn test_published() {
    let server = MockServer::start().await;
    for (name, version, time) in [
        ("a", "1.0.0", "2023-03-01T00:00:00.000Z"),
        ("b", "2.3.0", "2024-05-20T09:15:00.000Z"),
        ("e", "1.0.0", "2024-05-02T18:00:00.000Z"),
    ] {
        Mock::given(method("GET"))
            .and(path(format!("/{}", name)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": name,
                "versions": { version: {} },
                "time": { version: time },
            })))
            .mount(&server)
            .await;
    }

    let query = query_for(&server);
    let response = query.search(":root > :published(2024-05)", None).await.unwrap();
    assert_eq!(names(&response), vec!["b", "e"]);

    let response = query
        .search(":root > :published(>2024-05-10)", None)
        .await
        .unwrap();
    assert_eq!(names(&response), vec!["b"]);
}
