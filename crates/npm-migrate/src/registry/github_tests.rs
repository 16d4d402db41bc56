//! Tests for the GitHub Packages registry client.

use super::*;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(api_url: &str) -> GitHubRegistryConfig {
    GitHubRegistryConfig {
        api_url: api_url.to_string(),
        owner: "acme-corp".to_string(),
        owner_kind: OwnerKind::Orgs,
        token: "ghp_test".to_string(),
        page_size: 100,
        max_pages: MAX_PAGES,
        timeout: Duration::from_secs(5),
    }
}

#[test]
fn test_github_urls() {
    let registry = GitHubRegistry::new(test_config("https://api.github.com/")).unwrap();
    assert_eq!(
        registry.packages_url(),
        "https://api.github.com/orgs/acme-corp/packages"
    );
    assert_eq!(
        registry.versions_url(&Package::new("@acme", "widget")),
        "https://api.github.com/orgs/acme-corp/packages/npm/widget/versions"
    );
}

#[test]
fn test_github_users_urls() {
    let mut config = test_config("https://api.github.com");
    config.owner_kind = OwnerKind::Users;
    let registry = GitHubRegistry::new(config).unwrap();
    assert_eq!(
        registry.packages_url(),
        "https://api.github.com/users/acme-corp/packages"
    );
}

#[test]
fn test_github_rejects_invalid_url() {
    assert!(GitHubRegistry::new(test_config("ftp://api.github.com")).is_err());
}

#[test]
fn test_from_config_requires_token() {
    let config = MigrationConfig::new("acme-corp", "@acme");
    assert!(matches!(
        GitHubRegistry::from_config(&config),
        Err(Error::PreconditionMissing(_))
    ));
}

#[tokio::test]
async fn test_list_packages_filters_scope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme-corp/packages"))
        .and(query_param("package_type", "npm"))
        .and(header("authorization", "Bearer ghp_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "widget", "package_type": "npm"},
            {"name": "@other/gadget", "package_type": "npm"},
            {"name": "@acme/gizmo", "package_type": "npm"},
            {"package_type": "npm"},
            {"name": "widget", "package_type": "npm"}
        ])))
        .mount(&server)
        .await;

    let registry = GitHubRegistry::new(test_config(&server.uri())).unwrap();
    let packages = registry.list_packages("@acme").await.unwrap();

    assert_eq!(
        packages,
        vec![Package::new("@acme", "widget"), Package::new("@acme", "gizmo")]
    );
}

#[tokio::test]
async fn test_list_packages_empty_is_not_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme-corp/packages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let registry = GitHubRegistry::new(test_config(&server.uri())).unwrap();
    assert!(registry.list_packages("@acme").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_packages_http_error_is_registry_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme-corp/packages"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
        .mount(&server)
        .await;

    let registry = GitHubRegistry::new(test_config(&server.uri())).unwrap();
    let err = registry.list_packages("@acme").await.unwrap_err();

    assert!(matches!(err, Error::RegistryUnavailable(_)));
    assert!(err.to_string().contains("401"));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_list_packages_unreachable_is_registry_unavailable() {
    // nothing listens on the discard port
    let registry = GitHubRegistry::new(test_config("http://127.0.0.1:9")).unwrap();
    let err = registry.list_packages("@acme").await.unwrap_err();
    assert!(matches!(err, Error::RegistryUnavailable(_)));
}

#[tokio::test]
async fn test_list_packages_follows_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme-corp/packages"))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"name": "a"}, {"name": "b"}])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme-corp/packages"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "c"}])))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.page_size = 2;
    let registry = GitHubRegistry::new(config).unwrap();
    let packages = registry.list_packages("acme").await.unwrap();

    let names: Vec<_> = packages.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_list_packages_page_cap_is_an_error() {
    let server = MockServer::start().await;
    // every page is full, so the listing never ends on its own
    Mock::given(method("GET"))
        .and(path("/orgs/acme-corp/packages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "a"}])))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.page_size = 1;
    config.max_pages = 3;
    let registry = GitHubRegistry::new(config).unwrap();

    let err = registry.list_packages("acme").await.unwrap_err();
    match err {
        Error::RegistryUnavailable(reason) => assert!(reason.contains("exceeded 3 pages")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_list_versions_page_cap_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme-corp/packages/npm/widget/versions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "1.0.0"}])))
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.page_size = 1;
    config.max_pages = 2;
    let registry = GitHubRegistry::new(config).unwrap();

    let err = registry
        .list_versions(&Package::new("@acme", "widget"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::VersionLookupFailed { .. }));
    assert!(err.to_string().contains("exceeded 2 pages"));
}

#[tokio::test]
async fn test_list_versions_keeps_registry_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme-corp/packages/npm/widget/versions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 3, "name": "1.1.0"},
            {"id": 1, "name": "1.0.0"},
            {"id": 2},
            {"id": 4, "name": "1.1.0"}
        ])))
        .mount(&server)
        .await;

    let registry = GitHubRegistry::new(test_config(&server.uri())).unwrap();
    let versions = registry
        .list_versions(&Package::new("@acme", "widget"))
        .await
        .unwrap();

    assert_eq!(versions, vec!["1.1.0", "1.0.0"]);
}

#[tokio::test]
async fn test_list_versions_not_found_is_recoverable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme-corp/packages/npm/ghost/versions"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let registry = GitHubRegistry::new(test_config(&server.uri())).unwrap();
    let err = registry
        .list_versions(&Package::new("@acme", "ghost"))
        .await
        .unwrap_err();

    match err {
        Error::VersionLookupFailed { package, reason } => {
            assert_eq!(package, "@acme/ghost");
            assert!(reason.contains("404"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_list_versions_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme-corp/packages/npm/widget/versions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let registry = GitHubRegistry::new(test_config(&server.uri())).unwrap();
    let result = registry.list_versions(&Package::new("@acme", "widget")).await;
    assert!(matches!(result, Err(Error::VersionLookupFailed { .. })));
}
