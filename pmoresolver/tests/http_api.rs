use pmoconfig::Config;
use pmolocal::LocalFileSource;
use pmoresolver::{ResolverContext, api};
use pmosource::{
    MemoryLibrary, Result, SourceCapabilities, SourceError, SourceRegistry, StreamSource,
    TrackResource, TrackStreamInfo, async_trait,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
struct SignedUrlSource;

#[async_trait]
impl StreamSource for SignedUrlSource {
    fn id(&self) -> &str {
        "signed"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::STREAMING
    }

    fn can_fetch_stream(&self, resource: &TrackResource) -> bool {
        resource.id != "local"
    }

    async fn fetch_stream(&self, resource: &TrackResource) -> Result<Option<TrackStreamInfo>> {
        if resource.id == "broken" {
            return Err(SourceError::NoMatch(resource.title.clone()));
        }
        Ok(Some(TrackStreamInfo {
            uri: format!("https://cdn.example/{}?expire=4102444800", resource.id),
            duration: 1_000,
            from: "signed".to_string(),
        }))
    }
}

async fn serve(registry: SourceRegistry) -> String {
    let config = Config::from_yaml_str("").unwrap();
    let context = Arc::new(ResolverContext::new(
        config,
        Arc::new(MemoryLibrary::new()),
        registry,
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, api::router(context)).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn signed_registry() -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(SignedUrlSource)).await.unwrap();
    registry
}

#[tokio::test]
async fn resolve_then_query_and_remove() {
    let base = serve(signed_registry().await).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("{}/api/resolve_stream", base))
        .json(&json!({"resource": {"id": "t1", "title": "Song", "artists": ["Artist"]}}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        body["stream"]["uri"],
        "https://cdn.example/t1?expire=4102444800"
    );
    assert_eq!(body["stream"]["from"], "signed");

    let has: Value = client
        .get(format!("{}/api/has/t1", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(has["value"], true);

    let fetching: Value = client
        .get(format!("{}/api/fetching/t1", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetching["value"], false);

    let removed = client
        .post(format!("{}/api/remove/t1", base))
        .send()
        .await
        .unwrap();
    assert_eq!(removed.status(), reqwest::StatusCode::NO_CONTENT);

    let has: Value = client
        .get(format!("{}/api/has/t1", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(has["value"], false);
}

#[tokio::test]
async fn hard_failure_maps_to_not_found() {
    let base = serve(signed_registry().await).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/resolve_stream", base))
        .json(&json!({"resource": {"id": "broken", "title": "Lost"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Lost"));
}

#[tokio::test]
async fn local_files_are_not_cached_without_expiry() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("song.flac");
    std::fs::write(&file, b"fLaC").unwrap();

    let local = LocalFileSource::new(Vec::<std::path::PathBuf>::new(), vec!["flac".to_string()]);
    local.register_file_as("local", &file);

    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(local)).await.unwrap();
    let base = serve(registry).await;

    let body: Value = reqwest::Client::new()
        .post(format!("{}/api/resolve_stream", base))
        .json(&json!({"resource": {"id": "local", "title": "Song"}}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["stream"].is_null());
}

#[tokio::test]
async fn sources_and_import_passthrough() {
    let base = serve(signed_registry().await).await;
    let client = reqwest::Client::new();

    let sources: Value = client
        .get(format!("{}/api/sources", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(sources["count"], 1);
    assert_eq!(sources["sources"][0]["id"], "signed");
    assert_eq!(
        sources["sources"][0]["capabilities"]["supports_import"],
        false
    );

    let report: Value = client
        .post(format!("{}/api/import", base))
        .json(&json!({"items": ["https://open.spotify.com/album/A1"]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["remaining"][0], "https://open.spotify.com/album/A1");
    assert_eq!(report["results"].as_array().unwrap().len(), 0);
}
