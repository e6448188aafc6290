use pmolocal::LocalFileSource;
use pmosource::{SourceRegistry, StreamSource, TrackResource};
use std::sync::Arc;
use tempfile::TempDir;

fn library() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("Artist/Album")).unwrap();
    std::fs::write(dir.path().join("Artist/Album/01.flac"), b"fLaC").unwrap();
    std::fs::write(dir.path().join("Artist/Album/02.MP3"), b"ID3").unwrap();
    std::fs::write(dir.path().join("Artist/Album/cover.jpg"), b"jpg").unwrap();
    dir
}

fn source_for(dir: &TempDir) -> LocalFileSource {
    LocalFileSource::new(
        vec![dir.path().to_path_buf()],
        vec!["flac".to_string(), "mp3".to_string()],
    )
}

#[tokio::test]
async fn load_indexes_audio_files_only() {
    let dir = library();
    let source = source_for(&dir);
    source.load().await.unwrap();

    assert_eq!(source.len(), 2);
    let id = LocalFileSource::track_id(&dir.path().join("Artist/Album/01.flac"));
    assert!(source.can_fetch_stream(&TrackResource::new(id, "01")));
}

#[tokio::test]
async fn missing_directory_is_skipped() {
    let dir = library();
    let source = LocalFileSource::new(
        vec![dir.path().join("nope"), dir.path().to_path_buf()],
        vec!["flac".to_string()],
    );
    source.load().await.unwrap();
    assert_eq!(source.len(), 1);
}

#[tokio::test]
async fn fetch_stream_returns_file_uri() {
    let dir = library();
    let source = source_for(&dir);
    let path = dir.path().join("Artist/Album/01.flac");
    source.register_file_as("t1", &path);

    let info = source
        .fetch_stream(&TrackResource::new("t1", "Song"))
        .await
        .unwrap()
        .unwrap();
    assert!(info.uri.starts_with("file://"));
    assert!(info.uri.ends_with("/Artist/Album/01.flac"));
    assert_eq!(info.duration, 0);
    assert_eq!(info.from, "");
}

#[tokio::test]
async fn vanished_file_resolves_to_none() {
    let dir = library();
    let source = source_for(&dir);
    let path = dir.path().join("Artist/Album/01.flac");
    let id = source.register_file(&path);
    std::fs::remove_file(&path).unwrap();

    let resource = TrackResource::new(id, "Song");
    assert!(source.can_fetch_stream(&resource));
    assert!(source.fetch_stream(&resource).await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_track_is_not_claimed() {
    let dir = library();
    let source = source_for(&dir);
    assert!(!source.can_fetch_stream(&TrackResource::new("other", "Song")));
}

#[tokio::test]
async fn registry_resolves_local_files() {
    let dir = library();
    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(source_for(&dir))).await.unwrap();

    let id = LocalFileSource::track_id(&dir.path().join("Artist/Album/02.MP3"));
    let info = registry
        .resolve_stream(&TrackResource::new(id, "02"))
        .await
        .unwrap()
        .unwrap();
    assert!(info.uri.ends_with("02.MP3"));
}
