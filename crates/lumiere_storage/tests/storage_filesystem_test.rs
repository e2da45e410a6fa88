//! Tests for the filesystem artifact store.

use lumiere_core::{Outline, Topic};
use lumiere_storage::{
    ArtifactKey, ArtifactStore, FileSystemArtifactStore, StorageErrorKind, read_json, write_json,
};
use tempfile::TempDir;

fn topic() -> Topic {
    Topic::new(0, "binary search")
}

#[tokio::test]
async fn test_write_and_read() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileSystemArtifactStore::new(temp_dir.path()).unwrap();
    let key = ArtifactKey::code(&topic(), "section_1");

    assert!(!store.exists(&key).await.unwrap());
    store.write(&key, b"class Section1Scene: pass").await.unwrap();
    assert!(store.exists(&key).await.unwrap());
    assert_eq!(store.read(&key).await.unwrap(), b"class Section1Scene: pass");

    let on_disk = temp_dir.path().join("0-binary_search").join("section_1.py");
    assert!(on_disk.exists());
}

#[tokio::test]
async fn test_write_replaces_contents() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileSystemArtifactStore::new(temp_dir.path()).unwrap();
    let key = ArtifactKey::video(&topic(), "section_1");

    store.write(&key, b"v1").await.unwrap();
    store.write(&key, b"v2").await.unwrap();
    assert_eq!(store.read(&key).await.unwrap(), b"v2");

    // No temp files left behind.
    let videos = temp_dir.path().join("0-binary_search").join("videos");
    let names: Vec<_> = std::fs::read_dir(videos)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["section_1.mp4".to_string()]);
}

#[tokio::test]
async fn test_missing_artifact_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileSystemArtifactStore::new(temp_dir.path()).unwrap();
    let err = store.read(&ArtifactKey::outline(&topic())).await.unwrap_err();
    assert!(matches!(err.kind, StorageErrorKind::NotFound(_)));
}

#[tokio::test]
async fn test_create_if_absent_keeps_first_writer() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileSystemArtifactStore::new(temp_dir.path()).unwrap();
    let key = ArtifactKey::storyboard(&topic());

    assert!(store.create_if_absent(&key, b"first").await.unwrap());
    assert!(!store.create_if_absent(&key, b"second").await.unwrap());
    assert_eq!(store.read(&key).await.unwrap(), b"first");
}

#[tokio::test]
async fn test_json_helpers() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileSystemArtifactStore::new(temp_dir.path()).unwrap();
    let key = ArtifactKey::outline(&topic());

    let missing: Option<Outline> = read_json(&store, &key).await.unwrap();
    assert!(missing.is_none());

    let outline: Outline = serde_json::from_str(
        r#"{"topic": "Binary search", "target_audience": "students", "sections": []}"#,
    )
    .unwrap();
    write_json(&store, &key, &outline).await.unwrap();
    let loaded: Option<Outline> = read_json(&store, &key).await.unwrap();
    assert_eq!(loaded, Some(outline));
}

#[tokio::test]
async fn test_corrupt_json_reported() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileSystemArtifactStore::new(temp_dir.path()).unwrap();
    let key = ArtifactKey::outline(&topic());
    store.write(&key, b"{not json").await.unwrap();

    let err = read_json::<Outline>(&store, &key).await.unwrap_err();
    assert!(matches!(err.kind, StorageErrorKind::Corrupt(_)));
}
