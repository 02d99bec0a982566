//! Artifact store behaviour against a real directory

use tempfile::TempDir;
use vertex_media_studio::storage::ArtifactStore;
use vertex_media_studio::AppError;

fn create_store() -> (TempDir, ArtifactStore) {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(dir.path().join("outputs"), "/outputs");
    (dir, store)
}

#[tokio::test]
async fn test_save_uses_naming_convention() {
    let (_dir, store) = create_store();

    let single = store.save(b"png", Some("image/png"), 100, None).await.unwrap();
    let variant = store.save(b"jpg", Some("image/jpeg"), 100, Some(2)).await.unwrap();
    let fallback = store.save(b"raw", None, 101, None).await.unwrap();

    assert_eq!(single, "/outputs/result-100.png");
    assert_eq!(variant, "/outputs/result-100-2.jpeg");
    assert_eq!(fallback, "/outputs/result-101.png");
    assert_eq!(
        std::fs::read(store.storage_path().join("result-100-2.jpeg")).unwrap(),
        b"jpg"
    );
}

#[tokio::test]
async fn test_save_overwrites_same_name() {
    let (_dir, store) = create_store();

    store.save(b"first", Some("image/png"), 5, None).await.unwrap();
    store.save(b"second", Some("image/png"), 5, None).await.unwrap();

    assert_eq!(store.read("result-5.png").await.unwrap(), b"second");
}

#[tokio::test]
async fn test_read_missing_is_not_found() {
    let (_dir, store) = create_store();
    store.ensure_storage_dir().await.unwrap();

    let result = store.read("result-1.png").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_list_groups_by_generation() {
    let (_dir, store) = create_store();

    store.save(b"a", Some("image/png"), 10, Some(2)).await.unwrap();
    store.save(b"a", Some("image/png"), 10, Some(1)).await.unwrap();
    store.save(b"a", Some("image/png"), 10, None).await.unwrap();
    store.save_video(10, b"video").await.unwrap();
    store.save(b"b", Some("image/png"), 20, None).await.unwrap();

    // Files outside the convention are ignored
    std::fs::write(store.storage_path().join("notes.txt"), b"x").unwrap();
    std::fs::write(store.storage_path().join("result-abc.png"), b"x").unwrap();

    let listing = store.list_by_generation_id().await.unwrap();

    assert_eq!(listing.keys().copied().collect::<Vec<_>>(), vec![10, 20]);
    assert_eq!(
        listing[&10].images,
        vec![
            "/outputs/result-10.png",
            "/outputs/result-10-1.png",
            "/outputs/result-10-2.png"
        ]
    );
    assert_eq!(listing[&10].videos, vec!["/outputs/result-10-video.mp4"]);
    assert!(listing[&20].videos.is_empty());
}

#[tokio::test]
async fn test_list_missing_directory_is_empty() {
    let (_dir, store) = create_store();
    assert!(store.list_by_generation_id().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_video() {
    let (_dir, store) = create_store();

    store.save_video(7, b"video").await.unwrap();
    assert!(store.delete_video(7).await.unwrap());
    assert!(!store.delete_video(7).await.unwrap());

    let listing = store.list_by_generation_id().await.unwrap();
    assert!(listing.get(&7).is_none());
}

#[tokio::test]
async fn test_save_all_writes_every_file() {
    let (_dir, store) = create_store();

    let urls = store
        .save_all(&[
            ("result-3-1.png".to_string(), b"one".to_vec()),
            ("result-3-2.png".to_string(), b"two".to_vec()),
        ])
        .await
        .unwrap();

    assert_eq!(urls, vec!["/outputs/result-3-1.png", "/outputs/result-3-2.png"]);

    // No staging files are left behind
    let names: Vec<String> = std::fs::read_dir(store.storage_path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.iter().all(|name| !name.ends_with(".partial")));
}

#[tokio::test]
async fn test_save_all_is_all_or_nothing() {
    let (_dir, store) = create_store();
    store.ensure_storage_dir().await.unwrap();

    // The second target cannot be staged because its parent does not exist
    let result = store
        .save_all(&[
            ("result-4-1.png".to_string(), b"one".to_vec()),
            ("missing/result-4-2.png".to_string(), b"two".to_vec()),
        ])
        .await;

    assert!(matches!(result, Err(AppError::Io(_))));
    assert_eq!(std::fs::read_dir(store.storage_path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_save_all_rolls_back_published_files() {
    let (_dir, store) = create_store();
    store.ensure_storage_dir().await.unwrap();

    // Staging succeeds, but nothing can be renamed onto a non-empty directory
    let blocker = store.storage_path().join("result-6-2.png");
    std::fs::create_dir(&blocker).unwrap();
    std::fs::write(blocker.join("keep"), b"x").unwrap();

    let result = store
        .save_all(&[
            ("result-6-1.png".to_string(), b"one".to_vec()),
            ("result-6-2.png".to_string(), b"two".to_vec()),
            ("result-6-3.png".to_string(), b"three".to_vec()),
        ])
        .await;

    assert!(matches!(result, Err(AppError::Io(_))));

    let names: Vec<String> = std::fs::read_dir(store.storage_path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["result-6-2.png"]);
    assert!(blocker.is_dir());
}

#[tokio::test]
async fn test_prune_variants_keeps_listed_files() {
    let (_dir, store) = create_store();

    store.save(b"base", Some("image/png"), 9, None).await.unwrap();
    for variant in 1..=4 {
        store.save(b"v", Some("image/png"), 9, Some(variant)).await.unwrap();
    }
    store.save(b"other", Some("image/png"), 10, Some(3)).await.unwrap();
    store.save_video(9, b"video").await.unwrap();

    let removed = store
        .prune_variants(9, &["result-9-1.png", "result-9-2.png"])
        .await
        .unwrap();

    assert_eq!(removed, 2);

    let listing = store.list_by_generation_id().await.unwrap();
    assert_eq!(
        listing[&9].images,
        vec![
            "/outputs/result-9.png",
            "/outputs/result-9-1.png",
            "/outputs/result-9-2.png"
        ]
    );
    assert_eq!(listing[&9].videos, vec!["/outputs/result-9-video.mp4"]);
    assert_eq!(listing[&10].images, vec!["/outputs/result-10-3.png"]);
}
