//! Metadata ledger persistence

use futures::future::join_all;
use std::sync::Arc;
use tempfile::TempDir;
use vertex_media_studio::storage::MetadataLedger;

fn create_ledger() -> (TempDir, MetadataLedger) {
    let dir = TempDir::new().unwrap();
    let ledger = MetadataLedger::new(dir.path().join("metadata.json"));
    (dir, ledger)
}

#[tokio::test]
async fn test_missing_document_is_empty() {
    let (_dir, ledger) = create_ledger();
    assert!(ledger.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_creation_then_edits() {
    let (_dir, ledger) = create_ledger();

    ledger
        .record_creation(1, "a red fox", Some("A photorealistic red fox"))
        .await
        .unwrap();
    ledger.append_edit(1, "add snow").await.unwrap();
    let record = ledger.append_edit(1, "make it night").await.unwrap();

    assert_eq!(record.prompts, vec!["a red fox", "add snow", "make it night"]);
    assert_eq!(record.enhanced_prompt.as_deref(), Some("A photorealistic red fox"));

    let reloaded = ledger.load().await.unwrap();
    assert_eq!(reloaded[&1], record);
}

#[tokio::test]
async fn test_creation_prompt_is_not_duplicated() {
    let (_dir, ledger) = create_ledger();

    ledger.record_creation(2, "a cat", None).await.unwrap();
    let record = ledger.record_creation(2, "a cat", Some("late")).await.unwrap();

    assert_eq!(record.prompts, vec!["a cat"]);
    // Enhanced prompt may be filled in once but never replaced
    assert_eq!(record.enhanced_prompt.as_deref(), Some("late"));

    let record = ledger.record_creation(2, "a cat", Some("later")).await.unwrap();
    assert_eq!(record.enhanced_prompt.as_deref(), Some("late"));
}

#[tokio::test]
async fn test_video_prompts_append() {
    let (_dir, ledger) = create_ledger();

    ledger.record_creation(3, "a boat", None).await.unwrap();
    ledger.append_video_prompt(3, "waves roll").await.unwrap();
    let record = ledger.append_video_prompt(3, "camera pans").await.unwrap();

    assert_eq!(record.video_prompts, vec!["waves roll", "camera pans"]);
    assert_eq!(record.prompts, vec!["a boat"]);
}

#[tokio::test]
async fn test_legacy_document_is_upgraded_on_write() {
    let (dir, ledger) = create_ledger();
    std::fs::write(
        dir.path().join("metadata.json"),
        r#"{"5": {"prompt": "old prompt", "enhancedPrompt": "Old prompt!"}}"#,
    )
    .unwrap();

    let record = ledger.append_edit(5, "new edit").await.unwrap();
    assert_eq!(record.prompts, vec!["old prompt", "new edit"]);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("metadata.json")).unwrap())
            .unwrap();
    assert_eq!(raw["5"]["prompts"][1], "new edit");
    assert!(raw["5"].get("prompt").is_none());
}

#[tokio::test]
async fn test_malformed_document_is_empty_and_preserved() {
    let (dir, ledger) = create_ledger();
    std::fs::write(dir.path().join("metadata.json"), "{ not json").unwrap();

    assert!(ledger.load().await.unwrap().is_empty());

    ledger.record_creation(6, "fresh", None).await.unwrap();
    assert_eq!(ledger.load().await.unwrap()[&6].prompts, vec!["fresh"]);

    let backups: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with("metadata.json.corrupt-"))
        .collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(
        std::fs::read_to_string(dir.path().join(&backups[0])).unwrap(),
        "{ not json"
    );
}

#[tokio::test]
async fn test_concurrent_appends_are_not_lost() {
    let (_dir, ledger) = create_ledger();
    let ledger = Arc::new(ledger);
    ledger.record_creation(8, "base", None).await.unwrap();

    let tasks = (0..20).map(|i| {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.append_edit(8, &format!("edit {}", i)).await })
    });

    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let document = ledger.load().await.unwrap();
    let record = &document[&8];
    assert_eq!(record.prompts.len(), 21);
    assert_eq!(record.prompts[0], "base");
}
