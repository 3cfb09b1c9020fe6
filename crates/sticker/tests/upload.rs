//! The upload-and-link workflow end to end.

use std::sync::Arc;

use sticker::core::{Sticker, StickerGroup};
use sticker::store::{AttachmentStore, ResourceStore};
use sticker::{
    CallerContext, GroupTarget, ServiceError, StickerQuery, UploadForm, UploadLinkWorkflow,
    DEFAULT_MAX_UPLOAD_BYTES, FILE_PART,
};
use sticker_testkit::{png, FlakyStore, TestFixture};

#[tokio::test]
async fn test_upload_from_form() {
    let fixture = TestFixture::new();
    let manager = fixture.manager();
    let form = UploadForm::new()
        .field("groupName", "-")
        .file(FILE_PART, png("party.png", 128));

    let sticker = manager
        .uploads()
        .upload(&CallerContext::new("alice"), &GroupTarget::parse("-"), form.into_file().unwrap())
        .await
        .unwrap();

    assert_eq!(sticker.spec.group_name, "alice-stickers");
    assert_eq!(sticker.spec.display_name.as_deref(), Some("party.png"));
    let attachment = fixture
        .attachments
        .fetch(&sticker.spec.attachment_name)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(attachment.size, 128);
    assert_eq!(fixture.attachments.content(&attachment.name).unwrap().len(), 128);
}

#[tokio::test]
async fn test_upload_at_exact_limit_is_accepted() {
    let fixture = TestFixture::new();
    let manager = fixture.manager();
    let alice = CallerContext::new("alice");

    let limit = DEFAULT_MAX_UPLOAD_BYTES as usize;
    manager
        .uploads()
        .upload(&alice, &GroupTarget::SelfDefault, png("max.png", limit))
        .await
        .unwrap();
    assert_eq!(fixture.attachments.len(), 1);

    let err = manager
        .uploads()
        .upload(&alice, &GroupTarget::SelfDefault, png("over.png", limit + 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ClientInput(_)));
    assert_eq!(err.status_code(), 400);
    assert_eq!(fixture.attachments.len(), 1);
    assert_eq!(fixture.store.len(sticker::core::ResourceKind::Sticker), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uploads_share_one_default_group() {
    let fixture = TestFixture::new();
    let manager = Arc::new(fixture.manager());

    let mut tasks = Vec::new();
    for i in 0..8 {
        let manager = manager.clone();
        tasks.push(tokio::spawn(async move {
            manager
                .uploads()
                .upload(
                    &CallerContext::new("alice"),
                    &GroupTarget::SelfDefault,
                    png(&format!("{i}.png"), 32),
                )
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let groups = fixture
        .store
        .list_all(&|g: &StickerGroup| g.spec.owner == "alice")
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].metadata.name, "alice-stickers");

    let stickers = manager
        .stickers()
        .list(&StickerQuery::new().group("alice-stickers"))
        .await
        .unwrap();
    assert_eq!(stickers.total, 8);
}

#[tokio::test(start_paused = true)]
async fn test_link_survives_injected_conflicts() {
    let fixture = TestFixture::new();
    let store = Arc::new(FlakyStore::new(fixture.store.clone()));
    let workflow = UploadLinkWorkflow::new(
        store.clone(),
        fixture.attachments.clone(),
        fixture.config.clone(),
    );

    store.inject_conflicts(2);
    let sticker = workflow
        .upload(&CallerContext::new("alice"), &GroupTarget::parse("memes"), png("a.png", 8))
        .await
        .unwrap();

    assert_eq!(sticker.spec.group_name, "memes");
    assert_eq!(store.conflicts_remaining(), 0);
    let stored: Sticker = fixture.store.get(&sticker.metadata.name).await.unwrap();
    assert_eq!(stored.spec.group_name, "memes");
}

#[tokio::test(start_paused = true)]
async fn test_link_keeps_concurrent_edits() {
    let fixture = TestFixture::new();
    let store = Arc::new(FlakyStore::new(fixture.store.clone()));
    let workflow = UploadLinkWorkflow::new(
        store.clone(),
        fixture.attachments.clone(),
        fixture.config.clone(),
    );

    store.inject_concurrent_writes(2, |metadata| {
        let edits = metadata
            .labels
            .get("edits")
            .and_then(|n| n.parse::<u32>().ok())
            .unwrap_or_default();
        metadata.labels.insert("edits".into(), (edits + 1).to_string());
    });
    let sticker = workflow
        .upload(&CallerContext::new("alice"), &GroupTarget::parse("memes"), png("a.png", 8))
        .await
        .unwrap();
    assert_eq!(store.conflicts_remaining(), 0);

    let stored: Sticker = fixture.store.get(&sticker.metadata.name).await.unwrap();
    assert_eq!(stored, sticker);
    assert_eq!(stored.spec.group_name, "memes");
    assert_eq!(stored.metadata.labels.get("edits").map(String::as_str), Some("2"));
    // create, two concurrent edits, then the link
    assert_eq!(stored.metadata.version.get(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_link_gives_up_after_retry_budget() {
    let fixture = TestFixture::new();
    let store = Arc::new(FlakyStore::new(fixture.store.clone()));
    let workflow = UploadLinkWorkflow::new(
        store.clone(),
        fixture.attachments.clone(),
        fixture.config.clone(),
    );

    store.inject_conflicts(100);
    let err = workflow
        .upload(&CallerContext::new("alice"), &GroupTarget::SelfDefault, png("a.png", 8))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert_eq!(err.status_code(), 409);

    // The sticker exists but was never linked.
    let orphans = fixture
        .store
        .list_all(&|s: &Sticker| s.group().is_none())
        .await
        .unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(fixture.attachments.len(), 1);
}
