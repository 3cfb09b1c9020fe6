//! Sticker lifecycle driven by a running controller.

use std::time::Duration;

use sticker::controller::{forward_events, ControllerConfig};
use sticker::core::{Sticker, StickerGroup, StickerPhase};
use sticker::store::ResourceStore;
use sticker::{CallerContext, GroupTarget, StickerConfig};
use sticker_testkit::{png, wait_until, TestFixture};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const PATIENCE: Duration = Duration::from_secs(5);

struct Running {
    shutdown: watch::Sender<bool>,
    controller: JoinHandle<sticker::controller::Result<()>>,
    forwarder: Option<JoinHandle<()>>,
}

impl Running {
    async fn stop(self) {
        self.shutdown.send(true).unwrap();
        self.controller.await.unwrap().unwrap();
        if let Some(forwarder) = self.forwarder {
            forwarder.await.unwrap();
        }
    }
}

fn start(fixture: &TestFixture, watch_store: bool) -> Running {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let (shutdown, shutdown_rx) = watch::channel(false);
    let controller = fixture.manager().controller();
    let forwarder =
        watch_store.then(|| forward_events(&fixture.store, controller.handle(), shutdown_rx.clone()));
    Running {
        shutdown,
        controller: tokio::spawn(controller.run(shutdown_rx)),
        forwarder,
    }
}

async fn sticker_state(fixture: &TestFixture, name: &str) -> Option<Sticker> {
    fixture.store.fetch::<Sticker>(name).await.unwrap()
}

async fn group_count(fixture: &TestFixture, name: &str) -> u64 {
    let group: StickerGroup = fixture.store.get(name).await.unwrap();
    group.status.sticker_count
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_upload_converges_then_delete_removes() {
    let fixture = &TestFixture::new();
    let running = start(fixture, true);
    let manager = fixture.manager();
    let alice = CallerContext::new("alice");

    let uploaded = manager
        .uploads()
        .upload(&alice, &GroupTarget::SelfDefault, png("hi.png", 64))
        .await
        .unwrap();
    let name = uploaded.metadata.name.as_str();

    let converged = wait_until(PATIENCE, || async move {
        match sticker_state(fixture, name).await {
            Some(s) => s.lifecycle() == StickerPhase::Active && !s.spec.url.is_empty(),
            None => false,
        }
    })
    .await;
    assert!(converged, "sticker never became active");
    assert!(wait_until(PATIENCE, || async move { group_count(fixture, "alice-stickers").await == 1 }).await);

    manager.stickers().delete(name).await.unwrap();
    let removed = wait_until(PATIENCE, || async move { sticker_state(fixture, name).await.is_none() }).await;
    assert!(removed, "terminating sticker was never released");
    assert!(wait_until(PATIENCE, || async move { group_count(fixture, "alice-stickers").await == 0 }).await);

    running.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_resync_converges_without_events() {
    let mut config = StickerConfig::default().with_attachment(Default::default());
    config.controller = ControllerConfig {
        resync_interval: Some(Duration::from_millis(50)),
        ..Default::default()
    };
    let fixture = &TestFixture::with_config(config);
    fixture.seed_group("cats", "alice").await;
    fixture.seed_sticker("s1", "cats").await;
    fixture.seed_sticker("s2", "cats").await;

    let running = start(fixture, false);

    let converged = wait_until(PATIENCE, || async move {
        let mut active = 0;
        for name in ["s1", "s2"] {
            if let Some(s) = sticker_state(fixture, name).await {
                if s.lifecycle() == StickerPhase::Active {
                    active += 1;
                }
            }
        }
        active == 2
    })
    .await;
    assert!(converged);
    assert!(wait_until(PATIENCE, || async move { group_count(fixture, "cats").await == 2 }).await);

    running.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_moved_sticker_counts_in_new_group() {
    let fixture = &TestFixture::new();
    fixture.seed_group("cats", "alice").await;
    fixture.seed_group("dogs", "alice").await;
    fixture.seed_sticker("s1", "cats").await;
    let running = start(fixture, true);
    let manager = fixture.manager();

    // Nudge the seeded sticker through the queue with a no-op edit.
    manager
        .stickers()
        .update(&CallerContext::new("alice"), "s1", Default::default())
        .await
        .unwrap();
    assert!(wait_until(PATIENCE, || async move { group_count(fixture, "cats").await == 1 }).await);

    manager
        .stickers()
        .move_to_group(&CallerContext::new("alice"), "s1", "dogs")
        .await
        .unwrap();
    assert!(wait_until(PATIENCE, || async move { group_count(fixture, "dogs").await == 1 }).await);
    assert_eq!(group_count(fixture, "cats").await, 0);

    running.stop().await;
}
