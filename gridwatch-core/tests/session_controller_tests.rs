// File: gridwatch-core/tests/session_controller_tests.rs

mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use uuid::Uuid;

use gridwatch_common::models::{LayoutMode, Platform, SavedLayout, StreamId, Viewport};
use gridwatch_common::traits::repository_traits::LayoutStore;
use gridwatch_core::config::{PollerConfig, SessionConfig};
use gridwatch_core::platforms::EmbedSignal;
use gridwatch_core::repositories::JsonFileLayoutStore;
use gridwatch_core::services::SessionController;
use gridwatch_core::Error;
use test_utils::helpers::*;

fn session(api: &Arc<FakeMetadataApi>) -> Arc<SessionController> {
    Arc::new(SessionController::new(api.clone(), SessionConfig::default()))
}

fn add(session: &SessionController, channel: &str) -> (StreamId, Arc<RecordingAdapter>) {
    let adapter = RecordingAdapter::ready();
    let id = session
        .add_stream(Platform::Twitch, channel, adapter.clone())
        .expect("stream should be accepted");
    (id, adapter)
}

async fn settle<F: Fn() -> bool>(done: F) {
    for _ in 0..100 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}

#[tokio::test]
async fn test_three_streams_get_a_grid_and_start_muted() {
    let api = FakeMetadataApi::new();
    let session = session(&api);
    let (a, adapter_a) = add(&session, "alpha");
    let (b, _) = add(&session, "bravo");
    let (c, adapter_c) = add(&session, "charlie");

    let plan = session.layout();
    assert_eq!((plan.columns, plan.rows), (2, 2));
    assert_eq!(plan.slots.len(), 3);

    let streams = session.streams();
    assert_eq!(streams.iter().map(|s| s.id).collect::<Vec<_>>(), vec![a, b, c]);
    for (index, entry) in streams.iter().enumerate() {
        assert_eq!(entry.slot_index, Some(index));
        assert!(entry.muted);
    }
    assert_eq!(session.active_audible(), None);

    assert_eq!(adapter_a.last_mount().unwrap().x, 0);
    assert_eq!(adapter_c.last_mount().unwrap().y, 540);
}

#[tokio::test]
async fn test_duplicates_and_overflow_are_rejected() {
    let api = FakeMetadataApi::new();
    let session = Arc::new(SessionController::new(
        api.clone(),
        SessionConfig { max_streams: 2, ..SessionConfig::default() },
    ));
    add(&session, "alpha");

    let dup = session.add_stream(Platform::Twitch, "  ALPHA ", RecordingAdapter::ready());
    assert!(matches!(dup, Err(Error::Validation(_))));

    let empty = session.add_stream(Platform::Twitch, "   ", RecordingAdapter::ready());
    assert!(matches!(empty, Err(Error::Validation(_))));

    add(&session, "bravo");
    let overflow = session.add_stream(Platform::Twitch, "charlie", RecordingAdapter::ready());
    assert!(matches!(overflow, Err(Error::Validation(_))));
    assert_eq!(session.streams().len(), 2);
}

#[tokio::test]
async fn test_same_id_on_different_platforms_is_allowed() {
    let api = FakeMetadataApi::new();
    let session = session(&api);
    add(&session, "shared");
    let yt = session.add_stream(Platform::YouTube, "shared", RecordingAdapter::ready());
    assert!(yt.is_ok());
}

#[tokio::test]
async fn test_poll_merges_live_status() -> Result<(), Error> {
    let api = FakeMetadataApi::new();
    let session = session(&api);
    let (a, _) = add(&session, "Alpha");
    let (b, _) = add(&session, "bravo");

    api.push(Ok(vec![live("alpha", 1234)]));
    let report = session.poll_once().await?;
    assert_eq!(report.requested, 2);
    assert_eq!(report.updated, 2);
    assert_eq!(report.went_live, vec![a]);

    let alpha = session.stream(a).unwrap();
    assert!(alpha.is_live);
    assert_eq!(alpha.viewer_count, 1234);
    assert_eq!(alpha.title.as_deref(), Some("alpha live"));
    assert!(alpha.last_refreshed.is_some());
    assert!(!session.stream(b).unwrap().is_live);

    api.push(Ok(Vec::new()));
    let report = session.poll_once().await?;
    assert_eq!(report.went_offline, vec![a]);
    assert_eq!(session.stream(a).unwrap().viewer_count, 0);

    assert_eq!(api.requests.lock()[0], vec!["alpha".to_string(), "bravo".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_removed_stream_is_not_resurrected_by_in_flight_poll() {
    let api = FakeMetadataApi::new();
    let session = session(&api);
    let (a, _) = add(&session, "alpha");
    let (b, _) = add(&session, "bravo");
    let (started, release) = api.gated();
    api.push(Ok(vec![live("alpha", 5), live("bravo", 7)]));

    let poll = tokio::spawn({
        let session = session.clone();
        async move { session.poll_once().await }
    });
    started.notified().await;
    session.remove_stream(b).unwrap();
    let (c, _) = add(&session, "charlie");
    release.notify_one();

    let report = poll.await.unwrap().unwrap();
    assert_eq!(report.requested, 2);
    assert_eq!(report.discarded, 1);
    assert_eq!(report.updated, 1);

    let ids: Vec<StreamId> = session.streams().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![a, c]);
    assert!(session.stream(a).unwrap().is_live);
    // Added mid-cycle; left for the next poll.
    assert!(session.stream(c).unwrap().last_refreshed.is_none());
}

#[tokio::test]
async fn test_failed_poll_keeps_last_known_data() {
    let api = FakeMetadataApi::new();
    let session = session(&api);
    let (a, _) = add(&session, "alpha");

    api.push(Ok(vec![live("alpha", 50)]));
    session.poll_once().await.unwrap();

    api.push(Err(Error::Network("connection reset".into())));
    let err = session.poll_once().await.unwrap_err();
    assert!(err.is_transient());

    let entry = session.stream(a).unwrap();
    assert!(entry.is_live);
    assert_eq!(entry.viewer_count, 50);
    assert!(entry.stale);

    api.push(Ok(vec![live("alpha", 60)]));
    session.poll_once().await.unwrap();
    assert!(!session.stream(a).unwrap().stale);
}

#[tokio::test]
async fn test_streams_without_metadata_are_not_polled() -> Result<(), Error> {
    let api = FakeMetadataApi::new();
    let session = session(&api);
    session.add_stream(Platform::YouTube, "dQw4w9WgXcQ", RecordingAdapter::ready())?;

    let report = session.poll_once().await?;
    assert_eq!(report.requested, 0);
    assert_eq!(api.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_toggle_scenario_keeps_one_audible() -> Result<(), Error> {
    let api = FakeMetadataApi::new();
    let session = session(&api);
    let (a, adapter_a) = add(&session, "alpha");
    let (b, adapter_b) = add(&session, "bravo");
    let (c, _) = add(&session, "charlie");

    assert!(!session.toggle_mute(a)?);
    assert!(!session.toggle_mute(b)?);
    assert_eq!(session.active_audible(), Some(b));
    assert!(session.stream(a).unwrap().muted);
    assert!(!session.stream(b).unwrap().muted);
    assert!(session.stream(c).unwrap().muted);
    assert!(!adapter_a.is_audible());
    assert!(adapter_b.is_audible());

    assert!(session.toggle_mute(b)?);
    assert_eq!(session.active_audible(), None);
    assert!(session.streams().iter().all(|s| s.muted));

    assert!(matches!(session.toggle_mute(Uuid::new_v4()), Err(Error::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn test_removing_audible_stream_silences_session() -> Result<(), Error> {
    let api = FakeMetadataApi::new();
    let session = session(&api);
    let (a, adapter_a) = add(&session, "alpha");
    add(&session, "bravo");
    session.toggle_mute(a)?;

    let removed = session.remove_stream(a)?;
    assert_eq!(removed.channel_ref, "alpha");
    assert_eq!(session.active_audible(), None);
    assert_eq!(adapter_a.commands().last(), Some(&"unmount"));
    assert_eq!(session.layout().slots.len(), 1);

    assert!(matches!(session.remove_stream(a), Err(Error::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn test_ready_signal_applies_deferred_unmute() -> Result<(), Error> {
    let api = FakeMetadataApi::new();
    let session = session(&api);
    let adapter = RecordingAdapter::not_ready();
    let id = session.add_stream(Platform::Twitch, "alpha", adapter.clone())?;
    assert!(!session.toggle_mute(id)?);
    assert!(adapter.commands().is_empty());

    session.start(PollerConfig::default());
    adapter.become_ready();
    settle(|| adapter.is_audible()).await;

    session.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_offline_signal_marks_entry_offline() -> Result<(), Error> {
    let api = FakeMetadataApi::new();
    let session = session(&api);
    let (a, _) = add(&session, "alpha");
    api.push(Ok(vec![live("alpha", 9)]));
    session.poll_once().await?;

    assert!(session.stream(a).unwrap().is_live);

    session.handle_embed_signal(EmbedSignal::Offline(a));
    let entry = session.stream(a).unwrap();
    assert!(!entry.is_live);
    assert_eq!(entry.viewer_count, 0);
    Ok(())
}

#[tokio::test]
async fn test_signals_for_removed_streams_are_ignored() {
    let api = FakeMetadataApi::new();
    let session = session(&api);
    let (a, _) = add(&session, "alpha");
    session.remove_stream(a).unwrap();

    session.handle_embed_signal(EmbedSignal::Ready(a));
    session.handle_embed_signal(EmbedSignal::Offline(a));
    assert!(session.streams().is_empty());
}

#[tokio::test]
async fn test_offline_last_moves_live_streams_forward() -> Result<(), Error> {
    let api = FakeMetadataApi::new();
    let session = Arc::new(SessionController::new(
        api.clone(),
        SessionConfig { offline_last: true, ..SessionConfig::default() },
    ));
    let (a, _) = add(&session, "alpha");
    let (b, _) = add(&session, "bravo");

    api.push(Ok(vec![live("bravo", 3)]));
    session.poll_once().await?;

    let plan = session.layout();
    assert_eq!(plan.slots[0].stream_id, b);
    assert_eq!(plan.slots[1].stream_id, a);
    assert_eq!(session.stream(b).unwrap().slot_index, Some(0));
    Ok(())
}

#[tokio::test]
async fn test_focus_mode_features_chosen_stream() -> Result<(), Error> {
    let api = FakeMetadataApi::new();
    let session = session(&api);
    let (a, _) = add(&session, "alpha");
    add(&session, "bravo");
    let (c, _) = add(&session, "charlie");

    session.focus(c)?;
    // Grid mode ignores the focused stream.
    assert_eq!(session.layout().slots[0].stream_id, a);

    session.set_mode(LayoutMode::Focus);
    let plan = session.layout();
    assert_eq!(plan.mode, LayoutMode::Focus);
    assert_eq!(plan.slots[0].stream_id, c);
    assert_eq!(plan.slots[0].w, 1920);
    assert_eq!(session.stream(c).unwrap().slot_index, Some(0));

    assert!(matches!(session.focus(Uuid::new_v4()), Err(Error::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn test_move_and_clear() -> Result<(), Error> {
    let api = FakeMetadataApi::new();
    let session = session(&api);
    let (a, _) = add(&session, "alpha");
    let (b, _) = add(&session, "bravo");
    let (c, adapter_c) = add(&session, "charlie");

    session.move_stream(c, 0)?;
    let ids: Vec<StreamId> = session.streams().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![c, a, b]);
    assert_eq!(session.layout().slots[0].stream_id, c);

    session.move_stream(c, 99)?;
    assert_eq!(session.streams().last().unwrap().id, c);

    session.clear();
    assert!(session.streams().is_empty());
    assert!(session.layout().is_empty());
    assert_eq!(adapter_c.commands().last(), Some(&"unmount"));
    Ok(())
}

#[tokio::test]
async fn test_viewport_change_publishes_new_plan() {
    let api = FakeMetadataApi::new();
    let session = session(&api);
    let mut rx = session.subscribe_layout();
    add(&session, "alpha");
    add(&session, "bravo");

    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().slots.len(), 2);

    session.set_viewport(Viewport::new(1080, 1920));
    assert!(rx.has_changed().unwrap());
    let plan = rx.borrow_and_update().clone();
    assert_eq!((plan.columns, plan.rows), (1, 2));

    // Unchanged viewport does not republish.
    session.set_viewport(Viewport::new(1080, 1920));
    assert!(!rx.has_changed().unwrap());
}

#[tokio::test]
async fn test_layout_mode_survives_restart() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileLayoutStore::new(dir.path().join("nested").join("layout.json")));
    let api = FakeMetadataApi::new();

    let first = Arc::new(
        SessionController::new(api.clone(), SessionConfig::default()).with_layout_store(store.clone()),
    );
    first.set_mode(LayoutMode::PictureInPicture);
    first.set_viewport(Viewport::new(2560, 1440));
    first.shutdown().await;
    assert!(store.path().exists());

    let second = SessionController::new(api.clone(), SessionConfig::default()).with_layout_store(store.clone());
    assert_eq!(second.mode(), LayoutMode::Grid);
    second.restore_layout().await;
    assert_eq!(second.mode(), LayoutMode::PictureInPicture);
    assert_eq!(second.viewport(), Viewport::new(2560, 1440));
}

#[tokio::test]
async fn test_unreadable_saved_layout_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("layout.json");
    std::fs::write(&path, "{ not json").unwrap();
    let store = Arc::new(JsonFileLayoutStore::new(&path));
    assert!(store.load().await.is_err());

    let session = SessionController::new(FakeMetadataApi::new(), SessionConfig::default())
        .with_layout_store(store);
    session.restore_layout().await;
    assert_eq!(session.mode(), LayoutMode::Grid);
}

#[tokio::test]
async fn test_missing_layout_file_loads_as_none() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileLayoutStore::new(dir.path().join("absent.json"));
    assert_eq!(store.load().await.unwrap(), None::<SavedLayout>);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_the_poller() {
    let api = FakeMetadataApi::new();
    let session = session(&api);
    add(&session, "alpha");

    session.start(PollerConfig {
        interval: Duration::from_secs(60),
        max_backoff: Duration::from_secs(600),
    });
    settle(|| api.request_count() == 1).await;

    tokio::time::advance(Duration::from_secs(61)).await;
    settle(|| api.request_count() == 2).await;

    session.shutdown().await;
    assert!(session.is_shut_down());
    tokio::time::advance(Duration::from_secs(600)).await;
    tokio::task::yield_now().await;
    assert_eq!(api.request_count(), 2);
}

#[tokio::test]
async fn test_shutdown_unmounts_every_embed() {
    let api = FakeMetadataApi::new();
    let session = session(&api);
    let (_, adapter_a) = add(&session, "alpha");
    let (_, adapter_b) = add(&session, "bravo");

    session.shutdown().await;
    for adapter in [&adapter_a, &adapter_b] {
        assert_eq!(adapter.commands().last(), Some(&"unmount"));
    }

    // A second shutdown has nothing left to tear down.
    session.shutdown().await;
    for adapter in [&adapter_a, &adapter_b] {
        assert_eq!(adapter.commands().iter().filter(|c| **c == "unmount").count(), 1);
    }
}
