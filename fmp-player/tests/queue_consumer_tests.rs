//! Queue consumer integration tests
//!
//! Drives the consumer against a memory store and a scripted engine whose
//! tracks end only when the test says so.

mod helpers;

use fmp_common::{Notification, StoreKeys, TrackRequest};
use fmp_player::consumer::{PlayOutcome, QueueConsumer, Step};
use fmp_player::playback::{EndReason, EngineState, PlaybackCapability, SimulatedEngine};
use fmp_player::store::SharedStore;
use helpers::{EngineCall, Fixture};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn keys() -> StoreKeys {
    StoreKeys::default()
}

#[tokio::test]
async fn test_empty_queue_is_idle() {
    let fixture = Fixture::new();
    let consumer = fixture.consumer();

    assert_eq!(consumer.run_once().await.unwrap(), Step::Idle);
    assert!(fixture.engine.calls().is_empty());
}

#[tokio::test]
async fn test_tracks_play_in_enqueue_order() {
    let fixture = Fixture::new();
    let mut events = fixture.collector().await;
    fixture.enqueue("track:A", "u1").await;
    fixture.enqueue("track:B", "u2").await;

    let consumer = Arc::new(fixture.consumer());
    let runner = {
        let consumer = Arc::clone(&consumer);
        tokio::spawn(async move { consumer.run().await })
    };

    fixture.engine.wait_for_plays(1).await;
    assert_eq!(events.next().await, Notification::play(&TrackRequest::new("track:A", "u1")));
    assert_eq!(fixture.current().await, Some(TrackRequest::new("track:A", "u1")));

    assert!(fixture.engine.finish(EndReason::Finished));
    assert_eq!(events.next().await, Notification::end(&TrackRequest::new("track:A", "u1")));
    assert_eq!(events.next().await, Notification::play(&TrackRequest::new("track:B", "u2")));
    assert_eq!(fixture.current().await, Some(TrackRequest::new("track:B", "u2")));

    assert!(fixture.engine.finish(EndReason::Finished));
    assert_eq!(events.next().await, Notification::end(&TrackRequest::new("track:B", "u2")));

    // end clears the record before it is published
    assert_eq!(fixture.current().await, None);
    assert_eq!(fixture.engine.plays(), vec!["track:A", "track:B"]);
    assert_eq!(fixture.engine.overlaps(), 0);

    runner.abort();
}

#[tokio::test]
async fn test_next_track_waits_for_completion() {
    let fixture = Fixture::new();
    for uri in ["track:1", "track:2", "track:3"] {
        fixture.enqueue(uri, "u").await;
    }

    let consumer = Arc::new(fixture.consumer());
    let runner = {
        let consumer = Arc::clone(&consumer);
        tokio::spawn(async move { consumer.run().await })
    };

    fixture.engine.wait_for_plays(1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fixture.engine.plays().len(), 1);
    assert_eq!(fixture.store.list_len(&keys().queue).await.unwrap(), 2);

    fixture.engine.finish(EndReason::Finished);
    fixture.engine.wait_for_plays(2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fixture.engine.plays().len(), 2);

    fixture.engine.finish(EndReason::Finished);
    fixture.engine.wait_for_plays(3).await;
    assert_eq!(fixture.engine.overlaps(), 0);

    runner.abort();
}

#[tokio::test]
async fn test_recovery_replays_current_track_first() {
    let fixture = Fixture::new();
    let mut events = fixture.collector().await;
    let leftover = TrackRequest::new("track:C", "u3");
    fixture
        .store
        .set(&keys().current, &leftover.to_json().unwrap())
        .await
        .unwrap();
    fixture.enqueue("track:D", "u4").await;

    let consumer = Arc::new(fixture.consumer());
    let runner = {
        let consumer = Arc::clone(&consumer);
        tokio::spawn(async move { consumer.run().await })
    };

    fixture.engine.wait_for_plays(1).await;
    assert_eq!(fixture.engine.plays(), vec!["track:C"]);
    assert_eq!(events.next().await, Notification::play(&leftover));
    assert_eq!(fixture.store.list_len(&keys().queue).await.unwrap(), 1);

    fixture.engine.finish(EndReason::Finished);
    assert_eq!(events.next().await, Notification::end(&leftover));
    assert_eq!(events.next().await, Notification::play(&TrackRequest::new("track:D", "u4")));

    runner.abort();
}

#[tokio::test]
async fn test_recovery_without_record_does_nothing() {
    let fixture = Fixture::new();
    let consumer = fixture.consumer();

    assert_eq!(consumer.recover().await.unwrap(), None);
    assert!(fixture.engine.calls().is_empty());
}

#[tokio::test]
async fn test_unreadable_current_record_is_deleted() {
    let fixture = Fixture::new();
    fixture.store.set(&keys().current, "{not json").await.unwrap();

    let consumer = fixture.consumer();
    assert_eq!(consumer.recover().await.unwrap(), None);
    assert_eq!(fixture.key(&keys().current).await, None);
    assert!(fixture.engine.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_queue_entry_is_dropped() {
    let fixture = Fixture::new();
    fixture.store.push_back(&keys().queue, "not json").await.unwrap();
    fixture
        .store
        .push_back(&keys().queue, r#"{"user":"u1"}"#)
        .await
        .unwrap();

    let consumer = fixture.consumer();
    assert_eq!(consumer.run_once().await.unwrap(), Step::Discarded);
    assert_eq!(consumer.run_once().await.unwrap(), Step::Discarded);
    assert_eq!(consumer.run_once().await.unwrap(), Step::Idle);
    assert!(fixture.engine.calls().is_empty());
    assert_eq!(fixture.current().await, None);
}

#[tokio::test]
async fn test_run_once_reports_finished_track() {
    let fixture = Fixture::new();
    fixture.enqueue("track:A", "u1").await;

    let consumer = Arc::new(fixture.consumer());
    let step = {
        let consumer = Arc::clone(&consumer);
        tokio::spawn(async move { consumer.run_once().await })
    };

    fixture.engine.wait_for_plays(1).await;
    fixture.engine.finish(EndReason::Finished);

    let report = match step.await.unwrap().unwrap() {
        Step::Played(report) => report,
        other => panic!("expected a played track, got {:?}", other),
    };
    assert_eq!(report.track, TrackRequest::new("track:A", "u1"));
    assert_eq!(report.outcome, PlayOutcome::Ended(EndReason::Finished));

    // nothing is recorded between one track's end and the next play
    assert_eq!(fixture.current().await, None);
}

#[tokio::test]
async fn test_unplayable_track_still_ends() {
    let fixture = Fixture::new();
    let mut events = fixture.collector().await;
    fixture.engine.reject("broken");
    fixture.enqueue("broken", "u1").await;

    let consumer = fixture.consumer();
    let Step::Played(report) = consumer.run_once().await.unwrap() else {
        panic!("expected a played track");
    };
    assert_eq!(report.outcome, PlayOutcome::Ended(EndReason::Failed));

    let track = TrackRequest::new("broken", "u1");
    assert_eq!(events.next().await, Notification::play(&track));
    assert_eq!(events.next().await, Notification::end(&track));
    assert_eq!(fixture.current().await, None);
}

#[tokio::test]
async fn test_stop_releases_the_wait() {
    let fixture = Fixture::new();
    let mut events = fixture.collector().await;
    fixture.enqueue("track:A", "u1").await;

    let consumer = Arc::new(fixture.consumer());
    let step = {
        let consumer = Arc::clone(&consumer);
        tokio::spawn(async move { consumer.run_once().await })
    };

    fixture.engine.wait_for_plays(1).await;
    fixture.dispatcher().handle_message(r#"{"event":"stop"}"#).await;

    let Step::Played(report) = step.await.unwrap().unwrap() else {
        panic!("expected a played track");
    };
    assert_eq!(report.outcome, PlayOutcome::Ended(EndReason::Stopped));
    assert_eq!(events.next().await.event_name(), "play");
    assert_eq!(events.next().await.event_name(), "end");
}

#[tokio::test]
async fn test_stalled_track_is_skipped_after_timeout() {
    let fixture = Fixture::new();
    let mut events = fixture.collector().await;
    fixture.enqueue("track:A", "u1").await;

    let consumer = fixture
        .consumer()
        .with_completion_timeout(Some(Duration::from_millis(50)));
    let Step::Played(report) = consumer.run_once().await.unwrap() else {
        panic!("expected a played track");
    };
    assert_eq!(report.outcome, PlayOutcome::Stalled);
    assert_eq!(
        fixture.engine.calls(),
        vec![EngineCall::Play("track:A".to_string()), EngineCall::Stop]
    );

    let track = TrackRequest::new("track:A", "u1");
    assert_eq!(events.next().await, Notification::play(&track));
    assert_eq!(events.next().await, Notification::stalled(&track));
    assert_eq!(events.next().await, Notification::end(&track));
    assert_eq!(fixture.current().await, None);
}

#[tokio::test]
async fn test_pausing_past_the_timeout_does_not_stall() {
    let fixture = Fixture::new();
    fixture.enqueue("track:A", "u1").await;
    let engine = Arc::new(SimulatedEngine::new(Duration::from_millis(80)));
    let consumer = QueueConsumer::new(engine.clone(), fixture.publisher.clone())
        .with_completion_timeout(Some(Duration::from_millis(200)));
    let step = tokio::spawn(async move { consumer.run_once().await });

    tokio::time::timeout(Duration::from_secs(2), async {
        while engine.state().await != EngineState::Playing {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("track never started");
    engine.pause().await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    engine.resume().await.unwrap();

    let Step::Played(report) = step.await.unwrap().unwrap() else {
        panic!("expected a played track");
    };
    assert_eq!(report.outcome, PlayOutcome::Ended(EndReason::Finished));
    assert_eq!(fixture.current().await, None);
}

#[tokio::test]
async fn test_paused_track_is_never_stalled() {
    let fixture = Fixture::new();
    let mut events = fixture.collector().await;
    fixture.enqueue("track:A", "u1").await;

    let consumer = Arc::new(
        fixture
            .consumer()
            .with_completion_timeout(Some(Duration::from_millis(50))),
    );
    let step = {
        let consumer = Arc::clone(&consumer);
        tokio::spawn(async move { consumer.run_once().await })
    };

    fixture.engine.wait_for_plays(1).await;
    fixture.engine.set_state(EngineState::Paused);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!step.is_finished());
    assert!(!fixture.engine.calls().contains(&EngineCall::Stop));

    fixture.engine.finish(EndReason::Finished);
    let Step::Played(report) = step.await.unwrap().unwrap() else {
        panic!("expected a played track");
    };
    assert_eq!(report.outcome, PlayOutcome::Ended(EndReason::Finished));
    assert_eq!(events.next().await.event_name(), "play");
    assert_eq!(events.next().await.event_name(), "end");
}

#[tokio::test]
async fn test_end_uses_requester_from_current_record() {
    let fixture = Fixture::new();
    let mut events = fixture.collector().await;
    fixture.enqueue("track:A", "u1").await;

    let consumer = Arc::new(fixture.consumer());
    let step = {
        let consumer = Arc::clone(&consumer);
        tokio::spawn(async move { consumer.run_once().await })
    };

    fixture.engine.wait_for_plays(1).await;
    let rewritten = TrackRequest::new("track:A", "u9");
    fixture
        .store
        .set(&keys().current, &rewritten.to_json().unwrap())
        .await
        .unwrap();
    fixture.engine.finish(EndReason::Finished);
    step.await.unwrap().unwrap();

    assert_eq!(events.next().await.event_name(), "play");
    assert_eq!(events.next().await, Notification::end(&rewritten));
}

#[tokio::test]
async fn test_missing_user_is_carried_as_null() {
    let fixture = Fixture::new();
    let mut events = fixture.collector().await;
    fixture
        .store
        .push_back(&keys().queue, r#"{"uri":"track:A"}"#)
        .await
        .unwrap();
    fixture.engine.reject("track:A");

    fixture.consumer().run_once().await.unwrap();

    assert_eq!(
        events.next_raw().await,
        json!({"event": "play", "uri": "track:A", "user": null})
    );
    assert_eq!(
        events.next_raw().await,
        json!({"event": "end", "uri": "track:A", "user": null})
    );
}

#[tokio::test]
async fn test_structured_requester_round_trips() {
    let fixture = Fixture::new();
    let mut events = fixture.collector().await;
    let entry = json!({"uri": "track:A", "user": {"id": 7, "name": "sam"}});
    fixture
        .store
        .push_back(&keys().queue, &entry.to_string())
        .await
        .unwrap();
    fixture.engine.reject("track:A");

    fixture.consumer().run_once().await.unwrap();

    let play = events.next_raw().await;
    assert_eq!(play["user"], json!({"id": 7, "name": "sam"}));
}

#[tokio::test]
async fn test_queue_moves_on_after_stalled_track() {
    let fixture = Fixture::new();
    let mut events = fixture.collector().await;
    fixture.enqueue("track:A", "u1").await;
    fixture.enqueue("track:B", "u2").await;

    let consumer = Arc::new(
        fixture
            .consumer()
            .with_completion_timeout(Some(Duration::from_millis(50))),
    );
    let runner = {
        let consumer = Arc::clone(&consumer);
        tokio::spawn(async move { consumer.run().await })
    };

    let a = TrackRequest::new("track:A", "u1");
    assert_eq!(events.next().await, Notification::play(&a));
    assert_eq!(events.next().await, Notification::stalled(&a));
    assert_eq!(events.next().await, Notification::end(&a));
    assert_eq!(events.next().await, Notification::play(&TrackRequest::new("track:B", "u2")));
    assert_eq!(fixture.engine.overlaps(), 0);

    runner.abort();
}
