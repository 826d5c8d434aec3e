//! Test helpers for fmp-player integration tests
//!
//! - ScriptedEngine: playback capability whose tracks end only when told to
//! - RecordingMixer: mixer that records calls and can be made to fail
//! - NotificationCollector: reads notifications off a store channel
//! - Fixture: memory store + scripted capabilities + publisher

#![allow(dead_code)]

use async_trait::async_trait;
use fmp_common::{EventBus, Notification, StoreKeys, TrackRequest};
use fmp_player::consumer::QueueConsumer;
use fmp_player::dispatcher::CommandDispatcher;
use fmp_player::mixer::MixerCapability;
use fmp_player::playback::{
    Completion, CompletionNotifier, EndReason, EngineState, PlaybackCapability,
};
use fmp_player::publisher::NotificationPublisher;
use fmp_player::store::{MemoryStore, SharedStore, Subscription};
use fmp_player::{Error, Result};
use futures::StreamExt;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Upper bound for anything a test waits on
pub const WAIT: Duration = Duration::from_secs(2);

pub const CHANNEL: &str = "fm:player:events";

// ============================================================================
// ScriptedEngine
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Play(String),
    Pause,
    Resume,
    Stop,
}

struct ScriptedInner {
    state: EngineState,
    pending: VecDeque<CompletionNotifier>,
    calls: Vec<EngineCall>,
    unplayable: HashSet<String>,
    fail_transport: bool,
    overlaps: usize,
}

/// Engine whose tracks never end on their own
///
/// Overlapping plays are counted, not replaced, so tests can detect a
/// consumer that starts a track while another is still in flight.
pub struct ScriptedEngine {
    inner: Mutex<ScriptedInner>,
}

impl ScriptedEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(ScriptedInner {
                state: EngineState::Stopped,
                pending: VecDeque::new(),
                calls: Vec::new(),
                unplayable: HashSet::new(),
                fail_transport: false,
                overlaps: 0,
            }),
        })
    }

    /// Make `uri` fail to load
    pub fn reject(&self, uri: &str) {
        self.inner.lock().unwrap().unplayable.insert(uri.to_string());
    }

    /// Make pause/resume/stop return an error
    pub fn fail_transport(&self, fail: bool) {
        self.inner.lock().unwrap().fail_transport = fail;
    }

    pub fn set_state(&self, state: EngineState) {
        self.inner.lock().unwrap().state = state;
    }

    /// End the oldest in-flight track; false if nothing was playing
    pub fn finish(&self, reason: EndReason) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let Some(notifier) = inner.pending.pop_front() else {
            return false;
        };
        if inner.pending.is_empty() {
            inner.state = EngineState::Stopped;
        }
        notifier.fire(reason);
        true
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn plays(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::Play(uri) => Some(uri),
                _ => None,
            })
            .collect()
    }

    pub fn overlaps(&self) -> usize {
        self.inner.lock().unwrap().overlaps
    }

    /// Wait until `play` has been called `count` times
    pub async fn wait_for_plays(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + WAIT;
        while self.plays().len() < count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "expected {} plays, saw {:?}",
                count,
                self.plays()
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl PlaybackCapability for ScriptedEngine {
    async fn play(&self, uri: &str) -> Completion {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(EngineCall::Play(uri.to_string()));
        if inner.unplayable.contains(uri) {
            inner.state = EngineState::Stopped;
            return Completion::resolved(EndReason::Failed);
        }
        if !inner.pending.is_empty() {
            inner.overlaps += 1;
        }
        let (notifier, completion) = Completion::channel();
        inner.pending.push_back(notifier);
        inner.state = EngineState::Playing;
        completion
    }

    async fn pause(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(EngineCall::Pause);
        if inner.fail_transport {
            return Err(Error::Playback("device busy".to_string()));
        }
        inner.state = EngineState::Paused;
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(EngineCall::Resume);
        if inner.fail_transport {
            return Err(Error::Playback("device busy".to_string()));
        }
        inner.state = EngineState::Playing;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(EngineCall::Stop);
        if inner.fail_transport {
            return Err(Error::Playback("device busy".to_string()));
        }
        for notifier in inner.pending.drain(..) {
            notifier.fire(EndReason::Stopped);
        }
        inner.state = EngineState::Stopped;
        Ok(())
    }

    async fn state(&self) -> EngineState {
        self.inner.lock().unwrap().state
    }
}

// ============================================================================
// RecordingMixer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixerCall {
    SetVolume(u8),
    SetMute(bool),
}

#[derive(Default)]
pub struct RecordingMixer {
    calls: Mutex<Vec<MixerCall>>,
    failing: Mutex<bool>,
}

impl RecordingMixer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn calls(&self) -> Vec<MixerCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: MixerCall) -> Result<()> {
        if *self.failing.lock().unwrap() {
            return Err(Error::Mixer("endpoint gone".to_string()));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl MixerCapability for RecordingMixer {
    async fn volume(&self) -> Result<u8> {
        let last = self.calls().into_iter().rev().find_map(|call| match call {
            MixerCall::SetVolume(volume) => Some(volume),
            _ => None,
        });
        Ok(last.unwrap_or(100))
    }

    async fn set_volume(&self, volume: u8) -> Result<()> {
        self.record(MixerCall::SetVolume(volume))
    }

    async fn mute(&self) -> Result<bool> {
        let last = self.calls().into_iter().rev().find_map(|call| match call {
            MixerCall::SetMute(mute) => Some(mute),
            _ => None,
        });
        Ok(last.unwrap_or(false))
    }

    async fn set_mute(&self, mute: bool) -> Result<()> {
        self.record(MixerCall::SetMute(mute))
    }
}

// ============================================================================
// NotificationCollector
// ============================================================================

/// Reads a store channel, skipping anything that is not a notification
/// (commands share the default channel)
pub struct NotificationCollector {
    messages: Subscription,
}

impl NotificationCollector {
    pub async fn subscribe(store: &MemoryStore, channel: &str) -> Self {
        Self {
            messages: store.subscribe(channel).await.unwrap(),
        }
    }

    /// Next raw notification payload as JSON
    pub async fn next_raw(&mut self) -> serde_json::Value {
        loop {
            let raw = tokio::time::timeout(WAIT, self.messages.next())
                .await
                .expect("timed out waiting for a notification")
                .expect("notification channel closed");
            if Notification::from_json(&raw).is_ok() {
                return serde_json::from_str(&raw).unwrap();
            }
        }
    }

    pub async fn next(&mut self) -> Notification {
        serde_json::from_value(self.next_raw().await).unwrap()
    }

    /// Assert no notification arrives within `window`
    pub async fn assert_quiet(&mut self, window: Duration) {
        let deadline = tokio::time::Instant::now() + window;
        loop {
            match tokio::time::timeout_at(deadline, self.messages.next()).await {
                Err(_) => return,
                Ok(None) => return,
                Ok(Some(raw)) => {
                    if let Ok(notification) = Notification::from_json(&raw) {
                        panic!("unexpected notification: {:?}", notification);
                    }
                }
            }
        }
    }
}

// ============================================================================
// Fixture
// ============================================================================

pub struct Fixture {
    pub store: MemoryStore,
    pub engine: Arc<ScriptedEngine>,
    pub mixer: Arc<RecordingMixer>,
    pub publisher: NotificationPublisher,
}

impl Fixture {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let publisher = NotificationPublisher::new(
            Arc::new(store.clone()),
            StoreKeys::default(),
            CHANNEL,
            EventBus::new(64),
        );
        Self {
            store,
            engine: ScriptedEngine::new(),
            mixer: RecordingMixer::new(),
            publisher,
        }
    }

    pub fn consumer(&self) -> QueueConsumer {
        QueueConsumer::new(self.engine.clone(), self.publisher.clone())
    }

    pub fn dispatcher(&self) -> CommandDispatcher {
        CommandDispatcher::new(self.engine.clone(), self.mixer.clone(), self.publisher.clone())
    }

    pub async fn collector(&self) -> NotificationCollector {
        NotificationCollector::subscribe(&self.store, CHANNEL).await
    }

    pub async fn enqueue(&self, uri: &str, user: &str) {
        let entry = TrackRequest::new(uri, user).to_json().unwrap();
        self.store.push_back(&StoreKeys::default().queue, &entry).await.unwrap();
    }

    pub async fn key(&self, key: &str) -> Option<String> {
        self.store.get(key).await.unwrap()
    }

    pub async fn current(&self) -> Option<TrackRequest> {
        self.key(&StoreKeys::default().current)
            .await
            .map(|raw| TrackRequest::from_json(&raw).unwrap())
    }
}
