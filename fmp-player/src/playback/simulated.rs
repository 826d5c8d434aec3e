//! Simulated playback engine
//!
//! Stands in for a real audio engine: each track "plays" for a fixed
//! duration with no audio output, honouring pause, resume and stop. Used for
//! development deployments and the integration tests.
//!
//! A uri is playable when it looks like `<scheme>:<id>` (e.g.
//! `spotify:track:3Esqxo3D31RCjmdgwBPbOO`). Anything else fails to load and
//! resolves its completion with [`EndReason::Failed`] straight away.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{Completion, CompletionNotifier, EndReason, EngineState, PlaybackCapability};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
enum Control {
    Pause,
    Resume,
    Stop,
}

struct ActiveTrack {
    id: u64,
    uri: String,
    control: mpsc::UnboundedSender<Control>,
}

struct EngineInner {
    state: EngineState,
    active: Option<ActiveTrack>,
    next_id: u64,
}

/// Timer-driven engine without audio output
#[derive(Clone)]
pub struct SimulatedEngine {
    inner: Arc<Mutex<EngineInner>>,
    track_duration: Duration,
}

impl SimulatedEngine {
    pub fn new(track_duration: Duration) -> Self {
        info!(
            "Running simulated engine ({}ms per track) - there will be no audio output",
            track_duration.as_millis()
        );
        Self {
            inner: Arc::new(Mutex::new(EngineInner {
                state: EngineState::Stopped,
                active: None,
                next_id: 0,
            })),
            track_duration,
        }
    }

    /// Uri of the track currently loaded, if any
    pub async fn current_uri(&self) -> Option<String> {
        self.inner.lock().await.active.as_ref().map(|a| a.uri.clone())
    }

    fn is_playable(uri: &str) -> bool {
        match uri.split_once(':') {
            Some((scheme, id)) => !scheme.trim().is_empty() && !id.trim().is_empty(),
            None => false,
        }
    }
}

#[async_trait]
impl PlaybackCapability for SimulatedEngine {
    async fn play(&self, uri: &str) -> Completion {
        let mut inner = self.inner.lock().await;

        if let Some(previous) = inner.active.take() {
            debug!("Replacing {} with {}", previous.uri, uri);
            let _ = previous.control.send(Control::Stop);
        }

        if !Self::is_playable(uri) {
            warn!("Unable to play {} - forcing stop", uri);
            inner.state = EngineState::Stopped;
            return Completion::resolved(EndReason::Failed);
        }

        let id = inner.next_id;
        inner.next_id += 1;

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (notifier, completion) = Completion::channel();

        inner.active = Some(ActiveTrack {
            id,
            uri: uri.to_string(),
            control: control_tx,
        });
        inner.state = EngineState::Playing;

        info!("Playing track: {}", uri);
        tokio::spawn(run_track(
            Arc::clone(&self.inner),
            id,
            uri.to_string(),
            self.track_duration,
            control_rx,
            notifier,
        ));

        completion
    }

    async fn pause(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state != EngineState::Playing {
            return Err(Error::InvalidState(format!(
                "cannot pause while {}",
                inner.state
            )));
        }
        if let Some(active) = &inner.active {
            let _ = active.control.send(Control::Pause);
        }
        inner.state = EngineState::Paused;
        info!("Pausing playback");
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state != EngineState::Paused {
            return Err(Error::InvalidState(format!(
                "cannot resume while {}",
                inner.state
            )));
        }
        if let Some(active) = &inner.active {
            let _ = active.control.send(Control::Resume);
        }
        inner.state = EngineState::Playing;
        info!("Resuming playback");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.active.take() {
            Some(active) => {
                info!("Stop track: {}", active.uri);
                let _ = active.control.send(Control::Stop);
            }
            None => debug!("Stop requested with nothing loaded"),
        }
        inner.state = EngineState::Stopped;
        Ok(())
    }

    async fn state(&self) -> EngineState {
        self.inner.lock().await.state
    }
}

/// Plays one track to completion, tracking the time left across pauses
async fn run_track(
    inner: Arc<Mutex<EngineInner>>,
    id: u64,
    uri: String,
    duration: Duration,
    mut control_rx: mpsc::UnboundedReceiver<Control>,
    notifier: CompletionNotifier,
) {
    let mut remaining = duration;
    let mut paused = false;

    let reason = loop {
        if paused {
            match control_rx.recv().await {
                Some(Control::Resume) => paused = false,
                Some(Control::Pause) => {}
                Some(Control::Stop) | None => break EndReason::Stopped,
            }
            continue;
        }

        let started = Instant::now();
        tokio::select! {
            _ = tokio::time::sleep(remaining) => break EndReason::Finished,
            control = control_rx.recv() => {
                remaining = remaining.saturating_sub(started.elapsed());
                match control {
                    Some(Control::Pause) => paused = true,
                    Some(Control::Resume) => {}
                    Some(Control::Stop) | None => break EndReason::Stopped,
                }
            }
        }
    };

    {
        let mut inner = inner.lock().await;
        if inner.active.as_ref().is_some_and(|active| active.id == id) {
            inner.active = None;
            inner.state = EngineState::Stopped;
        }
    }

    debug!("Track {} ended ({})", uri, reason);
    notifier.fire(reason);
}
