//! Queue consumer
//!
//! The single sequencer of the work queue: at most one track plays at a time,
//! in enqueue order, with no retry or reordering.
//!
//! One cycle:
//! 1. Pop one entry (pop-and-own; malformed entries are dropped)
//! 2. Record it as the current track and publish `play`
//! 3. Hand the uri to the engine, keeping the completion handle it returns
//! 4. Wait for that handle (bounded by the completion timeout, if any)
//! 5. Clear the current track and publish `end`
//!
//! On an empty queue the loop sleeps a short random delay before polling
//! again. A track that plays past the completion timeout without finishing is
//! stopped and reported as `stalled` (then `end`) so the queue keeps moving.
//! Time spent paused does not count towards the timeout.
//!
//! Only one consumer may run per queue. Nothing here enforces that.

use fmp_common::{Notification, TrackRequest};
use rand::Rng;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::playback::{EndReason, PlaybackCapability, WaitOutcome};
use crate::publisher::NotificationPublisher;
use crate::store::SharedStore;

/// How a play cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Ended(EndReason),
    /// No completion within the timeout; the track was stopped
    Stalled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayReport {
    pub track: TrackRequest,
    pub outcome: PlayOutcome,
}

/// Result of one pass over the queue
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Played(PlayReport),
    /// Popped an entry that did not decode
    Discarded,
    /// Queue was empty
    Idle,
}

pub struct QueueConsumer {
    store: Arc<dyn SharedStore>,
    engine: Arc<dyn PlaybackCapability>,
    publisher: NotificationPublisher,
    completion_timeout: Option<Duration>,
    idle_poll_ms: RangeInclusive<u64>,
}

impl QueueConsumer {
    pub fn new(engine: Arc<dyn PlaybackCapability>, publisher: NotificationPublisher) -> Self {
        Self {
            store: Arc::clone(publisher.store()),
            engine,
            publisher,
            completion_timeout: None,
            idle_poll_ms: 0..=2,
        }
    }

    /// Bound the playing time waited for each track; `None` waits forever
    pub fn with_completion_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.completion_timeout = timeout;
        self
    }

    /// Range of the randomized empty-queue delay, in milliseconds
    pub fn with_idle_poll(mut self, range_ms: RangeInclusive<u64>) -> Self {
        if range_ms.is_empty() {
            warn!("Ignoring empty idle poll range {:?}", range_ms);
        } else {
            self.idle_poll_ms = range_ms;
        }
        self
    }

    /// Recover from a restart, then consume the queue forever
    pub async fn run(&self) {
        match self.recover().await {
            Ok(Some(report)) => debug!("Recovered {} ({:?})", report.track.uri, report.outcome),
            Ok(None) => {}
            Err(e) => error!("Current track recovery failed: {}", e),
        }

        info!("Watching queue '{}'", self.publisher.keys().queue);
        loop {
            match self.run_once().await {
                Ok(Step::Played(_)) | Ok(Step::Discarded) => {}
                Ok(Step::Idle) => self.idle().await,
                Err(e) => {
                    error!("Queue poll failed: {}", e);
                    self.idle().await;
                }
            }
        }
    }

    /// Replay a track left behind by a previous process
    ///
    /// Runs before the queue is touched. The track restarts from the
    /// beginning; no position is kept.
    pub async fn recover(&self) -> Result<Option<PlayReport>> {
        let current_key = &self.publisher.keys().current;
        let Some(raw) = self.store.get(current_key).await? else {
            return Ok(None);
        };

        match TrackRequest::from_json(&raw) {
            Ok(track) => {
                info!("Playing current track before watching queue: {}", track.uri);
                Ok(Some(self.play(track).await))
            }
            Err(e) => {
                warn!("Discarding unreadable current track record {:?}: {}", raw, e);
                self.store.delete(current_key).await?;
                Ok(None)
            }
        }
    }

    /// Pop and play at most one entry
    pub async fn run_once(&self) -> Result<Step> {
        let Some(raw) = self.store.pop_front(&self.publisher.keys().queue).await? else {
            return Ok(Step::Idle);
        };

        match TrackRequest::from_json(&raw) {
            Ok(track) => {
                debug!("Track popped off queue: {}", track.uri);
                Ok(Step::Played(self.play(track).await))
            }
            Err(e) => {
                warn!("Dropping malformed queue entry {:?}: {}", raw, e);
                Ok(Step::Discarded)
            }
        }
    }

    /// One full play cycle; store failures are logged, never fatal
    async fn play(&self, track: TrackRequest) -> PlayReport {
        info!("Playing {} for {}", track.uri, track.requester);
        self.notify(Notification::play(&track)).await;

        let completion = self.engine.play(&track.uri).await;
        debug!("Waiting for {} to finish", track.uri);

        let outcome = match completion
            .wait_playing(self.completion_timeout, self.engine.as_ref())
            .await
        {
            WaitOutcome::Ended(reason) => {
                debug!("{} ended ({})", track.uri, reason);
                PlayOutcome::Ended(reason)
            }
            WaitOutcome::TimedOut => {
                warn!(
                    "{} did not finish within {:?}, skipping",
                    track.uri, self.completion_timeout
                );
                if let Err(e) = self.engine.stop().await {
                    warn!("Failed to stop stalled track: {}", e);
                }
                PlayOutcome::Stalled
            }
        };

        self.finish(&track, outcome).await;
        PlayReport { track, outcome }
    }

    /// Announce the end using the requester from the persisted record
    async fn finish(&self, track: &TrackRequest, outcome: PlayOutcome) {
        let announced = match self.publisher.current().await {
            Ok(Some(record)) if record.uri == track.uri => record,
            Ok(_) => {
                warn!("Current track record for {} is gone, using queue entry", track.uri);
                track.clone()
            }
            Err(e) => {
                warn!("Failed to read current track record: {}", e);
                track.clone()
            }
        };

        if outcome == PlayOutcome::Stalled {
            self.notify(Notification::stalled(&announced)).await;
        }
        debug!("Fire end event");
        self.notify(Notification::end(&announced)).await;
    }

    async fn notify(&self, notification: Notification) {
        if let Err(e) = self.publisher.publish(&notification).await {
            error!("Failed to publish {}: {}", notification.event_name(), e);
        }
    }

    async fn idle(&self) {
        let delay_ms = rand::thread_rng().gen_range(self.idle_poll_ms.clone());
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}
