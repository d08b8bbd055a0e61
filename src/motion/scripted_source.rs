//! Scripted orientation source
//!
//! Plays back tilt angles at a fixed sample rate, standing in for the device
//! sensor in the demo binary and in tests. Queued angles are emitted in order;
//! once the queue runs dry the last angle is held (a device resting on a
//! forehead keeps reporting), or a looping script is replayed.
//!
//! The feed loop uses a statum typestate machine, `Priming → Streaming`,
//! mirroring how a real sensor session has to be opened before it streams.

use serde::{Deserialize, Serialize};
use statum::{machine, state};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::lock;
use crate::motion::orientation::{OrientationSource, ReadingSender, SensorError, SensorReading};

pub const MAX_SAMPLE_RATE_HZ: f64 = 1000.0;

/// Sampling settings for an orientation source
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Samples per second
    pub sample_rate_hz: f64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            sample_rate_hz: 60.0,
        }
    }
}

impl SourceSettings {
    /// Period between samples, rate clamped to 1..=1000 Hz
    pub fn sample_interval(&self) -> Duration {
        let rate = if self.sample_rate_hz.is_finite() {
            self.sample_rate_hz.clamp(1.0, MAX_SAMPLE_RATE_HZ)
        } else {
            Self::default().sample_rate_hz
        };
        Duration::from_secs_f64(1.0 / rate)
    }
}

/// How the simulated sensor behaves when started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    #[default]
    Available,
    /// `start` fails with [`SensorError::NotAvailable`]
    Unavailable,
    /// Starts, then reports [`SensorError::PermissionDenied`] and stays silent
    PermissionDenied,
}

/// Angles waiting to be played back
#[derive(Debug, Default)]
pub struct AngleScript {
    queue: VecDeque<f64>,
    looped: Vec<f64>,
    held: f64,
}

impl AngleScript {
    fn next_angle(&mut self) -> f64 {
        if self.queue.is_empty() && !self.looped.is_empty() {
            self.queue.extend(self.looped.iter().copied());
        }
        if let Some(angle) = self.queue.pop_front() {
            self.held = angle;
        }
        self.held
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum FeedState {
    Priming,
    Streaming,
}

#[machine]
#[derive(Debug)]
pub struct SampleFeed<S: FeedState> {
    // Shared with the owning source so scripts can change mid-stream
    script: Arc<Mutex<AngleScript>>,

    // Channel into the motion handle's sample pump
    sender: ReadingSender,

    sample_interval: Duration,

    mode: SourceMode,

    samples_sent: u64,
}

impl SampleFeed<Priming> {
    pub fn create(
        script: Arc<Mutex<AngleScript>>,
        sender: ReadingSender,
        sample_interval: Duration,
        mode: SourceMode,
    ) -> Self {
        debug!(
            "Creating sample feed with interval {:?} in mode {:?}",
            sample_interval, mode
        );
        Self::new(script, sender, sample_interval, mode, 0)
    }

    /// Opens the simulated sensor session
    pub fn prime(self) -> Result<SampleFeed<Streaming>, SensorError> {
        if self.mode == SourceMode::PermissionDenied {
            warn!("Sample feed denied sensor access");
            let _ = self
                .sender
                .send(SensorReading::Fault(SensorError::PermissionDenied));
            return Err(SensorError::PermissionDenied);
        }

        debug!("Sample feed primed, transitioning to Streaming");
        Ok(self.transition())
    }
}

impl SampleFeed<Streaming> {
    /// Emits one sample per interval until cancelled or the pump goes away
    pub async fn run_feed_loop(mut self, token: CancellationToken) -> u64 {
        info!("Starting sample feed loop");

        let mut ticker = interval(self.sample_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,

                _ = ticker.tick() => {
                    let angle = lock(&self.script).next_angle();
                    if self.sender.send(SensorReading::Sample(angle)).is_err() {
                        debug!("Sample pump dropped its receiver");
                        break;
                    }
                    self.samples_sent += 1;
                }
            }
        }

        info!("Sample feed stopped after {} samples", self.samples_sent);
        self.samples_sent
    }
}

/// [`OrientationSource`] driven by a script instead of hardware
#[derive(Debug)]
pub struct ScriptedSource {
    settings: SourceSettings,
    mode: SourceMode,
    script: Arc<Mutex<AngleScript>>,
    feed_token: Mutex<Option<CancellationToken>>,
}

impl ScriptedSource {
    /// Source holding 0.0 rad until told otherwise
    pub fn new(settings: SourceSettings) -> Self {
        Self::with_mode(settings, SourceMode::Available)
    }

    pub fn with_mode(settings: SourceSettings, mode: SourceMode) -> Self {
        Self {
            settings,
            mode,
            script: Arc::new(Mutex::new(AngleScript::default())),
            feed_token: Mutex::new(None),
        }
    }

    /// Drops any queued or looping script and holds `angle`
    pub fn set_angle(&self, angle: f64) {
        let mut script = lock(&self.script);
        script.queue.clear();
        script.looped.clear();
        script.held = angle;
    }

    /// Appends angles to play back one per sample
    pub fn queue_angles(&self, angles: impl IntoIterator<Item = f64>) {
        lock(&self.script).queue.extend(angles);
    }

    /// Replays `angles` forever once the queue is empty
    pub fn loop_script(&self, angles: Vec<f64>) {
        lock(&self.script).looped = angles;
    }

    /// Samples needed to hold `angle` for `duration` at this source's rate
    pub fn segment(&self, angle: f64, duration: Duration) -> Vec<f64> {
        let count = (duration.as_secs_f64() * self.settings.sample_rate_hz).round() as usize;
        vec![angle; count.max(1)]
    }

    pub fn is_streaming(&self) -> bool {
        lock(&self.feed_token).is_some()
    }
}

impl OrientationSource for ScriptedSource {
    fn start(&self, sender: ReadingSender) -> Result<(), SensorError> {
        if self.mode == SourceMode::Unavailable {
            return Err(SensorError::NotAvailable);
        }

        let token = CancellationToken::new();
        if let Some(previous) = lock(&self.feed_token).replace(token.clone()) {
            previous.cancel();
        }

        let feed = SampleFeed::create(
            self.script.clone(),
            sender,
            self.settings.sample_interval(),
            self.mode,
        );

        tokio::spawn(async move {
            match feed.prime() {
                Ok(streaming) => {
                    streaming.run_feed_loop(token).await;
                }
                Err(e) => warn!("Sample feed did not start streaming: {}", e),
            }
        });

        Ok(())
    }

    fn stop(&self) {
        if let Some(token) = lock(&self.feed_token).take() {
            token.cancel();
            debug!("Scripted source stopped");
        }
    }
}
