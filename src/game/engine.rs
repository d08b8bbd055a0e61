//! Round Engine - timed round control loop
//!
//! Owns the round state and bridges gesture events and wall-clock time into
//! score changes, feedback cues and state transitions:
//!
//! ```text
//! Idle ─start_round→ Buffer(n) ─countdown→ Playing ⇄ Paused
//!                                             │
//!                      time up / deck empty / finish_game
//!                                             ▼
//!                                          Finished
//! ```
//!
//! # Concurrency
//!
//! [`RoundEngine::start_game_loop`] spawns one round task which runs the
//! buffer countdown and then two activities side by side:
//!
//! 1. **Input activity**: consumes the gesture channel
//! 2. **Timer activity**: drift-corrected countdown, see [`RoundClock`]
//!
//! Every mutation happens under the session lock and is published as one
//! [`EngineSnapshot`] on a watch channel. A [`CancellationToken`] per round is
//! checked at every suspension point, and a generation counter keeps tasks of
//! an abandoned round from touching a newer one. Feedback cues are dispatched
//! after the lock is released.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::feedback::FeedbackDispatcher;
use crate::game::clock::RoundClock;
use crate::game::models::{Deck, EngineState, RoundConfiguration, RoundState, ScenePhase};
use crate::game::result::GameResult;
use crate::lock;
use crate::motion::classifier::GestureEvent;
use crate::motion::motion_handle::MotionHandle;

const BUFFER_STEP: Duration = Duration::from_secs(1);

/// Everything an observer needs to render the round
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub state: EngineState,
    pub round: Option<RoundState>,
    /// Most recent gesture, for transient flashes
    pub last_action: Option<GestureEvent>,
    pub warning_active: bool,
    pub result: Option<GameResult>,
}

impl Default for EngineSnapshot {
    fn default() -> Self {
        Self {
            state: EngineState::Idle,
            round: None,
            last_action: None,
            warning_active: false,
            result: None,
        }
    }
}

struct Session {
    view: EngineSnapshot,
    generation: u64,
    token: CancellationToken,
    loop_started: bool,
}

struct EngineShared {
    config: RoundConfiguration,
    motion: MotionHandle,
    feedback: FeedbackDispatcher,
    // Single consumer; held by the input activity of the running round
    events: tokio::sync::Mutex<mpsc::UnboundedReceiver<GestureEvent>>,
    session: Mutex<Session>,
    snapshot_sender: watch::Sender<EngineSnapshot>,
}

/// Cloneable handle to the round engine
///
/// All operations are synchronous and never fail; calls that do not fit the
/// current state are ignored. Spawning methods must run inside a tokio
/// runtime.
#[derive(Clone)]
pub struct RoundEngine {
    inner: Arc<EngineShared>,
}

impl RoundEngine {
    pub fn new(
        config: RoundConfiguration,
        motion: MotionHandle,
        events: mpsc::UnboundedReceiver<GestureEvent>,
        feedback: FeedbackDispatcher,
    ) -> Self {
        info!("Creating round engine with configuration: {:?}", config);

        let (snapshot_sender, _) = watch::channel(EngineSnapshot::default());

        Self {
            inner: Arc::new(EngineShared {
                config,
                motion,
                feedback,
                events: tokio::sync::Mutex::new(events),
                session: Mutex::new(Session {
                    view: EngineSnapshot::default(),
                    generation: 0,
                    token: CancellationToken::new(),
                    loop_started: false,
                }),
                snapshot_sender,
            }),
        }
    }

    pub fn config(&self) -> &RoundConfiguration {
        &self.inner.config
    }

    pub fn motion(&self) -> &MotionHandle {
        &self.inner.motion
    }

    /// Shuffles `deck` into a fresh round and enters the buffer countdown.
    ///
    /// Any loop of a previous round is cancelled first.
    pub fn start_round(&self, deck: Arc<Deck>) {
        let round = RoundState::new(deck, self.inner.config.game_duration);
        let count = self.inner.config.buffer_count();

        info!(
            "Starting round with deck '{}' ({} cards), buffer {}s",
            round.deck.title,
            round.total_cards(),
            count
        );

        let mut session = lock(&self.inner.session);
        session.token.cancel();
        session.generation += 1;
        session.token = CancellationToken::new();
        session.loop_started = false;
        session.view = EngineSnapshot {
            state: EngineState::Buffer(count),
            round: Some(round),
            ..EngineSnapshot::default()
        };
        self.inner.motion.stop_monitoring();
        self.publish(&session);
    }

    /// Spawns the loop of the current round. No-op unless a freshly started
    /// round is waiting in its buffer phase.
    pub fn start_game_loop(&self) {
        let launch = {
            let mut session = lock(&self.inner.session);
            if session.loop_started || !matches!(session.view.state, EngineState::Buffer(_)) {
                None
            } else {
                session.loop_started = true;
                Some((session.generation, session.token.clone()))
            }
        };

        match launch {
            Some((generation, token)) => {
                debug!("Spawning round loop for generation {}", generation);
                tokio::spawn(self.clone().run_round(generation, token));
            }
            None => debug!("Round loop already running or no round waiting"),
        }
    }

    pub fn pause(&self) {
        let mut session = lock(&self.inner.session);
        if session.view.state != EngineState::Playing {
            debug!("Pause ignored in state {:?}", session.view.state);
            return;
        }

        session.view.state = EngineState::Paused;
        self.inner.motion.stop_monitoring();
        self.publish(&session);
        info!("Round paused");
    }

    /// Continues a paused round; the sensor restarts and is recalibrated
    /// after the settle delay.
    pub fn resume(&self) {
        let (generation, token) = {
            let mut session = lock(&self.inner.session);
            if session.view.state != EngineState::Paused {
                debug!("Resume ignored in state {:?}", session.view.state);
                return;
            }

            session.view.state = EngineState::Playing;
            self.inner.motion.start_monitoring();
            self.publish(&session);
            (session.generation, session.token.clone())
        };

        info!("Round resumed");
        let engine = self.clone();
        tokio::spawn(async move { engine.settle_and_calibrate(generation, &token).await });
    }

    /// Pauses when the app leaves the foreground. Never resumes on its own.
    pub fn handle_scene_phase(&self, phase: ScenePhase) {
        debug!("Scene phase changed to {:?}", phase);
        if phase.is_background() && self.state() == EngineState::Playing {
            info!("App left the foreground, pausing");
            self.pause();
        }
    }

    /// Ends the current round now. Idempotent.
    pub fn finish_game(&self) {
        let mut session = lock(&self.inner.session);
        self.finish_locked(&mut session);
    }

    pub fn state(&self) -> EngineState {
        lock(&self.inner.session).view.state
    }

    pub fn round(&self) -> Option<RoundState> {
        lock(&self.inner.session).view.round.clone()
    }

    pub fn last_action(&self) -> Option<GestureEvent> {
        lock(&self.inner.session).view.last_action
    }

    pub fn is_warning_active(&self) -> bool {
        lock(&self.inner.session).view.warning_active
    }

    pub fn result(&self) -> Option<GameResult> {
        lock(&self.inner.session).view.result.clone()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        lock(&self.inner.session).view.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.inner.snapshot_sender.subscribe()
    }

    fn publish(&self, session: &Session) {
        self.inner.snapshot_sender.send_if_modified(|current| {
            if *current == session.view {
                false
            } else {
                *current = session.view.clone();
                true
            }
        });
    }

    fn finish_locked(&self, session: &mut Session) {
        if session.view.state == EngineState::Finished {
            debug!("Round already finished");
            return;
        }

        session.view.result = session.view.round.as_ref().map(GameResult::from_round);
        session.token.cancel();
        self.inner.motion.stop_monitoring();
        session.view.state = EngineState::Finished;
        self.publish(session);

        match &session.view.result {
            Some(result) => info!(
                "Round finished: score {}, passed {}, rank {:?}",
                result.score,
                result.passed,
                result.rank()
            ),
            None => info!("Finished without a round"),
        }
    }

    /// Finish triggered from inside a round's own tasks
    fn finish_round(&self, generation: u64) {
        let mut session = lock(&self.inner.session);
        if session.generation != generation {
            debug!("Stale finish for generation {} ignored", generation);
            return;
        }
        self.finish_locked(&mut session);
    }

    async fn run_round(self, generation: u64, token: CancellationToken) {
        if !self.run_buffer(generation, &token).await {
            debug!("Round {} cancelled during buffer", generation);
            return;
        }

        {
            let mut session = lock(&self.inner.session);
            if session.generation != generation || token.is_cancelled() {
                return;
            }
            session.view.state = EngineState::Playing;
            self.publish(&session);
        }
        info!("Round {} playing", generation);

        let (ready_sender, ready_receiver) = oneshot::channel();
        let input = tokio::spawn(
            self.clone()
                .run_input_activity(generation, token.clone(), ready_sender),
        );

        tokio::select! {
            _ = token.cancelled() => {}
            _ = ready_receiver => {}
        }

        {
            let session = lock(&self.inner.session);
            if session.generation == generation && session.view.state == EngineState::Playing {
                self.inner.motion.start_monitoring();
            } else {
                debug!("Round {} left play before monitoring started", generation);
            }
        }
        self.settle_and_calibrate(generation, &token).await;

        self.run_timer_activity(generation, &token).await;

        token.cancel();
        if let Err(e) = input.await {
            warn!("Input activity ended abnormally: {}", e);
        }
        debug!("Round {} loop exited", generation);
    }

    /// Counts the buffer down once per second. `false` if the round was
    /// cancelled or replaced meanwhile.
    async fn run_buffer(&self, generation: u64, token: &CancellationToken) -> bool {
        loop {
            {
                let session = lock(&self.inner.session);
                if session.generation != generation {
                    return false;
                }
                match session.view.state {
                    EngineState::Buffer(0) => return !token.is_cancelled(),
                    EngineState::Buffer(_) => {}
                    _ => return false,
                }
            }

            tokio::select! {
                _ = token.cancelled() => return false,
                _ = sleep(BUFFER_STEP) => {}
            }

            let mut session = lock(&self.inner.session);
            if session.generation != generation || token.is_cancelled() {
                return false;
            }
            if let EngineState::Buffer(count) = session.view.state {
                session.view.state = EngineState::Buffer(count.saturating_sub(1));
                debug!("Buffer countdown: {}", count.saturating_sub(1));
                self.publish(&session);
            }
        }
    }

    /// Lets the sensor deliver a few samples, then captures the baseline
    async fn settle_and_calibrate(&self, generation: u64, token: &CancellationToken) {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = sleep(self.inner.config.settle()) => {}
        }

        let session = lock(&self.inner.session);
        if session.generation != generation || session.view.state != EngineState::Playing {
            debug!("Calibration skipped, round no longer playing");
            return;
        }
        if !self.inner.motion.calibrate() {
            warn!("Calibration failed, no orientation samples; gestures disabled this round");
        }
    }

    async fn run_input_activity(
        self,
        generation: u64,
        token: CancellationToken,
        ready: oneshot::Sender<()>,
    ) {
        let mut events = tokio::select! {
            _ = token.cancelled() => return,
            guard = self.inner.events.lock() => guard,
        };

        let mut stale = 0;
        while events.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!("Discarded {} gesture events from an earlier round", stale);
        }
        let _ = ready.send(());

        loop {
            let event = tokio::select! {
                biased;

                _ = token.cancelled() => break,

                event = events.recv() => match event {
                    Some(event) => event,
                    None => {
                        warn!("Gesture channel closed, no more input this round");
                        break;
                    }
                },
            };

            self.handle_input(generation, event);
        }

        debug!("Input activity for round {} stopped", generation);
    }

    fn handle_input(&self, generation: u64, event: GestureEvent) {
        let exhausted = {
            let mut session = lock(&self.inner.session);
            if session.generation != generation || session.view.state != EngineState::Playing {
                debug!("Gesture {:?} ignored outside of play", event);
                return;
            }

            let exhausted = match session.view.round.as_mut() {
                Some(round) if round.current_card.is_some() => !round.record(event),
                _ => {
                    debug!("Gesture {:?} ignored, no card in play", event);
                    return;
                }
            };

            session.view.last_action = Some(event);
            self.publish(&session);
            exhausted
        };

        info!("Gesture {:?} recorded", event);
        match event {
            GestureEvent::Correct => self.inner.feedback.play_success_cue(),
            GestureEvent::Pass => self.inner.feedback.play_pass_cue(),
        }

        if exhausted {
            info!("Deck exhausted, ending round early");
            self.finish_round(generation);
        }
    }

    async fn run_timer_activity(&self, generation: u64, token: &CancellationToken) {
        let tick = self.inner.config.tick();
        let mut clock = RoundClock::new(self.inner.config.warning_threshold, Instant::now());

        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = sleep(tick) => {}
            }

            let now = Instant::now();
            let outcome = {
                let mut session = lock(&self.inner.session);
                if session.generation != generation || token.is_cancelled() {
                    return;
                }

                match session.view.state {
                    EngineState::Paused => {
                        clock.checkpoint(now);
                        continue;
                    }
                    EngineState::Playing => {}
                    _ => return,
                }

                let Some(round) = session.view.round.as_mut() else {
                    return;
                };
                let outcome = clock.tick(now, round);

                if outcome.warning {
                    session.view.warning_active = true;
                }
                self.publish(&session);
                outcome
            };

            if outcome.warning {
                info!("Warning threshold reached");
                self.inner.feedback.play_warning_cue();
            }

            if outcome.expired {
                info!("Time is up");
                self.finish_round(generation);
                return;
            }
        }
    }
}
