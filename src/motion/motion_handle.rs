//! Motion Handle - monitoring lifecycle around the gesture classifier
//!
//! Connects an [`OrientationSource`] to a [`GestureClassifier`] and publishes
//! the results on two independent channels:
//!
//! ```text
//! OrientationSource ─[SensorReading]→ sample pump ─→ GestureClassifier
//!                    (mpsc, any thread)     │                 │
//!                                           ▼                 ▼
//!                                  errors: SensorError   events: GestureEvent
//! ```
//!
//! The classifier is owned here; other components only reach it through
//! [`MotionHandle::start_monitoring`], [`MotionHandle::stop_monitoring`] and
//! [`MotionHandle::calibrate`].

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::lock;
use crate::motion::classifier::{
    CalibrationState, ClassifierSettings, ClassifierState, GestureClassifier, GestureEvent,
};
use crate::motion::orientation::{OrientationSource, SensorError, SensorReading};

/// Consumer ends of the motion channels
///
/// Each receiver has exactly one logical consumer: the round engine takes
/// `events`, the UI layer takes `errors`.
#[derive(Debug)]
pub struct MotionChannels {
    pub events: mpsc::UnboundedReceiver<GestureEvent>,
    pub errors: mpsc::UnboundedReceiver<SensorError>,
}

struct MotionShared {
    source: Arc<dyn OrientationSource>,
    classifier: Mutex<GestureClassifier>,
    event_sender: mpsc::UnboundedSender<GestureEvent>,
    error_sender: mpsc::UnboundedSender<SensorError>,
    // Present while monitoring; cancels the sample pump
    pump_token: Mutex<Option<CancellationToken>>,
}

/// Cloneable handle to the gesture pipeline
#[derive(Clone)]
pub struct MotionHandle {
    inner: Arc<MotionShared>,
}

impl MotionHandle {
    pub fn new(
        source: Arc<dyn OrientationSource>,
        settings: ClassifierSettings,
    ) -> (Self, MotionChannels) {
        info!("Creating motion handle with settings: {:?}", settings);

        let (event_sender, events) = mpsc::unbounded_channel();
        let (error_sender, errors) = mpsc::unbounded_channel();

        let handle = Self {
            inner: Arc::new(MotionShared {
                source,
                classifier: Mutex::new(GestureClassifier::new(settings)),
                event_sender,
                error_sender,
                pump_token: Mutex::new(None),
            }),
        };

        (handle, MotionChannels { events, errors })
    }

    /// Starts sample delivery. No-op while already monitoring.
    ///
    /// A source that fails to start is reported on the error channel; the
    /// classifier state is not touched. Must be called inside a tokio runtime.
    pub fn start_monitoring(&self) {
        let mut pump_token = lock(&self.inner.pump_token);
        if pump_token.is_some() {
            debug!("Motion monitoring already active");
            return;
        }

        let (reading_sender, reading_receiver) = mpsc::unbounded_channel();
        if let Err(e) = self.inner.source.start(reading_sender) {
            warn!("Failed to start orientation source: {}", e);
            self.report_error(e);
            return;
        }

        let token = CancellationToken::new();
        tokio::spawn(run_sample_pump(
            self.clone(),
            reading_receiver,
            token.clone(),
        ));
        *pump_token = Some(token);
        info!("Motion monitoring started");
    }

    /// Stops sample delivery and resets the classifier to uncalibrated neutral
    pub fn stop_monitoring(&self) {
        // Held across cancel and reset so an in-flight pumped sample lands
        // either before both or not at all
        let mut classifier = lock(&self.inner.classifier);

        if let Some(token) = lock(&self.inner.pump_token).take() {
            token.cancel();
            self.inner.source.stop();
            info!("Motion monitoring stopped");
        }

        classifier.reset();
    }

    pub fn is_monitoring(&self) -> bool {
        lock(&self.inner.pump_token).is_some()
    }

    /// Uses the latest sample as baseline. `false` if none has arrived yet.
    pub fn calibrate(&self) -> bool {
        lock(&self.inner.classifier).calibrate()
    }

    pub fn validate_position(&self) -> bool {
        lock(&self.inner.classifier).validate_position()
    }

    /// Classifies one sample and publishes the resulting event, if any
    pub fn process_sample(&self, angle: f64) -> Option<GestureEvent> {
        let event = lock(&self.inner.classifier).process_sample(angle);
        self.publish_event(event)
    }

    /// Pump path: drops the sample if monitoring stopped while it was queued
    fn process_pumped_sample(&self, angle: f64, token: &CancellationToken) -> Option<GestureEvent> {
        let event = {
            let mut classifier = lock(&self.inner.classifier);
            if token.is_cancelled() {
                debug!("Sample {:.3} dropped after stop", angle);
                return None;
            }
            classifier.process_sample(angle)
        };
        self.publish_event(event)
    }

    fn publish_event(&self, event: Option<GestureEvent>) -> Option<GestureEvent> {
        if let Some(event) = event {
            if self.inner.event_sender.send(event).is_err() {
                debug!("Gesture event {:?} dropped, no consumer attached", event);
            }
        }

        event
    }

    pub fn classifier_state(&self) -> ClassifierState {
        lock(&self.inner.classifier).state()
    }

    pub fn calibration_state(&self) -> CalibrationState {
        lock(&self.inner.classifier).calibration_state().clone()
    }

    pub fn live_angle(&self) -> Option<f64> {
        lock(&self.inner.classifier).live_angle()
    }

    pub fn baseline(&self) -> Option<f64> {
        lock(&self.inner.classifier).baseline()
    }

    fn report_error(&self, err: SensorError) {
        if self.inner.error_sender.send(err).is_err() {
            debug!("Sensor error dropped, no consumer attached");
        }
    }
}

async fn run_sample_pump(
    handle: MotionHandle,
    mut readings: mpsc::UnboundedReceiver<SensorReading>,
    token: CancellationToken,
) {
    debug!("Sample pump running");

    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => break,

            reading = readings.recv() => match reading {
                Some(SensorReading::Sample(angle)) => {
                    handle.process_pumped_sample(angle, &token);
                }
                Some(SensorReading::Fault(e)) => {
                    error!("Orientation source fault: {}", e);
                    handle.report_error(e);
                }
                None => {
                    warn!("Orientation source closed its channel");
                    break;
                }
            }
        }
    }

    debug!("Sample pump stopped");
}
