//! Tilt gesture classification
//!
//! Pure state machine that turns tilt samples (radians) into debounced
//! [`GestureEvent`]s. The classifier knows nothing about sensors or tasks:
//! [`GestureClassifier::process_sample`] is the complete transition function,
//! so it can be driven directly from tests or from the sample pump in
//! [`super::motion_handle`].
//!
//! ```text
//!            delta > trigger            |delta| >= neutral
//! Neutral ─────────────────► Triggered ───────────────────► Debouncing
//!    ▲       delta < -trigger     │                              │
//!    └────────────────────────────┴──────────────────────────────┘
//!                       |delta| < neutral
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Discrete gameplay decision produced by a tilt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GestureEvent {
    /// Tilt forward past the trigger threshold (screen towards the floor)
    Correct,
    /// Tilt backward past the trigger threshold (screen towards the ceiling)
    Pass,
}

/// Debounce state of the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierState {
    Neutral,
    Triggered(GestureEvent),
    Debouncing,
}

/// Why a resting position was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidReason {
    TiltOutOfRange { angle: f64 },
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::TiltOutOfRange { angle } => {
                write!(f, "device tilted {:.2} rad away from upright", angle)
            }
        }
    }
}

/// Whether samples are trusted for classification
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationState {
    NotStarted,
    Checking,
    Valid,
    Invalid(InvalidReason),
}

/// Tunable thresholds, all in radians
///
/// The defaults come from play-testing with the device on the forehead and
/// are expected to move, which is why they are configuration rather than
/// constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Delta from baseline that fires an event (strictly greater)
    pub trigger_threshold: f64,

    /// Delta from baseline below which the classifier re-arms (strictly less)
    pub neutral_threshold: f64,

    /// Largest absolute tilt accepted by the position check
    pub max_resting_tilt: f64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            trigger_threshold: 0.785, // ~45°
            neutral_threshold: 0.20,
            max_resting_tilt: 0.6,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GestureClassifier {
    settings: ClassifierSettings,
    state: ClassifierState,
    calibration: CalibrationState,
    baseline: Option<f64>,
    live_angle: Option<f64>,
}

impl GestureClassifier {
    pub fn new(settings: ClassifierSettings) -> Self {
        debug!("Creating GestureClassifier with settings: {:?}", settings);
        Self {
            settings,
            state: ClassifierState::Neutral,
            calibration: CalibrationState::NotStarted,
            baseline: None,
            live_angle: None,
        }
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    pub fn state(&self) -> ClassifierState {
        self.state
    }

    pub fn calibration_state(&self) -> &CalibrationState {
        &self.calibration
    }

    pub fn baseline(&self) -> Option<f64> {
        self.baseline
    }

    /// Most recent sample, classified or not
    pub fn live_angle(&self) -> Option<f64> {
        self.live_angle
    }

    /// Captures the live angle as the neutral position.
    ///
    /// Returns `false` and leaves everything untouched when no sample has
    /// arrived yet.
    pub fn calibrate(&mut self) -> bool {
        let Some(angle) = self.live_angle else {
            warn!("Calibration requested before any orientation sample arrived");
            return false;
        };

        self.baseline = Some(angle);
        self.state = ClassifierState::Neutral;
        self.calibration = CalibrationState::Valid;
        info!("Calibrated baseline at {:.3} rad", angle);
        true
    }

    /// Checks whether the device is held close enough to upright to calibrate.
    ///
    /// Does not calibrate; a `Valid` calibration is left as is.
    pub fn validate_position(&mut self) -> bool {
        if self.calibration == CalibrationState::Valid {
            return true;
        }

        match self.live_angle {
            None => {
                self.calibration = CalibrationState::Checking;
                false
            }
            Some(angle) if angle.abs() > self.settings.max_resting_tilt => {
                debug!("Position rejected at {:.3} rad", angle);
                self.calibration = CalibrationState::Invalid(InvalidReason::TiltOutOfRange { angle });
                false
            }
            Some(_) => {
                self.calibration = CalibrationState::Checking;
                true
            }
        }
    }

    /// Feeds one sample through the state machine.
    ///
    /// Returns the event emitted by this sample, if any. Before calibration
    /// the sample only updates the live angle.
    pub fn process_sample(&mut self, angle: f64) -> Option<GestureEvent> {
        self.live_angle = Some(angle);

        let baseline = match (&self.calibration, self.baseline) {
            (CalibrationState::Valid, Some(baseline)) => baseline,
            _ => return None,
        };

        let delta = angle - baseline;

        match self.state {
            ClassifierState::Neutral => {
                let event = if delta > self.settings.trigger_threshold {
                    GestureEvent::Correct
                } else if delta < -self.settings.trigger_threshold {
                    GestureEvent::Pass
                } else {
                    return None;
                };

                info!("Gesture {:?} at delta {:.3} rad", event, delta);
                self.state = ClassifierState::Triggered(event);
                Some(event)
            }
            ClassifierState::Triggered(_) | ClassifierState::Debouncing => {
                if delta.abs() < self.settings.neutral_threshold {
                    debug!("Returned to neutral at delta {:.3} rad", delta);
                    self.state = ClassifierState::Neutral;
                } else {
                    self.state = ClassifierState::Debouncing;
                }
                None
            }
        }
    }

    /// Back to the uncalibrated, neutral state
    pub fn reset(&mut self) {
        self.state = ClassifierState::Neutral;
        self.calibration = CalibrationState::NotStarted;
        self.baseline = None;
        self.live_angle = None;
    }
}
