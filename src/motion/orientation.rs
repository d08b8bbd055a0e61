//! Orientation source seam
//!
//! The platform sensor is an external collaborator. It pushes
//! [`SensorReading`]s into the channel it is handed on start; the
//! [`super::motion_handle::MotionHandle`] pump is the only consumer, so a
//! source may deliver from any thread.

use tokio::sync::mpsc;

/// Sensor-layer failures
///
/// None of these are fatal to a round: they are reported on the motion
/// error channel and the round keeps running on its timer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    #[error("Motion sensor access was denied")]
    PermissionDenied,

    #[error("Motion sensor is not available on this device")]
    NotAvailable,

    #[error("Motion sensor error: {0}")]
    Unknown(String),
}

/// One item pushed by a source
#[derive(Debug, Clone, PartialEq)]
pub enum SensorReading {
    /// Tilt angle in radians
    Sample(f64),
    /// Runtime fault, e.g. access revoked while streaming
    Fault(SensorError),
}

pub type ReadingSender = mpsc::UnboundedSender<SensorReading>;

/// Push-based tilt sensor
pub trait OrientationSource: Send + Sync {
    /// Begins delivering readings into `sender` at the source's own cadence.
    ///
    /// An error means the sensor never started; nothing will be sent.
    fn start(&self, sender: ReadingSender) -> Result<(), SensorError>;

    /// Stops delivery. Must be safe to call when not started.
    fn stop(&self);
}
