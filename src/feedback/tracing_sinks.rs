//! Sinks that only log, for headless runs
//!
//! Stand-ins for a real audio player and vibration motor when the crate runs
//! without a device, e.g. in the demo binary.

use chrono::Local;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use super::{AudioSink, FeedbackError, FeedbackKind, HapticSink};

#[derive(Debug, Default)]
pub struct TracingAudioSink {
    played: AtomicU64,
}

impl TracingAudioSink {
    pub fn played(&self) -> u64 {
        self.played.load(Ordering::Relaxed)
    }
}

impl AudioSink for TracingAudioSink {
    fn play_sound(&self, cue: FeedbackKind) -> Result<(), FeedbackError> {
        self.played.fetch_add(1, Ordering::Relaxed);
        info!(
            "Audio cue '{}.wav' at {}",
            cue.sound_name(),
            Local::now().format("%H:%M:%S.%3f")
        );
        Ok(())
    }
}

/// Haptic pattern names follow the usual phone vocabulary
#[derive(Debug, Default)]
pub struct TracingHapticSink {
    played: AtomicU64,
}

impl TracingHapticSink {
    pub fn played(&self) -> u64 {
        self.played.load(Ordering::Relaxed)
    }
}

impl HapticSink for TracingHapticSink {
    fn play_feedback(&self, cue: FeedbackKind) -> Result<(), FeedbackError> {
        self.played.fetch_add(1, Ordering::Relaxed);
        let pattern = match cue {
            FeedbackKind::Success => "impact(heavy)",
            FeedbackKind::Pass => "impact(rigid)",
            FeedbackKind::Warning => "notification(warning)",
        };
        info!("Haptic {} for {} cue", pattern, cue);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_played_cues() {
        let audio = TracingAudioSink::default();
        let haptics = TracingHapticSink::default();

        audio.play_sound(FeedbackKind::Success).unwrap();
        audio.play_sound(FeedbackKind::Warning).unwrap();
        haptics.play_feedback(FeedbackKind::Pass).unwrap();

        assert_eq!(audio.played(), 2);
        assert_eq!(haptics.played(), 1);
    }
}
