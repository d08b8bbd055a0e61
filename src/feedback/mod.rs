//! Feedback dispatch
//!
//! Audio and haptic players are external collaborators. The engine only
//! needs each cue to be *requested*; a failing sink is logged and otherwise
//! ignored so it can never stall gameplay.

pub mod tracing_sinks;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Gameplay moment that deserves a cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedbackKind {
    Success,
    Pass,
    Warning,
}

impl FeedbackKind {
    /// Name of the sound asset for this cue
    pub fn sound_name(&self) -> &'static str {
        match self {
            FeedbackKind::Success => "success",
            FeedbackKind::Pass => "pass",
            FeedbackKind::Warning => "warning",
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sound_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedbackError {
    #[error("Cue asset missing: {0}")]
    AssetMissing(String),

    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    #[error("Feedback unsupported on this device")]
    Unsupported,
}

pub trait AudioSink: Send + Sync {
    fn play_sound(&self, cue: FeedbackKind) -> Result<(), FeedbackError>;
}

pub trait HapticSink: Send + Sync {
    fn play_feedback(&self, cue: FeedbackKind) -> Result<(), FeedbackError>;
}

/// Per-channel toggles
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackSettings {
    pub sound_enabled: bool,
    pub haptics_enabled: bool,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            haptics_enabled: true,
        }
    }
}

/// Sends each cue to the audio and the haptic sink independently
#[derive(Clone)]
pub struct FeedbackDispatcher {
    audio: Arc<dyn AudioSink>,
    haptics: Arc<dyn HapticSink>,
    settings: FeedbackSettings,
}

impl FeedbackDispatcher {
    pub fn new(
        audio: Arc<dyn AudioSink>,
        haptics: Arc<dyn HapticSink>,
        settings: FeedbackSettings,
    ) -> Self {
        Self {
            audio,
            haptics,
            settings,
        }
    }

    pub fn settings(&self) -> &FeedbackSettings {
        &self.settings
    }

    pub fn play_success_cue(&self) {
        self.dispatch(FeedbackKind::Success);
    }

    pub fn play_pass_cue(&self) {
        self.dispatch(FeedbackKind::Pass);
    }

    pub fn play_warning_cue(&self) {
        self.dispatch(FeedbackKind::Warning);
    }

    pub fn dispatch(&self, cue: FeedbackKind) {
        debug!("Dispatching {} cue", cue);

        if self.settings.sound_enabled {
            if let Err(e) = self.audio.play_sound(cue) {
                warn!("Audio cue {} failed: {}", cue, e);
            }
        }

        if self.settings.haptics_enabled {
            if let Err(e) = self.haptics.play_feedback(cue) {
                warn!("Haptic cue {} failed: {}", cue, e);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use crate::lock;
    use std::sync::Mutex;

    /// Sink double that remembers every cue it was asked to play
    #[derive(Default)]
    pub struct RecordingSink {
        cues: Mutex<Vec<FeedbackKind>>,
        fail_with: Option<FeedbackError>,
    }

    impl RecordingSink {
        pub fn failing(err: FeedbackError) -> Self {
            Self {
                cues: Mutex::new(Vec::new()),
                fail_with: Some(err),
            }
        }

        pub fn cues(&self) -> Vec<FeedbackKind> {
            lock(&self.cues).clone()
        }

        pub fn count(&self, cue: FeedbackKind) -> usize {
            lock(&self.cues).iter().filter(|c| **c == cue).count()
        }

        fn record(&self, cue: FeedbackKind) -> Result<(), FeedbackError> {
            lock(&self.cues).push(cue);
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    impl AudioSink for RecordingSink {
        fn play_sound(&self, cue: FeedbackKind) -> Result<(), FeedbackError> {
            self.record(cue)
        }
    }

    impl HapticSink for RecordingSink {
        fn play_feedback(&self, cue: FeedbackKind) -> Result<(), FeedbackError> {
            self.record(cue)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::recording::RecordingSink;
    use super::*;

    #[test]
    fn each_cue_reaches_both_sinks() {
        let audio = Arc::new(RecordingSink::default());
        let haptics = Arc::new(RecordingSink::default());
        let dispatcher =
            FeedbackDispatcher::new(audio.clone(), haptics.clone(), FeedbackSettings::default());

        dispatcher.play_success_cue();
        dispatcher.play_pass_cue();
        dispatcher.play_warning_cue();

        let expected = vec![
            FeedbackKind::Success,
            FeedbackKind::Pass,
            FeedbackKind::Warning,
        ];
        assert_eq!(audio.cues(), expected);
        assert_eq!(haptics.cues(), expected);
    }

    #[test]
    fn failing_audio_does_not_block_haptics() {
        let audio = Arc::new(RecordingSink::failing(FeedbackError::AssetMissing(
            "success.wav".to_string(),
        )));
        let haptics = Arc::new(RecordingSink::default());
        let dispatcher =
            FeedbackDispatcher::new(audio.clone(), haptics.clone(), FeedbackSettings::default());

        dispatcher.play_success_cue();

        assert_eq!(audio.count(FeedbackKind::Success), 1);
        assert_eq!(haptics.cues(), vec![FeedbackKind::Success]);
    }

    #[test]
    fn unsupported_haptics_do_not_block_audio() {
        let audio = Arc::new(RecordingSink::default());
        let haptics = Arc::new(RecordingSink::failing(FeedbackError::Unsupported));
        let dispatcher =
            FeedbackDispatcher::new(audio.clone(), haptics.clone(), FeedbackSettings::default());

        dispatcher.play_pass_cue();
        dispatcher.play_warning_cue();

        assert_eq!(audio.cues(), vec![FeedbackKind::Pass, FeedbackKind::Warning]);
        assert_eq!(haptics.cues().len(), 2);
    }

    #[test]
    fn both_sinks_failing_is_swallowed() {
        let audio = Arc::new(RecordingSink::failing(FeedbackError::PlaybackFailed(
            "audio session interrupted".to_string(),
        )));
        let haptics = Arc::new(RecordingSink::failing(FeedbackError::Unsupported));
        let dispatcher =
            FeedbackDispatcher::new(audio.clone(), haptics.clone(), FeedbackSettings::default());

        dispatcher.play_success_cue();
        dispatcher.play_success_cue();

        assert_eq!(audio.count(FeedbackKind::Success), 2);
        assert_eq!(haptics.count(FeedbackKind::Success), 2);
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            FeedbackError::PlaybackFailed("busy".to_string()).to_string(),
            "Playback failed: busy"
        );
        assert_eq!(
            FeedbackError::AssetMissing("pass.wav".to_string()).to_string(),
            "Cue asset missing: pass.wav"
        );
        assert_eq!(
            FeedbackError::Unsupported.to_string(),
            "Feedback unsupported on this device"
        );
    }

    #[test]
    fn muted_sound_still_plays_haptics() {
        let audio = Arc::new(RecordingSink::default());
        let haptics = Arc::new(RecordingSink::default());
        let settings = FeedbackSettings {
            sound_enabled: false,
            haptics_enabled: true,
        };
        let dispatcher = FeedbackDispatcher::new(audio.clone(), haptics.clone(), settings);

        dispatcher.play_warning_cue();

        assert!(audio.cues().is_empty());
        assert_eq!(haptics.cues(), vec![FeedbackKind::Warning]);
    }

    #[test]
    fn sound_names() {
        assert_eq!(FeedbackKind::Success.sound_name(), "success");
        assert_eq!(FeedbackKind::Pass.to_string(), "pass");
        assert_eq!(FeedbackKind::Warning.sound_name(), "warning");
    }
}
