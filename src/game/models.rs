//! Round data: cards, decks, configuration and the mutable round state

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::motion::classifier::GestureEvent;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub text: String,
}

impl Card {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Source deck. The engine shuffles a working copy and never mutates this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub id: String,
    pub title: String,
    pub cards: Vec<Card>,
}

impl Deck {
    pub fn new(id: impl Into<String>, title: impl Into<String>, cards: Vec<Card>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            cards,
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

const DEFAULT_TICK: Duration = Duration::from_millis(100);
const MIN_TICK: Duration = Duration::from_millis(1);

/// Timing of a round, in seconds
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfiguration {
    /// Get-ready countdown before play; rounded up to whole seconds
    pub buffer_duration: f64,

    /// Playing time
    pub game_duration: f64,

    /// Remaining time at which the warning cue fires
    pub warning_threshold: f64,

    /// Nominal countdown tick; the decrement is the measured elapsed time
    pub tick_interval: f64,

    /// Wait between starting the sensor and capturing the baseline
    pub settle_delay: f64,
}

impl Default for RoundConfiguration {
    fn default() -> Self {
        Self {
            buffer_duration: 3.0,
            game_duration: 60.0,
            warning_threshold: 10.0,
            tick_interval: 0.1,
            settle_delay: 0.1,
        }
    }
}

impl RoundConfiguration {
    /// Whole seconds of buffer countdown
    pub fn buffer_count(&self) -> u32 {
        self.buffer_duration.max(0.0).ceil() as u32
    }

    /// Countdown tick, at least 1 ms; unusable values fall back to 100 ms
    pub fn tick(&self) -> Duration {
        Duration::try_from_secs_f64(self.tick_interval)
            .unwrap_or(DEFAULT_TICK)
            .max(MIN_TICK)
    }

    /// Settle delay; unusable values mean no delay
    pub fn settle(&self) -> Duration {
        Duration::try_from_secs_f64(self.settle_delay).unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    /// Seconds left in the get-ready countdown
    Buffer(u32),
    Playing,
    Paused,
    Finished,
}

/// Host application lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenePhase {
    Active,
    Inactive,
    Background,
}

impl ScenePhase {
    /// Anything but `Active` means the player can no longer see the screen
    pub fn is_background(&self) -> bool {
        !matches!(self, ScenePhase::Active)
    }
}

/// Progress of one round
///
/// `remaining_cards` is in play order with the next card at the back.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundState {
    pub score: u32,
    pub passed: u32,
    pub time_remaining: f64,
    pub current_card: Option<Card>,
    pub remaining_cards: Vec<Card>,
    pub deck: Arc<Deck>,
}

impl RoundState {
    /// Shuffles the deck with the thread RNG and deals the first card
    pub fn new(deck: Arc<Deck>, time_remaining: f64) -> Self {
        Self::shuffled(deck, time_remaining, &mut rand::rng())
    }

    pub fn shuffled<R: Rng + ?Sized>(deck: Arc<Deck>, time_remaining: f64, rng: &mut R) -> Self {
        let mut remaining_cards = deck.cards.clone();
        remaining_cards.shuffle(rng);
        let current_card = remaining_cards.pop();

        Self {
            score: 0,
            passed: 0,
            time_remaining: time_remaining.max(0.0),
            current_card,
            remaining_cards,
            deck,
        }
    }

    /// Counts the gesture against the current card and deals the next one.
    ///
    /// Returns `false` once the working copy is exhausted, leaving
    /// `current_card` empty.
    pub fn record(&mut self, event: GestureEvent) -> bool {
        match event {
            GestureEvent::Correct => self.score += 1,
            GestureEvent::Pass => self.passed += 1,
        }
        self.advance()
    }

    fn advance(&mut self) -> bool {
        self.current_card = self.remaining_cards.pop();
        self.current_card.is_some()
    }

    pub fn total_cards(&self) -> usize {
        self.deck.len()
    }
}

#[cfg(test)]
pub(crate) mod factories {
    use super::*;

    pub fn deck_of(count: usize) -> Arc<Deck> {
        let cards = (0..count)
            .map(|i| Card::new(format!("card-{i}"), format!("Word {i}")))
            .collect();
        Arc::new(Deck::new("test", "Test Deck", cards))
    }
}
