//! Tiltdeck: gesture classification and round control for a forehead-card
//! party game.
//!
//! One player holds the device against their forehead while the others give
//! hints. Tilting forward counts the card as guessed, tilting backward passes
//! it. [`motion`] turns orientation samples into gestures, [`game`] runs the
//! timed round and [`feedback`] plays the cues.

pub mod config;
pub mod feedback;
pub mod game;
pub mod motion;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `mutex`, recovering the data if another holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
