//! Round control
//!
//! - [`models`]: cards, decks, round configuration and state
//! - [`clock`]: drift-corrected countdown
//! - [`engine`]: the round state machine and its spawned activities
//! - [`result`]: the summary taken when a round ends

pub mod clock;
pub mod engine;
pub mod models;
pub mod result;
