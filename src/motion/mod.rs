//! Motion pipeline
//!
//! - [`orientation`]: the sensor abstraction and its error type
//! - [`classifier`]: tilt deltas to gesture events
//! - [`motion_handle`]: monitoring lifecycle and the output channels
//! - [`scripted_source`]: a sensor stand-in fed from a script

pub mod classifier;
pub mod motion_handle;
pub mod orientation;
pub mod scripted_source;
