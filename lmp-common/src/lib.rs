//! # LMP Common Library
//!
//! Shared code for the LMP media player:
//! - Error type used across crates
//! - Configuration loading and resolution
//! - Event types (LmpEvent enum) and the event bus
//! - SSE stream helpers
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
pub use events::{EventBus, LmpEvent};
