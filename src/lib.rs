//! teledash: a real-time telemetry dashboard engine
//!
//! This library provides the data model a telemetry dashboard renders from,
//! including:
//! - Frame classification and widget model reconfiguration
//! - Value fan-out from dataset identities to every live widget copy
//! - Bounded time-series buffers (plots, multiplots, FFT, GPS, 3D)
//! - Action timers and coalesced refresh notifications
//! - Configuration management

pub mod config;
pub mod core;
pub mod sources;

// Re-export commonly used types
pub use config::DashboardConfig;
pub use core::{Dashboard, DashboardEvent};
pub use teledash_types as types;
