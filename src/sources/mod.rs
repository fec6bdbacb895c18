//! Built-in demo sources and sinks
//!
//! The engine consumes frames and collaborators through traits; real
//! deployments plug in a serial/MQTT/file transport. This module provides
//! the implementations used by the demo binary and by benchmarks: a
//! synthetic telemetry generator, a logging transport sink and a static
//! license gate.

mod sink;
mod synth;

pub use sink::{ConsoleSink, StaticLicense};
pub use synth::{SynthConfig, SynthSource};
