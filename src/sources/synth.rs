//! Synthetic telemetry source for demos and benchmarks
//!
//! Generates structurally stable frames with oscillating values: a bank of
//! sine channels, an accelerometer group and an orbiting GPS fix. The shape
//! only changes when the configuration does, which makes this a convenient
//! driver for the value-only hot path.

use std::f64::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};
use teledash_types::{Action, Dataset, Frame, Group, TimerMode};

/// Configuration for the synthetic source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    /// Number of sine channels in the signal group
    pub channels: usize,
    /// Oscillation period in frames
    pub period: f64,
    /// Peak amplitude of the sine channels
    pub amplitude: f64,
    /// Uniform noise added to every sample
    pub noise: f64,
    /// Include an accelerometer group
    pub accelerometer: bool,
    /// Include a GPS group
    pub gps: bool,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            channels: 4,
            period: 120.0,
            amplitude: 10.0,
            noise: 0.2,
            accelerometer: true,
            gps: true,
        }
    }
}

/// Frame generator with a stable structure and oscillating values.
pub struct SynthSource {
    config: SynthConfig,
    tick: u64,
}

impl SynthSource {
    pub fn new(config: SynthConfig) -> Self {
        Self { config, tick: 0 }
    }

    /// Produce the next frame.
    pub fn next_frame(&mut self) -> Frame {
        let mut rng = rand::thread_rng();
        let cfg = &self.config;
        let phase = TAU * self.tick as f64 / cfg.period;
        self.tick += 1;

        let mut groups = Vec::new();
        let mut next_id = 1u32;

        let mut signals = Group {
            group_id: 0,
            title: "Signals".to_string(),
            widget: String::new(),
            datasets: Vec::new(),
        };
        for channel in 0..cfg.channels {
            let offset = channel as f64 * TAU / cfg.channels.max(1) as f64;
            let value = cfg.amplitude * (phase + offset).sin()
                + rng.gen_range(-cfg.noise..=cfg.noise);
            signals.datasets.push(Dataset {
                unique_id: next_id,
                title: format!("Sine {channel}"),
                value: format!("{value:.4}"),
                units: "V".to_string(),
                min: -cfg.amplitude,
                max: cfg.amplitude,
                graph: true,
                ..Dataset::default()
            });
            next_id += 1;
        }
        groups.push(signals);

        if cfg.accelerometer {
            let mut accel = Group {
                group_id: groups.len() as u32,
                title: "Attitude".to_string(),
                widget: "accelerometer".to_string(),
                datasets: Vec::new(),
            };
            for (tag, offset) in [("x", 0.0), ("y", TAU / 3.0), ("z", 2.0 * TAU / 3.0)] {
                let value = (phase + offset).cos() + rng.gen_range(-cfg.noise..=cfg.noise);
                accel.datasets.push(Dataset {
                    unique_id: next_id,
                    title: format!("Accel {}", tag.to_uppercase()),
                    value: format!("{value:.4}"),
                    units: "g".to_string(),
                    widget: tag.to_string(),
                    min: -2.0,
                    max: 2.0,
                    ..Dataset::default()
                });
                next_id += 1;
            }
            groups.push(accel);
        }

        if cfg.gps {
            let mut gps = Group {
                group_id: groups.len() as u32,
                title: "Position".to_string(),
                widget: "gps".to_string(),
                datasets: Vec::new(),
            };
            let fields = [
                ("lat", 47.3769 + 0.001 * phase.sin()),
                ("lon", 8.5417 + 0.001 * phase.cos()),
                ("alt", 408.0 + 2.0 * (phase / 2.0).sin()),
            ];
            for (tag, value) in fields {
                gps.datasets.push(Dataset {
                    unique_id: next_id,
                    title: tag.to_uppercase(),
                    value: format!("{value:.6}"),
                    widget: tag.to_string(),
                    ..Dataset::default()
                });
                next_id += 1;
            }
            groups.push(gps);
        }

        Frame {
            title: "Synthetic Telemetry".to_string(),
            groups,
            actions: vec![Action {
                title: "Marker".to_string(),
                icon: "flag".to_string(),
                tx_data: "MARK".to_string(),
                eol: "\n".to_string(),
                timer_mode: TimerMode::ToggleOnTrigger,
                timer_interval_ms: 1000,
                ..Action::default()
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_are_structurally_stable() {
        let mut source = SynthSource::new(SynthConfig::default());
        let a = source.next_frame();
        let b = source.next_frame();
        assert!(a.is_valid());
        assert!(a.equals_structure(&b));
    }

    #[test]
    fn test_channel_count_follows_config() {
        let mut source = SynthSource::new(SynthConfig {
            channels: 2,
            accelerometer: false,
            gps: false,
            ..SynthConfig::default()
        });
        let frame = source.next_frame();
        assert_eq!(frame.groups.len(), 1);
        assert_eq!(frame.groups[0].datasets.len(), 2);
        assert!(frame.groups[0].datasets.iter().all(|d| d.graph));
    }

    #[test]
    fn test_values_oscillate() {
        let mut source = SynthSource::new(SynthConfig {
            noise: 0.0,
            ..SynthConfig::default()
        });
        let first = source.next_frame();
        for _ in 0..30 {
            source.next_frame();
        }
        let later = source.next_frame();
        let a = first.groups[0].datasets[0].numeric_value();
        let b = later.groups[0].datasets[0].numeric_value();
        assert!((a - b).abs() > 1e-6);
    }
}
