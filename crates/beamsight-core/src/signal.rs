//! Simulated signal monitor
//!
//! Produces the illustrative RSSI numbers shown in the status panel. There is
//! no radio behind it: samples are synthesised from the user-controlled
//! detection flag so the panel behaves like a drop-threshold detector would.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{SignalConfig, MAX_HISTORY_LEN};
use crate::types::{DetectionState, MarkerPosition};

pub const MIN_THRESHOLD: i32 = 1;
pub const MAX_THRESHOLD: i32 = 40;

/// Extra drop beyond the threshold while an object is "detected"
const DETECTED_MARGIN_DB: f32 = 4.0;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignalError {
    #[error("No RSSI sample yet")]
    NoSample,
}

/// Propagation profile; each mode remembers its own drop threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    /// Line of sight through open air
    #[default]
    Air,
    /// Through a wall
    Wall,
}

impl DetectionMode {
    pub const ALL: [DetectionMode; 2] = [DetectionMode::Air, DetectionMode::Wall];

    pub fn label(&self) -> &'static str {
        match self {
            DetectionMode::Air => "air",
            DetectionMode::Wall => "wall",
        }
    }
}

/// One history point, `t` in milliseconds since start
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RssiSample {
    pub t: u64,
    pub rssi: i32,
}

/// JSON export of the current metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub rssi: Option<i32>,
    pub baseline: i32,
    pub mode: DetectionMode,
    pub threshold: i32,
    /// Whether the latest sample dropped past the threshold
    pub rssi_detected: bool,
    /// The user-controlled detection flag
    pub detected: bool,
    pub phone_position: Option<MarkerPosition>,
    pub laptop_position: Option<MarkerPosition>,
    pub history: Vec<RssiSample>,
}

impl MetricsSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone)]
pub struct SignalMonitor {
    baseline: i32,
    mode: DetectionMode,
    air_threshold: i32,
    wall_threshold: i32,
    latest: Option<i32>,
    history: VecDeque<RssiSample>,
    capacity: usize,
}

impl SignalMonitor {
    pub fn new(config: &SignalConfig) -> Self {
        Self {
            baseline: config.baseline,
            mode: config.mode,
            air_threshold: config.air_threshold.clamp(MIN_THRESHOLD, MAX_THRESHOLD),
            wall_threshold: config.wall_threshold.clamp(MIN_THRESHOLD, MAX_THRESHOLD),
            latest: None,
            history: VecDeque::new(),
            capacity: config.history_len.clamp(1, MAX_HISTORY_LEN),
        }
    }

    pub fn baseline(&self) -> i32 {
        self.baseline
    }

    pub fn latest(&self) -> Option<i32> {
        self.latest
    }

    pub fn mode(&self) -> DetectionMode {
        self.mode
    }

    /// Threshold of the active mode
    pub fn threshold(&self) -> i32 {
        match self.mode {
            DetectionMode::Air => self.air_threshold,
            DetectionMode::Wall => self.wall_threshold,
        }
    }

    /// Set the active mode's threshold, clamped to 1..=40 dB. Returns the
    /// value actually stored.
    pub fn set_threshold(&mut self, value: i32) -> i32 {
        let value = value.clamp(MIN_THRESHOLD, MAX_THRESHOLD);
        match self.mode {
            DetectionMode::Air => self.air_threshold = value,
            DetectionMode::Wall => self.wall_threshold = value,
        }
        debug!(mode = self.mode.label(), threshold = value, "Threshold set");
        value
    }

    /// Switch profile; the new mode's remembered threshold becomes active
    pub fn set_mode(&mut self, mode: DetectionMode) {
        self.mode = mode;
        debug!(mode = mode.label(), threshold = self.threshold(), "Mode set");
    }

    /// Take the latest sample as the new baseline
    pub fn calibrate(&mut self) -> Result<i32, SignalError> {
        let latest = self.latest.ok_or(SignalError::NoSample)?;
        self.baseline = latest;
        info!(baseline = latest, "Baseline calibrated");
        Ok(latest)
    }

    /// Latest sample sits at least `threshold` dB below the baseline
    pub fn drop_detected(&self) -> bool {
        self.latest
            .map(|rssi| rssi <= self.baseline.saturating_sub(self.threshold()))
            .unwrap_or(false)
    }

    /// Synthesise the sample for `elapsed` seconds and record it
    pub fn sample(&mut self, elapsed: f64, detected: bool) -> i32 {
        let rssi = synthesize_rssi(self.baseline, self.threshold(), elapsed, detected);
        self.record(elapsed, rssi);
        rssi
    }

    /// Record an externally produced sample
    pub fn record(&mut self, elapsed: f64, rssi: i32) {
        self.latest = Some(rssi);
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(RssiSample {
            t: (elapsed.max(0.0) * 1000.0) as u64,
            rssi,
        });
    }

    pub fn history(&self) -> impl Iterator<Item = &RssiSample> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn snapshot(&self, state: &DetectionState) -> MetricsSnapshot {
        MetricsSnapshot {
            rssi: self.latest,
            baseline: self.baseline,
            mode: self.mode,
            threshold: self.threshold(),
            rssi_detected: self.drop_detected(),
            detected: state.is_detected,
            phone_position: state.phone_position,
            laptop_position: state.laptop_position,
            history: self.history.iter().copied().collect(),
        }
    }
}

/// Deterministic wobble bounded by ±2 dB
fn jitter(elapsed: f64) -> f32 {
    let t = elapsed as f32;
    (t * 1.7).sin() * 1.2 + (t * 0.43 + 1.0).sin() * 0.8
}

fn synthesize_rssi(baseline: i32, threshold: i32, elapsed: f64, detected: bool) -> i32 {
    let level = if detected {
        baseline as f32 - threshold as f32 - DETECTED_MARGIN_DB
    } else {
        baseline as f32
    };
    (level + jitter(elapsed)).round() as i32
}
