//! Derived metrics for the status panel

use crate::types::DetectionState;

/// Deltas beyond this many dB (either way) get highlighted
pub const DELTA_HIGHLIGHT_DB: i32 = 5;

/// RSSI change relative to the calibrated baseline
pub fn rssi_delta(rssi: i32, baseline: i32) -> i32 {
    rssi - baseline
}

/// Map RSSI (dBm) onto the 0-100 signal bar
pub fn signal_strength(rssi: i32) -> f32 {
    ((rssi as f32 + 100.0) * 1.5).clamp(0.0, 100.0)
}

/// `+` prefix only for positive deltas; negatives carry their own sign
pub fn format_delta(delta: i32) -> String {
    if delta > 0 {
        format!("+{}", delta)
    } else {
        delta.to_string()
    }
}

/// How the delta line is colored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaBand {
    /// Above baseline by more than the highlight margin
    Elevated,
    /// Below baseline by more than the highlight margin
    Depressed,
    Steady,
}

impl DeltaBand {
    pub fn from_delta(delta: i32) -> Self {
        if delta > DELTA_HIGHLIGHT_DB {
            DeltaBand::Elevated
        } else if delta < -DELTA_HIGHLIGHT_DB {
            DeltaBand::Depressed
        } else {
            DeltaBand::Steady
        }
    }
}

/// Everything the status panel displays, computed from a `DetectionState`
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSummary {
    pub is_detected: bool,
    pub rssi: i32,
    pub baseline: i32,
    pub delta: i32,
    /// 0..=100
    pub signal_strength: f32,
    pub band: DeltaBand,
}

impl StatusSummary {
    pub fn from_state(state: &DetectionState) -> Self {
        let delta = rssi_delta(state.rssi, state.baseline);
        Self {
            is_detected: state.is_detected,
            rssi: state.rssi,
            baseline: state.baseline,
            delta,
            signal_strength: signal_strength(state.rssi),
            band: DeltaBand::from_delta(delta),
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_detected {
            "DETECTED"
        } else {
            "CLEAR"
        }
    }

    /// e.g. "Δ +7 dBm from baseline"
    pub fn delta_text(&self) -> String {
        format!("Δ {} dBm from baseline", format_delta(self.delta))
    }

    /// e.g. "83%"
    pub fn strength_text(&self) -> String {
        format!("{:.0}%", self.signal_strength)
    }

    /// Bar fill fraction in 0..=1
    pub fn strength_fraction(&self) -> f32 {
        self.signal_strength / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_is_rssi_minus_baseline() {
        for rssi in -120..=0 {
            for baseline in [-90, -60, -45, -30] {
                assert_eq!(rssi_delta(rssi, baseline), rssi - baseline);
            }
        }
    }

    #[test]
    fn test_delta_sign_prefix_only_when_positive() {
        assert_eq!(format_delta(7), "+7");
        assert_eq!(format_delta(0), "0");
        assert_eq!(format_delta(-3), "-3");
    }

    #[test]
    fn test_signal_strength_is_clamped() {
        assert_eq!(signal_strength(-200), 0.0);
        assert_eq!(signal_strength(-100), 0.0);
        assert_eq!(signal_strength(-50), 75.0);
        assert_eq!(signal_strength(-40), 90.0);
        assert_eq!(signal_strength(-33), 100.0);
        assert_eq!(signal_strength(0), 100.0);
        for rssi in -300..300 {
            let s = signal_strength(rssi);
            assert!((0.0..=100.0).contains(&s), "rssi {} gave {}", rssi, s);
        }
    }

    #[test]
    fn test_delta_band_thresholds() {
        assert_eq!(DeltaBand::from_delta(6), DeltaBand::Elevated);
        assert_eq!(DeltaBand::from_delta(5), DeltaBand::Steady);
        assert_eq!(DeltaBand::from_delta(-5), DeltaBand::Steady);
        assert_eq!(DeltaBand::from_delta(-6), DeltaBand::Depressed);
    }

    #[test]
    fn test_summary_from_state() {
        let state = DetectionState {
            is_detected: true,
            rssi: -52,
            baseline: -45,
            phone_position: None,
            laptop_position: None,
        };
        let summary = StatusSummary::from_state(&state);
        assert_eq!(summary.delta, -7);
        assert_eq!(summary.band, DeltaBand::Depressed);
        assert_eq!(summary.status_label(), "DETECTED");
        assert_eq!(summary.delta_text(), "Δ -7 dBm from baseline");
        assert_eq!(summary.strength_text(), "72%");
        assert!((summary.strength_fraction() - 0.72).abs() < 1e-6);
    }
}
