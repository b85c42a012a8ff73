//! Marker and beam palette plus idle animations.
//!
//! All animation values are pure functions of elapsed seconds, so a marker
//! or beam spawned again starts cleanly without stored state.

use crate::types::MarkerKind;

/// sRGB color as 8-bit channels
pub type Rgb = [u8; 3];

pub const PHONE_COLOR: Rgb = [0x3b, 0x82, 0xf6];
pub const LAPTOP_COLOR: Rgb = [0x22, 0xc5, 0x5e];
pub const ALERT_COLOR: Rgb = [0xef, 0x44, 0x44];
pub const BEAM_CLEAR_COLOR: Rgb = [0x00, 0xd4, 0xff];
pub const BEAM_DETECTED_COLOR: Rgb = ALERT_COLOR;

pub const MARKER_FLOAT_AMPLITUDE: f32 = 0.02;
pub const MARKER_FLOAT_RATE: f32 = 2.0;
pub const GLOW_PULSE_AMPLITUDE: f32 = 0.1;
pub const GLOW_PULSE_RATE: f32 = 3.0;
pub const BEAM_IDLE_OPACITY: f32 = 0.6;
pub const BEAM_FLASH_RATE: f32 = 8.0;

/// Base color of a marker; only the phone switches to the alert color
pub fn marker_color(kind: MarkerKind, detected: bool) -> Rgb {
    match kind {
        MarkerKind::Phone if detected => ALERT_COLOR,
        MarkerKind::Phone => PHONE_COLOR,
        MarkerKind::Laptop => LAPTOP_COLOR,
    }
}

pub fn beam_color(detected: bool) -> Rgb {
    if detected {
        BEAM_DETECTED_COLOR
    } else {
        BEAM_CLEAR_COLOR
    }
}

/// Vertical bob of the marker core around its placed height
pub fn marker_float_offset(elapsed: f32) -> f32 {
    (elapsed * MARKER_FLOAT_RATE).sin() * MARKER_FLOAT_AMPLITUDE
}

/// Uniform scale of the marker glow shell
pub fn glow_scale(elapsed: f32) -> f32 {
    1.0 + (elapsed * GLOW_PULSE_RATE).sin() * GLOW_PULSE_AMPLITUDE
}

/// Tube opacity: steady while clear, flashing while detected
pub fn beam_opacity(elapsed: f32, detected: bool) -> f32 {
    if detected {
        0.4 + (elapsed * BEAM_FLASH_RATE).sin() * 0.3
    } else {
        BEAM_IDLE_OPACITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_phone_turns_red() {
        assert_eq!(marker_color(MarkerKind::Phone, false), PHONE_COLOR);
        assert_eq!(marker_color(MarkerKind::Phone, true), ALERT_COLOR);
        assert_eq!(marker_color(MarkerKind::Laptop, false), LAPTOP_COLOR);
        assert_eq!(marker_color(MarkerKind::Laptop, true), LAPTOP_COLOR);
        assert_eq!(beam_color(true), ALERT_COLOR);
        assert_eq!(beam_color(false), BEAM_CLEAR_COLOR);
    }

    #[test]
    fn test_animations_stay_in_range() {
        for i in 0..1000 {
            let t = i as f32 * 0.037;
            assert!(marker_float_offset(t).abs() <= MARKER_FLOAT_AMPLITUDE + 1e-6);
            let s = glow_scale(t);
            assert!((0.9 - 1e-6..=1.1 + 1e-6).contains(&s));
            let o = beam_opacity(t, true);
            assert!((0.1 - 1e-6..=0.7 + 1e-6).contains(&o));
            assert_eq!(beam_opacity(t, false), BEAM_IDLE_OPACITY);
        }
    }

    #[test]
    fn test_animations_start_at_rest() {
        assert_eq!(marker_float_offset(0.0), 0.0);
        assert_eq!(glow_scale(0.0), 1.0);
        assert!((beam_opacity(0.0, true) - 0.4).abs() < 1e-6);
    }
}
