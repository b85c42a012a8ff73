//! Marker, detection and room-scan types

use serde::{Deserialize, Serialize};

/// A point in scene space (Y up, meters)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MarkerPosition {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl MarkerPosition {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn from_array(arr: [f32; 3]) -> Self {
        Self {
            x: arr[0],
            y: arr[1],
            z: arr[2],
        }
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Linear interpolation towards `other`
    pub fn lerp(&self, other: &MarkerPosition, t: f32) -> MarkerPosition {
        MarkerPosition {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    pub fn distance(&self, other: &MarkerPosition) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl std::fmt::Display for MarkerPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Which simulated device a marker stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Phone,
    Laptop,
}

impl MarkerKind {
    pub const ALL: [MarkerKind; 2] = [MarkerKind::Phone, MarkerKind::Laptop];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerKind::Phone => "phone",
            MarkerKind::Laptop => "laptop",
        }
    }

    /// Title-cased name for buttons
    pub fn title(&self) -> &'static str {
        match self {
            MarkerKind::Phone => "Phone",
            MarkerKind::Laptop => "Laptop",
        }
    }

    /// Floating label shown above the marker in the scene
    pub fn label(&self) -> &'static str {
        match self {
            MarkerKind::Phone => "📱 Phone",
            MarkerKind::Laptop => "💻 Laptop",
        }
    }
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// View-model aggregate rendered by the status panel.
///
/// `is_detected` is toggled by the user; `rssi` and `baseline` are
/// illustrative numbers from the signal simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionState {
    pub is_detected: bool,
    /// Latest simulated RSSI in dBm
    pub rssi: i32,
    /// Calibrated baseline in dBm
    pub baseline: i32,
    pub phone_position: Option<MarkerPosition>,
    pub laptop_position: Option<MarkerPosition>,
}

impl Default for DetectionState {
    fn default() -> Self {
        Self {
            is_detected: false,
            rssi: -45,
            baseline: -45,
            phone_position: None,
            laptop_position: None,
        }
    }
}

impl DetectionState {
    pub fn position(&self, kind: MarkerKind) -> Option<MarkerPosition> {
        match kind {
            MarkerKind::Phone => self.phone_position,
            MarkerKind::Laptop => self.laptop_position,
        }
    }

    pub fn set_position(&mut self, kind: MarkerKind, position: Option<MarkerPosition>) {
        match kind {
            MarkerKind::Phone => self.phone_position = position,
            MarkerKind::Laptop => self.laptop_position = position,
        }
    }

    /// Both endpoints of the beam, if both markers are placed
    pub fn beam_endpoints(&self) -> Option<(MarkerPosition, MarkerPosition)> {
        match (self.phone_position, self.laptop_position) {
            (Some(phone), Some(laptop)) => Some((phone, laptop)),
            _ => None,
        }
    }

    pub fn both_placed(&self) -> bool {
        self.beam_endpoints().is_some()
    }
}

/// Reference to an uploaded room scan.
///
/// The revision increases with every accepted upload so the renderer can
/// tell a replaced room apart from the one already spawned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomScan {
    /// Original file name (or URL) of the scan
    pub name: String,
    pub revision: u32,
}

impl RoomScan {
    /// Asset path of this revision inside the in-memory upload source
    pub fn asset_path(&self) -> String {
        format!("room-{}.glb", self.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beam_endpoints_require_both_markers() {
        let mut state = DetectionState::default();
        assert!(state.beam_endpoints().is_none());

        state.set_position(MarkerKind::Phone, Some(MarkerPosition::new(1.0, 0.0, 0.0)));
        assert!(state.beam_endpoints().is_none());
        assert!(!state.both_placed());

        state.set_position(MarkerKind::Laptop, Some(MarkerPosition::new(-1.0, 0.0, 2.0)));
        let (start, end) = state.beam_endpoints().unwrap();
        assert_eq!(start, MarkerPosition::new(1.0, 0.0, 0.0));
        assert_eq!(end, MarkerPosition::new(-1.0, 0.0, 2.0));
    }

    #[test]
    fn test_marker_kind_serializes_lowercase() {
        let json = serde_json::to_string(&MarkerKind::Laptop).unwrap();
        assert_eq!(json, "\"laptop\"");
        assert_eq!(MarkerKind::Phone.to_string(), "phone");
    }

    #[test]
    fn test_room_asset_path_is_unique_per_revision() {
        let first = RoomScan { name: "office.glb".to_string(), revision: 1 };
        let second = RoomScan { name: "office.glb".to_string(), revision: 2 };
        assert_ne!(first.asset_path(), second.asset_path());
    }

    #[test]
    fn test_position_lerp_and_distance() {
        let a = MarkerPosition::new(0.0, 0.0, 0.0);
        let b = MarkerPosition::new(2.0, 4.0, 0.0);
        assert_eq!(a.lerp(&b, 0.5), MarkerPosition::new(1.0, 2.0, 0.0));
        assert!((MarkerPosition::new(3.0, 0.0, 4.0).distance(&a) - 5.0).abs() < 1e-6);
    }
}
