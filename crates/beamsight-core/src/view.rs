//! Top-level view state
//!
//! `ViewState` is the single owner of everything the panels and the scene
//! render: marker positions, the marker awaiting placement, the simulated
//! detection flag and the current room scan. Panels and scene systems only
//! read it and call the operations below.

use tracing::{debug, info};

use crate::types::{DetectionState, MarkerKind, MarkerPosition, RoomScan};
use crate::upload::{RoomUpload, UploadError};

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    detection: DetectionState,
    placing: Option<MarkerKind>,
    room: Option<RoomScan>,
    room_revision: u32,
}

/// A room scan accepted by [`ViewState::upload_room`], with the bytes to hand
/// to the renderer
#[derive(Debug, Clone)]
pub struct AcceptedRoom {
    pub scan: RoomScan,
    pub bytes: Vec<u8>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detection(&self) -> &DetectionState {
        &self.detection
    }

    pub fn placing(&self) -> Option<MarkerKind> {
        self.placing
    }

    pub fn room(&self) -> Option<&RoomScan> {
        self.room.as_ref()
    }

    pub fn is_detected(&self) -> bool {
        self.detection.is_detected
    }

    pub fn position(&self, kind: MarkerKind) -> Option<MarkerPosition> {
        self.detection.position(kind)
    }

    /// Marker button behaviour: picking the active kind clears it, picking
    /// another kind replaces the selection.
    pub fn select_marker(&mut self, kind: MarkerKind) {
        let next = if self.placing == Some(kind) { None } else { Some(kind) };
        self.set_placing(next);
    }

    pub fn set_placing(&mut self, placing: Option<MarkerKind>) {
        if self.placing != placing {
            debug!(from = ?self.placing, to = ?placing, "Placing marker changed");
        }
        self.placing = placing;
    }

    /// Place the active marker at `position`.
    ///
    /// Returns the kind that was placed, or `None` when no marker is awaiting
    /// placement (clicks are then ignored). Placing ends the placement mode.
    pub fn place_marker(&mut self, position: MarkerPosition) -> Option<MarkerKind> {
        let kind = self.placing.take()?;
        info!(marker = %kind, %position, "Marker placed");
        self.detection.set_position(kind, Some(position));
        Some(kind)
    }

    /// Detection can only be simulated once both markers are in the scene
    pub fn can_toggle_detection(&self) -> bool {
        self.detection.both_placed()
    }

    /// Flip the simulated detection flag. Returns the new value, or `None`
    /// if the toggle is disabled.
    pub fn toggle_detection(&mut self) -> Option<bool> {
        if !self.can_toggle_detection() {
            return None;
        }
        self.detection.is_detected = !self.detection.is_detected;
        info!(detected = self.detection.is_detected, "Detection toggled");
        Some(self.detection.is_detected)
    }

    /// Whether the beam between the markers should be drawn
    pub fn show_beam(&self) -> bool {
        self.detection.both_placed()
    }

    /// Validate and accept an uploaded room scan. A rejected file leaves the
    /// state untouched.
    pub fn upload_room(
        &mut self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<AcceptedRoom, UploadError> {
        let upload = RoomUpload::new(filename, bytes)?;
        let scan = self.load_room(&upload.filename);
        Ok(AcceptedRoom {
            scan,
            bytes: upload.bytes,
        })
    }

    /// Point the scene at a new room scan (uploaded or fetched by URL)
    pub fn load_room(&mut self, name: &str) -> RoomScan {
        self.room_revision += 1;
        let scan = RoomScan {
            name: name.to_string(),
            revision: self.room_revision,
        };
        info!(name, revision = scan.revision, "Room scan selected");
        self.room = Some(scan.clone());
        scan
    }

    /// Update the illustrative signal numbers shown by the status panel
    pub fn set_signal(&mut self, rssi: i32, baseline: i32) {
        self.detection.rssi = rssi;
        self.detection.baseline = baseline;
    }

    /// Clear both markers, the placement selection and the detection flag.
    /// The room scan and the signal numbers are kept.
    pub fn reset(&mut self) {
        self.detection.phone_position = None;
        self.detection.laptop_position = None;
        self.detection.is_detected = false;
        self.placing = None;
        info!("View reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed_view() -> ViewState {
        let mut view = ViewState::new();
        view.select_marker(MarkerKind::Phone);
        view.place_marker(MarkerPosition::new(1.0, 0.0, 1.0));
        view.select_marker(MarkerKind::Laptop);
        view.place_marker(MarkerPosition::new(-1.0, 0.0, -1.0));
        view
    }

    #[test]
    fn test_select_marker_is_mutually_exclusive() {
        let mut view = ViewState::new();
        assert_eq!(view.placing(), None);

        view.select_marker(MarkerKind::Phone);
        assert_eq!(view.placing(), Some(MarkerKind::Phone));

        // Another kind replaces the selection
        view.select_marker(MarkerKind::Laptop);
        assert_eq!(view.placing(), Some(MarkerKind::Laptop));

        // Same kind clears it
        view.select_marker(MarkerKind::Laptop);
        assert_eq!(view.placing(), None);
    }

    #[test]
    fn test_click_without_active_marker_is_ignored() {
        let mut view = ViewState::new();
        assert_eq!(view.place_marker(MarkerPosition::new(1.0, 0.0, 0.0)), None);
        assert_eq!(view.position(MarkerKind::Phone), None);
        assert_eq!(view.position(MarkerKind::Laptop), None);
    }

    #[test]
    fn test_place_marker_records_and_ends_placement() {
        let mut view = ViewState::new();
        view.select_marker(MarkerKind::Phone);
        let placed = view.place_marker(MarkerPosition::new(0.5, 0.0, 0.25));
        assert_eq!(placed, Some(MarkerKind::Phone));
        assert_eq!(view.position(MarkerKind::Phone), Some(MarkerPosition::new(0.5, 0.0, 0.25)));
        assert_eq!(view.placing(), None);
    }

    #[test]
    fn test_placing_same_marker_overwrites() {
        let mut view = ViewState::new();
        view.select_marker(MarkerKind::Laptop);
        view.place_marker(MarkerPosition::new(1.0, 0.0, 0.0));
        view.select_marker(MarkerKind::Laptop);
        view.place_marker(MarkerPosition::new(2.0, 0.0, 0.0));
        assert_eq!(view.position(MarkerKind::Laptop), Some(MarkerPosition::new(2.0, 0.0, 0.0)));
        assert_eq!(view.position(MarkerKind::Phone), None);
    }

    #[test]
    fn test_toggle_disabled_until_both_markers_placed() {
        let mut view = ViewState::new();
        assert!(!view.can_toggle_detection());
        assert_eq!(view.toggle_detection(), None);

        view.select_marker(MarkerKind::Phone);
        view.place_marker(MarkerPosition::default());
        assert!(!view.can_toggle_detection());
        assert!(!view.show_beam());
        assert_eq!(view.toggle_detection(), None);
        assert!(!view.is_detected());

        view.select_marker(MarkerKind::Laptop);
        view.place_marker(MarkerPosition::new(1.0, 0.0, 0.0));
        assert!(view.can_toggle_detection());
        assert!(view.show_beam());
    }

    #[test]
    fn test_toggle_detection_flips_flag() {
        let mut view = placed_view();
        assert_eq!(view.toggle_detection(), Some(true));
        assert!(view.is_detected());
        assert_eq!(view.toggle_detection(), Some(false));
        assert!(!view.is_detected());
    }

    #[test]
    fn test_reset_clears_markers_placing_and_detection() {
        let mut view = placed_view();
        view.toggle_detection();
        view.select_marker(MarkerKind::Phone);
        view.load_room("office.glb");
        view.set_signal(-60, -45);

        view.reset();

        assert_eq!(view.position(MarkerKind::Phone), None);
        assert_eq!(view.position(MarkerKind::Laptop), None);
        assert_eq!(view.placing(), None);
        assert!(!view.is_detected());
        assert!(!view.show_beam());
        // Room and signal numbers survive a reset
        assert_eq!(view.room().map(|r| r.name.as_str()), Some("office.glb"));
        assert_eq!(view.detection().rssi, -60);
    }

    #[test]
    fn test_non_glb_upload_changes_nothing() {
        let mut view = placed_view();
        view.select_marker(MarkerKind::Phone);
        let before = view.clone();

        assert!(view.upload_room("room.fbx", vec![1, 2, 3]).is_err());

        assert_eq!(view.room(), before.room());
        assert_eq!(view.placing(), before.placing());
        assert_eq!(view.detection(), before.detection());
    }

    #[test]
    fn test_upload_bumps_room_revision() {
        let mut view = ViewState::new();
        let first = view.upload_room("a.glb", vec![1]).unwrap();
        let second = view.upload_room("b.glb", vec![2]).unwrap();
        assert_eq!(first.scan.revision + 1, second.scan.revision);
        assert_eq!(view.room(), Some(&second.scan));
        assert_eq!(second.bytes, vec![2]);
    }
}
