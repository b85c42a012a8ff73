//! Room scan upload validation

use thiserror::Error;

/// The only extension accepted for room scans
pub const ROOM_SCAN_EXTENSION: &str = ".glb";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UploadError {
    #[error("Not a .glb room scan: {0}")]
    NotGlb(String),
}

/// Case-sensitive suffix check, matching the file input's accept filter
pub fn is_room_scan(filename: &str) -> bool {
    filename.ends_with(ROOM_SCAN_EXTENSION)
}

/// A room scan picked by the user. Only the name is checked; unreadable
/// content fails later, when the renderer loads it.
#[derive(Debug, Clone)]
pub struct RoomUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl RoomUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Result<Self, UploadError> {
        let filename = filename.into();
        if !is_room_scan(&filename) {
            return Err(UploadError::NotGlb(filename));
        }
        Ok(Self { filename, bytes })
    }
}
