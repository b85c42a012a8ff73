//! Browser file picker and download bridge
//!
//! Used for:
//! - Room scan upload (pick a .glb file)
//! - Metrics snapshot export (save a .json file)
//!
//! The browser reports picked files from a `FileReader` callback. Results are
//! queued in a shared `VecDeque` and drained into [`FilePickerState`] once per
//! frame, where the interested plugin takes them by context.

use bevy::prelude::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// File picker plugin
pub struct FilePickerPlugin;

impl Plugin for FilePickerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FilePickerState>()
            .init_resource::<PendingFileResults>()
            .add_systems(PreUpdate, process_file_results);
    }
}

/// Type of file operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    /// Pick a file to open/upload
    Open,
    /// Save content to a file
    Save,
}

/// What the file picker is being used for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilePickerContext {
    /// Uploading a room scan
    RoomScan,
    /// Downloading the metrics snapshot
    SnapshotExport,
}

/// File filter for the picker dialog
#[derive(Debug, Clone)]
pub struct FileFilter {
    /// Display name (e.g., "Room Scans")
    pub name: String,
    /// File extensions without dots (e.g., ["glb"])
    pub extensions: Vec<String>,
}

impl FileFilter {
    pub fn room_scan() -> Self {
        Self {
            name: "Room Scans".to_string(),
            extensions: vec!["glb".to_string()],
        }
    }

    /// Convert to accept string for HTML input element
    pub fn to_accept_string(&self) -> String {
        if self.extensions.is_empty() {
            "*".to_string()
        } else {
            self.extensions
                .iter()
                .map(|ext| format!(".{}", ext))
                .collect::<Vec<_>>()
                .join(",")
        }
    }
}

/// Result from a file picker operation
#[derive(Debug, Clone)]
pub struct FilePickerResult {
    /// The context this result is for
    pub context: FilePickerContext,
    /// The operation that was performed
    pub operation: FileOperation,
    /// Filename (without path)
    pub filename: String,
    /// File content (for open operations)
    pub content: Option<Vec<u8>>,
    /// Whether the operation succeeded
    pub success: bool,
    /// Error message if failed
    pub error: Option<String>,
}

impl FilePickerResult {
    fn failed(
        context: FilePickerContext,
        operation: FileOperation,
        filename: &str,
        error: impl Into<String>,
    ) -> Self {
        Self {
            context,
            operation,
            filename: filename.to_string(),
            content: None,
            success: false,
            error: Some(error.into()),
        }
    }
}

impl FilePickerResult {
    /// A picked file whose content could not be read
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    fn read_failed(context: FilePickerContext, filename: &str, detail: &str) -> Self {
        Self::failed(
            context,
            FileOperation::Open,
            filename,
            format!("Failed to read file: {}", detail),
        )
    }
}

/// Pending file results from JavaScript callbacks
#[derive(Resource, Default, Clone)]
pub struct PendingFileResults(pub Arc<Mutex<VecDeque<FilePickerResult>>>);

impl PendingFileResults {
    fn push(&self, result: FilePickerResult) {
        if let Ok(mut results) = self.0.lock() {
            results.push_back(result);
        }
    }
}

/// File picker state
#[derive(Resource, Default)]
pub struct FilePickerState {
    /// Completed results ready for processing
    pub completed_results: VecDeque<FilePickerResult>,
}

impl FilePickerState {
    /// Take the oldest completed result for a specific context, leaving
    /// results for other contexts queued
    pub fn take_result_for(&mut self, context: &FilePickerContext) -> Option<FilePickerResult> {
        let index = self
            .completed_results
            .iter()
            .position(|r| &r.context == context)?;
        self.completed_results.remove(index)
    }
}

/// System to process file results from JavaScript callbacks
fn process_file_results(
    pending: Res<PendingFileResults>,
    mut picker_state: ResMut<FilePickerState>,
) {
    // Move results from pending (JS callback) to completed (ready for plugins)
    if let Ok(mut pending_results) = pending.0.lock() {
        picker_state.completed_results.extend(pending_results.drain(..));
    }
}

// ============================================================================
// JavaScript Interop (WASM only)
// ============================================================================

#[cfg(target_arch = "wasm32")]
mod js_interop {
    use super::*;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::{Blob, FileReader, HtmlInputElement, Url};

    /// Open a file picker dialog using a hidden HTML input element
    pub fn open_file_picker(accept: &str, pending: PendingFileResults, context: FilePickerContext) {
        tracing::debug!(accept, ?context, "Opening file picker");

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            tracing::error!("open_file_picker: no document object");
            return;
        };

        let input: HtmlInputElement = match document
            .create_element("input")
            .ok()
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        {
            Some(input) => input,
            None => {
                tracing::error!("open_file_picker: failed to create input element");
                return;
            }
        };

        input.set_type("file");
        input.set_accept(accept);
        input.style().set_property("display", "none").ok();

        let Some(body) = document.body() else {
            tracing::error!("open_file_picker: no document body");
            return;
        };
        if let Err(e) = body.append_child(&input) {
            tracing::error!("open_file_picker: failed to append input to body: {:?}", e);
            return;
        }

        let input_clone = input.clone();
        let closure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            if let Some(file) = input_clone.files().and_then(|files| files.get(0)) {
                read_file(file, pending.clone(), context.clone());
            } else {
                tracing::debug!("open_file_picker: no file selected");
            }

            // Remove the input element
            if let Some(parent) = input_clone.parent_node() {
                parent.remove_child(&input_clone).ok();
            }
        }) as Box<dyn FnMut(_)>);

        input.set_onchange(Some(closure.as_ref().unchecked_ref()));
        closure.forget();

        input.click();
    }

    /// Read a picked file as bytes and queue the result
    fn read_file(file: web_sys::File, pending: PendingFileResults, context: FilePickerContext) {
        let filename = file.name();
        tracing::debug!(%filename, size = file.size(), "Reading picked file");

        let reader = match FileReader::new() {
            Ok(reader) => reader,
            Err(e) => {
                pending.push(FilePickerResult::failed(
                    context,
                    FileOperation::Open,
                    &filename,
                    format!("FileReader unavailable: {:?}", e),
                ));
                return;
            }
        };
        let reader_clone = reader.clone();
        let error_reader = reader.clone();
        let error_pending = pending.clone();
        let error_context = context.clone();
        let error_filename = filename.clone();
        let start_pending = pending.clone();
        let start_context = context.clone();

        let onload = Closure::wrap(Box::new(move |_: web_sys::Event| {
            let result = match reader_clone.result() {
                Ok(value) => match value.dyn_into::<js_sys::ArrayBuffer>() {
                    Ok(buffer) => FilePickerResult {
                        context: context.clone(),
                        operation: FileOperation::Open,
                        filename: filename.clone(),
                        content: Some(js_sys::Uint8Array::new(&buffer).to_vec()),
                        success: true,
                        error: None,
                    },
                    Err(_) => FilePickerResult::failed(
                        context.clone(),
                        FileOperation::Open,
                        &filename,
                        "File content is not an ArrayBuffer",
                    ),
                },
                Err(e) => FilePickerResult::read_failed(
                    context.clone(),
                    &filename,
                    &format!("{:?}", e),
                ),
            };
            pending.push(result);
        }) as Box<dyn FnMut(_)>);

        let onerror = Closure::wrap(Box::new(move |_: web_sys::Event| {
            let detail = error_reader
                .error()
                .map(|e| e.message())
                .unwrap_or_else(|| "unknown error".to_string());
            error_pending.push(FilePickerResult::read_failed(
                error_context.clone(),
                &error_filename,
                &detail,
            ));
        }) as Box<dyn FnMut(_)>);

        reader.set_onload(Some(onload.as_ref().unchecked_ref()));
        reader.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onload.forget();
        onerror.forget();

        if let Err(e) = reader.read_as_array_buffer(&file) {
            start_pending.push(FilePickerResult::read_failed(
                start_context,
                &file.name(),
                &format!("{:?}", e),
            ));
        }
    }

    /// Save content to a file using a download link
    pub fn save_file(
        filename: &str,
        content: &[u8],
        mime_type: &str,
        pending: PendingFileResults,
        context: FilePickerContext,
    ) {
        let fail = |error: &str| {
            pending.push(FilePickerResult::failed(
                context.clone(),
                FileOperation::Save,
                filename,
                error,
            ));
        };

        let Some(window) = web_sys::window() else {
            return fail("no window object");
        };
        let Some(document) = window.document() else {
            return fail("no document object");
        };

        // Create blob from content
        let uint8_array = js_sys::Uint8Array::from(content);
        let array = js_sys::Array::new();
        array.push(&uint8_array.buffer());

        let blob_options = web_sys::BlobPropertyBag::new();
        blob_options.set_type(mime_type);

        let Ok(blob) = Blob::new_with_u8_array_sequence_and_options(&array, &blob_options) else {
            return fail("failed to create blob");
        };
        let Ok(url) = Url::create_object_url_with_blob(&blob) else {
            return fail("failed to create object URL");
        };
        let Ok(anchor) = document.create_element("a") else {
            return fail("failed to create anchor");
        };

        anchor.set_attribute("href", &url).ok();
        anchor.set_attribute("download", filename).ok();

        if let Some(body) = document.body() {
            body.append_child(&anchor).ok();
            if let Some(html_el) = anchor.dyn_ref::<web_sys::HtmlElement>() {
                html_el.click();
            }
            body.remove_child(&anchor).ok();
        }

        // Revoke URL after a delay
        let url_clone = url.clone();
        let closure = Closure::wrap(Box::new(move || {
            Url::revoke_object_url(&url_clone).ok();
        }) as Box<dyn FnMut()>);

        window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                1000,
            )
            .ok();
        closure.forget();

        pending.push(FilePickerResult {
            context,
            operation: FileOperation::Save,
            filename: filename.to_string(),
            content: None,
            success: true,
            error: None,
        });
    }
}

// Non-WASM stubs
#[cfg(not(target_arch = "wasm32"))]
mod js_interop {
    use super::*;

    pub fn open_file_picker(_accept: &str, pending: PendingFileResults, context: FilePickerContext) {
        pending.push(FilePickerResult::failed(
            context,
            FileOperation::Open,
            "",
            "File picker not supported on this platform",
        ));
    }

    pub fn save_file(
        filename: &str,
        content: &[u8],
        _mime_type: &str,
        pending: PendingFileResults,
        context: FilePickerContext,
    ) {
        let result = match std::fs::write(filename, content) {
            Ok(()) => FilePickerResult {
                context,
                operation: FileOperation::Save,
                filename: filename.to_string(),
                content: None,
                success: true,
                error: None,
            },
            Err(e) => FilePickerResult::failed(context, FileOperation::Save, filename, e.to_string()),
        };
        pending.push(result);
    }
}

use js_interop::{open_file_picker, save_file};

/// Helper to trigger file open from UI
pub fn trigger_file_open(pending: &PendingFileResults, context: FilePickerContext, filter: FileFilter) {
    let accept = filter.to_accept_string();
    tracing::debug!(filter = %filter.name, %accept, ?context, "trigger_file_open");
    open_file_picker(&accept, pending.clone(), context);
}

/// Helper to trigger file save from UI. Native builds write into the
/// working directory.
pub fn trigger_file_save(
    pending: &PendingFileResults,
    context: FilePickerContext,
    filename: &str,
    content: &[u8],
    mime_type: &str,
) {
    save_file(filename, content, mime_type, pending.clone(), context);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_result(context: FilePickerContext, filename: &str) -> FilePickerResult {
        FilePickerResult {
            context,
            operation: FileOperation::Open,
            filename: filename.to_string(),
            content: Some(vec![1, 2, 3]),
            success: true,
            error: None,
        }
    }

    #[test]
    fn test_accept_strings() {
        assert_eq!(FileFilter::room_scan().to_accept_string(), ".glb");
        let any = FileFilter {
            name: "Anything".to_string(),
            extensions: vec![],
        };
        assert_eq!(any.to_accept_string(), "*");
    }

    #[test]
    fn test_take_result_for_leaves_other_contexts() {
        let mut state = FilePickerState::default();
        state
            .completed_results
            .push_back(open_result(FilePickerContext::SnapshotExport, "a.json"));
        state
            .completed_results
            .push_back(open_result(FilePickerContext::RoomScan, "room.glb"));

        let taken = state.take_result_for(&FilePickerContext::RoomScan).unwrap();
        assert_eq!(taken.filename, "room.glb");
        assert!(state.take_result_for(&FilePickerContext::RoomScan).is_none());
        assert_eq!(state.completed_results.len(), 1);
        assert_eq!(state.completed_results[0].context, FilePickerContext::SnapshotExport);
    }

    #[test]
    fn test_read_failure_reaches_room_scan_consumer() {
        let mut app = App::new();
        app.add_plugins(FilePickerPlugin);

        let pending = app.world().resource::<PendingFileResults>().clone();
        pending.push(FilePickerResult::read_failed(
            FilePickerContext::RoomScan,
            "office.glb",
            "NotReadableError",
        ));
        app.update();

        let mut state = app.world_mut().resource_mut::<FilePickerState>();
        let result = state.take_result_for(&FilePickerContext::RoomScan).unwrap();
        assert!(!result.success);
        assert_eq!(result.operation, FileOperation::Open);
        assert_eq!(result.filename, "office.glb");
        assert!(result.content.is_none());
        assert_eq!(
            result.error.as_deref(),
            Some("Failed to read file: NotReadableError")
        );
    }

    #[test]
    fn test_pending_results_drain_each_frame() {
        let mut app = App::new();
        app.add_plugins(FilePickerPlugin);

        let pending = app.world().resource::<PendingFileResults>().clone();
        pending.push(open_result(FilePickerContext::RoomScan, "office.glb"));
        app.update();

        let mut state = app.world_mut().resource_mut::<FilePickerState>();
        assert!(pending.0.lock().unwrap().is_empty());
        assert_eq!(
            state
                .take_result_for(&FilePickerContext::RoomScan)
                .map(|r| r.filename),
            Some("office.glb".to_string())
        );
    }
}
