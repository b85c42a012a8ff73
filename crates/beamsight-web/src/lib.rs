//! Beamsight Web - WebGPU-powered marker placement and detection demo
//!
//! Browser (and native) front end built on Bevy and egui: load a room scan or
//! use the grid floor, drop phone/laptop markers by clicking in the scene and
//! toggle the simulated detection state.

mod app;
mod file_picker;
mod markers;
mod room;
mod scene;
mod signal;
mod ui;

pub use app::{query_param, run};
pub use beamsight_core::ViewerConfig;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Entry point for WASM module
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn main() {
    // Set panic hook for better error messages
    console_error_panic_hook::set_once();

    let mut config = ViewerConfig::default();
    if let Some(level) = app::query_param("log") {
        config.log.level = level;
    }
    if let Some(room) = app::query_param("room") {
        config.scene.room = Some(room);
    }

    // Initialize logging with filtering to reduce wgpu noise
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(parse_level(&config.log.level))
            .build()
    );

    app::run(config);
}

/// Console log level from a config string, WARN when unrecognised
pub fn parse_level(level: &str) -> tracing::Level {
    level.parse().unwrap_or(tracing::Level::WARN)
}
