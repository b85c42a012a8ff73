//! Bevy application setup

use bevy::asset::io::memory::{Dir, MemoryAssetReader};
use bevy::asset::io::AssetSource;
use bevy::asset::AssetApp;
use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::{DefaultPickingPlugins, prelude::MeshPickingPlugin};
use beamsight_core::config::SceneConfig;
use beamsight_core::{ViewState, ViewerConfig};

use crate::file_picker::FilePickerPlugin;
use crate::markers::MarkersPlugin;
use crate::room::{RoomPlugin, UploadDir, UPLOAD_SOURCE};
use crate::scene::ScenePlugin;
use crate::signal::SignalPlugin;
use crate::ui::UiPlugin;

/// Canonical view state shared by the panels and the scene systems
#[derive(Debug, Clone, Resource, Default, Deref, DerefMut)]
pub struct View(pub ViewState);

/// Configuration the app was started with
#[derive(Debug, Clone, Resource, Default, Deref)]
pub struct AppConfig(pub ViewerConfig);

/// Orbit camera controller settings (Y up)
#[derive(Debug, Clone, Resource)]
pub struct CameraSettings {
    pub distance: f32,
    pub target_distance: f32, // For smooth zoom
    pub azimuth: f32,
    pub elevation: f32,
    pub target: Vec3,
    pub target_focus: Vec3, // For smooth re-centering
    pub min_distance: f32,
    pub max_distance: f32,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self::from_config(&SceneConfig::default())
    }
}

impl CameraSettings {
    /// Orbit parameters that put the camera at the configured position,
    /// looking at the origin
    pub fn from_config(config: &SceneConfig) -> Self {
        // `f32::clamp` panics on an inverted range
        let min_distance = config.min_distance.min(config.max_distance);
        let max_distance = config.max_distance.max(config.min_distance);
        let position = Vec3::from_array(config.camera_position);
        let distance = position.length().clamp(min_distance, max_distance);
        let (azimuth, elevation) = if position.length_squared() > f32::EPSILON {
            (
                position.z.atan2(position.x),
                (position.y / position.length()).clamp(-1.0, 1.0).asin(),
            )
        } else {
            (std::f32::consts::FRAC_PI_4, 0.6)
        };

        Self {
            distance,
            target_distance: distance,
            azimuth,
            elevation,
            target: Vec3::ZERO,
            target_focus: Vec3::ZERO,
            min_distance,
            max_distance,
            sensitivity: 0.005,
            zoom_speed: 0.1,
            smooth_factor: 0.15,
        }
    }

    /// Camera position on the orbit sphere around `target`
    pub fn eye(&self) -> Vec3 {
        let horizontal = self.distance * self.elevation.cos();
        self.target
            + Vec3::new(
                horizontal * self.azimuth.cos(),
                self.distance * self.elevation.sin(),
                horizontal * self.azimuth.sin(),
            )
    }
}

/// UI layout settings for responsive design
#[derive(Debug, Clone, Resource)]
pub struct UiLayout {
    /// Whether the left panel (controls) is visible
    pub show_left_panel: bool,
    /// Whether the right panel (status) is visible
    pub show_right_panel: bool,
    pub screen_width: f32,
    pub screen_height: f32,
    /// Whether we're on a small screen (mobile/tablet)
    pub is_mobile: bool,
    /// Scale factor for UI elements on mobile
    pub ui_scale: f32,
}

impl Default for UiLayout {
    fn default() -> Self {
        Self {
            show_left_panel: true,
            show_right_panel: true,
            screen_width: 1920.0,
            screen_height: 1080.0,
            is_mobile: false,
            ui_scale: 1.0,
        }
    }
}

impl UiLayout {
    /// Update layout based on screen dimensions
    pub fn update_for_screen(&mut self, width: f32, height: f32) {
        let was_mobile = self.is_mobile;
        self.screen_width = width;
        self.screen_height = height;

        // Consider mobile if width < 800 or if it's a portrait orientation with width < 600
        self.is_mobile = width < 800.0 || (width < height && width < 600.0);
        self.ui_scale = if self.is_mobile { 1.3 } else { 1.0 };

        // Only one panel at a time fits on a phone
        if self.is_mobile && !was_mobile {
            self.show_right_panel = false;
        } else if !self.is_mobile && was_mobile {
            self.show_left_panel = true;
            self.show_right_panel = true;
        }
    }

    /// Get the width for side panels
    pub fn panel_width(&self) -> f32 {
        if self.is_mobile {
            (self.screen_width * 0.85).min(350.0)
        } else {
            260.0
        }
    }
}

/// Read a query parameter from the page URL (always `None` off the web)
pub fn query_param(name: &str) -> Option<String> {
    #[cfg(target_arch = "wasm32")]
    {
        let search = web_sys::window()?.location().search().ok()?;
        let params = web_sys::UrlSearchParams::new_with_str(&search).ok()?;
        params.get(name).filter(|value| !value.is_empty())
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = name;
        None
    }
}

/// Run the Bevy application
pub fn run(config: ViewerConfig) {
    let upload_dir = Dir::default();
    let reader_dir = upload_dir.clone();

    let mut app = App::new();
    // In-memory source for uploaded room scans; must exist before AssetPlugin builds
    app.register_asset_source(
        UPLOAD_SOURCE,
        AssetSource::build().with_reader(move || {
            Box::new(MemoryAssetReader {
                root: reader_dir.clone(),
            })
        }),
    );

    app.insert_resource(ClearColor(Color::srgb(0.1, 0.1, 0.15))) // Dark blue-gray background
        // Bevy 0.17+ has built-in https:// asset loading via the "https" feature
        .add_plugins(DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Beamsight - Marker Placement Demo".to_string(),
                    canvas: Some("#beamsight-canvas".to_string()),
                    fit_canvas_to_parent: true,
                    prevent_default_event_handling: false,
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                // Relative room paths resolve against the working directory / page origin
                file_path: "".to_string(),
                // Room scans never ship with .meta files
                meta_check: bevy::asset::AssetMetaCheck::Never,
                ..default()
            })
        )
        // bevy_picking from the crate must be added BEFORE EguiPlugin so it can detect PickingPlugin.
        // MeshPickingPlugin provides the MeshRayCast used for marker placement.
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        .insert_resource(CameraSettings::from_config(&config.scene))
        .insert_resource(UploadDir(upload_dir))
        .insert_resource(AppConfig(config))
        .init_resource::<View>()
        .init_resource::<UiLayout>()
        .add_plugins(FilePickerPlugin)
        .add_plugins(SignalPlugin)
        .add_plugins(ScenePlugin)
        .add_plugins(RoomPlugin)
        .add_plugins(MarkersPlugin)
        .add_plugins(UiPlugin)
        .run();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_starts_at_configured_position() {
        let settings = CameraSettings::default();
        let eye = settings.eye();
        assert!((eye - Vec3::new(3.0, 3.0, 3.0)).length() < 1e-4, "eye {:?}", eye);
    }

    #[test]
    fn test_camera_distance_is_clamped_to_range() {
        let config = SceneConfig {
            camera_position: [30.0, 0.0, 0.0],
            ..SceneConfig::default()
        };
        let settings = CameraSettings::from_config(&config);
        assert_eq!(settings.distance, 20.0);
        assert!(settings.elevation.abs() < 1e-6);
    }

    #[test]
    fn test_inverted_distance_range_is_ordered() {
        let config = SceneConfig {
            min_distance: 30.0,
            max_distance: 20.0,
            ..SceneConfig::default()
        };
        let settings = CameraSettings::from_config(&config);
        assert_eq!(settings.min_distance, 20.0);
        assert_eq!(settings.max_distance, 30.0);
        assert_eq!(settings.distance, 20.0);
    }

    #[test]
    fn test_mobile_layout_keeps_one_panel() {
        let mut layout = UiLayout::default();
        layout.update_for_screen(400.0, 800.0);
        assert!(layout.is_mobile);
        assert!(!layout.show_right_panel);
        assert_eq!(layout.ui_scale, 1.3);

        layout.update_for_screen(1600.0, 900.0);
        assert!(!layout.is_mobile);
        assert!(layout.show_left_panel && layout.show_right_panel);
        assert_eq!(layout.panel_width(), 260.0);
    }
}
