//! 3D scene management: camera, lights, grid floor and marker placement

use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;
use bevy_picking::mesh_picking::ray_cast::{MeshRayCast, MeshRayCastSettings};
use beamsight_core::geometry::FloorPlane;
use beamsight_core::MarkerPosition;
use std::f32::consts::FRAC_PI_2;
use tracing::debug;

use crate::app::{AppConfig, CameraSettings, View};
use crate::room::RoomMesh;

/// Height of the click plane below a loaded room
const ROOM_FLOOR_HEIGHT: f32 = -0.5;
/// Grid lines sit just below the click plane to avoid z-fighting with markers
const GRID_HEIGHT: f32 = -0.01;
const GRID_CELL_COLOR: Color = Color::srgb(0.118, 0.227, 0.373); // #1e3a5f
const GRID_SECTION_COLOR: Color = Color::srgb(0.145, 0.388, 0.922); // #2563eb
/// Keeps the camera above the floor and short of the pole
const MAX_ELEVATION: f32 = FRAC_PI_2 - 0.01;
const MIN_ELEVATION: f32 = 0.0;
/// Pointer travel (pixels) that turns a click into an orbit drag
const DRAG_THRESHOLD: f32 = 10.0;

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TouchState>()
            .add_systems(Startup, setup_scene)
            .add_systems(Update, (
                update_camera,
                handle_placement_click,
                update_grid_visibility,
            ));
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Marker for grid lines
#[derive(Component)]
pub struct GridLine;

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<AppConfig>,
    camera_settings: Res<CameraSettings>,
) {
    let scene = &config.scene;

    // Y is up; the camera orbits the origin
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: scene.fov_degrees.to_radians(),
            near: 0.01,
            far: 1000.0,
            ..default()
        }),
        Transform::from_translation(camera_settings.eye()).looking_at(Vec3::ZERO, Vec3::Y),
        AmbientLight {
            color: Color::WHITE,
            brightness: 500.0,
            ..default()
        },
        MainCamera,
    ));

    // Key light from above, the only shadow caster
    commands.spawn((
        DirectionalLight {
            illuminance: 5000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(5.0, 10.0, 5.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    // Cyan rim light
    commands.spawn((
        PointLight {
            intensity: 200_000.0,
            color: Color::srgb(0.0, 0.831, 1.0), // #00d4ff
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(-5.0, 5.0, -5.0),
    ));

    // White fill light
    commands.spawn((
        PointLight {
            intensity: 100_000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(5.0, 5.0, 5.0),
    ));

    spawn_grid(&mut commands, &mut meshes, &mut materials, scene);
}

/// Grid floor on the X-Z plane: thin cell lines with brighter section lines
fn spawn_grid(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    scene: &beamsight_core::config::SceneConfig,
) {
    let half = scene.grid_size / 2.0;
    let cell = scene.grid_cell.max(0.01);
    let lines = (scene.grid_size / cell).round() as i32;
    let cells_per_section = (scene.grid_section / cell).round().max(1.0) as i32;

    let cell_material = materials.add(StandardMaterial {
        base_color: GRID_CELL_COLOR,
        unlit: true,
        ..default()
    });
    let section_material = materials.add(StandardMaterial {
        base_color: GRID_SECTION_COLOR,
        unlit: true,
        ..default()
    });

    let cell_thickness = 0.006;
    let section_thickness = 0.012;
    let cell_x = meshes.add(Cuboid::new(scene.grid_size, cell_thickness, cell_thickness));
    let cell_z = meshes.add(Cuboid::new(cell_thickness, cell_thickness, scene.grid_size));
    let section_x = meshes.add(Cuboid::new(scene.grid_size, section_thickness, section_thickness));
    let section_z = meshes.add(Cuboid::new(section_thickness, section_thickness, scene.grid_size));

    for i in 0..=lines {
        let offset = -half + i as f32 * cell;
        // Sections are counted from the centre line outwards
        let is_section = (i - lines / 2) % cells_per_section == 0;
        let (mesh_x, mesh_z, material) = if is_section {
            (&section_x, &section_z, &section_material)
        } else {
            (&cell_x, &cell_z, &cell_material)
        };

        // Line parallel to X (varying Z)
        commands.spawn((
            Mesh3d(mesh_x.clone()),
            MeshMaterial3d(material.clone()),
            Transform::from_xyz(0.0, GRID_HEIGHT, offset),
            GridLine,
        ));
        // Line parallel to Z (varying X)
        commands.spawn((
            Mesh3d(mesh_z.clone()),
            MeshMaterial3d(material.clone()),
            Transform::from_xyz(offset, GRID_HEIGHT, 0.0),
            GridLine,
        ));
    }
}

fn update_camera(
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
    mut settings: ResMut<CameraSettings>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    time: Res<Time>,
    mut contexts: bevy_egui::EguiContexts,
) {
    // Check if egui wants the mouse - if so, don't process camera controls
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false);

    let mut total_motion = Vec2::ZERO;
    for motion in mouse_motion.read() {
        total_motion += motion.delta;
    }

    // Orbit with left mouse drag
    if mouse_button.pressed(MouseButton::Left) && !egui_wants_pointer {
        settings.azimuth += total_motion.x * settings.sensitivity;
        settings.elevation = (settings.elevation + total_motion.y * settings.sensitivity)
            .clamp(MIN_ELEVATION, MAX_ELEVATION);
    }

    // Pan with right mouse drag, in the camera's vertical plane
    if mouse_button.pressed(MouseButton::Right) && !egui_wants_pointer {
        let right = Vec3::new(settings.azimuth.sin(), 0.0, -settings.azimuth.cos());
        let pan_speed = settings.distance * 0.002;
        settings.target_focus -= right * total_motion.x * pan_speed;
        settings.target_focus += Vec3::Y * total_motion.y * pan_speed;
    }

    // Zoom with scroll
    if !egui_wants_pointer {
        for scroll in mouse_wheel.read() {
            let zoom_factor = 1.0 - scroll.y * settings.zoom_speed * 0.3;
            settings.target_distance = (settings.target_distance * zoom_factor)
                .clamp(settings.min_distance, settings.max_distance);
        }
    } else {
        // Drain the scroll events even if we're not using them
        for _ in mouse_wheel.read() {}
    }

    // Touch support for mobile
    if touch_input.iter().count() == 1 && !egui_wants_pointer {
        for touch in touch_input.iter() {
            let delta = touch.delta();
            if delta != Vec2::ZERO {
                settings.azimuth += delta.x * settings.sensitivity;
                settings.elevation = (settings.elevation + delta.y * settings.sensitivity)
                    .clamp(MIN_ELEVATION, MAX_ELEVATION);
            }
        }
    }

    // Pinch to zoom
    if touch_input.iter().count() == 2 {
        let touches: Vec<_> = touch_input.iter().collect();
        if let (Some(t1), Some(t2)) = (touches.first(), touches.get(1)) {
            let curr_dist = t1.position().distance(t2.position());
            let prev_dist = (t1.position() - t1.delta())
                .distance(t2.position() - t2.delta());
            let zoom_factor = prev_dist / curr_dist.max(1.0);
            settings.target_distance = (settings.target_distance * zoom_factor)
                .clamp(settings.min_distance, settings.max_distance);
        }
    }

    // Damping: ease distance and focus towards their targets
    let dt = time.delta_secs();
    let lerp_factor = 1.0 - (-settings.smooth_factor * 60.0 * dt).exp();
    settings.distance += (settings.target_distance - settings.distance) * lerp_factor;
    settings.target = settings.target + (settings.target_focus - settings.target) * lerp_factor;

    if let Ok(mut transform) = camera_query.single_mut() {
        transform.translation = settings.eye();
        transform.look_at(settings.target, Vec3::Y);
    }
}

/// Press/release tracking so orbit drags don't count as clicks
#[derive(Resource, Default)]
pub struct TouchState {
    /// Position where the press or touch started
    start_position: Option<Vec2>,
    /// Whether it has moved significantly (is a drag, not a tap)
    is_dragging: bool,
}

impl TouchState {
    fn press(&mut self, position: Vec2) {
        self.start_position = Some(position);
        self.is_dragging = false;
    }

    fn track(&mut self, position: Vec2) {
        if let Some(start) = self.start_position {
            if position.distance(start) > DRAG_THRESHOLD {
                self.is_dragging = true;
            }
        }
    }

    /// End the gesture; returns the click position unless it was a drag
    fn release(&mut self) -> Option<Vec2> {
        let click = self.start_position.take().filter(|_| !self.is_dragging);
        self.is_dragging = false;
        click
    }
}

/// Turn a click or tap in the scene into `place_marker` on the nearest hit:
/// a room mesh or the invisible floor plane
fn handle_placement_click(
    mut view: ResMut<View>,
    config: Res<AppConfig>,
    camera_query: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    room_meshes: Query<(), With<RoomMesh>>,
    mut ray_cast: MeshRayCast,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    windows: Query<&Window>,
    mut contexts: bevy_egui::EguiContexts,
    mut touch_state: ResMut<TouchState>,
) {
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input() || ctx.is_pointer_over_area())
        .unwrap_or(false);
    let Ok(window) = windows.single() else {
        return;
    };

    let mut click_pos: Option<Vec2> = None;

    // Touch: tap = release without significant movement
    for touch in touch_input.iter() {
        if touch_input.just_pressed(touch.id()) {
            if egui_wants_pointer {
                continue;
            }
            touch_state.press(touch.position());
        } else {
            touch_state.track(touch.position());
        }
    }
    for touch in touch_input.iter_just_released() {
        touch_state.track(touch.position());
        click_pos = touch_state.release();
    }

    // Mouse: same gesture rules with the left button
    if mouse_button.just_pressed(MouseButton::Left) && !egui_wants_pointer {
        if let Some(cursor) = window.cursor_position() {
            touch_state.press(cursor);
        }
    }
    if mouse_button.pressed(MouseButton::Left) {
        if let Some(cursor) = window.cursor_position() {
            touch_state.track(cursor);
        }
    }
    if mouse_button.just_released(MouseButton::Left) {
        click_pos = touch_state.release().or(click_pos);
    }

    let Some(pos) = click_pos else {
        return;
    };
    // Clicks without an active marker kind are no-ops
    if view.placing().is_none() {
        return;
    }

    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };
    let Ok(ray) = camera.viewport_to_world(camera_transform, pos) else {
        return;
    };

    // Nearest room hit
    let filter = |entity: Entity| room_meshes.contains(entity);
    let settings = MeshRayCastSettings::default().with_filter(&filter);
    let room_hit = ray_cast
        .cast_ray(ray, &settings)
        .first()
        .map(|(_, hit)| (hit.point, hit.distance));

    // Invisible click plane, lowered under a room
    let floor = FloorPlane {
        height: if view.room().is_some() { ROOM_FLOOR_HEIGHT } else { 0.0 },
        half_extent: config.scene.floor_size / 2.0,
    };
    let floor_hit = floor
        .ray_hit(ray.origin.to_array(), ray.direction.as_vec3().to_array())
        .map(|(point, t)| (Vec3::from_array(point), t));

    let Some((point, _)) = nearest_hit(room_hit, floor_hit) else {
        debug!(?pos, "Click missed every placement target");
        return;
    };
    view.place_marker(MarkerPosition::from_array(point.to_array()));
}

/// Pick the closer of two optional `(point, distance)` hits
fn nearest_hit(a: Option<(Vec3, f32)>, b: Option<(Vec3, f32)>) -> Option<(Vec3, f32)> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if a.1 <= b.1 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// The grid floor is only shown while no room is loaded
fn update_grid_visibility(
    view: Res<View>,
    mut grid_query: Query<&mut Visibility, With<GridLine>>,
) {
    if !view.is_changed() {
        return;
    }

    let grid_visibility = if view.room().is_some() {
        Visibility::Hidden
    } else {
        Visibility::Visible
    };

    for mut visibility in grid_query.iter_mut() {
        visibility.set_if_neq(grid_visibility);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_press_is_a_click() {
        let mut state = TouchState::default();
        state.press(Vec2::new(100.0, 100.0));
        state.track(Vec2::new(104.0, 103.0));
        assert_eq!(state.release(), Some(Vec2::new(100.0, 100.0)));
        // Nothing pressed any more
        assert_eq!(state.release(), None);
    }

    #[test]
    fn test_drag_is_not_a_click() {
        let mut state = TouchState::default();
        state.press(Vec2::new(100.0, 100.0));
        state.track(Vec2::new(140.0, 100.0));
        state.track(Vec2::new(101.0, 100.0));
        assert_eq!(state.release(), None);

        state.press(Vec2::new(10.0, 10.0));
        assert_eq!(state.release(), Some(Vec2::new(10.0, 10.0)));
    }

    #[test]
    fn test_nearest_hit_wins() {
        let room = Some((Vec3::new(0.0, 1.0, 0.0), 2.0));
        let floor = Some((Vec3::new(0.0, -0.5, 0.0), 3.5));
        assert_eq!(nearest_hit(room, floor), room);
        assert_eq!(nearest_hit(floor, room), room);
        assert_eq!(nearest_hit(None, floor), floor);
        assert_eq!(nearest_hit(None, None), None);
    }
}
