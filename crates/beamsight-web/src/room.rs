//! Room scan loading and normalisation
//!
//! Uploaded `.glb` bytes go into an in-memory asset source under a fresh
//! path per revision, so a replaced room never reuses a cached handle. Rooms
//! named at startup (config, `--room` or `?room=`) load through the regular
//! file/https sources instead.

use bevy::asset::io::memory::Dir;
use bevy::asset::LoadState;
use bevy::gltf::Gltf;
use bevy::mesh::VertexAttributeValues;
use bevy::prelude::*;
use bevy::scene::{SceneInstance, SceneSpawner};
use beamsight_core::geometry::{Bounds, RoomFit};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::app::{AppConfig, View};
use crate::file_picker::{FilePickerContext, FilePickerState};

/// Asset source id for uploaded room scans
pub const UPLOAD_SOURCE: &str = "upload";

/// Color of the stand-in cube shown while a room loads
const PLACEHOLDER_COLOR: Color = Color::srgba(0.0, 0.83, 1.0, 0.35);

pub struct RoomPlugin;

impl Plugin for RoomPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RoomAssets>()
            .add_systems(Startup, load_startup_room)
            .add_systems(Update, (
                receive_room_uploads,
                sync_room,
                watch_room_load,
                mark_ready_rooms,
                normalize_room,
            ).chain());
    }
}

/// Backing storage of the `upload://` asset source
#[derive(Resource, Clone, Default)]
pub struct UploadDir(pub Dir);

/// Asset path of the room revision the view points at
#[derive(Resource, Debug, Default)]
pub struct RoomAssets {
    paths: HashMap<u32, String>,
}

impl RoomAssets {
    /// Record the path for `revision` and release every superseded one.
    /// Superseded uploads are dropped from `dir` so their bytes are freed.
    pub fn replace(&mut self, revision: u32, path: String, dir: &Dir) {
        for (old_revision, old_path) in self.paths.drain() {
            if let Some(file) = upload_file(&old_path) {
                let freed = dir.remove_asset(Path::new(file)).is_some();
                debug!(revision = old_revision, path = %old_path, freed, "Released room upload");
            }
        }
        self.paths.insert(revision, path);
    }

    pub fn path(&self, revision: u32) -> Option<&str> {
        self.paths.get(&revision).map(String::as_str)
    }
}

/// File name inside the upload source for an `upload://` path
fn upload_file(path: &str) -> Option<&str> {
    path.strip_prefix(UPLOAD_SOURCE)?.strip_prefix("://")
}

/// Root of a spawned room scene
#[derive(Component)]
pub struct RoomRoot {
    pub revision: u32,
    /// Keeps the whole glTF alive and lets us watch its load state
    gltf: Handle<Gltf>,
}

/// Mesh inside a normalised room; the placement ray cast targets these
#[derive(Component)]
pub struct RoomMesh;

/// Stand-in shown until the current room is ready
#[derive(Component)]
pub struct RoomPlaceholder;

/// The room's scene instance has finished spawning
#[derive(Component)]
struct RoomReady;

#[derive(Component)]
struct RoomNormalized;

#[derive(Component)]
struct RoomFailed;

/// Display name for a room path or URL: the last path segment
pub fn room_name(path: &str) -> &str {
    let without_query = path.split(|c| c == '?' || c == '#').next().unwrap_or(path);
    without_query
        .rsplit(|c| c == '/' || c == '\\')
        .find(|segment| !segment.is_empty())
        .unwrap_or(without_query)
}

fn load_startup_room(
    config: Res<AppConfig>,
    mut view: ResMut<View>,
    upload_dir: Res<UploadDir>,
    mut rooms: ResMut<RoomAssets>,
) {
    let Some(path) = config.scene.room.clone() else {
        return;
    };
    let scan = view.load_room(room_name(&path));
    info!(%path, revision = scan.revision, "Loading startup room scan");
    rooms.replace(scan.revision, path, &upload_dir.0);
}

/// Accept picked files: `.glb` uploads become the new room, anything else is
/// dropped without touching the view
fn receive_room_uploads(
    mut picker: ResMut<FilePickerState>,
    mut view: ResMut<View>,
    upload_dir: Res<UploadDir>,
    mut rooms: ResMut<RoomAssets>,
) {
    while let Some(result) = picker.take_result_for(&FilePickerContext::RoomScan) {
        if !result.success {
            debug!(
                filename = %result.filename,
                operation = ?result.operation,
                error = ?result.error,
                "Room scan pick failed"
            );
            continue;
        }
        let Some(bytes) = result.content else {
            continue;
        };

        match view.upload_room(&result.filename, bytes) {
            Ok(accepted) => {
                let path = accepted.scan.asset_path();
                upload_dir.0.insert_asset(Path::new(&path), accepted.bytes);
                rooms.replace(
                    accepted.scan.revision,
                    format!("{}://{}", UPLOAD_SOURCE, path),
                    &upload_dir.0,
                );
            }
            Err(e) => debug!(error = %e, "Ignoring upload"),
        }
    }
}

/// Spawn the scene for a new room revision, replacing the previous room
fn sync_room(
    mut commands: Commands,
    view: Res<View>,
    rooms: Res<RoomAssets>,
    asset_server: Res<AssetServer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    existing: Query<Entity, Or<(With<RoomRoot>, With<RoomPlaceholder>)>>,
    mut synced_revision: Local<u32>,
) {
    let Some(scan) = view.room() else {
        return;
    };
    if scan.revision == *synced_revision {
        return;
    }
    *synced_revision = scan.revision;

    for entity in existing.iter() {
        commands.entity(entity).despawn();
    }

    let Some(path) = rooms.path(scan.revision) else {
        warn!(revision = scan.revision, "No asset path for room scan");
        return;
    };

    let gltf: Handle<Gltf> = asset_server.load(path.to_string());
    let scene = asset_server.load(GltfAssetLabel::Scene(0).from_asset(path.to_string()));
    commands.spawn((
        SceneRoot(scene),
        Transform::default(),
        RoomRoot {
            revision: scan.revision,
            gltf,
        },
        Name::new(format!("Room: {}", scan.name)),
    ));

    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(1.0, 1.0, 1.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: PLACEHOLDER_COLOR,
            unlit: true,
            alpha_mode: AlphaMode::Blend,
            ..default()
        })),
        Transform::default(),
        RoomPlaceholder,
    ));

    debug!(%path, revision = scan.revision, "Room scene spawned");
}

/// Failed loads keep the placeholder; there is no other fallback
fn watch_room_load(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    rooms: Query<(Entity, &RoomRoot), (Without<RoomNormalized>, Without<RoomFailed>)>,
) {
    for (entity, room) in rooms.iter() {
        if let Some(LoadState::Failed(err)) = asset_server.get_load_state(room.gltf.id()) {
            warn!(revision = room.revision, error = %err, "Failed to load room scan");
            commands.entity(entity).insert(RoomFailed);
        }
    }
}

fn mark_ready_rooms(
    mut commands: Commands,
    scene_spawner: Res<SceneSpawner>,
    rooms: Query<(Entity, &SceneInstance), (With<RoomRoot>, Without<RoomReady>)>,
) {
    for (root, instance) in rooms.iter() {
        if scene_spawner.instance_is_ready(**instance) {
            commands.entity(root).insert(RoomReady);
        }
    }
}

/// Centre a ready room, scale its largest dimension to the target size and
/// tweak its materials
fn normalize_room(
    mut commands: Commands,
    config: Res<AppConfig>,
    mut rooms: Query<(Entity, &RoomRoot, &mut Transform), (With<RoomReady>, Without<RoomNormalized>)>,
    children: Query<&Children>,
    mesh_query: Query<(&Mesh3d, &GlobalTransform, Option<&MeshMaterial3d<StandardMaterial>>)>,
    meshes: Res<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    placeholders: Query<Entity, With<RoomPlaceholder>>,
) {
    for (root, room, mut transform) in rooms.iter_mut() {

        // The root is still at identity, so world space equals room space
        let mut bounds = Bounds::empty();
        let mut mesh_count = 0;
        for entity in children.iter_descendants(root) {
            let Ok((mesh3d, global, material)) = mesh_query.get(entity) else {
                continue;
            };
            mesh_count += 1;

            if let Some(VertexAttributeValues::Float32x3(positions)) = meshes
                .get(&mesh3d.0)
                .and_then(|mesh| mesh.attribute(Mesh::ATTRIBUTE_POSITION))
            {
                for p in positions {
                    bounds.include_point(global.transform_point(Vec3::from_array(*p)).to_array());
                }
            }

            if let Some(material) = material.and_then(|m| materials.get_mut(&m.0)) {
                material.perceptual_roughness = 0.7;
                material.metallic = 0.1;
            }
            commands.entity(entity).insert(RoomMesh);
        }

        let fit = RoomFit::for_bounds(&bounds, config.scene.room_target_size);
        *transform = Transform::from_translation(Vec3::from_array(fit.translation))
            .with_scale(Vec3::splat(fit.scale));
        commands.entity(root).insert(RoomNormalized);

        for placeholder in placeholders.iter() {
            commands.entity(placeholder).despawn();
        }

        info!(
            revision = room.revision,
            meshes = mesh_count,
            size = ?bounds.size(),
            scale = fit.scale,
            "Room scan normalised"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_picker::{FileOperation, FilePickerResult};

    fn upload_app() -> App {
        let mut app = App::new();
        app.init_resource::<FilePickerState>()
            .init_resource::<View>()
            .init_resource::<UploadDir>()
            .init_resource::<RoomAssets>()
            .add_systems(Update, receive_room_uploads);
        app
    }

    fn picked(filename: &str, content: &[u8]) -> FilePickerResult {
        FilePickerResult {
            context: FilePickerContext::RoomScan,
            operation: FileOperation::Open,
            filename: filename.to_string(),
            content: Some(content.to_vec()),
            success: true,
            error: None,
        }
    }

    #[test]
    fn test_room_name_from_paths_and_urls() {
        assert_eq!(room_name("office.glb"), "office.glb");
        assert_eq!(room_name("rooms/lab/office.glb"), "office.glb");
        assert_eq!(room_name("https://scans.local/scans/lobby.glb?v=2"), "lobby.glb");
        assert_eq!(room_name("C:\\scans\\den.glb"), "den.glb");
    }

    #[test]
    fn test_glb_upload_becomes_room() {
        let mut app = upload_app();
        app.world_mut()
            .resource_mut::<FilePickerState>()
            .completed_results
            .push_back(picked("office.glb", b"glTF"));
        app.update();

        let view = app.world().resource::<View>();
        let scan = view.room().unwrap();
        assert_eq!(scan.name, "office.glb");
        assert_eq!(scan.revision, 1);
        assert_eq!(
            app.world().resource::<RoomAssets>().path(1),
            Some("upload://room-1.glb")
        );

        let dir = &app.world().resource::<UploadDir>().0;
        assert!(dir.get_asset(Path::new("room-1.glb")).is_some());
    }

    #[test]
    fn test_replaced_upload_is_released() {
        let mut app = upload_app();
        for name in ["first.glb", "second.glb"] {
            app.world_mut()
                .resource_mut::<FilePickerState>()
                .completed_results
                .push_back(picked(name, b"glTF"));
            app.update();
        }

        assert_eq!(app.world().resource::<View>().room().map(|r| r.revision), Some(2));
        let rooms = app.world().resource::<RoomAssets>();
        assert_eq!(rooms.path(1), None);
        assert_eq!(rooms.path(2), Some("upload://room-2.glb"));

        let dir = &app.world().resource::<UploadDir>().0;
        assert!(dir.get_asset(Path::new("room-1.glb")).is_none());
        assert!(dir.get_asset(Path::new("room-2.glb")).is_some());
    }

    #[test]
    fn test_upload_file_names() {
        assert_eq!(upload_file("upload://room-3.glb"), Some("room-3.glb"));
        assert_eq!(upload_file("scans/lobby.glb"), None);
        assert_eq!(upload_file("https://scans.local/lobby.glb"), None);
    }

    #[test]
    fn test_other_files_are_ignored() {
        let mut app = upload_app();
        app.world_mut()
            .resource_mut::<FilePickerState>()
            .completed_results
            .push_back(picked("office.GLB", b"glTF"));
        app.update();

        assert!(app.world().resource::<View>().room().is_none());
        assert!(app.world().resource::<RoomAssets>().path(1).is_none());
        assert!(app
            .world()
            .resource::<FilePickerState>()
            .completed_results
            .is_empty());
    }

    #[test]
    fn test_empty_glb_still_switches_room() {
        let mut app = upload_app();
        app.world_mut()
            .resource_mut::<FilePickerState>()
            .completed_results
            .push_back(picked("blank.glb", b""));
        app.update();

        let view = app.world().resource::<View>();
        assert_eq!(view.room().map(|r| r.name.as_str()), Some("blank.glb"));
        assert_eq!(
            app.world().resource::<RoomAssets>().path(1),
            Some("upload://room-1.glb")
        );
    }

    #[test]
    fn test_ready_room_is_normalised() {
        let mut app = App::new();
        app.init_resource::<AppConfig>()
            .init_resource::<Assets<Mesh>>()
            .init_resource::<Assets<StandardMaterial>>()
            .add_systems(Update, normalize_room);

        let world = app.world_mut();
        // 2 x 4 x 1 box whose world-space centre is (1, 0, 0)
        let mesh = world
            .resource_mut::<Assets<Mesh>>()
            .add(Mesh::from(Cuboid::new(2.0, 4.0, 1.0)));
        let material = world
            .resource_mut::<Assets<StandardMaterial>>()
            .add(StandardMaterial::default());
        let placeholder = world.spawn(RoomPlaceholder).id();

        let root = world
            .spawn((
                Transform::default(),
                RoomRoot {
                    revision: 1,
                    gltf: Handle::default(),
                },
                RoomReady,
            ))
            .id();
        let child = world
            .spawn((
                Mesh3d(mesh),
                MeshMaterial3d(material.clone()),
                GlobalTransform::from_translation(Vec3::new(1.0, 0.0, 0.0)),
                ChildOf(root),
            ))
            .id();

        app.update();

        let world = app.world();
        let transform = world.get::<Transform>(root).unwrap();
        assert!((transform.scale - Vec3::splat(0.75)).length() < 1e-5, "{:?}", transform);
        assert!(
            (transform.translation - Vec3::new(-0.75, 0.0, 0.0)).length() < 1e-5,
            "{:?}",
            transform
        );
        assert!(world.get::<RoomNormalized>(root).is_some());
        assert!(world.get::<RoomMesh>(child).is_some());
        assert!(world.get_entity(placeholder).is_err());

        let material = world
            .resource::<Assets<StandardMaterial>>()
            .get(&material)
            .unwrap();
        assert_eq!(material.perceptual_roughness, 0.7);
        assert_eq!(material.metallic, 0.1);
    }

    #[test]
    fn test_rooms_wait_for_scene_instance() {
        let mut app = App::new();
        app.init_resource::<AppConfig>()
            .init_resource::<Assets<Mesh>>()
            .init_resource::<Assets<StandardMaterial>>()
            .add_systems(Update, normalize_room);

        let placeholder = app.world_mut().spawn(RoomPlaceholder).id();
        let root = app
            .world_mut()
            .spawn((
                Transform::default(),
                RoomRoot {
                    revision: 1,
                    gltf: Handle::default(),
                },
            ))
            .id();
        app.update();

        assert!(app.world().get::<RoomNormalized>(root).is_none());
        assert!(app.world().get_entity(placeholder).is_ok());
    }

    #[test]
    fn test_startup_room_from_config() {
        let mut config = beamsight_core::ViewerConfig::default();
        config.scene.room = Some("scans/lobby.glb".to_string());

        let mut app = App::new();
        app.insert_resource(AppConfig(config))
            .init_resource::<View>()
            .init_resource::<UploadDir>()
            .init_resource::<RoomAssets>()
            .add_systems(Startup, load_startup_room);
        app.update();

        let view = app.world().resource::<View>();
        assert_eq!(view.room().map(|r| r.name.as_str()), Some("lobby.glb"));
        assert_eq!(
            app.world().resource::<RoomAssets>().path(1),
            Some("scans/lobby.glb")
        );
    }
}
