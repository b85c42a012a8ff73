//! Phone/laptop markers and the beam between them
//!
//! Entities are rebuilt only when a marker position or the detection flag
//! changes. Everything that moves between rebuilds (float, glow pulse, beam
//! flash) is derived from elapsed time.

use bevy::prelude::*;
use beamsight_core::animation::{
    beam_color, beam_opacity, glow_scale, marker_color, marker_float_offset, Rgb,
};
use beamsight_core::geometry::{beam_curve, beam_particles};
use beamsight_core::{MarkerKind, MarkerPosition};
use tracing::debug;

use crate::app::View;

const GLOW_RADIUS: f32 = 0.15;
const GLOW_OPACITY: f32 = 0.3;
const CORE_RADIUS: f32 = 0.08;
const TUBE_RADIUS: f32 = 0.015;
const CORE_LINE_RADIUS: f32 = 0.004;
const PARTICLE_RADIUS: f32 = 0.008;

pub struct MarkersPlugin;

impl Plugin for MarkersPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (
            sync_markers,
            animate_markers,
            animate_beam,
        ).chain());
    }
}

/// Root of a placed marker, positioned at the placed point
#[derive(Component)]
pub struct MarkerEntity {
    pub kind: MarkerKind,
}

/// Solid sphere that bobs up and down
#[derive(Component)]
pub struct MarkerCore;

/// Translucent shell that pulses
#[derive(Component)]
pub struct MarkerGlow;

/// Root of the beam; all tube segments share `tube_material`
#[derive(Component)]
pub struct BeamEntity {
    pub detected: bool,
    tube_material: Handle<StandardMaterial>,
}

/// What the marker/beam entities were last built from
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct SceneSignature {
    phone: Option<MarkerPosition>,
    laptop: Option<MarkerPosition>,
    detected: bool,
}

impl SceneSignature {
    fn from_view(view: &View) -> Self {
        Self {
            phone: view.position(MarkerKind::Phone),
            laptop: view.position(MarkerKind::Laptop),
            detected: view.is_detected(),
        }
    }
}

fn to_color(rgb: Rgb) -> Color {
    Color::srgb_u8(rgb[0], rgb[1], rgb[2])
}

fn to_vec3(p: &MarkerPosition) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

fn sync_markers(
    mut commands: Commands,
    view: Res<View>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    existing: Query<Entity, Or<(With<MarkerEntity>, With<BeamEntity>)>>,
    mut built: Local<Option<SceneSignature>>,
) {
    let signature = SceneSignature::from_view(&view);
    if *built == Some(signature) {
        return;
    }
    *built = Some(signature);

    for entity in existing.iter() {
        commands.entity(entity).despawn();
    }

    for kind in MarkerKind::ALL {
        if let Some(position) = view.position(kind) {
            spawn_marker(
                &mut commands,
                &mut meshes,
                &mut materials,
                kind,
                &position,
                signature.detected,
            );
        }
    }

    if let Some((start, end)) = view.detection().beam_endpoints() {
        spawn_beam(&mut commands, &mut meshes, &mut materials, &start, &end, signature.detected);
    }

    debug!(?signature, "Markers rebuilt");
}

fn spawn_marker(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    kind: MarkerKind,
    position: &MarkerPosition,
    detected: bool,
) {
    let color = to_color(marker_color(kind, detected));

    let glow_material = materials.add(StandardMaterial {
        base_color: color.with_alpha(GLOW_OPACITY),
        unlit: true,
        alpha_mode: AlphaMode::Blend,
        ..default()
    });
    let core_material = materials.add(StandardMaterial {
        base_color: color,
        emissive: LinearRgba::from(color) * 0.5,
        metallic: 0.8,
        perceptual_roughness: 0.2,
        ..default()
    });

    commands
        .spawn((
            Transform::from_translation(to_vec3(position)),
            Visibility::default(),
            MarkerEntity { kind },
            Name::new(kind.title()),
        ))
        .with_children(|parent| {
            parent.spawn((
                Mesh3d(meshes.add(Sphere::new(GLOW_RADIUS))),
                MeshMaterial3d(glow_material),
                Transform::default(),
                MarkerGlow,
            ));
            parent.spawn((
                Mesh3d(meshes.add(Sphere::new(CORE_RADIUS))),
                MeshMaterial3d(core_material),
                Transform::default(),
                MarkerCore,
            ));
        });
}

/// Cylinder transform spanning `a` to `b`, or `None` for a zero-length span
fn segment_transform(a: Vec3, b: Vec3) -> Option<(Transform, f32)> {
    let span = b - a;
    let length = span.length();
    if length <= f32::EPSILON {
        return None;
    }
    let transform = Transform::from_translation((a + b) * 0.5)
        .with_rotation(Quat::from_rotation_arc(Vec3::Y, span / length));
    Some((transform, length))
}

fn spawn_beam(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    start: &MarkerPosition,
    end: &MarkerPosition,
    detected: bool,
) {
    let color = to_color(beam_color(detected));
    let points: Vec<Vec3> = beam_curve(start, end).iter().map(to_vec3).collect();

    let tube_material = materials.add(StandardMaterial {
        base_color: color.with_alpha(beam_opacity(0.0, detected)),
        unlit: true,
        alpha_mode: AlphaMode::Blend,
        ..default()
    });
    let core_material = materials.add(StandardMaterial {
        base_color: color,
        unlit: true,
        ..default()
    });
    let particle_mesh = meshes.add(Sphere::new(PARTICLE_RADIUS));

    let segments: Vec<(Transform, f32)> = points
        .windows(2)
        .filter_map(|pair| segment_transform(pair[0], pair[1]))
        .collect();

    commands
        .spawn((
            Transform::default(),
            Visibility::default(),
            BeamEntity {
                detected,
                tube_material: tube_material.clone(),
            },
            Name::new("Beam"),
        ))
        .with_children(|parent| {
            for (transform, length) in &segments {
                parent.spawn((
                    Mesh3d(meshes.add(Cylinder::new(TUBE_RADIUS, *length))),
                    MeshMaterial3d(tube_material.clone()),
                    *transform,
                ));
                parent.spawn((
                    Mesh3d(meshes.add(Cylinder::new(CORE_LINE_RADIUS, *length))),
                    MeshMaterial3d(core_material.clone()),
                    *transform,
                ));
            }

            for point in beam_particles(&beam_curve(start, end)) {
                parent.spawn((
                    Mesh3d(particle_mesh.clone()),
                    MeshMaterial3d(core_material.clone()),
                    Transform::from_translation(to_vec3(&point)),
                ));
            }
        });
}

fn animate_markers(
    time: Res<Time>,
    mut cores: Query<&mut Transform, (With<MarkerCore>, Without<MarkerGlow>)>,
    mut glows: Query<&mut Transform, (With<MarkerGlow>, Without<MarkerCore>)>,
) {
    let t = time.elapsed_secs();

    let offset = marker_float_offset(t);
    for mut transform in cores.iter_mut() {
        transform.translation.y = offset;
    }

    let scale = Vec3::splat(glow_scale(t));
    for mut transform in glows.iter_mut() {
        transform.scale = scale;
    }
}

fn animate_beam(
    time: Res<Time>,
    beams: Query<&BeamEntity>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let t = time.elapsed_secs();
    for beam in beams.iter() {
        // Steady beams only need the opacity set at spawn
        if !beam.detected {
            continue;
        }
        if let Some(material) = materials.get_mut(&beam.tube_material) {
            material.base_color.set_alpha(beam_opacity(t, true));
        }
    }
}
