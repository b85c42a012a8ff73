//! Scene geometry helpers: room bounds/normalisation, floor ray casts and
//! the beam curve

use crate::types::MarkerPosition;

/// Largest dimension of an uploaded room after normalisation (meters)
pub const ROOM_TARGET_SIZE: f32 = 3.0;

/// Number of curve segments sampled along the beam
pub const BEAM_SEGMENTS: usize = 50;

/// Height the beam's control point is lifted above the straight midpoint
pub const BEAM_ARC_LIFT: f32 = 0.1;

/// Every n-th beam point gets a particle dot
pub const BEAM_PARTICLE_STRIDE: usize = 5;

/// Axis-aligned bounding box accumulated from points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Default for Bounds {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bounds {
    pub fn empty() -> Self {
        Self {
            min: [f32::MAX; 3],
            max: [f32::MIN; 3],
        }
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    pub fn include_point(&mut self, p: [f32; 3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    pub fn merge(&mut self, other: &Bounds) {
        if other.is_empty() {
            return;
        }
        self.include_point(other.min);
        self.include_point(other.max);
    }

    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }

    pub fn size(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    pub fn max_dimension(&self) -> f32 {
        let s = self.size();
        s[0].max(s[1]).max(s[2])
    }
}

/// Uniform scale and offset that centre a room at the origin and fit its
/// largest dimension to a target size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomFit {
    pub scale: f32,
    pub translation: [f32; 3],
}

impl RoomFit {
    pub const IDENTITY: RoomFit = RoomFit {
        scale: 1.0,
        translation: [0.0; 3],
    };

    /// Compute the fit for a room whose root sits at the origin unscaled.
    /// Empty or flat-to-a-point bounds keep scale 1 and only recentre.
    pub fn for_bounds(bounds: &Bounds, target_size: f32) -> RoomFit {
        if bounds.is_empty() {
            return RoomFit::IDENTITY;
        }
        let max_dim = bounds.max_dimension();
        let scale = if max_dim > f32::EPSILON && max_dim.is_finite() {
            target_size / max_dim
        } else {
            1.0
        };
        let c = bounds.center();
        RoomFit {
            scale,
            translation: [-c[0] * scale, -c[1] * scale, -c[2] * scale],
        }
    }

    pub fn apply(&self, p: [f32; 3]) -> [f32; 3] {
        [
            p[0] * self.scale + self.translation[0],
            p[1] * self.scale + self.translation[1],
            p[2] * self.scale + self.translation[2],
        ]
    }
}

/// Horizontal clickable plane (normal +Y) with a square extent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorPlane {
    pub height: f32,
    /// Half of the plane's side length
    pub half_extent: f32,
}

impl FloorPlane {
    /// Intersect a ray with the plane. Returns the hit point and the ray
    /// parameter, or `None` when the ray is parallel, points away, or lands
    /// outside the plane.
    pub fn ray_hit(&self, origin: [f32; 3], direction: [f32; 3]) -> Option<([f32; 3], f32)> {
        if direction[1].abs() < 1e-6 {
            return None;
        }
        let t = (self.height - origin[1]) / direction[1];
        if t < 0.0 {
            return None;
        }
        let hit = [
            origin[0] + direction[0] * t,
            self.height,
            origin[2] + direction[2] * t,
        ];
        if hit[0].abs() > self.half_extent || hit[2].abs() > self.half_extent {
            return None;
        }
        Some((hit, t))
    }
}

/// Point on a quadratic Bézier curve
pub fn quadratic_bezier(
    p0: &MarkerPosition,
    p1: &MarkerPosition,
    p2: &MarkerPosition,
    t: f32,
) -> MarkerPosition {
    let u = 1.0 - t;
    let a = u * u;
    let b = 2.0 * u * t;
    let c = t * t;
    MarkerPosition {
        x: a * p0.x + b * p1.x + c * p2.x,
        y: a * p0.y + b * p1.y + c * p2.y,
        z: a * p0.z + b * p1.z + c * p2.z,
    }
}

/// Sample the slightly arched beam between two markers.
///
/// Returns `BEAM_SEGMENTS + 1` points from `start` to `end`.
pub fn beam_curve(start: &MarkerPosition, end: &MarkerPosition) -> Vec<MarkerPosition> {
    let mut control = start.lerp(end, 0.5);
    control.y += BEAM_ARC_LIFT;

    (0..=BEAM_SEGMENTS)
        .map(|i| quadratic_bezier(start, &control, end, i as f32 / BEAM_SEGMENTS as f32))
        .collect()
}

/// Points along the beam that carry a particle dot
pub fn beam_particles(points: &[MarkerPosition]) -> Vec<MarkerPosition> {
    points
        .iter()
        .step_by(BEAM_PARTICLE_STRIDE)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_room_fit_centres_and_scales() {
        let mut bounds = Bounds::empty();
        bounds.include_point([2.0, 0.0, -1.0]);
        bounds.include_point([8.0, 3.0, 1.0]);

        let fit = RoomFit::for_bounds(&bounds, ROOM_TARGET_SIZE);
        // Largest dimension is 6 on X
        assert!(approx(fit.scale, 0.5));

        let lo = fit.apply(bounds.min);
        let hi = fit.apply(bounds.max);
        assert!(approx(lo[0], -1.5) && approx(hi[0], 1.5));
        assert!(approx(lo[1], -0.75) && approx(hi[1], 0.75));
        assert!(approx(lo[2], -0.5) && approx(hi[2], 0.5));
    }

    #[test]
    fn test_room_fit_degenerate_bounds() {
        assert_eq!(RoomFit::for_bounds(&Bounds::empty(), 3.0), RoomFit::IDENTITY);

        let mut point = Bounds::empty();
        point.include_point([1.0, 2.0, 3.0]);
        let fit = RoomFit::for_bounds(&point, 3.0);
        assert_eq!(fit.scale, 1.0);
        assert_eq!(fit.apply([1.0, 2.0, 3.0]), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_bounds_merge_ignores_empty() {
        let mut a = Bounds::empty();
        a.include_point([0.0, 0.0, 0.0]);
        a.merge(&Bounds::empty());
        assert_eq!(a.size(), [0.0, 0.0, 0.0]);

        let mut b = Bounds::empty();
        b.include_point([1.0, -1.0, 2.0]);
        a.merge(&b);
        assert_eq!(a.min, [0.0, -1.0, 0.0]);
        assert_eq!(a.max, [1.0, 0.0, 2.0]);
    }

    #[test]
    fn test_floor_ray_hit() {
        let floor = FloorPlane { height: 0.0, half_extent: 10.0 };

        let (hit, t) = floor.ray_hit([3.0, 3.0, 3.0], [-1.0, -1.0, -1.0]).unwrap();
        assert!(approx(t, 3.0));
        assert!(approx(hit[0], 0.0) && approx(hit[1], 0.0) && approx(hit[2], 0.0));

        // Parallel and upward rays miss
        assert!(floor.ray_hit([0.0, 1.0, 0.0], [1.0, 0.0, 0.0]).is_none());
        assert!(floor.ray_hit([0.0, 1.0, 0.0], [0.0, 1.0, 0.0]).is_none());

        // Outside the 20x20 plane
        assert!(floor.ray_hit([0.0, 1.0, 0.0], [20.0, -1.0, 0.0]).is_none());

        let lowered = FloorPlane { height: -0.5, half_extent: 10.0 };
        let (hit, _) = lowered.ray_hit([0.0, 1.0, 0.0], [0.0, -1.0, 0.0]).unwrap();
        assert!(approx(hit[1], -0.5));
    }

    #[test]
    fn test_beam_curve_shape() {
        let start = MarkerPosition::new(0.0, 0.0, 0.0);
        let end = MarkerPosition::new(2.0, 0.0, 0.0);
        let points = beam_curve(&start, &end);

        assert_eq!(points.len(), BEAM_SEGMENTS + 1);
        assert_eq!(points[0], start);
        assert_eq!(points[BEAM_SEGMENTS], end);

        // Quadratic Bézier reaches half the control lift at t = 0.5
        let mid = points[BEAM_SEGMENTS / 2];
        assert!(approx(mid.x, 1.0));
        assert!(approx(mid.y, BEAM_ARC_LIFT / 2.0));
    }

    #[test]
    fn test_beam_particles_every_fifth_point() {
        let points = beam_curve(&MarkerPosition::default(), &MarkerPosition::new(0.0, 0.0, 5.0));
        let particles = beam_particles(&points);
        assert_eq!(particles.len(), 11);
        assert_eq!(particles[1], points[5]);
        assert_eq!(particles[10], points[50]);
    }
}
