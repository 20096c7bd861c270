//! Target perception: range, field of view and line of sight.
//!
//! [`perceive`] is a pure function of the agent pose, the sensor settings,
//! the target position and whatever the [`SightProbe`] reports. It never
//! touches agent state and never draws random numbers.

use glam::{Quat, Vec3};
use invasion_common::{forward, horizontal_bearing_deg, EntityId};
use serde::{Deserialize, Serialize};

/// Position and orientation of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World position (feet)
    pub position: Vec3,
    /// Yaw rotation; +Z is forward when unrotated
    pub rotation: Quat,
}

impl Pose {
    /// Creates a pose.
    #[must_use]
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Forward facing vector.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        forward(self.rotation)
    }

    /// Converts a local offset (e.g. head or muzzle) into world space.
    #[must_use]
    pub fn transform_point(&self, offset: Vec3) -> Vec3 {
        self.position + self.rotation * offset
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY)
    }
}

/// Sensor settings of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    /// Maximum detection distance
    pub view_range: f32,
    /// Half-angle of the view cone in degrees (180 = all around)
    pub view_angle: f32,
    /// Sensor origin relative to the agent (head position)
    pub offset: Vec3,
}

/// Outcome of a perception check.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerceptionResult {
    /// Whether the target is detected
    pub can_see: bool,
    /// Distance from sensor origin to target
    pub distance: f32,
    /// Horizontal angle between facing and target, in degrees
    pub bearing_deg: f32,
}

/// First thing a visibility ray hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeHit {
    /// An entity collider
    Entity(EntityId),
    /// Static geometry or any non-entity collider
    Occluder,
    /// Nothing at all
    Nothing,
}

/// Visibility ray cast, provided by the physics engine.
pub trait SightProbe {
    /// Casts from `origin` toward `target_position` and reports the first
    /// collider hit. The target's own collider counts as a hit on
    /// `ProbeHit::Entity(target)`.
    fn cast(&self, origin: Vec3, target: EntityId, target_position: Vec3) -> ProbeHit;
}

/// Checks whether an agent at `pose` can detect `target` at `target_position`.
///
/// Detection requires all of: distance within `view_range`, bearing within
/// `view_angle` (inclusive), and the probe's first hit being the target.
pub fn perceive<P: SightProbe + ?Sized>(
    sensor: &Sensor,
    pose: &Pose,
    target: EntityId,
    target_position: Vec3,
    probe: &P,
) -> PerceptionResult {
    let origin = pose.transform_point(sensor.offset);
    let direction = target_position - origin;
    let distance = direction.length();
    let bearing_deg = horizontal_bearing_deg(direction, pose.forward());

    let can_see = distance <= sensor.view_range
        && bearing_deg <= sensor.view_angle
        && probe.cast(origin, target, target_position) == ProbeHit::Entity(target);

    PerceptionResult {
        can_see,
        distance,
        bearing_deg,
    }
}

/// Static occluding shape for [`OpenField`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Occluder {
    /// Sphere
    Sphere {
        /// Center
        center: Vec3,
        /// Radius
        radius: f32,
    },
    /// Axis-aligned box
    Box {
        /// Minimum corner
        min: Vec3,
        /// Maximum corner
        max: Vec3,
    },
}

impl Occluder {
    /// Returns the entry parameter `t` in `0..=1` where the segment
    /// `from + t * (to - from)` first touches this shape.
    #[must_use]
    pub fn segment_entry(&self, from: Vec3, to: Vec3) -> Option<f32> {
        let dir = to - from;
        match *self {
            Self::Sphere { center, radius } => {
                let m = from - center;
                let a = dir.length_squared();
                let c = m.length_squared() - radius * radius;
                if c <= 0.0 {
                    return Some(0.0);
                }
                if a <= f32::EPSILON {
                    return None;
                }
                let b = m.dot(dir);
                let disc = b * b - a * c;
                if disc < 0.0 {
                    return None;
                }
                let t = (-b - disc.sqrt()) / a;
                (0.0..=1.0).contains(&t).then_some(t)
            },
            Self::Box { min, max } => {
                let mut t_min = 0.0_f32;
                let mut t_max = 1.0_f32;
                for axis in 0..3 {
                    let (o, d, lo, hi) = (from[axis], dir[axis], min[axis], max[axis]);
                    if d.abs() <= f32::EPSILON {
                        if o < lo || o > hi {
                            return None;
                        }
                        continue;
                    }
                    let inv = 1.0 / d;
                    let (mut t0, mut t1) = ((lo - o) * inv, (hi - o) * inv);
                    if t0 > t1 {
                        std::mem::swap(&mut t0, &mut t1);
                    }
                    t_min = t_min.max(t0);
                    t_max = t_max.min(t1);
                    if t_min > t_max {
                        return None;
                    }
                }
                Some(t_min)
            },
        }
    }
}

/// Reference [`SightProbe`] for headless runs: an open field with a few
/// static occluders. The target is hit unless an occluder lies on the way.
#[derive(Debug, Clone, Default)]
pub struct OpenField {
    occluders: Vec<Occluder>,
}

impl OpenField {
    /// Creates a field with no occluders.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an occluder.
    #[must_use]
    pub fn with_occluder(mut self, occluder: Occluder) -> Self {
        self.occluders.push(occluder);
        self
    }

    /// Adds an occluder in place.
    pub fn add_occluder(&mut self, occluder: Occluder) {
        self.occluders.push(occluder);
    }

    /// All occluders.
    #[must_use]
    pub fn occluders(&self) -> &[Occluder] {
        &self.occluders
    }
}

impl SightProbe for OpenField {
    fn cast(&self, origin: Vec3, target: EntityId, target_position: Vec3) -> ProbeHit {
        let blocked = self
            .occluders
            .iter()
            .any(|o| o.segment_entry(origin, target_position).is_some_and(|t| t < 1.0));
        if blocked {
            ProbeHit::Occluder
        } else {
            ProbeHit::Entity(target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TARGET: EntityId = EntityId::from_raw(99);

    fn sensor() -> Sensor {
        Sensor {
            view_range: 20.0,
            view_angle: 45.0,
            offset: Vec3::new(0.0, 1.5, 0.0),
        }
    }

    #[test]
    fn test_target_ahead_is_seen() {
        let result = perceive(
            &sensor(),
            &Pose::default(),
            TARGET,
            Vec3::new(0.0, 1.0, 10.0),
            &OpenField::new(),
        );
        assert!(result.can_see);
        assert!(result.bearing_deg < 1e-3);
        assert!((result.distance - 10.0125).abs() < 1e-2);
    }

    #[test]
    fn test_target_behind_is_not_seen() {
        let result = perceive(
            &sensor(),
            &Pose::default(),
            TARGET,
            Vec3::new(0.0, 0.0, -5.0),
            &OpenField::new(),
        );
        assert!(!result.can_see);
        assert!(result.bearing_deg > 170.0);
    }

    #[test]
    fn test_out_of_range() {
        let result = perceive(
            &sensor(),
            &Pose::default(),
            TARGET,
            Vec3::new(0.0, 1.5, 30.0),
            &OpenField::new(),
        );
        assert!(!result.can_see);
    }

    #[test]
    fn test_boundary_angle_is_visible() {
        let pose = Pose::default();
        let mut sensor = sensor();
        sensor.offset = Vec3::ZERO;
        // 45 degrees off the forward axis
        let target = Vec3::new(5.0, 0.0, 5.0);
        let bearing = horizontal_bearing_deg(target, pose.forward());
        sensor.view_angle = bearing;

        let result = perceive(&sensor, &pose, TARGET, target, &OpenField::new());
        assert!(result.can_see);
    }

    #[test]
    fn test_occluder_blocks_sight() {
        let field = OpenField::new().with_occluder(Occluder::Box {
            min: Vec3::new(-1.0, 0.0, 4.0),
            max: Vec3::new(1.0, 3.0, 5.0),
        });
        let result = perceive(
            &sensor(),
            &Pose::default(),
            TARGET,
            Vec3::new(0.0, 1.5, 10.0),
            &field,
        );
        assert!(!result.can_see);
    }

    #[test]
    fn test_occluder_behind_target_does_not_block() {
        let field = OpenField::new().with_occluder(Occluder::Sphere {
            center: Vec3::new(0.0, 1.5, 15.0),
            radius: 1.0,
        });
        let result = perceive(
            &sensor(),
            &Pose::default(),
            TARGET,
            Vec3::new(0.0, 1.5, 10.0),
            &field,
        );
        assert!(result.can_see);
    }

    #[test]
    fn test_probe_hitting_other_entity_blocks() {
        struct Crowd;
        impl SightProbe for Crowd {
            fn cast(&self, _origin: Vec3, _target: EntityId, _pos: Vec3) -> ProbeHit {
                ProbeHit::Entity(EntityId::from_raw(5))
            }
        }
        let result = perceive(&sensor(), &Pose::default(), TARGET, Vec3::Z * 3.0, &Crowd);
        assert!(!result.can_see);
    }

    #[test]
    fn test_rotated_pose_uses_facing() {
        let pose = Pose::new(Vec3::ZERO, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let result = perceive(
            &sensor(),
            &pose,
            TARGET,
            Vec3::new(8.0, 1.5, 0.0),
            &OpenField::new(),
        );
        assert!(result.can_see);
    }

    proptest! {
        #[test]
        fn prop_perceive_is_deterministic(
            x in -30.0f32..30.0,
            z in -30.0f32..30.0,
            yaw in -3.0f32..3.0,
        ) {
            let pose = Pose::new(Vec3::new(1.0, 0.0, -2.0), Quat::from_rotation_y(yaw));
            let field = OpenField::new().with_occluder(Occluder::Sphere {
                center: Vec3::new(4.0, 1.0, 4.0),
                radius: 1.5,
            });
            let target = Vec3::new(x, 1.0, z);
            let a = perceive(&sensor(), &pose, TARGET, target, &field);
            let b = perceive(&sensor(), &pose, TARGET, target, &field);
            prop_assert_eq!(a, b);
        }
    }
}
