//! Horizontal-plane math helpers.
//!
//! The world is Y-up with +Z as the forward axis of an unrotated agent.
//! Facing is yaw-only; vertical components are ignored when comparing
//! directions so a target above or below an agent is still "ahead" of it.

use glam::{Quat, Vec3};

/// Squared length below which a direction is treated as degenerate.
const DEGENERATE_EPSILON: f32 = 1e-8;

/// Projects a vector onto the horizontal (XZ) plane.
#[must_use]
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Forward vector of a rotation.
#[must_use]
pub fn forward(rotation: Quat) -> Vec3 {
    rotation * Vec3::Z
}

/// Unsigned angle in degrees between the horizontal projection of
/// `direction` and `forward`.
///
/// Returns 0.0 when either vector is degenerate, so a target exactly at the
/// sensor origin counts as straight ahead.
#[must_use]
pub fn horizontal_bearing_deg(direction: Vec3, forward: Vec3) -> f32 {
    let flat = horizontal(direction);
    let denom = (flat.length_squared() * forward.length_squared()).sqrt();
    if denom < DEGENERATE_EPSILON {
        return 0.0;
    }
    let cos = (flat.dot(forward) / denom).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Yaw-only rotation looking along `direction`.
///
/// Returns `None` if the horizontal part of `direction` is degenerate.
#[must_use]
pub fn look_rotation(direction: Vec3) -> Option<Quat> {
    let flat = horizontal(direction);
    if flat.length_squared() < DEGENERATE_EPSILON {
        return None;
    }
    Some(Quat::from_rotation_y(flat.x.atan2(flat.z)))
}

/// Spherically interpolates `current` toward `desired` by `t` (clamped to 0..=1).
#[must_use]
pub fn turn_towards(current: Quat, desired: Quat, t: f32) -> Quat {
    current.slerp(desired, t.clamp(0.0, 1.0)).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bearing_ignores_vertical() {
        let bearing = horizontal_bearing_deg(Vec3::new(1.0, 10.0, 1.0), Vec3::Z);
        assert!((bearing - 45.0).abs() < 1e-3);
    }

    #[test]
    fn test_bearing_behind() {
        let bearing = horizontal_bearing_deg(Vec3::new(0.0, 0.0, -4.0), Vec3::Z);
        assert!((bearing - 180.0).abs() < 1e-3);
    }

    #[test]
    fn test_bearing_degenerate_is_zero() {
        assert_eq!(horizontal_bearing_deg(Vec3::new(0.0, 2.0, 0.0), Vec3::Z), 0.0);
    }

    #[test]
    fn test_look_rotation_points_forward() {
        let rot = look_rotation(Vec3::new(3.0, 0.0, 0.0)).expect("non-degenerate");
        let fwd = forward(rot);
        assert!((fwd - Vec3::X).length() < 1e-5);
        assert!(look_rotation(Vec3::Y).is_none());
    }

    #[test]
    fn test_turn_towards_clamps() {
        let from = Quat::IDENTITY;
        let to = Quat::from_rotation_y(1.0);
        let full = turn_towards(from, to, 5.0);
        assert!(full.angle_between(to) < 1e-4);
        let none = turn_towards(from, to, -1.0);
        assert!(none.angle_between(from) < 1e-4);
    }

    proptest! {
        #[test]
        fn prop_bearing_is_a_half_turn_at_most(
            (dx, dy, dz) in (-100.0f32..100.0, -100.0f32..100.0, -100.0f32..100.0),
            (fx, fz) in (-1.0f32..1.0, -1.0f32..1.0),
        ) {
            let bearing = horizontal_bearing_deg(Vec3::new(dx, dy, dz), Vec3::new(fx, 0.0, fz));
            prop_assert!(bearing.is_finite());
            prop_assert!((0.0..=180.0 + 1e-3).contains(&bearing), "bearing {bearing}");
        }
    }
}
