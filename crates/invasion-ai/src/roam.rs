//! Idle wandering around the spawn point.
//!
//! When an agent has nothing to chase and has reached its last destination,
//! it waits for the configured pause and then walks to a random walkable
//! point within `radius` of home.

use glam::Vec3;
use invasion_common::TimerId;

use crate::locomotion::Locomotion;

/// Remaining distance under which a roam destination counts as reached.
pub const ARRIVAL_EPSILON: f32 = 0.05;

/// Per-agent roam state.
#[derive(Debug, Clone, PartialEq)]
pub struct Roam {
    home: Vec3,
    radius: f32,
    pause: f32,
    pending: Option<TimerId>,
}

impl Roam {
    /// Creates roam state centered on `home`.
    #[must_use]
    pub fn new(home: Vec3, radius: f32, pause: f32) -> Self {
        Self {
            home,
            radius: radius.max(0.0),
            pause: pause.max(0.0),
            pending: None,
        }
    }

    /// Roam center.
    #[must_use]
    pub const fn home(&self) -> Vec3 {
        self.home
    }

    /// Roam radius.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Pause between destinations, in seconds.
    #[must_use]
    pub const fn pause(&self) -> f32 {
        self.pause
    }

    /// Pending pause timer, if any.
    #[must_use]
    pub const fn pending(&self) -> Option<TimerId> {
        self.pending
    }

    /// Returns whether a new pause should start: the last destination was
    /// reached and no pause is already running.
    #[must_use]
    pub fn needs_destination(&self, remaining_distance: f32) -> bool {
        remaining_distance < ARRIVAL_EPSILON && self.pending.is_none()
    }

    /// Records the pause timer that was just scheduled.
    pub fn begin_pause(&mut self, timer: TimerId) {
        self.pending = Some(timer);
    }

    /// Clears the pause once its timer has fired.
    pub fn end_pause(&mut self) -> Option<TimerId> {
        self.pending.take()
    }

    /// Picks a walkable destination near home, or `None` if sampling fails.
    pub fn pick_destination<L: Locomotion + ?Sized>(
        &self,
        rng: &mut fastrand::Rng,
        locomotion: &L,
    ) -> Option<Vec3> {
        let candidate = self.home + random_in_unit_sphere(rng) * self.radius;
        locomotion.sample_walkable_point(candidate, self.radius)
    }
}

/// Uniform random point inside the unit sphere.
pub fn random_in_unit_sphere(rng: &mut fastrand::Rng) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.f32() * 2.0 - 1.0,
            rng.f32() * 2.0 - 1.0,
            rng.f32() * 2.0 - 1.0,
        );
        if v.length_squared() <= 1.0 {
            return v;
        }
    }
}
