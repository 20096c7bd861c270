//! Locomotion proxy.
//!
//! The AI never computes paths itself. It asks a [`Locomotion`] service to
//! move agents toward destinations and reads back distance and velocity.
//! [`SimpleNavigator`] is a straight-line reference implementation used by
//! tests and the headless simulation.

use std::collections::BTreeMap;

use glam::Vec3;
use invasion_common::{horizontal, EntityId};

/// Path-following service, keyed by agent id.
pub trait Locomotion {
    /// Current position of the agent's body.
    fn position(&self, agent: EntityId) -> Option<Vec3>;
    /// Returns whether the agent stands on a navigable surface.
    fn is_on_nav_surface(&self, agent: EntityId) -> bool;
    /// Requests a path to `point`. Returns whether the request was accepted.
    fn set_destination(&mut self, agent: EntityId, point: Vec3) -> bool;
    /// Distance left to the current destination (0 when there is none).
    fn remaining_distance(&self, agent: EntityId) -> Option<f32>;
    /// Drops the current destination and halts the body.
    fn stop(&mut self, agent: EntityId);
    /// Current velocity.
    fn velocity(&self, agent: EntityId) -> Vec3;
    /// Sets the travel speed.
    fn set_speed(&mut self, agent: EntityId, speed: f32);
    /// Sets how far short of the destination the body stops.
    fn set_stopping_distance(&mut self, agent: EntityId, distance: f32);
    /// Adds an instantaneous velocity change (knockback).
    fn add_velocity(&mut self, agent: EntityId, impulse: Vec3);
    /// Finds the closest walkable point within `radius` of `center`.
    fn sample_walkable_point(&self, center: Vec3, radius: f32) -> Option<Vec3>;
}

/// Walkable rectangle on the XZ plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkableArea {
    /// Minimum X/Z corner (Y ignored)
    pub min: Vec3,
    /// Maximum X/Z corner (Y ignored)
    pub max: Vec3,
}

impl WalkableArea {
    /// Creates an area from two corners.
    #[must_use]
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Returns whether the point lies inside the area.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.z >= self.min.z && point.z <= self.max.z
    }

    /// Closest point inside the area.
    #[must_use]
    pub fn clamp(&self, point: Vec3) -> Vec3 {
        Vec3::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y,
            point.z.clamp(self.min.z, self.max.z),
        )
    }
}

#[derive(Debug, Clone)]
struct Body {
    position: Vec3,
    destination: Option<Vec3>,
    speed: f32,
    stopping_distance: f32,
    velocity: Vec3,
    impulse: Vec3,
}

/// Straight-line navigator on flat ground.
#[derive(Debug, Clone)]
pub struct SimpleNavigator {
    bodies: BTreeMap<EntityId, Body>,
    area: Option<WalkableArea>,
    ground_height: f32,
    /// Fraction of knockback velocity lost per second
    impulse_damping: f32,
}

impl Default for SimpleNavigator {
    fn default() -> Self {
        Self {
            bodies: BTreeMap::new(),
            area: None,
            ground_height: 0.0,
            impulse_damping: 4.0,
        }
    }
}

impl SimpleNavigator {
    /// Creates an unbounded navigator with ground at y = 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts movement and sampling to `area`.
    #[must_use]
    pub fn with_area(mut self, area: WalkableArea) -> Self {
        self.area = Some(area);
        self
    }

    /// Sets the ground height used for sampled points.
    #[must_use]
    pub const fn with_ground_height(mut self, height: f32) -> Self {
        self.ground_height = height;
        self
    }

    /// Registers a body for `agent` at `position`.
    pub fn add_agent(&mut self, agent: EntityId, position: Vec3, speed: f32) {
        self.bodies.insert(
            agent,
            Body {
                position,
                destination: None,
                speed: speed.max(0.0),
                stopping_distance: 0.0,
                velocity: Vec3::ZERO,
                impulse: Vec3::ZERO,
            },
        );
    }

    /// Removes an agent's body.
    pub fn remove_agent(&mut self, agent: EntityId) -> bool {
        self.bodies.remove(&agent).is_some()
    }

    /// Teleports a body without any surface check.
    pub fn set_position(&mut self, agent: EntityId, position: Vec3) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.position = position;
        }
    }

    /// Current destination of a body.
    #[must_use]
    pub fn destination(&self, agent: EntityId) -> Option<Vec3> {
        self.bodies.get(&agent).and_then(|b| b.destination)
    }

    /// Current speed of a body.
    #[must_use]
    pub fn speed(&self, agent: EntityId) -> Option<f32> {
        self.bodies.get(&agent).map(|b| b.speed)
    }

    /// Number of registered bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Returns whether no bodies are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Moves every body on the walkable surface by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let decay = (1.0 - self.impulse_damping * dt).max(0.0);

        for body in self.bodies.values_mut() {
            if !self.area.map_or(true, |a| a.contains(body.position)) {
                body.velocity = Vec3::ZERO;
                continue;
            }

            let mut steer = Vec3::ZERO;
            if let Some(destination) = body.destination {
                let to_goal = destination - body.position;
                let distance = to_goal.length();
                let travel = (distance - body.stopping_distance).max(0.0);
                if travel > f32::EPSILON && body.speed > 0.0 {
                    let step = (body.speed * dt).min(travel);
                    steer = to_goal / distance * (step / dt);
                }
            }

            let velocity = steer + horizontal(body.impulse);
            let mut next = body.position + velocity * dt;
            if let Some(area) = self.area {
                next = area.clamp(next);
            }
            body.velocity = (next - body.position) / dt;
            body.position = next;
            body.impulse *= decay;
            if body.impulse.length_squared() < 1e-6 {
                body.impulse = Vec3::ZERO;
            }
        }
    }
}

impl Locomotion for SimpleNavigator {
    fn position(&self, agent: EntityId) -> Option<Vec3> {
        self.bodies.get(&agent).map(|b| b.position)
    }

    fn is_on_nav_surface(&self, agent: EntityId) -> bool {
        self.bodies
            .get(&agent)
            .is_some_and(|b| self.area.map_or(true, |a| a.contains(b.position)))
    }

    fn set_destination(&mut self, agent: EntityId, point: Vec3) -> bool {
        let Some(body) = self.bodies.get_mut(&agent) else {
            return false;
        };
        body.destination = Some(match self.area {
            Some(area) => area.clamp(point),
            None => point,
        });
        true
    }

    fn remaining_distance(&self, agent: EntityId) -> Option<f32> {
        let body = self.bodies.get(&agent)?;
        Some(body.destination.map_or(0.0, |d| d.distance(body.position)))
    }

    fn stop(&mut self, agent: EntityId) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.destination = None;
            body.velocity = Vec3::ZERO;
            body.impulse = Vec3::ZERO;
        }
    }

    fn velocity(&self, agent: EntityId) -> Vec3 {
        self.bodies.get(&agent).map_or(Vec3::ZERO, |b| b.velocity)
    }

    fn set_speed(&mut self, agent: EntityId, speed: f32) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.speed = speed.max(0.0);
        }
    }

    fn set_stopping_distance(&mut self, agent: EntityId, distance: f32) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.stopping_distance = distance.max(0.0);
        }
    }

    fn add_velocity(&mut self, agent: EntityId, impulse: Vec3) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.impulse += impulse;
        }
    }

    fn sample_walkable_point(&self, center: Vec3, radius: f32) -> Option<Vec3> {
        let grounded = Vec3::new(center.x, self.ground_height, center.z);
        let point = match self.area {
            Some(area) => area.clamp(grounded),
            None => grounded,
        };
        (horizontal(point - center).length() <= radius.max(0.0)).then_some(point)
    }
}
