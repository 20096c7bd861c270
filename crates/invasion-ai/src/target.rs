//! Things agents attack.
//!
//! Targets are owned by the game layer. Agents only remember a target's
//! [`EntityId`] and reach it through the [`Target`] capability passed to each
//! tick.

use glam::Vec3;
use invasion_common::EntityId;
use tracing::{debug, info};

/// Capability the AI needs from whatever it attacks.
pub trait Target {
    /// Target id, as reported by sight probes.
    fn id(&self) -> EntityId;
    /// Current position.
    fn position(&self) -> Vec3;
    /// Returns whether the target can still be attacked.
    fn is_alive(&self) -> bool;
    /// Applies damage.
    fn apply_damage(&mut self, amount: i32);
}

/// Hurt-and-destroy target with floating point health.
///
/// Destroyed once health drops to zero or below. Records every hit so tests
/// and the simulation can inspect what landed.
#[derive(Debug, Clone)]
pub struct TrainingDummy {
    id: EntityId,
    position: Vec3,
    health: f32,
    destroyed: bool,
    hits: Vec<i32>,
}

impl TrainingDummy {
    /// Default starting health.
    pub const DEFAULT_HEALTH: f32 = 100.0;

    /// Creates a dummy at `position` with default health.
    #[must_use]
    pub fn new(position: Vec3) -> Self {
        Self::with_health(position, Self::DEFAULT_HEALTH)
    }

    /// Creates a dummy with explicit health.
    #[must_use]
    pub fn with_health(position: Vec3, health: f32) -> Self {
        Self {
            id: EntityId::new(),
            position,
            health,
            destroyed: health <= 0.0,
            hits: Vec::new(),
        }
    }

    /// Moves the dummy.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Health left.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Returns whether the dummy was destroyed.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Every hit received, in order.
    #[must_use]
    pub fn hits(&self) -> &[i32] {
        &self.hits
    }

    /// Total damage received.
    #[must_use]
    pub fn total_damage(&self) -> i32 {
        self.hits.iter().sum()
    }
}

impl Target for TrainingDummy {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn is_alive(&self) -> bool {
        !self.destroyed
    }

    fn apply_damage(&mut self, amount: i32) {
        if self.destroyed {
            debug!(target_id = %self.id, "Ignoring damage on destroyed dummy");
            return;
        }
        self.hits.push(amount);
        self.health -= amount as f32;
        if self.health <= 0.0 {
            self.destroyed = true;
            info!(target_id = %self.id, "Training dummy destroyed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_destroyed_at_zero() {
        let mut dummy = TrainingDummy::with_health(Vec3::ZERO, 20.0);
        dummy.apply_damage(15);
        assert!(dummy.is_alive());
        dummy.apply_damage(5);
        assert!(!dummy.is_alive());
        assert_eq!(dummy.health(), 0.0);
    }

    #[test]
    fn test_destroyed_dummy_ignores_damage() {
        let mut dummy = TrainingDummy::with_health(Vec3::ZERO, 1.0);
        dummy.apply_damage(3);
        dummy.apply_damage(3);
        assert_eq!(dummy.hits(), &[3]);
        assert_eq!(dummy.total_damage(), 3);
    }
}
