//! Hit point tracking for agents.

use serde::{Deserialize, Serialize};

/// Result of applying damage to a [`Health`] pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthChange {
    /// Non-positive amount; nothing changed
    Rejected,
    /// Pool was already empty; nothing changed
    AlreadyDepleted,
    /// Damage applied, pool still above zero
    Damaged {
        /// Hit points left
        remaining: i32,
    },
    /// Damage emptied the pool
    Depleted {
        /// Damage beyond what was needed to reach zero
        overkill: i32,
    },
}

/// Integer hit points clamped to `0..=max`.
///
/// Once depleted the pool cannot be damaged or healed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    current: i32,
    max: i32,
}

impl Health {
    /// Creates a full pool. `max` is raised to at least 1.
    #[must_use]
    pub fn new(max: i32) -> Self {
        let max = max.max(1);
        Self { current: max, max }
    }

    /// Creates a pool with explicit starting hit points, clamped to `1..=max`.
    #[must_use]
    pub fn with_current(max: i32, current: i32) -> Self {
        let max = max.max(1);
        Self {
            current: current.clamp(1, max),
            max,
        }
    }

    /// Current hit points.
    #[must_use]
    pub const fn current(&self) -> i32 {
        self.current
    }

    /// Maximum hit points.
    #[must_use]
    pub const fn max(&self) -> i32 {
        self.max
    }

    /// Current / max, in `0.0..=1.0`.
    #[must_use]
    pub fn ratio(&self) -> f32 {
        self.current as f32 / self.max as f32
    }

    /// Returns whether the pool is empty.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.current == 0
    }

    /// Subtracts `amount`, clamping at zero.
    pub fn apply_damage(&mut self, amount: i32) -> HealthChange {
        if amount <= 0 {
            return HealthChange::Rejected;
        }
        if self.is_depleted() {
            return HealthChange::AlreadyDepleted;
        }

        if amount >= self.current {
            let overkill = amount - self.current;
            self.current = 0;
            HealthChange::Depleted { overkill }
        } else {
            self.current -= amount;
            HealthChange::Damaged {
                remaining: self.current,
            }
        }
    }

    /// Restores up to `amount` hit points. Returns the amount actually healed.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if amount <= 0 || self.is_depleted() {
            return 0;
        }
        let healed = amount.min(self.max - self.current);
        self.current += healed;
        healed
    }
}
