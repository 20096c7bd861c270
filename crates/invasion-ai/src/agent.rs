//! Per-agent combat state.
//!
//! An [`Agent`] is owned by the [`World`](crate::world::World), which drives
//! it through the state machine every tick. Everything here is plain data
//! plus the bookkeeping helpers the world uses; the transition rules live in
//! `world.rs`.

use std::sync::Arc;

use ahash::AHashSet;
use glam::{Quat, Vec3};
use invasion_common::{EntityId, TimerId};
use tracing::debug;

use crate::config::{AgentConfig, AttackProfile, MeleeProfile};
use crate::events::{AgentEvent, AgentState, EventBus};
use crate::health::Health;
use crate::perception::{PerceptionResult, Pose};
use crate::roam::Roam;
use crate::stage::{Stage, StageSelector};

/// An open melee hit volume.
#[derive(Debug, Clone)]
pub struct MeleeWindow {
    activation: u64,
    damage: i32,
    reach: f32,
    radius: f32,
    hits: AHashSet<EntityId>,
}

impl MeleeWindow {
    pub(crate) fn open(activation: u64, profile: &MeleeProfile) -> Self {
        Self {
            activation,
            damage: profile.damage,
            reach: profile.reach,
            radius: profile.radius,
            hits: AHashSet::new(),
        }
    }

    /// Activation counter value this window was opened with.
    #[must_use]
    pub const fn activation(&self) -> u64 {
        self.activation
    }

    /// Damage dealt per target.
    #[must_use]
    pub const fn damage(&self) -> i32 {
        self.damage
    }

    /// Center of the hit volume for an agent at `pose`.
    #[must_use]
    pub fn center(&self, pose: &Pose) -> Vec3 {
        pose.position + pose.forward() * self.reach
    }

    /// Returns whether `point` lies inside the hit volume.
    #[must_use]
    pub fn overlaps(&self, pose: &Pose, point: Vec3) -> bool {
        self.center(pose).distance(point) <= self.radius
    }

    /// Records a hit on `target`. Returns `false` if it was already hit
    /// during this activation.
    pub fn register_hit(&mut self, target: EntityId) -> bool {
        self.hits.insert(target)
    }

    /// Number of distinct targets hit so far.
    #[must_use]
    pub fn hit_count(&self) -> usize {
        self.hits.len()
    }
}

/// One AI-controlled combatant.
#[derive(Debug, Clone)]
pub struct Agent {
    pub(crate) id: EntityId,
    pub(crate) config: Arc<AgentConfig>,
    pub(crate) health: Health,
    pub(crate) state: AgentState,
    pub(crate) pose: Pose,
    pub(crate) roam: Roam,
    /// Attack-range gate; 0 whenever the target is not perceived
    pub(crate) stopping_distance: f32,
    pub(crate) attack_cooldown: Option<TimerId>,
    pub(crate) stagger: Option<TimerId>,
    pub(crate) flash: Option<TimerId>,
    pub(crate) melee: Option<MeleeWindow>,
    pub(crate) melee_activations: u64,
    pub(crate) stage: Option<StageSelector>,
    pub(crate) perception: PerceptionResult,
    pub(crate) knockback: Vec3,
    pub(crate) chase_pending: bool,
    pub(crate) halt_pending: bool,
    pub(crate) died_at: Option<f64>,
    pub(crate) rng: fastrand::Rng,
}

impl Agent {
    pub(crate) fn new(
        id: EntityId,
        config: Arc<AgentConfig>,
        pose: Pose,
        health: Health,
        rng: fastrand::Rng,
    ) -> Self {
        let stage = match &config.attack {
            AttackProfile::Staged(staged) => {
                Some(StageSelector::new(health.ratio(), staged.stage_hysteresis))
            },
            _ => None,
        };
        let roam = Roam::new(pose.position, config.roam_radius, config.roam_pause);

        Self {
            id,
            config,
            health,
            state: AgentState::Roaming,
            pose,
            roam,
            stopping_distance: 0.0,
            attack_cooldown: None,
            stagger: None,
            flash: None,
            melee: None,
            melee_activations: 0,
            stage,
            perception: PerceptionResult::default(),
            knockback: Vec3::ZERO,
            chase_pending: false,
            halt_pending: false,
            died_at: None,
            rng,
        }
    }

    /// Agent id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Shared type configuration.
    #[must_use]
    pub fn config(&self) -> &Arc<AgentConfig> {
        &self.config
    }

    /// Hit points.
    #[must_use]
    pub const fn health(&self) -> &Health {
        &self.health
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> AgentState {
        self.state
    }

    /// Returns whether the agent is alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.state.is_dead()
    }

    /// Returns whether hit detection is enabled. Off once dead.
    #[must_use]
    pub const fn is_hittable(&self) -> bool {
        self.is_alive()
    }

    /// Position and facing.
    #[must_use]
    pub const fn pose(&self) -> &Pose {
        &self.pose
    }

    /// World position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.pose.position
    }

    /// Facing rotation.
    #[must_use]
    pub const fn rotation(&self) -> Quat {
        self.pose.rotation
    }

    /// Spawn point and roam center.
    #[must_use]
    pub const fn home(&self) -> Vec3 {
        self.roam.home()
    }

    /// Current attack-range gate.
    #[must_use]
    pub const fn stopping_distance(&self) -> f32 {
        self.stopping_distance
    }

    /// Returns whether an attack cooldown is running.
    #[must_use]
    pub const fn is_cooling_down(&self) -> bool {
        self.attack_cooldown.is_some()
    }

    /// Returns whether the damage flash is showing.
    #[must_use]
    pub const fn is_flashing(&self) -> bool {
        self.flash.is_some()
    }

    /// Open melee window, if any.
    #[must_use]
    pub const fn melee_window(&self) -> Option<&MeleeWindow> {
        self.melee.as_ref()
    }

    /// Boss stage, `None` for non-staged agents.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        self.stage.map(|s| s.current())
    }

    /// Result of the last perception check.
    #[must_use]
    pub const fn perception(&self) -> &PerceptionResult {
        &self.perception
    }

    /// Simulated time of death.
    #[must_use]
    pub const fn died_at(&self) -> Option<f64> {
        self.died_at
    }

    /// Moves to `state`, publishing `StateEntered`. Returns `false` if the
    /// agent was already there.
    pub(crate) fn enter(&mut self, state: AgentState, events: &EventBus) -> bool {
        if self.state == state {
            return false;
        }
        debug!(agent = %self.id, from = %self.state, to = %state, "State change");
        self.state = state;
        events.publish(AgentEvent::StateEntered {
            agent: self.id,
            state,
        });
        true
    }

    /// Walking speed, or the stage-scaled run speed while closing in.
    pub(crate) fn travel_speed(&self, closing: bool) -> f32 {
        match self.state {
            AgentState::Staggered | AgentState::Dead => 0.0,
            _ if closing => {
                let multiplier = match (&self.config.attack, self.stage) {
                    (AttackProfile::Staged(staged), Some(selector)) => {
                        staged.tuning(selector.current()).speed_multiplier
                    },
                    _ => 1.0,
                };
                self.config.alert_speed * multiplier
            },
            _ => self.config.speed,
        }
    }

    /// Melee settings for the next swing, with stage tuning applied.
    pub(crate) fn melee_profile(&self) -> Option<MeleeProfile> {
        match &self.config.attack {
            AttackProfile::Ranged(_) => None,
            AttackProfile::Melee(melee) => Some(melee.clone()),
            AttackProfile::Staged(staged) => {
                let stage = self.stage.map_or(Stage::One, |s| s.current());
                Some(staged.melee_for(stage))
            },
        }
    }
}
