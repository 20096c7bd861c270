//! The combat world: owns agents and their timers and runs the tick.
//!
//! Each [`World::tick`] first advances the scheduler and dispatches due
//! timers, then updates every live agent in ascending id order:
//!
//! 1. sync position from locomotion (skip the agent if it is off the surface)
//! 2. apply pending knockback
//! 3. recompute the boss stage
//! 4. perceive the target
//! 5. run the state machine and issue locomotion commands
//! 6. commit travel speed
//! 7. resolve an open melee window against the target
//!
//! Collaborators are passed in per tick; the world holds no references to
//! engine objects.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Quat, Vec3};
use invasion_common::{look_rotation, turn_towards, EntityId, TimerId};
use tracing::{debug, info, warn};

use crate::agent::{Agent, MeleeWindow};
use crate::config::{AgentCatalog, AgentConfig, AttackProfile};
use crate::error::{AiError, AiResult, DamageRejection};
use crate::events::{AgentEvent, AgentState, EventBus};
use crate::health::{Health, HealthChange};
use crate::locomotion::Locomotion;
use crate::perception::{perceive, Pose, SightProbe};
use crate::scheduler::{Fired, Scheduler};
use crate::target::Target;

/// Slack when comparing path distance against the stopping distance, so a
/// body parked exactly at its stopping distance counts as in range.
const RANGE_TOLERANCE: f32 = 1e-3;

/// Work scheduled on an agent's timer queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerEvent {
    /// Attack cooldown elapsed
    AttackCooldown,
    /// Delayed projectile spawn
    FireProjectile,
    /// Melee hit volume closes
    CloseMeleeWindow {
        /// Activation the window belongs to
        activation: u64,
    },
    /// Stagger ends
    StaggerEnd,
    /// Damage flash ends
    FlashEnd,
    /// Roam pause ends
    RoamPause,
    /// Explosion-style damage lands
    DelayedDamage {
        /// Damage to apply
        amount: i32,
    },
}

/// Result of [`World::apply_damage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Agent survived
    Damaged {
        /// Hit points left
        remaining: i32,
    },
    /// Agent died from this hit
    Killed,
    /// Nothing happened
    Rejected(DamageRejection),
}

/// Owner of all agents, their timers and the event bus.
#[derive(Debug)]
pub struct World {
    agents: BTreeMap<EntityId, Agent>,
    scheduler: Scheduler<TimerEvent>,
    events: EventBus,
    seed: u64,
    spawned: u64,
}

impl Default for World {
    fn default() -> Self {
        Self::new(0)
    }
}

impl World {
    /// Creates an empty world. `seed` drives roam sampling.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_event_capacity(seed, 1024)
    }

    /// Creates an empty world with a custom event bus capacity.
    #[must_use]
    pub fn with_event_capacity(seed: u64, capacity: usize) -> Self {
        Self {
            agents: BTreeMap::new(),
            scheduler: Scheduler::new(),
            events: EventBus::new(capacity),
            seed,
            spawned: 0,
        }
    }

    /// Simulated time in seconds.
    #[must_use]
    pub const fn now(&self) -> f64 {
        self.scheduler.now()
    }

    /// Event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Drains pending events.
    pub fn drain_events(&self) -> Vec<AgentEvent> {
        self.events.drain()
    }

    /// Looks up an agent.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Iterates agents in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Number of agents, dead or alive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns whether the world has no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Number of live agents.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.agents.values().filter(|a| a.is_alive()).count()
    }

    /// Number of timers pending for `id`.
    #[must_use]
    pub fn pending_timers(&self, id: EntityId) -> usize {
        self.scheduler.pending_for(id)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Spawns an agent at full health.
    pub fn spawn(&mut self, position: Vec3, facing: Quat, config: Arc<AgentConfig>) -> EntityId {
        let health = Health::new(config.max_health);
        self.insert(position, facing, health, config)
    }

    /// Spawns an agent with explicit starting health (clamped to `1..=max`).
    pub fn spawn_with_health(
        &mut self,
        position: Vec3,
        facing: Quat,
        health: i32,
        config: Arc<AgentConfig>,
    ) -> EntityId {
        let health = Health::with_current(config.max_health, health);
        self.insert(position, facing, health, config)
    }

    /// Spawns a catalog type by name, at full health unless `health` is set.
    pub fn spawn_from_catalog(
        &mut self,
        catalog: &AgentCatalog,
        name: &str,
        position: Vec3,
        facing: Quat,
        health: Option<i32>,
    ) -> AiResult<EntityId> {
        let config = catalog.require(name)?;
        Ok(match health {
            Some(health) => self.spawn_with_health(position, facing, health, config),
            None => self.spawn(position, facing, config),
        })
    }

    fn insert(&mut self, position: Vec3, facing: Quat, health: Health, config: Arc<AgentConfig>) -> EntityId {
        let id = EntityId::new();
        self.spawned += 1;
        let rng = fastrand::Rng::with_seed(
            self.seed ^ self.spawned.wrapping_mul(0x9E37_79B9_7F4A_7C15),
        );

        info!(agent = %id, kind = %config.name, hp = health.current(), "Spawned agent");
        self.events.publish(AgentEvent::Spawned {
            agent: id,
            config: config.name.clone(),
        });

        let agent = Agent::new(id, config, Pose::new(position, facing.normalize()), health, rng);
        self.agents.insert(id, agent);
        id
    }

    /// Removes a dead agent. Fails if it is unknown or still alive.
    pub fn reap(&mut self, id: EntityId) -> AiResult<Agent> {
        match self.agents.get(&id) {
            None => return Err(AiError::NotFound(id)),
            Some(agent) if agent.is_alive() => return Err(AiError::NotDead(id)),
            Some(_) => {},
        }
        self.remove(id, true).ok_or(AiError::NotFound(id))
    }

    /// Reaps every dead agent whose corpse grace period has elapsed.
    pub fn reap_expired(&mut self) -> Vec<EntityId> {
        let now = self.now();
        let expired: Vec<EntityId> = self
            .agents
            .values()
            .filter(|a| a.died_at.is_some_and(|t| now - t + 1e-6 >= f64::from(a.config.corpse_grace)))
            .map(Agent::id)
            .collect();

        for id in &expired {
            self.remove(*id, true);
        }
        expired
    }

    /// Removes an agent regardless of state, cancelling its timers.
    pub fn despawn(&mut self, id: EntityId) -> AiResult<Agent> {
        self.remove(id, false).ok_or(AiError::NotFound(id))
    }

    fn remove(&mut self, id: EntityId, reaped: bool) -> Option<Agent> {
        let agent = self.agents.remove(&id)?;
        let cancelled = self.scheduler.cancel_owner(id);
        if reaped {
            info!(agent = %id, "Reaped agent");
            self.events.publish(AgentEvent::Reaped { agent: id });
        } else {
            debug!(agent = %id, cancelled, "Despawned agent");
        }
        Some(agent)
    }

    // ========================================================================
    // Damage
    // ========================================================================

    /// Applies damage to an agent.
    ///
    /// Non-positive amounts and hits on dead agents are ignored and reported
    /// as [`DamageOutcome::Rejected`]; they never change state.
    pub fn apply_damage(&mut self, id: EntityId, amount: i32) -> DamageOutcome {
        let Some(agent) = self.agents.get_mut(&id) else {
            warn!(agent = %id, "Damage for unknown agent");
            return DamageOutcome::Rejected(DamageRejection::UnknownAgent(id));
        };
        if amount <= 0 {
            warn!(agent = %id, amount, "Rejected non-positive damage");
            return DamageOutcome::Rejected(DamageRejection::InvalidAmount(amount));
        }
        if !agent.is_alive() {
            debug!(agent = %id, amount, "Ignoring damage on dead agent");
            return DamageOutcome::Rejected(DamageRejection::AlreadyDead(id));
        }

        match agent.health.apply_damage(amount) {
            HealthChange::Damaged { remaining } => {
                debug!(agent = %id, amount, remaining, "Agent damaged");
                self.events.publish(AgentEvent::Damaged {
                    agent: id,
                    amount,
                    remaining,
                });

                match agent.flash.take() {
                    Some(timer) => {
                        self.scheduler.cancel(timer);
                    },
                    None => self.events.publish(AgentEvent::DamageFlash {
                        agent: id,
                        active: true,
                    }),
                }
                let flash = agent.config.flash_duration;
                agent.flash = Some(self.scheduler.after(id, flash, TimerEvent::FlashEnd));

                if let Some(timer) = agent.stagger.take() {
                    self.scheduler.cancel(timer);
                }
                let stagger = agent.config.stagger_duration;
                agent.stagger = Some(self.scheduler.after(id, stagger, TimerEvent::StaggerEnd));
                agent.enter(AgentState::Staggered, &self.events);
                agent.chase_pending = true;

                DamageOutcome::Damaged { remaining }
            },
            HealthChange::Depleted { overkill } => {
                debug!(agent = %id, amount, overkill, "Lethal damage");
                self.kill(id);
                DamageOutcome::Killed
            },
            HealthChange::Rejected => DamageOutcome::Rejected(DamageRejection::InvalidAmount(amount)),
            HealthChange::AlreadyDepleted => DamageOutcome::Rejected(DamageRejection::AlreadyDead(id)),
        }
    }

    /// Schedules explosion-style damage after `seconds`. The damage is
    /// dropped if the agent dies or despawns first.
    pub fn delay_damage(&mut self, id: EntityId, amount: i32, seconds: f32) -> Option<TimerId> {
        let Some(agent) = self.agents.get(&id) else {
            warn!(agent = %id, "Delayed damage for unknown agent");
            return None;
        };
        if amount <= 0 {
            warn!(agent = %id, amount, "Rejected non-positive delayed damage");
            return None;
        }
        if !agent.is_alive() {
            debug!(agent = %id, "Ignoring delayed damage on dead agent");
            return None;
        }
        Some(self.scheduler.after(id, seconds, TimerEvent::DelayedDamage { amount }))
    }

    /// Queues a knockback push, scaled by the agent's knockback scale and
    /// applied on the next tick.
    pub fn push(&mut self, id: EntityId, direction: Vec3) -> bool {
        match self.agents.get_mut(&id) {
            Some(agent) if agent.is_alive() => {
                agent.knockback += direction * agent.config.knockback_scale;
                true
            },
            Some(_) => {
                debug!(agent = %id, "Ignoring push on dead agent");
                false
            },
            None => false,
        }
    }

    /// Restores hit points on a live agent. Returns the amount healed.
    pub fn heal(&mut self, id: EntityId, amount: i32) -> i32 {
        match self.agents.get_mut(&id) {
            Some(agent) if agent.is_alive() => agent.health.heal(amount),
            _ => 0,
        }
    }

    fn kill(&mut self, id: EntityId) {
        let now = self.now();
        let Some(agent) = self.agents.get_mut(&id) else {
            return;
        };

        let cancelled = self.scheduler.cancel_owner(id);
        agent.attack_cooldown = None;
        agent.stagger = None;
        agent.flash = None;
        agent.roam.end_pause();
        agent.knockback = Vec3::ZERO;
        agent.chase_pending = false;
        agent.halt_pending = true;
        agent.died_at = Some(now);

        if agent.melee.take().is_some() {
            self.events.publish(AgentEvent::MeleeWindow {
                agent: id,
                open: false,
            });
        }
        agent.enter(AgentState::Dead, &self.events);
        self.events.publish(AgentEvent::Died {
            agent: id,
            config: agent.config.name.clone(),
        });
        info!(agent = %id, kind = %agent.config.name, cancelled, "Agent died");
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advances simulated time by `dt` seconds and updates every agent.
    pub fn tick<L, P, T>(&mut self, dt: f32, locomotion: &mut L, probe: &P, target: &mut T)
    where
        L: Locomotion + ?Sized,
        P: SightProbe + ?Sized,
        T: Target + ?Sized,
    {
        for fired in self.scheduler.advance(dt) {
            self.on_timer(fired, locomotion);
        }

        let ids: Vec<EntityId> = self.agents.keys().copied().collect();
        for id in ids {
            self.update_agent(id, dt, locomotion, probe, target);
        }
    }

    fn on_timer<L: Locomotion + ?Sized>(&mut self, fired: Fired<TimerEvent>, locomotion: &mut L) {
        let id = fired.owner;
        if let TimerEvent::DelayedDamage { amount } = fired.payload {
            self.apply_damage(id, amount);
            return;
        }

        let Some(agent) = self.agents.get_mut(&id) else {
            return;
        };
        if !agent.is_alive() {
            debug!(agent = %id, timer = ?fired.payload, "Timer fired for dead agent");
            return;
        }

        // A hit earlier in the same batch may have replaced this timer
        let current = match fired.payload {
            TimerEvent::AttackCooldown => agent.attack_cooldown,
            TimerEvent::StaggerEnd => agent.stagger,
            TimerEvent::FlashEnd => agent.flash,
            TimerEvent::RoamPause => agent.roam.pending(),
            _ => Some(fired.id),
        };
        if current != Some(fired.id) {
            debug!(agent = %id, timer = %fired.id, "Ignoring superseded timer");
            return;
        }

        match fired.payload {
            TimerEvent::AttackCooldown => {
                agent.attack_cooldown = None;
                if agent.state == AgentState::Attacking {
                    agent.enter(AgentState::Alerted, &self.events);
                }
            },
            TimerEvent::FireProjectile => emit_projectile(agent, &self.events),
            TimerEvent::CloseMeleeWindow { activation } => {
                if agent.melee.as_ref().is_some_and(|w| w.activation() == activation) {
                    agent.melee = None;
                    self.events.publish(AgentEvent::MeleeWindow {
                        agent: id,
                        open: false,
                    });
                }
            },
            TimerEvent::StaggerEnd => {
                agent.stagger = None;
                let next = if agent.perception.can_see {
                    AgentState::Alerted
                } else {
                    AgentState::Roaming
                };
                agent.enter(next, &self.events);
            },
            TimerEvent::FlashEnd => {
                agent.flash = None;
                self.events.publish(AgentEvent::DamageFlash {
                    agent: id,
                    active: false,
                });
            },
            TimerEvent::RoamPause => {
                agent.roam.end_pause();
                if agent.state != AgentState::Roaming {
                    return;
                }
                match agent.roam.pick_destination(&mut agent.rng, &*locomotion) {
                    Some(point) => {
                        locomotion.set_destination(id, point);
                    },
                    None => debug!(agent = %id, "No walkable roam point found"),
                }
            },
            TimerEvent::DelayedDamage { .. } => {},
        }
    }

    fn update_agent<L, P, T>(&mut self, id: EntityId, dt: f32, locomotion: &mut L, probe: &P, target: &mut T)
    where
        L: Locomotion + ?Sized,
        P: SightProbe + ?Sized,
        T: Target + ?Sized,
    {
        let Self {
            agents,
            scheduler,
            events,
            ..
        } = self;
        let Some(agent) = agents.get_mut(&id) else {
            return;
        };

        if !agent.is_alive() {
            if agent.halt_pending {
                locomotion.stop(id);
                locomotion.set_speed(id, 0.0);
                agent.halt_pending = false;
            }
            return;
        }

        let position = match locomotion.position(id) {
            Some(position) if locomotion.is_on_nav_surface(id) => position,
            _ => {
                let reason = AiError::MissingCollaborator {
                    agent: id,
                    reason: "not on a navigable surface",
                };
                debug!("{reason}, skipping tick");
                return;
            },
        };
        agent.pose.position = position;

        if agent.knockback != Vec3::ZERO {
            locomotion.add_velocity(id, agent.knockback);
            agent.knockback = Vec3::ZERO;
        }

        let ratio = agent.health.ratio();
        if let Some(selector) = agent.stage.as_mut() {
            let from = selector.current();
            if let Some(to) = selector.update(ratio) {
                info!(agent = %id, %from, %to, "Stage changed");
                events.publish(AgentEvent::StageChanged { agent: id, from, to });
            }
        }

        let target_position = target.position();
        let mut perception = perceive(
            &agent.config.sensor(),
            &agent.pose,
            target.id(),
            target_position,
            probe,
        );
        if !target.is_alive() {
            perception.can_see = false;
        }
        agent.perception = perception;

        if agent.chase_pending {
            agent.chase_pending = false;
            if target.is_alive() {
                locomotion.set_destination(id, target_position);
            }
        }

        let mut closing = false;
        if agent.state != AgentState::Staggered {
            if perception.can_see {
                agent.enter_if(AgentState::Roaming, AgentState::Alerted, events);
                agent.stopping_distance = agent.config.attack_range;
                locomotion.set_stopping_distance(id, agent.stopping_distance);

                let swinging = agent.state == AgentState::Attacking
                    && !matches!(agent.config.attack, AttackProfile::Ranged(_));
                if !swinging {
                    locomotion.set_destination(id, target_position);
                }

                let remaining = locomotion.remaining_distance(id).unwrap_or(f32::MAX);
                if remaining <= agent.stopping_distance + RANGE_TOLERANCE {
                    face(agent, target_position - position, dt);
                    if agent.state == AgentState::Alerted
                        && agent.attack_cooldown.is_none()
                        && within_attack_angle(agent)
                    {
                        start_attack(agent, scheduler, events);
                    }
                } else {
                    closing = true;
                    face_travel(agent, locomotion.velocity(id), dt);
                }
            } else {
                agent.stopping_distance = 0.0;
                locomotion.set_stopping_distance(id, 0.0);
                agent.enter_if(AgentState::Alerted, AgentState::Roaming, events);

                if agent.state == AgentState::Roaming {
                    let remaining = locomotion.remaining_distance(id).unwrap_or(0.0);
                    if agent.roam.needs_destination(remaining) {
                        let pause = agent.roam.pause();
                        agent.roam.begin_pause(scheduler.after(id, pause, TimerEvent::RoamPause));
                    }
                }
                face_travel(agent, locomotion.velocity(id), dt);
            }
        } else {
            agent.stopping_distance = if perception.can_see {
                agent.config.attack_range
            } else {
                0.0
            };
            locomotion.set_stopping_distance(id, agent.stopping_distance);
        }

        locomotion.set_speed(id, agent.travel_speed(closing));

        resolve_melee(agent, target, events);
    }
}

impl Agent {
    fn enter_if(&mut self, from: AgentState, to: AgentState, events: &EventBus) {
        if self.state == from {
            self.enter(to, events);
        }
    }
}

fn within_attack_angle(agent: &Agent) -> bool {
    match &agent.config.attack {
        AttackProfile::Ranged(ranged) => agent.perception.bearing_deg <= ranged.attack_angle,
        AttackProfile::Melee(_) | AttackProfile::Staged(_) => true,
    }
}

fn face(agent: &mut Agent, direction: Vec3, dt: f32) {
    if let Some(desired) = look_rotation(direction) {
        let t = (agent.config.turn_speed * dt).min(1.0);
        agent.pose.rotation = turn_towards(agent.pose.rotation, desired, t);
    }
}

fn face_travel(agent: &mut Agent, velocity: Vec3, dt: f32) {
    if velocity.length_squared() > 1e-4 {
        face(agent, velocity, dt);
    }
}

fn start_attack(agent: &mut Agent, scheduler: &mut Scheduler<TimerEvent>, events: &EventBus) {
    let id = agent.id;
    agent.enter(AgentState::Attacking, events);
    events.publish(AgentEvent::AttackFired {
        agent: id,
        style: agent.config.style(),
    });

    let cooldown = match (&agent.config.attack, agent.melee_profile()) {
        (AttackProfile::Ranged(ranged), _) => {
            if ranged.fire_delay > 0.0 {
                scheduler.after(id, ranged.fire_delay, TimerEvent::FireProjectile);
            } else {
                emit_projectile(agent, events);
            }
            1.0 / ranged.attack_rate
        },
        (_, Some(melee)) => {
            agent.melee_activations += 1;
            let activation = agent.melee_activations;
            agent.melee = Some(MeleeWindow::open(activation, &melee));
            events.publish(AgentEvent::MeleeWindow {
                agent: id,
                open: true,
            });
            scheduler.after(id, melee.window, TimerEvent::CloseMeleeWindow { activation });
            melee.window + melee.recovery
        },
        (_, None) => return,
    };

    agent.attack_cooldown = Some(scheduler.after(id, cooldown, TimerEvent::AttackCooldown));
    debug!(agent = %id, cooldown, "Attack started");
}

fn emit_projectile(agent: &Agent, events: &EventBus) {
    let AttackProfile::Ranged(ranged) = &agent.config.attack else {
        return;
    };
    events.publish(AgentEvent::ProjectileSpawned {
        agent: agent.id,
        origin: agent.pose.transform_point(ranged.muzzle_offset),
        direction: agent.pose.forward(),
    });
}

fn resolve_melee<T: Target + ?Sized>(agent: &mut Agent, target: &mut T, events: &EventBus) {
    let pose = agent.pose;
    let Some(window) = agent.melee.as_mut() else {
        return;
    };
    if !target.is_alive() || !window.overlaps(&pose, target.position()) {
        return;
    }
    if window.register_hit(target.id()) {
        let damage = window.damage();
        target.apply_damage(damage);
        debug!(agent = %agent.id, target_id = %target.id(), damage, "Melee hit");
        events.publish(AgentEvent::TargetHit {
            agent: agent.id,
            target: target.id(),
            damage,
        });
    }
}
