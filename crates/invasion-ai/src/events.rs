//! One-shot agent notifications.
//!
//! The AI publishes [`AgentEvent`]s on a bounded [`EventBus`]; presentation
//! layers (animation, audio, UI) and listeners such as [`KillCounter`] drain
//! them. Nothing a consumer does feeds back into the AI.

use std::collections::BTreeMap;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use glam::Vec3;
use invasion_common::EntityId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::AttackStyle;
use crate::stage::Stage;

/// Externally visible agent state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    /// Wandering around home
    Roaming,
    /// Target perceived, closing distance
    Alerted,
    /// Attack in progress, cooldown running
    Attacking,
    /// Halted after taking damage
    Staggered,
    /// Terminal
    Dead,
}

impl AgentState {
    /// Returns whether this is the terminal state.
    #[must_use]
    pub const fn is_dead(self) -> bool {
        matches!(self, Self::Dead)
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Roaming => "roaming",
            Self::Alerted => "alerted",
            Self::Attacking => "attacking",
            Self::Staggered => "staggered",
            Self::Dead => "dead",
        };
        f.write_str(name)
    }
}

/// Notifications emitted by the AI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentEvent {
    /// Agent entered the world
    Spawned {
        /// Agent
        agent: EntityId,
        /// Agent type name
        config: String,
    },
    /// Agent entered a state
    StateEntered {
        /// Agent
        agent: EntityId,
        /// New state
        state: AgentState,
    },
    /// Agent took non-lethal damage
    Damaged {
        /// Agent
        agent: EntityId,
        /// Damage taken
        amount: i32,
        /// Hit points left
        remaining: i32,
    },
    /// Agent died
    Died {
        /// Agent
        agent: EntityId,
        /// Agent type name
        config: String,
    },
    /// Attack started
    AttackFired {
        /// Agent
        agent: EntityId,
        /// Attack style
        style: AttackStyle,
    },
    /// Projectile should be spawned
    ProjectileSpawned {
        /// Agent
        agent: EntityId,
        /// Muzzle position
        origin: Vec3,
        /// Unit direction along the agent's facing
        direction: Vec3,
    },
    /// Melee hit volume toggled
    MeleeWindow {
        /// Agent
        agent: EntityId,
        /// Whether the window opened or closed
        open: bool,
    },
    /// Damage flash toggled
    DamageFlash {
        /// Agent
        agent: EntityId,
        /// Whether the flash started or ended
        active: bool,
    },
    /// Boss stage changed
    StageChanged {
        /// Agent
        agent: EntityId,
        /// Previous stage
        from: Stage,
        /// New stage
        to: Stage,
    },
    /// Melee hit landed on a target
    TargetHit {
        /// Attacking agent
        agent: EntityId,
        /// Target hit
        target: EntityId,
        /// Damage dealt
        damage: i32,
    },
    /// Dead agent removed from the world
    Reaped {
        /// Agent
        agent: EntityId,
    },
}

impl AgentEvent {
    /// Agent the event is about.
    #[must_use]
    pub const fn agent(&self) -> EntityId {
        match self {
            Self::Spawned { agent, .. }
            | Self::StateEntered { agent, .. }
            | Self::Damaged { agent, .. }
            | Self::Died { agent, .. }
            | Self::AttackFired { agent, .. }
            | Self::ProjectileSpawned { agent, .. }
            | Self::MeleeWindow { agent, .. }
            | Self::DamageFlash { agent, .. }
            | Self::StageChanged { agent, .. }
            | Self::TargetHit { agent, .. }
            | Self::Reaped { agent } => *agent,
        }
    }
}

/// Bounded event bus.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<AgentEvent>,
    receiver: Receiver<AgentEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event. Never blocks; a full bus drops the event.
    pub fn publish(&self, event: AgentEvent) {
        if let Err(TrySendError::Full(event)) = self.sender.try_send(event) {
            warn!(agent = %event.agent(), "Event bus full, dropping {event:?}");
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<AgentEvent> {
        self.receiver.try_iter().collect()
    }

    /// Drains pending events and hands each one to every handler.
    pub fn dispatch(&self, handlers: &[&dyn EventHandler]) -> usize {
        let events = self.drain();
        for event in &events {
            for handler in handlers {
                handler.handle(event);
            }
        }
        events.len()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<AgentEvent> {
        self.sender.clone()
    }
}

/// Typed event handler trait.
pub trait EventHandler: Send + Sync {
    /// Handles an event.
    fn handle(&self, event: &AgentEvent);
}

/// Counts deaths per agent type.
#[derive(Debug, Default)]
pub struct KillCounter {
    kills: Mutex<BTreeMap<String, u32>>,
}

impl KillCounter {
    /// Creates an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deaths of one agent type.
    #[must_use]
    pub fn kills_of(&self, config: &str) -> u32 {
        self.kills.lock().get(config).copied().unwrap_or(0)
    }

    /// Deaths across all types.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.kills.lock().values().sum()
    }

    /// Snapshot of all counts, sorted by type name.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, u32> {
        self.kills.lock().clone()
    }
}

impl EventHandler for KillCounter {
    fn handle(&self, event: &AgentEvent) {
        if let AgentEvent::Died { config, .. } = event {
            *self.kills.lock().entry(config.clone()).or_insert(0) += 1;
        }
    }
}
