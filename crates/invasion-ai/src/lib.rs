//! # Invasion AI
//!
//! Engine-agnostic enemy combat AI.
//!
//! This crate provides everything an enemy needs to find, chase and fight a
//! target, driven by an explicit simulation tick:
//! - Health and damage with a terminal death transition
//! - Perception (range, field of view, line of sight)
//! - Locomotion proxy trait plus a straight-line reference navigator
//! - Roaming around the spawn point
//! - Combat state machine for ranged, melee and multi-stage boss agents
//! - Tick-driven timer scheduler
//! - Event bus for presentation layers and listeners
//! - TOML agent catalogs
//!
//! The engine stays outside: physics, navigation and the target are reached
//! only through the [`Locomotion`], [`SightProbe`] and [`Target`] traits
//! passed to [`World::tick`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod agent;
pub mod config;
pub mod error;
pub mod events;
pub mod health;
pub mod locomotion;
pub mod perception;
pub mod roam;
pub mod scheduler;
pub mod stage;
pub mod target;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::agent::*;
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::health::*;
    pub use crate::locomotion::*;
    pub use crate::perception::*;
    pub use crate::roam::*;
    pub use crate::scheduler::*;
    pub use crate::stage::*;
    pub use crate::target::*;
    pub use crate::world::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};
    use std::sync::Arc;

    #[test]
    fn test_brute_kills_dummy() {
        let mut world = World::new(3);
        let mut nav = SimpleNavigator::new();
        let field = OpenField::new();
        let mut dummy = TrainingDummy::with_health(Vec3::new(0.0, 0.0, 6.0), 40.0);

        let catalog = AgentCatalog::with_defaults();
        let config = catalog.get_shared("brute").expect("built-in brute");
        let id = world.spawn(Vec3::ZERO, Quat::IDENTITY, config);
        nav.add_agent(id, Vec3::ZERO, 3.0);

        for _ in 0..100 {
            world.tick(0.1, &mut nav, &field, &mut dummy);
            nav.advance(0.1);
            if dummy.is_destroyed() {
                break;
            }
        }

        assert!(dummy.is_destroyed());
        assert_eq!(dummy.total_damage(), 45);

        let counter = KillCounter::new();
        world.apply_damage(id, 1_000);
        world.events().dispatch(&[&counter]);
        assert_eq!(counter.kills_of("brute"), 1);
    }

    #[test]
    fn test_world_skips_tick_without_locomotion_body() {
        let mut world = World::new(0);
        let mut nav = SimpleNavigator::new();
        let field = OpenField::new();
        let mut dummy = TrainingDummy::new(Vec3::new(0.0, 0.0, 3.0));

        let id = world.spawn(Vec3::ZERO, Quat::IDENTITY, Arc::new(AgentConfig::ranged()));
        world.tick(0.1, &mut nav, &field, &mut dummy);

        assert_eq!(world.get(id).map(Agent::state), Some(AgentState::Roaming));
    }
}
