//! # Invasion Common
//!
//! Common types, utilities, and shared abstractions for the Invasion combat AI.
//!
//! This crate provides foundational types used across all Invasion crates:
//! - ID types (EntityId, TimerId)
//! - Horizontal-plane math helpers over `glam`
//! - Version information for data files
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod math;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::math::*;
    pub use crate::version::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_generation() {
        let id1 = EntityId::new();
        let id2 = EntityId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_data_formats_readable_by_this_build() {
        assert!(SchemaVersion::AGENT_CATALOG.can_read(&SchemaVersion::new(1, 0, 0)));
        assert!(SchemaVersion::ARENA.can_read(&SchemaVersion::ARENA));
    }

    #[test]
    fn test_bearing_of_target_straight_ahead() {
        let bearing = horizontal_bearing_deg(glam::Vec3::new(0.0, 3.0, 5.0), glam::Vec3::Z);
        assert!(bearing.abs() < 1e-4);
    }
}
