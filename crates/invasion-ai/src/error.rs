//! Error types for the combat AI.
//!
//! Nothing in the AI core is fatal: damage rejections are reported as values
//! and logged, and collaborator gaps only skip a tick. `AiError` is reserved
//! for lookups and lifecycle calls made by the owning game layer.

use invasion_common::{EntityId, InvasionError};
use thiserror::Error;

/// Reasons a damage application was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DamageRejection {
    /// Damage amount was zero or negative
    #[error("damage amount must be positive, got {0}")]
    InvalidAmount(i32),
    /// Target agent already died
    #[error("agent {0} is already dead")]
    AlreadyDead(EntityId),
    /// No such agent in the world
    #[error("agent {0} not found")]
    UnknownAgent(EntityId),
}

/// Error types for AI world operations.
#[derive(Debug, Error)]
pub enum AiError {
    /// Agent not found
    #[error("agent not found: {0}")]
    NotFound(EntityId),
    /// Agent cannot be reaped while alive
    #[error("agent {0} is still alive")]
    NotDead(EntityId),
    /// Locomotion cannot serve this agent right now
    #[error("agent {agent} has no usable locomotion: {reason}")]
    MissingCollaborator {
        /// Affected agent
        agent: EntityId,
        /// What is missing
        reason: &'static str,
    },
    /// Configuration could not be loaded
    #[error("config error: {0}")]
    Config(#[from] InvasionError),
}

/// Result type for AI operations.
pub type AiResult<T> = Result<T, AiError>;
