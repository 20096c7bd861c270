//! Agent type configuration.
//!
//! Each agent type is a static [`AgentConfig`] record. Records are grouped in
//! an [`AgentCatalog`] TOML file, validated when loaded and shared as
//! `Arc<AgentConfig>` so agents can never mutate them.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use glam::Vec3;
use invasion_common::{InvasionError, InvasionResult, SchemaVersion};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::perception::Sensor;
use crate::stage::Stage;

/// Kind of attack an agent performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackStyle {
    /// Projectile attack
    Ranged,
    /// Hit-volume attack
    Melee,
    /// Hit-volume attack tuned per boss stage
    Staged,
}

impl std::fmt::Display for AttackStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ranged => write!(f, "ranged"),
            Self::Melee => write!(f, "melee"),
            Self::Staged => write!(f, "staged"),
        }
    }
}

/// Projectile attack settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangedProfile {
    /// Attacks per second; the cooldown is `1 / attack_rate`
    pub attack_rate: f32,
    /// Seconds between the attack starting and the projectile spawning
    pub fire_delay: f32,
    /// Maximum bearing to the target, in degrees, for an attack to start
    pub attack_angle: f32,
    /// Muzzle position relative to the agent
    pub muzzle_offset: Vec3,
}

impl Default for RangedProfile {
    fn default() -> Self {
        Self {
            attack_rate: 0.5,
            fire_delay: 0.25,
            attack_angle: 30.0,
            muzzle_offset: Vec3::new(0.0, 1.4, 0.6),
        }
    }
}

/// Melee hit-volume settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeleeProfile {
    /// Damage dealt to each target once per activation
    pub damage: i32,
    /// Seconds the hit volume stays active
    pub window: f32,
    /// Extra seconds after the window closes before the next swing
    pub recovery: f32,
    /// Distance of the hit volume center in front of the agent
    pub reach: f32,
    /// Hit volume radius
    pub radius: f32,
}

impl Default for MeleeProfile {
    fn default() -> Self {
        Self {
            damage: 10,
            window: 1.0,
            recovery: 0.0,
            reach: 1.0,
            radius: 1.0,
        }
    }
}

/// Per-stage adjustments for a staged attacker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageTuning {
    /// Multiplier applied to the alert (run) speed
    pub speed_multiplier: f32,
    /// Extra melee damage
    pub damage_bonus: i32,
    /// Multiplier applied to the melee window
    pub window_multiplier: f32,
}

impl Default for StageTuning {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            damage_bonus: 0,
            window_multiplier: 1.0,
        }
    }
}

/// Multi-stage boss settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagedProfile {
    /// Base melee attack
    pub melee: MeleeProfile,
    /// Margin a healing boss must clear before returning to an earlier stage
    pub stage_hysteresis: f32,
    /// Tuning for stages one, two and three
    pub stages: [StageTuning; 3],
}

impl Default for StagedProfile {
    fn default() -> Self {
        Self {
            melee: MeleeProfile::default(),
            stage_hysteresis: 0.0,
            stages: [StageTuning::default(); 3],
        }
    }
}

impl StagedProfile {
    /// Tuning for `stage`.
    #[must_use]
    pub fn tuning(&self, stage: Stage) -> &StageTuning {
        &self.stages[stage.index()]
    }

    /// Melee settings with the stage tuning applied.
    #[must_use]
    pub fn melee_for(&self, stage: Stage) -> MeleeProfile {
        let tuning = self.tuning(stage);
        MeleeProfile {
            damage: self.melee.damage.saturating_add(tuning.damage_bonus).max(1),
            window: self.melee.window * tuning.window_multiplier,
            ..self.melee.clone()
        }
    }
}

/// Attack strategy of an agent type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttackProfile {
    /// Fires projectiles
    Ranged(RangedProfile),
    /// Swings a hit volume
    Melee(MeleeProfile),
    /// Swings a hit volume with per-stage tuning
    Staged(StagedProfile),
}

impl Default for AttackProfile {
    fn default() -> Self {
        Self::Melee(MeleeProfile::default())
    }
}

impl AttackProfile {
    /// Attack style of this profile.
    #[must_use]
    pub const fn style(&self) -> AttackStyle {
        match self {
            Self::Ranged(_) => AttackStyle::Ranged,
            Self::Melee(_) => AttackStyle::Melee,
            Self::Staged(_) => AttackStyle::Staged,
        }
    }
}

/// Static settings for one agent type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Type name, filled from the catalog key when empty
    pub name: String,

    // === Health ===
    /// Maximum hit points
    pub max_health: i32,
    /// Seconds speed stays at zero after a hit
    pub stagger_duration: f32,
    /// Seconds the damage flash lasts
    pub flash_duration: f32,
    /// Scale applied to knockback pushes
    pub knockback_scale: f32,
    /// Seconds a corpse stays in the world before it can be reaped
    pub corpse_grace: f32,

    // === Movement ===
    /// Walking speed
    pub speed: f32,
    /// Speed while closing on a target
    pub alert_speed: f32,
    /// Turn rate factor (interpolation per second)
    pub turn_speed: f32,
    /// Roam distance from spawn
    pub roam_radius: f32,
    /// Seconds to wait between roam destinations
    pub roam_pause: f32,

    // === Perception ===
    /// Detection range
    pub view_range: f32,
    /// Half view angle in degrees
    pub view_angle: f32,
    /// Sensor (head) position relative to the agent
    pub sensor_offset: Vec3,

    // === Attack ===
    /// Stopping distance used while a target is perceived
    pub attack_range: f32,
    /// Attack strategy
    pub attack: AttackProfile,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_health: 50,
            stagger_duration: 1.0,
            flash_duration: 0.1,
            knockback_scale: 1.0 / 3.0,
            corpse_grace: 5.0,
            speed: 3.5,
            alert_speed: 3.5,
            turn_speed: 5.0,
            roam_radius: 10.0,
            roam_pause: 2.0,
            view_range: 20.0,
            view_angle: 60.0,
            sensor_offset: Vec3::new(0.0, 1.6, 0.0),
            attack_range: 2.0,
            attack: AttackProfile::default(),
        }
    }
}

impl AgentConfig {
    /// Rifle-carrying grunt.
    #[must_use]
    pub fn ranged() -> Self {
        Self {
            name: "grunt".to_string(),
            max_health: 50,
            view_angle: 45.0,
            attack_range: 12.0,
            attack: AttackProfile::Ranged(RangedProfile::default()),
            ..Self::default()
        }
    }

    /// Close-range brute.
    #[must_use]
    pub fn melee() -> Self {
        Self {
            name: "brute".to_string(),
            max_health: 60,
            speed: 3.0,
            alert_speed: 4.5,
            attack_range: 1.8,
            attack: AttackProfile::Melee(MeleeProfile {
                damage: 15,
                window: 1.0,
                recovery: 0.0,
                reach: 1.0,
                radius: 1.2,
            }),
            ..Self::default()
        }
    }

    /// Three-stage boss. Sees all around itself.
    #[must_use]
    pub fn boss() -> Self {
        Self {
            name: "warlord".to_string(),
            max_health: 300,
            speed: 2.5,
            alert_speed: 5.0,
            view_range: 30.0,
            view_angle: 180.0,
            attack_range: 2.5,
            corpse_grace: 10.0,
            attack: AttackProfile::Staged(StagedProfile {
                melee: MeleeProfile {
                    damage: 20,
                    window: 1.5,
                    recovery: 0.5,
                    reach: 1.5,
                    radius: 1.5,
                },
                stage_hysteresis: 0.0,
                stages: [
                    StageTuning::default(),
                    StageTuning {
                        speed_multiplier: 1.2,
                        damage_bonus: 5,
                        window_multiplier: 0.8,
                    },
                    StageTuning {
                        speed_multiplier: 1.5,
                        damage_bonus: 10,
                        window_multiplier: 0.6,
                    },
                ],
            }),
            ..Self::default()
        }
    }

    /// Sensor settings derived from this config.
    #[must_use]
    pub fn sensor(&self) -> Sensor {
        Sensor {
            view_range: self.view_range,
            view_angle: self.view_angle,
            offset: self.sensor_offset,
        }
    }

    /// Attack style.
    #[must_use]
    pub const fn style(&self) -> AttackStyle {
        self.attack.style()
    }

    /// Validate and clamp values to sensible ranges.
    pub fn validate(&mut self) {
        self.max_health = self.max_health.clamp(1, 100_000);
        self.stagger_duration = self.stagger_duration.clamp(0.0, 30.0);
        self.flash_duration = self.flash_duration.clamp(0.0, 5.0);
        self.knockback_scale = self.knockback_scale.clamp(0.0, 10.0);
        self.corpse_grace = self.corpse_grace.clamp(0.0, 600.0);

        self.speed = self.speed.clamp(0.0, 50.0);
        self.alert_speed = self.alert_speed.clamp(0.0, 50.0);
        self.turn_speed = self.turn_speed.clamp(0.0, 100.0);
        self.roam_radius = self.roam_radius.clamp(0.0, 500.0);
        self.roam_pause = self.roam_pause.clamp(0.0, 60.0);

        self.view_range = self.view_range.clamp(0.0, 1000.0);
        self.view_angle = self.view_angle.clamp(0.0, 180.0);
        self.attack_range = self.attack_range.clamp(0.0, self.view_range);

        match &mut self.attack {
            AttackProfile::Ranged(ranged) => {
                ranged.attack_rate = ranged.attack_rate.clamp(0.01, 100.0);
                ranged.fire_delay = ranged.fire_delay.clamp(0.0, 10.0);
                ranged.attack_angle = ranged.attack_angle.clamp(0.0, 180.0);
            },
            AttackProfile::Melee(melee) => validate_melee(melee),
            AttackProfile::Staged(staged) => {
                validate_melee(&mut staged.melee);
                staged.stage_hysteresis = staged.stage_hysteresis.clamp(0.0, 0.3);
                for tuning in &mut staged.stages {
                    tuning.speed_multiplier = tuning.speed_multiplier.clamp(0.0, 10.0);
                    tuning.damage_bonus =
                        tuning.damage_bonus.clamp(1 - staged.melee.damage, MAX_HIT_DAMAGE);
                    tuning.window_multiplier = tuning.window_multiplier.clamp(0.1, 10.0);
                }
            },
        }
    }
}

/// Upper bound for a single melee hit and for a stage damage bonus.
const MAX_HIT_DAMAGE: i32 = 100_000;

fn validate_melee(melee: &mut MeleeProfile) {
    melee.damage = melee.damage.clamp(1, MAX_HIT_DAMAGE);
    melee.window = melee.window.clamp(0.05, 30.0);
    melee.recovery = melee.recovery.clamp(0.0, 30.0);
    melee.reach = melee.reach.clamp(0.0, 20.0);
    melee.radius = melee.radius.clamp(0.05, 20.0);
}

/// Catalog of agent types, as stored in a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCatalog {
    /// File format version
    pub schema: SchemaVersion,
    /// Agent types by name
    #[serde(default)]
    pub agents: BTreeMap<String, AgentConfig>,
}

impl Default for AgentCatalog {
    fn default() -> Self {
        Self {
            schema: SchemaVersion::AGENT_CATALOG,
            agents: BTreeMap::new(),
        }
    }
}

impl AgentCatalog {
    /// Catalog holding the built-in grunt, brute and warlord types.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut catalog = Self::default();
        for config in [AgentConfig::ranged(), AgentConfig::melee(), AgentConfig::boss()] {
            catalog.insert(config);
        }
        catalog
    }

    /// Parses, version-checks and validates a catalog.
    pub fn from_toml_str(contents: &str) -> InvasionResult<Self> {
        let mut catalog: Self = toml::from_str(contents)?;

        if !SchemaVersion::AGENT_CATALOG.can_read(&catalog.schema) {
            return Err(InvasionError::VersionMismatch {
                expected: SchemaVersion::AGENT_CATALOG.to_string(),
                actual: catalog.schema.to_string(),
            });
        }

        for (key, config) in &mut catalog.agents {
            if config.name.is_empty() {
                config.name.clone_from(key);
            } else if config.name != *key {
                return Err(InvasionError::InvalidConfig {
                    field: format!("agents.{key}.name"),
                    reason: format!("name `{}` does not match its key", config.name),
                });
            }
            config.validate();
        }

        Ok(catalog)
    }

    /// Loads a catalog from `path`.
    pub fn load_from<P: AsRef<Path>>(path: P) -> InvasionResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&contents)?;
        info!(
            "Loaded {} agent types from {}",
            catalog.agents.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Loads a catalog from `path`, falling back to the built-in types if the
    /// file is missing or invalid.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("Agent catalog not found, using built-in types");
            return Self::with_defaults();
        }
        match Self::load_from(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("Failed to load agent catalog: {e}");
                Self::with_defaults()
            },
        }
    }

    /// Saves the catalog to `path`, creating parent directories.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> InvasionResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| InvasionError::Serialization(e.to_string()))?;
        fs::write(path, contents)?;

        info!("Saved agent catalog to {}", path.display());
        Ok(())
    }

    /// Adds or replaces a type, keyed by its name.
    pub fn insert(&mut self, mut config: AgentConfig) {
        config.validate();
        self.agents.insert(config.name.clone(), config);
    }

    /// Looks up a type.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AgentConfig> {
        self.agents.get(name)
    }

    /// Looks up a type as a shared, immutable record.
    #[must_use]
    pub fn get_shared(&self, name: &str) -> Option<Arc<AgentConfig>> {
        self.get(name).cloned().map(Arc::new)
    }

    /// Looks up a type, failing with a config error when it is unknown.
    pub fn require(&self, name: &str) -> InvasionResult<Arc<AgentConfig>> {
        self.get_shared(name).ok_or_else(|| InvasionError::InvalidConfig {
            field: format!("agents.{name}"),
            reason: format!("unknown agent type `{name}`"),
        })
    }

    /// Names of all types, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }
}
