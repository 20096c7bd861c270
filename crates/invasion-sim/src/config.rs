//! Arena scenario configuration.
//!
//! An arena describes one headless fight: where the target stands, which agent
//! types spawn where, and how long the simulation runs. Scenarios are stored
//! as TOML next to the agent catalog they reference.

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use invasion_ai::{Occluder, WalkableArea};
use invasion_common::{InvasionError, InvasionResult, SchemaVersion};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default scenario file name.
pub const ARENA_FILE: &str = "arena.toml";

/// The thing agents hunt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Where the target stands
    pub position: Vec3,
    /// Starting health
    pub health: f32,
    /// Damage dealt back to the nearest agent (0 = passive)
    pub retaliation_damage: i32,
    /// Seconds between retaliation hits
    pub retaliation_interval: f32,
    /// Only agents closer than this are hit back
    pub retaliation_range: f32,
    /// Knockback applied with each retaliation hit
    pub retaliation_knockback: f32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            health: 100.0,
            retaliation_damage: 0,
            retaliation_interval: 1.0,
            retaliation_range: 15.0,
            retaliation_knockback: 3.0,
        }
    }
}

/// One agent placed in the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnConfig {
    /// Catalog type name
    pub agent: String,
    /// Spawn point
    pub position: Vec3,
    /// Initial yaw in degrees (0 faces +Z, 90 faces +X)
    #[serde(default)]
    pub yaw_deg: f32,
    /// Starting health (full when omitted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<i32>,
}

impl SpawnConfig {
    /// Spawn at full health facing +Z.
    #[must_use]
    pub fn new(agent: impl Into<String>, position: Vec3) -> Self {
        Self {
            agent: agent.into(),
            position,
            yaw_deg: 0.0,
            health: None,
        }
    }
}

/// Walkable rectangle, serialized as two corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaConfig {
    /// First corner
    pub min: Vec3,
    /// Opposite corner
    pub max: Vec3,
}

impl From<AreaConfig> for WalkableArea {
    fn from(area: AreaConfig) -> Self {
        Self::new(area.min, area.max)
    }
}

/// Arena scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// File format version
    pub schema: SchemaVersion,
    /// Seed for every agent's roam sampling
    pub seed: u64,
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Simulated seconds to run
    pub duration: f32,
    /// End the run as soon as the target is destroyed
    pub stop_on_target_destroyed: bool,
    /// Agent catalog, relative to the scenario file (built-ins when unset)
    pub catalog: Option<PathBuf>,
    /// Ground height for sampled roam points
    pub ground_height: f32,
    /// Walkable bounds (unbounded when unset)
    pub area: Option<AreaConfig>,
    /// The target
    pub target: TargetConfig,
    /// Line-of-sight blockers
    pub occluders: Vec<Occluder>,
    /// Agents to spawn
    pub spawns: Vec<SpawnConfig>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            schema: SchemaVersion::ARENA,
            seed: 7,
            tick_rate: 30,
            duration: 60.0,
            stop_on_target_destroyed: true,
            catalog: None,
            ground_height: 0.0,
            area: Some(AreaConfig {
                min: Vec3::new(-30.0, 0.0, -30.0),
                max: Vec3::new(30.0, 0.0, 30.0),
            }),
            target: TargetConfig::default(),
            occluders: vec![Occluder::Box {
                min: Vec3::new(-2.0, 0.0, 8.0),
                max: Vec3::new(2.0, 3.0, 9.0),
            }],
            spawns: vec![
                SpawnConfig::new("grunt", Vec3::new(-10.0, 0.0, 14.0)),
                SpawnConfig::new("brute", Vec3::new(8.0, 0.0, 10.0)),
                SpawnConfig {
                    yaw_deg: 180.0,
                    ..SpawnConfig::new("warlord", Vec3::new(0.0, 0.0, 25.0))
                },
            ],
        }
    }
}

impl ArenaConfig {
    /// Parses, version-checks and validates a scenario.
    pub fn from_toml_str(contents: &str) -> InvasionResult<Self> {
        let mut config: Self = toml::from_str(contents)?;

        if !SchemaVersion::ARENA.can_read(&config.schema) {
            return Err(InvasionError::VersionMismatch {
                expected: SchemaVersion::ARENA.to_string(),
                actual: config.schema.to_string(),
            });
        }
        if let Some(index) = config.spawns.iter().position(|s| s.agent.is_empty()) {
            return Err(InvasionError::InvalidConfig {
                field: format!("spawns[{index}].agent"),
                reason: "agent type name is empty".to_string(),
            });
        }

        config.validate();
        Ok(config)
    }

    /// Loads a scenario from `path`.
    pub fn load_from<P: AsRef<Path>>(path: P) -> InvasionResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        info!(
            "Loaded arena from {} ({} spawns)",
            path.display(),
            config.spawns.len()
        );
        Ok(config)
    }

    /// Loads a scenario, falling back to the built-in arena if the file is
    /// missing or invalid.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("Arena file not found, using built-in arena");
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load arena: {e}");
                Self::default()
            },
        }
    }

    /// Saves the scenario to `path`, creating parent directories.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> InvasionResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| InvasionError::Serialization(e.to_string()))?;
        fs::write(path, contents)?;

        info!("Saved arena to {}", path.display());
        Ok(())
    }

    /// Catalog path resolved against the directory of `scenario`.
    #[must_use]
    pub fn catalog_path(&self, scenario: &Path) -> Option<PathBuf> {
        let catalog = self.catalog.as_ref()?;
        if catalog.is_absolute() {
            return Some(catalog.clone());
        }
        let base = scenario.parent().unwrap_or_else(|| Path::new(""));
        Some(base.join(catalog))
    }

    /// Fixed tick length in seconds.
    #[must_use]
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    /// Number of ticks covering `duration`.
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        (f64::from(self.duration) * f64::from(self.tick_rate)).ceil() as u64
    }

    /// Validate and clamp values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_rate = self.tick_rate.clamp(1, 240);
        self.duration = self.duration.clamp(0.1, 3600.0);

        let target = &mut self.target;
        target.health = target.health.max(1.0);
        target.retaliation_damage = target.retaliation_damage.max(0);
        target.retaliation_interval = target.retaliation_interval.clamp(0.05, 60.0);
        target.retaliation_range = target.retaliation_range.clamp(0.0, 200.0);
        target.retaliation_knockback = target.retaliation_knockback.clamp(0.0, 50.0);

        for spawn in &mut self.spawns {
            spawn.yaw_deg = spawn.yaw_deg.rem_euclid(360.0);
            spawn.health = spawn.health.map(|h| h.max(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_arena() {
        let config = ArenaConfig::default();
        assert_eq!(config.schema, SchemaVersion::ARENA);
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.spawns.len(), 3);
        assert_eq!(config.total_ticks(), 1800);
    }

    #[test]
    fn test_arena_validation() {
        let mut config = ArenaConfig::default();
        config.tick_rate = 0;
        config.duration = -5.0;
        config.target.health = 0.0;
        config.spawns[0].yaw_deg = -90.0;
        config.spawns[0].health = Some(-3);

        config.validate();

        assert_eq!(config.tick_rate, 1);
        assert!((config.duration - 0.1).abs() < 0.001);
        assert_eq!(config.target.health, 1.0);
        assert!((config.spawns[0].yaw_deg - 270.0).abs() < 0.001);
        assert_eq!(config.spawns[0].health, Some(1));
    }

    #[test]
    fn test_arena_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("arenas").join(ARENA_FILE);

        let mut config = ArenaConfig::default();
        config.seed = 99;
        config.target.retaliation_damage = 4;
        config.spawns.push(SpawnConfig {
            health: Some(10),
            ..SpawnConfig::new("brute", Vec3::new(1.0, 0.0, 2.0))
        });

        config.save_to(&path).expect("Failed to save arena");
        let loaded = ArenaConfig::load_from(&path).expect("Failed to load arena");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config = ArenaConfig::from_toml_str(
            r#"
            schema = "1.0.0"
            duration = 5.0

            [[spawns]]
            agent = "grunt"
            position = [0.0, 0.0, 10.0]
            "#,
        )
        .expect("valid arena");

        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.spawns.len(), 1);
        assert_eq!(config.spawns[0].yaw_deg, 0.0);
        assert_eq!(config.target.health, 100.0);
    }

    #[test]
    fn test_rejects_newer_major_schema() {
        let result = ArenaConfig::from_toml_str(r#"schema = "2.0.0""#);
        assert!(matches!(result, Err(InvasionError::VersionMismatch { .. })));
    }

    #[test]
    fn test_rejects_empty_agent_name() {
        let result = ArenaConfig::from_toml_str(
            r#"
            [[spawns]]
            agent = ""
            position = [0.0, 0.0, 0.0]
            "#,
        );
        assert!(matches!(result, Err(InvasionError::InvalidConfig { .. })));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = ArenaConfig::load_or_default("/nonexistent/path/arena.toml");
        assert_eq!(config, ArenaConfig::default());
    }

    #[test]
    fn test_catalog_path_is_relative_to_scenario() {
        let mut config = ArenaConfig::default();
        assert_eq!(config.catalog_path(Path::new("data/arena.toml")), None);

        config.catalog = Some(PathBuf::from("agents.toml"));
        assert_eq!(
            config.catalog_path(Path::new("data/arena.toml")),
            Some(PathBuf::from("data/agents.toml"))
        );
    }
}
