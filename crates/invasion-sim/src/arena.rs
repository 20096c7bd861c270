//! Headless arena run.
//!
//! Wires the AI [`World`] to the reference collaborators (straight-line
//! navigator, occluder field, training dummy) and steps it at a fixed rate.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use glam::Quat;
use invasion_ai::{
    AgentCatalog, AgentEvent, AiResult, EventHandler, KillCounter, OpenField, SimpleNavigator,
    Target, TrainingDummy, World,
};
use invasion_common::horizontal;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::ArenaConfig;

/// Writes events as JSON lines.
#[derive(Debug)]
pub struct EventLog<W: Write> {
    out: W,
    written: u64,
}

#[derive(Serialize)]
struct Record<'a> {
    time: f64,
    event: &'a AgentEvent,
}

impl<W: Write> EventLog<W> {
    /// Creates a log writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    /// Appends one event stamped with simulated time.
    pub fn record(&mut self, time: f64, event: &AgentEvent) -> Result<()> {
        serde_json::to_writer(&mut self.out, &Record { time, event })?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Lines written so far.
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Flushes and returns the writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArenaReport {
    /// Ticks simulated
    pub ticks: u64,
    /// Simulated seconds
    pub elapsed: f64,
    /// Whether the target was destroyed
    pub target_destroyed: bool,
    /// Target health left
    pub target_health: f32,
    /// Hits landed on the target
    pub target_hits: usize,
    /// Total damage dealt to the target
    pub damage_dealt: i32,
    /// Deaths per agent type
    pub kills: BTreeMap<String, u32>,
    /// Agents still alive
    pub survivors: usize,
    /// Events emitted
    pub events: u64,
}

/// One arena scenario in progress.
pub struct Arena {
    config: ArenaConfig,
    world: World,
    navigator: SimpleNavigator,
    field: OpenField,
    target: TrainingDummy,
    kills: KillCounter,
    retaliation_cooldown: f32,
    ticks: u64,
    events: u64,
}

impl Arena {
    /// Builds the arena and spawns every configured agent.
    pub fn new(config: ArenaConfig, catalog: &AgentCatalog) -> AiResult<Self> {
        let mut navigator = SimpleNavigator::new().with_ground_height(config.ground_height);
        if let Some(area) = config.area {
            navigator = navigator.with_area(area.into());
        }

        let mut field = OpenField::new();
        for occluder in &config.occluders {
            field.add_occluder(*occluder);
        }

        let target = TrainingDummy::with_health(config.target.position, config.target.health);
        let mut world = World::new(config.seed);

        for spawn in &config.spawns {
            let facing = Quat::from_rotation_y(spawn.yaw_deg.to_radians());
            let id = world.spawn_from_catalog(
                catalog,
                &spawn.agent,
                spawn.position,
                facing,
                spawn.health,
            )?;
            let speed = world.get(id).map_or(0.0, |agent| agent.config().speed);
            navigator.add_agent(id, spawn.position, speed);
        }

        info!(
            spawns = config.spawns.len(),
            seed = config.seed,
            "Arena ready"
        );

        Ok(Self {
            config,
            world,
            navigator,
            field,
            target,
            kills: KillCounter::new(),
            retaliation_cooldown: 0.0,
            ticks: 0,
            events: 0,
        })
    }

    /// Returns whether the run is over.
    pub fn is_finished(&self) -> bool {
        self.ticks >= self.config.total_ticks()
            || (self.config.stop_on_target_destroyed && !self.target.is_alive())
            || self.world.alive_count() == 0
    }

    /// Advances one fixed tick and returns the events it produced.
    pub fn step(&mut self) -> Vec<AgentEvent> {
        let dt = self.config.tick_seconds();

        self.world
            .tick(dt, &mut self.navigator, &self.field, &mut self.target);
        self.navigator.advance(dt);
        self.retaliate(dt);

        for id in self.world.reap_expired() {
            self.navigator.remove_agent(id);
        }
        self.ticks += 1;

        let events = self.world.drain_events();
        for event in &events {
            self.kills.handle(event);
        }
        self.events += events.len() as u64;
        events
    }

    /// Runs to completion, logging every event.
    pub fn run<W: Write>(&mut self, log: &mut EventLog<W>) -> Result<ArenaReport> {
        while !self.is_finished() {
            let events = self.step();
            let now = self.world.now();
            for event in &events {
                log.record(now, event)?;
            }
        }
        Ok(self.report())
    }

    /// Summary of the run so far.
    pub fn report(&self) -> ArenaReport {
        ArenaReport {
            ticks: self.ticks,
            elapsed: self.world.now(),
            target_destroyed: !self.target.is_alive(),
            target_health: self.target.health().max(0.0),
            target_hits: self.target.hits().len(),
            damage_dealt: self.target.total_damage(),
            kills: self.kills.snapshot(),
            survivors: self.world.alive_count(),
            events: self.events,
        }
    }

    /// The target hits the nearest live agent in range.
    fn retaliate(&mut self, dt: f32) {
        let settings = &self.config.target;
        if settings.retaliation_damage == 0 || !self.target.is_alive() {
            return;
        }

        self.retaliation_cooldown -= dt;
        if self.retaliation_cooldown > 0.0 {
            return;
        }

        let origin = self.target.position();
        let nearest = self
            .world
            .iter()
            .filter(|agent| agent.is_alive())
            .map(|agent| (agent.id(), agent.position()))
            .filter(|(_, position)| position.distance(origin) <= settings.retaliation_range)
            .min_by(|a, b| {
                a.1.distance_squared(origin)
                    .total_cmp(&b.1.distance_squared(origin))
            });
        let Some((id, position)) = nearest else {
            return;
        };

        self.retaliation_cooldown = settings.retaliation_interval;
        let away = horizontal(position - origin).normalize_or_zero();

        debug!(agent = %id, damage = settings.retaliation_damage, "Target retaliates");
        self.world.apply_damage(id, settings.retaliation_damage);
        self.world.push(id, away * settings.retaliation_knockback);
    }
}
