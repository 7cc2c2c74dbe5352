//! Simulation driver: owns the world, the agents and the random source.
//!
//! Callers drive it with `reset`, `step` and `is_complete`. Everything else
//! is a read accessor or a convenience built on those three.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::agent::{all_arrived, Agent};
use crate::config::{validate_dt, ConfigError, SimulationConfig};
use crate::constants::agent::FIRST_ID;
use crate::geometry::Point2;
use crate::movement::step_agent;
use crate::spawn;
use crate::trajectory::{AgentTrajectory, RunSummary};
use crate::world::World;

/// Most fixed steps a `FixedStepper` runs per call before dropping the
/// backlog.
const MAX_CATCH_UP_STEPS: u32 = 8;

/// How a capped run ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum RunOutcome {
    /// Every agent arrived.
    Completed { steps: u64, elapsed: f32 },
    /// `max_steps` ran out first.
    StepLimit { steps: u64, remaining: usize },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

pub struct Simulation {
    world: World,
    agents: Vec<Agent>,
    config: SimulationConfig,
    rng: StdRng,
    time: f32,
    steps: u64,
    spawn_warnings: usize,
    next_id: u32,
    completion_logged: bool,
}

impl Simulation {
    /// An empty simulation over `world`. Seeds from `config.seed` when set.
    pub fn new(world: World, config: SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            world,
            agents: Vec::new(),
            config,
            rng,
            time: 0.0,
            steps: 0,
            spawn_warnings: 0,
            next_id: FIRST_ID,
            completion_logged: false,
        }
    }

    /// Replace the world and spawn a fresh batch of `agent_count` agents.
    /// Time, ids and diagnostics start over.
    pub fn reset(&mut self, world: World, agent_count: usize) {
        self.world = world;
        self.agents.clear();
        self.time = 0.0;
        self.steps = 0;
        self.spawn_warnings = 0;
        self.next_id = FIRST_ID;
        self.completion_logged = false;

        for _ in 0..agent_count {
            let outcome = spawn::sample(
                &self.world,
                self.config.spawn_margin,
                self.config.max_spawn_attempts,
                self.config.spawn_mode,
                &mut self.rng,
            );
            if !outcome.clear {
                log::warn!(
                    "No clear spawn point after {} attempts; placing agent at ({:.2}, {:.2})",
                    self.config.max_spawn_attempts.max(1),
                    outcome.point.x,
                    outcome.point.y
                );
                self.spawn_warnings += 1;
            }
            let speed = self.config.sample_speed(&mut self.rng);
            self.place(outcome.point, speed);
        }

        log::info!(
            "Reset: {} agents, {} compartments, {} stations, {} spawn warnings",
            self.agents.len(),
            self.world.compartments.len(),
            self.world.stations.len(),
            self.spawn_warnings
        );
    }

    /// Put one agent at `point` without any clearance check. Returns its id.
    pub fn spawn_agent_at(&mut self, point: Point2, speed: f32) -> u32 {
        self.completion_logged = false;
        self.place(point, speed)
    }

    fn place(&mut self, point: Point2, speed: f32) -> u32 {
        let id = self.next_id;
        self.next_id += 1;

        let station = match self.world.nearest_station(point) {
            Some(s) => s,
            None => {
                log::warn!("Agent {id} has no mustering station to walk to");
                0
            }
        };
        let mut agent = Agent::new(id, speed, point, station);
        if let Some(ci) = self.world.compartment_index_at(point) {
            if self.world.deck_exit_index(ci).is_some() {
                agent = agent.in_compartment(ci);
            }
        }
        self.agents.push(agent);
        id
    }

    /// Advance every non-arrived agent by `dt` seconds, in spawn order.
    /// Non-positive or non-finite `dt` is ignored.
    pub fn step(&mut self, dt: f32) {
        if let Err(e) = validate_dt(dt) {
            log::warn!("Ignoring step: {e}");
            return;
        }
        self.time += dt;
        self.steps += 1;

        for agent in self.agents.iter_mut().filter(|a| !a.is_arrived()) {
            step_agent(agent, &self.world, dt, self.time, &mut self.rng);
        }

        if !self.completion_logged && self.is_complete() {
            self.completion_logged = true;
            log::info!(
                "All {} agents arrived after {:.1}s ({} steps)",
                self.agents.len(),
                self.time,
                self.steps
            );
        }
    }

    pub fn is_complete(&self) -> bool {
        all_arrived(&self.agents)
    }

    /// Step until every agent arrives or `max_steps` steps have run.
    pub fn run_to_completion(&mut self, dt: f32, max_steps: u64) -> RunOutcome {
        let mut taken = 0;
        while !self.is_complete() && taken < max_steps {
            self.step(dt);
            taken += 1;
        }
        if self.is_complete() {
            RunOutcome::Completed {
                steps: taken,
                elapsed: self.time,
            }
        } else {
            let remaining = self.agents.iter().filter(|a| !a.is_arrived()).count();
            log::warn!("Stopped after {taken} steps with {remaining} agents still walking");
            RunOutcome::StepLimit {
                steps: taken,
                remaining,
            }
        }
    }

    /// Ids of walking agents that have been blocked at least `threshold`
    /// times.
    pub fn stuck_agents(&self, threshold: u64) -> Vec<u32> {
        self.agents
            .iter()
            .filter(|a| !a.is_arrived() && a.blocked_steps >= threshold)
            .map(|a| a.id)
            .collect()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: u32) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Seconds simulated since the last reset.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Agents whose spawn point is only a fallback.
    pub fn spawn_warnings(&self) -> usize {
        self.spawn_warnings
    }

    /// Per-frame view: id, position and arrival flag for every agent.
    pub fn positions(&self) -> impl Iterator<Item = (u32, Point2, bool)> + '_ {
        self.agents
            .iter()
            .map(|a| (a.id, a.position, a.is_arrived()))
    }

    pub fn trajectories(&self) -> Vec<AgentTrajectory> {
        self.agents
            .iter()
            .map(|a| {
                let station = self
                    .world
                    .station(a.station)
                    .map(|s| s.name.as_str())
                    .unwrap_or_default();
                AgentTrajectory::from_agent(a, station, self.world.deck.z)
            })
            .collect()
    }

    pub fn summary(&self) -> RunSummary {
        let distances: Vec<f32> = self.agents.iter().map(|a| a.distance).collect();
        let mean_distance = if distances.is_empty() {
            0.0
        } else {
            distances.iter().sum::<f32>() / distances.len() as f32
        };
        RunSummary {
            agents: self.agents.len(),
            arrived: self.agents.iter().filter(|a| a.is_arrived()).count(),
            elapsed: self.time,
            steps: self.steps,
            spawn_warnings: self.spawn_warnings,
            agents_blocked: self.agents.iter().filter(|a| a.blocked_steps > 0).count(),
            mean_distance,
            max_distance: distances.iter().copied().fold(0.0, f32::max),
        }
    }
}

/// Turns variable frame times into whole fixed-size simulation steps.
#[derive(Debug, Clone)]
pub struct FixedStepper {
    dt: f32,
    accumulator: f32,
}

impl FixedStepper {
    pub fn new(dt: f32) -> Result<Self, ConfigError> {
        Ok(Self {
            dt: validate_dt(dt)?,
            accumulator: 0.0,
        })
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Bank `elapsed` seconds and run as many fixed steps as it covers.
    /// Returns the number of steps taken.
    pub fn advance(&mut self, sim: &mut Simulation, elapsed: f32) -> u32 {
        if elapsed.is_finite() && elapsed > 0.0 {
            self.accumulator += elapsed;
        }
        let mut taken = 0;
        while self.accumulator >= self.dt {
            if taken == MAX_CATCH_UP_STEPS {
                log::debug!("Dropping {:.3}s of frame backlog", self.accumulator);
                self.accumulator = 0.0;
                break;
            }
            sim.step(self.dt);
            self.accumulator -= self.dt;
            taken += 1;
        }
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::MovementPhase;
    use crate::shape::Shape;
    use crate::world::{Compartment, Deck, Interface, MusteringStation};

    fn seeded(seed: u64) -> SimulationConfig {
        SimulationConfig {
            seed: Some(seed),
            ..SimulationConfig::default()
        }
    }

    fn two_station_world() -> World {
        World::new(
            Deck::rectangle(40.0, 20.0),
            vec![Compartment::new(
                "locker",
                Shape::rectangle(Point2::new(0.0, 0.0), 4.0, 4.0, 0.0),
            )],
            vec![],
            vec![
                MusteringStation::new("west", Point2::new(-15.0, 0.0), 4.0, 6.0),
                MusteringStation::new("east", Point2::new(15.0, 0.0), 4.0, 6.0),
            ],
        )
    }

    /// 4×4 cabin at the origin with a deck exit on its right wall.
    fn cabin_world() -> World {
        World::new(
            Deck::rectangle(30.0, 30.0),
            vec![Compartment::new(
                "cabin",
                Shape::rectangle(Point2::ORIGIN, 4.0, 4.0, 0.0),
            )],
            vec![Interface::door("d", Point2::new(2.0, 0.0), 1.0, 2.0)
                .connecting(["cabin", "deck"])],
            vec![MusteringStation::new("S", Point2::new(10.0, 0.0), 2.0, 2.0)],
        )
    }

    #[test]
    fn reset_spawns_numbered_agents() {
        let world = two_station_world();
        let mut sim = Simulation::new(world.clone(), seeded(1));
        sim.reset(world, 5);
        let ids: Vec<u32> = sim.agents().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1001, 1002, 1003, 1004, 1005]);
        assert_eq!(sim.spawn_warnings(), 0);
        assert_eq!(sim.time(), 0.0);
        for a in sim.agents() {
            assert_eq!(a.phase, MovementPhase::Spawned);
            assert!((5.0..=8.0).contains(&a.speed));
        }
    }

    #[test]
    fn agents_go_to_nearest_station() {
        let world = two_station_world();
        let mut sim = Simulation::new(world.clone(), seeded(2));
        sim.reset(world, 20);
        for a in sim.agents() {
            let expected = if a.position.x < 0.0 { 0 } else { 1 };
            assert_eq!(a.station, expected, "agent at {:?}", a.position);
        }
    }

    #[test]
    fn same_seed_same_run() {
        let world = two_station_world();
        let run = |seed| {
            let mut sim = Simulation::new(world.clone(), seeded(seed));
            sim.reset(world.clone(), 6);
            sim.run_to_completion(0.1, 500);
            sim.trajectories()
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn open_deck_run_completes() {
        let world = two_station_world();
        let mut sim = Simulation::new(world.clone(), seeded(3));
        sim.reset(world, 10);
        let outcome = sim.run_to_completion(0.1, 2000);
        assert!(outcome.is_completed(), "{outcome:?}");
        assert!(sim.is_complete());
        let summary = sim.summary();
        assert_eq!(summary.arrived, 10);
        assert!(summary.is_complete());
        assert!(summary.mean_distance > 0.0);
        assert!(summary.max_distance >= summary.mean_distance);
    }

    #[test]
    fn arrived_agents_stop_recording() {
        let world = two_station_world();
        let mut sim = Simulation::new(world.clone(), seeded(4));
        sim.reset(world, 3);
        sim.run_to_completion(0.1, 2000);
        let lengths: Vec<usize> = sim.agents().iter().map(|a| a.trajectory.len()).collect();
        sim.step(0.1);
        let after: Vec<usize> = sim.agents().iter().map(|a| a.trajectory.len()).collect();
        assert_eq!(lengths, after);
    }

    #[test]
    fn invalid_dt_is_ignored() {
        let world = two_station_world();
        let mut sim = Simulation::new(world.clone(), seeded(5));
        sim.reset(world, 1);
        sim.step(0.0);
        sim.step(-1.0);
        assert_eq!(sim.steps(), 0);
        assert_eq!(sim.agents()[0].trajectory.len(), 1);
    }

    #[test]
    fn forced_spawn_inside_exit_compartment() {
        let world = cabin_world();
        let mut sim = Simulation::new(world.clone(), seeded(6));
        sim.reset(world, 0);
        let inside = sim.spawn_agent_at(Point2::new(-1.0, 0.0), 5.0);
        let outside = sim.spawn_agent_at(Point2::new(-8.0, 8.0), 5.0);
        assert_eq!(sim.agent(inside).and_then(|a| a.current_compartment), Some(0));
        assert_eq!(sim.agent(outside).and_then(|a| a.current_compartment), None);

        assert!(sim.run_to_completion(0.1, 1000).is_completed());
        assert!(sim.agent(inside).is_some_and(|a| a.has_exited_compartment()));
    }

    #[test]
    fn room_agents_arrive_at_frame_rate() {
        for dt in [0.016, 0.02, 0.1] {
            let world = cabin_world();
            let mut sim = Simulation::new(world.clone(), seeded(6));
            sim.reset(world, 0);
            sim.spawn_agent_at(Point2::new(-1.0, 0.5), 5.0);
            sim.spawn_agent_at(Point2::new(1.0, -1.2), 7.0);
            let outcome = sim.run_to_completion(dt, 5000);
            assert!(outcome.is_completed(), "dt {dt}: {outcome:?}");
            assert!(sim.agents().iter().all(|a| a.has_exited_compartment()));
            assert!(sim.stuck_agents(100).is_empty(), "dt {dt}");
        }
    }

    #[test]
    fn unreachable_station_hits_step_limit() {
        // Every candidate step leaves the tiny deck
        let world = World::new(
            Deck::rectangle(1.0, 1.0),
            vec![],
            vec![],
            vec![MusteringStation::new("S", Point2::new(20.0, 0.0), 2.0, 2.0)],
        );
        let mut sim = Simulation::new(world.clone(), seeded(7));
        sim.reset(world, 0);
        sim.spawn_agent_at(Point2::ORIGIN, 10.0);
        let outcome = sim.run_to_completion(0.1, 300);
        assert_eq!(
            outcome,
            RunOutcome::StepLimit {
                steps: 300,
                remaining: 1
            }
        );
        assert_eq!(sim.stuck_agents(1), vec![1001]);
        assert!(sim.stuck_agents(10_000).is_empty());
        assert_eq!(sim.summary().agents_blocked, 1);
    }

    #[test]
    fn fixed_stepper_banks_partial_frames() {
        let world = two_station_world();
        let mut sim = Simulation::new(world.clone(), seeded(8));
        sim.reset(world, 1);
        let mut stepper = FixedStepper::new(0.1).unwrap();
        assert_eq!(stepper.advance(&mut sim, 0.05), 0);
        assert_eq!(stepper.advance(&mut sim, 0.07), 1);
        assert_eq!(stepper.advance(&mut sim, 0.25), 2);
        assert_eq!(sim.steps(), 3);
        // A long stall runs a bounded number of steps
        assert_eq!(stepper.advance(&mut sim, 5.0), MAX_CATCH_UP_STEPS);
        assert!(FixedStepper::new(0.0).is_err());
    }

    #[test]
    fn trajectories_name_the_station() {
        let world = two_station_world();
        let mut sim = Simulation::new(world.clone(), seeded(10));
        sim.reset(world, 0);
        sim.spawn_agent_at(Point2::new(12.0, 8.0), 6.0);
        sim.step(0.1);
        let records = sim.trajectories();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].assigned_station_index, 1);
        assert_eq!(records[0].assigned_station, "east");
        assert_eq!(records[0].path.len(), 2);
        assert!((records[0].path[1].v - 6.0).abs() < 1e-3);
    }

    #[test]
    fn exported_z_follows_the_current_world() {
        let mut first = two_station_world();
        first.deck.z = 3.0;
        let mut second = two_station_world();
        second.deck.z = 9.0;

        let mut sim = Simulation::new(first, seeded(11));
        sim.reset(second, 0);
        sim.spawn_agent_at(Point2::new(12.0, 8.0), 6.0);
        sim.step(0.1);
        let records = sim.trajectories();
        assert!(records[0].path.iter().all(|p| p.z == 9.0));
    }
}
