//! ShipEvac Headless Evacuation Harness
//!
//! Loads a deck arrangement, runs evacuation scenarios with a fixed time
//! step and checks the movement rules against what actually happened.
//! Runs entirely in-process: no rendering, no networking.
//!
//! Usage:
//!   cargo run -p shipevac-simtest
//!   cargo run -p shipevac-simtest -- --layout deck.json --agents 200 --seed 7
//!   cargo run -p shipevac-simtest -- --json > trajectories.json
//!
//! Logging follows `RUST_LOG`; `--verbose` defaults it to `debug`.

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use shipevac_logic::arrangement::{load_world_from_str, LoadReport};
use shipevac_logic::config::{validate_config, validate_dt, SimulationConfig};
use shipevac_logic::geometry::Point2;
use shipevac_logic::shape::Shape;
use shipevac_logic::simulation::{RunOutcome, Simulation};
use shipevac_logic::spawn::{is_open_spot, SpawnMode};
use shipevac_logic::trajectory::{AgentTrajectory, RunSummary};
use shipevac_logic::world::{Compartment, Deck, MusteringStation, World};

// ── Bundled arrangement (same file the logic tests use) ─────────────────
const SAMPLE_DECK: &str = include_str!("../../../data/sample_deck.json");

// ── Options ─────────────────────────────────────────────────────────────

/// Headless evacuation runs over a deck arrangement.
#[derive(Debug, Parser)]
#[command(version, about = "ShipEvac headless evacuation harness", long_about = None)]
struct Options {
    /// Arrangement JSON to load instead of the bundled deck.
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Agents spawned per scenario.
    #[arg(long, default_value_t = 60)]
    agents: usize,

    /// RNG seed shared by every scenario.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Fixed time step in seconds.
    #[arg(long, default_value_t = 0.1, value_parser = parse_dt)]
    dt: f32,

    /// Step cap per run.
    #[arg(long, default_value_t = 5000)]
    max_steps: u64,

    /// Print the run summary and trajectories as JSON instead of checks.
    #[arg(long)]
    json: bool,

    /// Print every check and default logging to `debug`.
    #[arg(long)]
    verbose: bool,
}

fn parse_dt(text: &str) -> Result<f32, String> {
    let dt: f32 = text.parse().map_err(|e| format!("{e}"))?;
    validate_dt(dt).map_err(|e| e.to_string())
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

#[derive(Serialize)]
struct JsonOutput {
    summary: RunSummary,
    trajectories: Vec<AgentTrajectory>,
}

fn main() {
    let opts = Options::parse();

    let default_level = if opts.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let text = match &opts.layout {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("error: cannot read {}: {e}", path.display());
                std::process::exit(2);
            }
        },
        None => SAMPLE_DECK.to_string(),
    };
    let (world, report) = match load_world_from_str(&text) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };

    // In JSON mode stdout carries only the document
    if opts.json {
        let (sim, _) = run_open_deck(&world, &opts);
        let out = JsonOutput {
            summary: sim.summary(),
            trajectories: sim.trajectories(),
        };
        match serde_json::to_string_pretty(&out) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!("=== ShipEvac Evacuation Harness ===\n");

    let mut results = Vec::new();

    // 1. Arrangement
    results.extend(validate_arrangement(&world, &report, opts.verbose));

    // 2. Open-deck evacuation
    results.extend(validate_open_deck(&world, &opts));

    // 3. Compartment evacuation through deck exits
    results.extend(validate_room_exits(&world, &opts));

    // 4. Reference obstacle scenario
    results.extend(validate_reference_scenario(opts.verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || opts.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn config_for(opts: &Options, mode: SpawnMode) -> SimulationConfig {
    SimulationConfig {
        seed: Some(opts.seed),
        spawn_mode: mode,
        ..SimulationConfig::default()
    }
}

fn path_length(sim: &Simulation, id: u32) -> f32 {
    sim.agent(id)
        .map(|a| {
            a.trajectory
                .windows(2)
                .map(|w| Point2::new(w[0].x, w[0].y).distance(&Point2::new(w[1].x, w[1].y)))
                .sum()
        })
        .unwrap_or(0.0)
}

// ── 1. Arrangement ──────────────────────────────────────────────────────

fn validate_arrangement(world: &World, report: &LoadReport, verbose: bool) -> Vec<TestResult> {
    println!("--- Arrangement ---");
    let mut results = Vec::new();

    results.push(TestResult {
        name: "arrangement_warnings".into(),
        passed: report.is_clean(),
        detail: format!("{} load warnings", report.warnings.len()),
    });
    if verbose {
        for w in &report.warnings {
            println!("  warning: {w}");
        }
    }

    results.push(TestResult {
        name: "arrangement_has_station".into(),
        passed: !world.stations.is_empty(),
        detail: format!("{} mustering stations", world.stations.len()),
    });

    let off_deck_stations = world
        .stations
        .iter()
        .filter(|s| !world.deck.contains(s.center))
        .map(|s| s.name.clone())
        .collect::<Vec<_>>();
    results.push(TestResult {
        name: "stations_on_deck".into(),
        passed: off_deck_stations.is_empty(),
        detail: if off_deck_stations.is_empty() {
            "every station center lies on the deck".into()
        } else {
            format!("off-deck: {}", off_deck_stations.join(", "))
        },
    });

    // Every deck exit should sit on its compartment's boundary
    let mut far_doors = Vec::new();
    for ci in world.exit_compartments() {
        if let Some(door) = world.deck_exit_for(ci) {
            let gap = world.compartments[ci].shape.boundary_distance(door.position);
            if gap > door.influence_radius() {
                far_doors.push(format!("{} ({gap:.2} m)", door.name));
            }
        }
    }
    results.push(TestResult {
        name: "deck_exits_on_walls".into(),
        passed: far_doors.is_empty(),
        detail: format!(
            "{} compartments with deck exits{}",
            world.exit_compartments().len(),
            if far_doors.is_empty() {
                String::new()
            } else {
                format!("; far from wall: {}", far_doors.join(", "))
            }
        ),
    });

    if verbose {
        for c in &world.compartments {
            let kind = match c.shape {
                Shape::Rectangle(_) => "rect",
                Shape::Polygon(_) => "polygon",
            };
            println!("  {:12} {:8} center {:?}", c.name, kind, c.shape.center());
        }
    }

    results
}

// ── 2. Open deck ────────────────────────────────────────────────────────

fn run_open_deck(world: &World, opts: &Options) -> (Simulation, RunOutcome) {
    let config = config_for(opts, SpawnMode::Open);
    let mut sim = Simulation::new(world.clone(), config);
    sim.reset(world.clone(), opts.agents);
    let outcome = sim.run_to_completion(opts.dt, opts.max_steps);
    (sim, outcome)
}

fn validate_open_deck(world: &World, opts: &Options) -> Vec<TestResult> {
    println!("--- Open-deck evacuation ---");
    let mut results = Vec::new();

    let config = config_for(opts, SpawnMode::Open);
    let errors = validate_config(&config);
    results.push(TestResult {
        name: "config_valid".into(),
        passed: errors.is_empty(),
        detail: format!("{errors:?}"),
    });

    // Spawn clearance is checked before any agent moves
    let mut fresh = Simulation::new(world.clone(), config.clone());
    fresh.reset(world.clone(), opts.agents);
    let unclear = fresh
        .agents()
        .iter()
        .filter(|a| !is_open_spot(world, a.position, config.spawn_margin))
        .count();
    results.push(TestResult {
        name: "spawn_clearance".into(),
        passed: unclear == fresh.spawn_warnings(),
        detail: format!(
            "{} agents, {} fallback spawns, {} unclear",
            opts.agents,
            fresh.spawn_warnings(),
            unclear
        ),
    });

    let misassigned = fresh
        .agents()
        .iter()
        .filter(|a| world.nearest_station(a.position) != Some(a.station))
        .count();
    results.push(TestResult {
        name: "nearest_station_assignment".into(),
        passed: misassigned == 0,
        detail: format!("{misassigned} agents not sent to their nearest station"),
    });

    let (sim, outcome) = run_open_deck(world, opts);
    let summary = sim.summary();
    results.push(TestResult {
        name: "open_deck_completion".into(),
        passed: outcome.is_completed(),
        detail: format!(
            "{}/{} arrived in {:.1}s, {} agents ever blocked",
            summary.arrived, summary.agents, summary.elapsed, summary.agents_blocked
        ),
    });

    let stuck = sim.stuck_agents(100);
    if !stuck.is_empty() {
        log::warn!("Agents blocked 100+ times: {stuck:?}");
    }

    let worst = sim
        .agents()
        .iter()
        .map(|a| (path_length(&sim, a.id) - a.distance).abs())
        .fold(0.0_f32, f32::max);
    results.push(TestResult {
        name: "distance_accounting".into(),
        passed: worst <= 1e-3 * summary.max_distance.max(1.0),
        detail: format!("largest path/distance mismatch {worst:.5} m"),
    });

    let off_deck = sim
        .agents()
        .iter()
        .flat_map(|a| a.trajectory.iter())
        .filter(|p| !world.deck.contains(Point2::new(p.x, p.y)))
        .count();
    results.push(TestResult {
        name: "agents_stay_on_deck".into(),
        passed: off_deck == 0,
        detail: format!("{off_deck} off-deck samples"),
    });

    results
}

// ── 3. Compartment exits ────────────────────────────────────────────────

fn validate_room_exits(world: &World, opts: &Options) -> Vec<TestResult> {
    println!("--- Compartment evacuation ---");
    let mut results = Vec::new();

    if world.exit_compartments().is_empty() {
        results.push(TestResult {
            name: "room_exits_skipped".into(),
            passed: true,
            detail: "arrangement has no deck exits".into(),
        });
        return results;
    }

    let config = config_for(opts, SpawnMode::InsideExitCompartment);
    let mut sim = Simulation::new(world.clone(), config);
    sim.reset(world.clone(), opts.agents);

    let mut exited = vec![false; sim.agents().len()];
    let mut bad_exits = 0;
    let mut steps = 0;
    while !sim.is_complete() && steps < opts.max_steps {
        let before: Vec<Point2> = sim.agents().iter().map(|a| a.position).collect();
        sim.step(opts.dt);
        steps += 1;
        for (i, a) in sim.agents().iter().enumerate() {
            if exited[i] || !a.has_exited_compartment() {
                continue;
            }
            exited[i] = true;
            let door = a
                .current_compartment
                .and_then(|ci| world.deck_exit_for(ci))
                .map(|d| d.position);
            if door.map_or(true, |d| before[i].distance(&d) >= 0.5) {
                bad_exits += 1;
            }
        }
    }

    let n_exited = exited.iter().filter(|e| **e).count();
    results.push(TestResult {
        name: "room_exit_through_door".into(),
        passed: bad_exits == 0,
        detail: format!("{n_exited} exits, {bad_exits} away from the door"),
    });
    results.push(TestResult {
        name: "rooms_emptied".into(),
        passed: n_exited == exited.len(),
        detail: format!("{}/{} agents left their compartment", n_exited, exited.len()),
    });

    let arrived = sim.agents().iter().filter(|a| a.is_arrived()).count();
    let stuck = sim.stuck_agents(100);
    results.push(TestResult {
        name: "room_agents_arrived".into(),
        passed: sim.is_complete(),
        detail: format!(
            "{}/{} arrived in {steps} steps, {} stuck at a wall",
            arrived,
            sim.agents().len(),
            stuck.len()
        ),
    });

    results
}

// ── 4. Reference scenario ───────────────────────────────────────────────

fn validate_reference_scenario(verbose: bool) -> Vec<TestResult> {
    println!("--- Reference scenario ---");
    let mut results = Vec::new();

    let world = World::new(
        Deck::rectangle(10.0, 10.0),
        vec![Compartment::new(
            "obstacle",
            Shape::rectangle(Point2::ORIGIN, 2.0, 2.0, 0.0),
        )],
        vec![],
        vec![MusteringStation::new("S", Point2::new(4.0, 4.0), 2.0, 2.0)],
    );
    let config = SimulationConfig {
        seed: Some(1),
        ..SimulationConfig::default()
    };
    let mut sim = Simulation::new(world.clone(), config);
    sim.reset(world, 0);
    let id = sim.spawn_agent_at(Point2::new(-4.0, -4.0), 2.0);
    let outcome = sim.run_to_completion(0.1, 199);

    let end = sim.agent(id).map(|a| a.position).unwrap_or(Point2::ORIGIN);
    let in_window = (3.0..=5.0).contains(&end.x) && (3.0..=5.0).contains(&end.y);
    results.push(TestResult {
        name: "reference_arrival".into(),
        passed: outcome.is_completed() && in_window,
        detail: format!("{outcome:?}, final ({:.2}, {:.2})", end.x, end.y),
    });

    if verbose {
        if let Some(a) = sim.agent(id) {
            println!(
                "  walked {:.2} m in {} steps, {} blocked",
                a.distance, a.steps, a.blocked_steps
            );
        }
    }

    results
}
