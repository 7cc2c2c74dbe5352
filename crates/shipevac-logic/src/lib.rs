//! Pure evacuation movement logic for ShipEvac.
//!
//! Agents spawn on a ship deck, leave their compartment through its deck
//! exit if they start inside one, and walk to the nearest mustering station
//! using straight-line steps with a perpendicular sidestep when blocked.
//! Nothing here renders, reads files or spawns threads; callers feed in an
//! arrangement document and a time step.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`agent`] | Evacuee state, movement phases, body and footprint boxes |
//! | [`arrangement`] | Arrangement JSON → `World`, with non-fatal load warnings |
//! | [`config`] | Run parameters (`SimulationConfig`) and validation |
//! | [`constants`] | Body sizes, door distances, arrangement defaults |
//! | [`geometry`] | Points, bounding boxes, segment and polygon predicates |
//! | [`movement`] | Per-agent step: door targeting, collision, sidestep avoidance |
//! | [`shape`] | Rotated rectangles and polygons behind one `Shape` enum |
//! | [`simulation`] | `Simulation` driver, capped runs, `FixedStepper` |
//! | [`spawn`] | Rejection sampling of clear start points |
//! | [`trajectory`] | Trajectory export records and run summary |
//! | [`world`] | Deck, compartments, doors, stations, deck-exit table |
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use shipevac_logic::arrangement::load_world;
//! use shipevac_logic::config::SimulationConfig;
//! use shipevac_logic::simulation::Simulation;
//!
//! let doc = json!({
//!     "arrangements": {
//!         "deck": { "attributes": { "length": 30.0, "width": 12.0 } },
//!         "musteringStations": {
//!             "MES-1": { "attributes": { "x": 10.0, "y": 0.0, "length": 4.0, "width": 6.0 } }
//!         }
//!     }
//! });
//! let (world, report) = load_world(&doc);
//! assert!(report.is_clean());
//!
//! let config = SimulationConfig { seed: Some(1), ..SimulationConfig::default() };
//! let mut sim = Simulation::new(world.clone(), config);
//! sim.reset(world, 4);
//! for _ in 0..1000 {
//!     if sim.is_complete() {
//!         break;
//!     }
//!     sim.step(0.1);
//! }
//! assert!(sim.is_complete());
//! assert!(sim.agents().iter().all(|a| a.distance > 0.0));
//! ```

pub mod agent;
pub mod arrangement;
pub mod config;
pub mod constants;
pub mod geometry;
pub mod movement;
pub mod shape;
pub mod simulation;
pub mod spawn;
pub mod trajectory;
pub mod world;
