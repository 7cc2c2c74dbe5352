//! Rejection sampling of agent start points.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::{Aabb, Point2};
use crate::world::World;

/// Where new agents may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpawnMode {
    /// Open deck, clear of every compartment and station.
    #[default]
    Open,
    /// Inside a compartment that has a deck exit. Agents start by leaving
    /// through its door.
    InsideExitCompartment,
}

/// Result of one sampling run. `clear` is false when attempts ran out and
/// `point` is just the last candidate tried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnOutcome {
    pub point: Point2,
    pub clear: bool,
}

/// Draw a start point for `mode`, trying at most `max_attempts` candidates
/// (zero counts as one).
pub fn sample<R: Rng + ?Sized>(
    world: &World,
    margin: f32,
    max_attempts: u32,
    mode: SpawnMode,
    rng: &mut R,
) -> SpawnOutcome {
    let attempts = max_attempts.max(1);
    match mode {
        SpawnMode::Open => sample_open(world, margin, attempts, rng),
        SpawnMode::InsideExitCompartment => {
            let exits = world.exit_compartments();
            if exits.is_empty() {
                log::warn!("No compartment has a deck exit; spawning on the open deck");
                return sample_open(world, margin, attempts, rng);
            }
            sample_in_exit_compartment(world, &exits, margin, attempts, rng)
        }
    }
}

fn sample_open<R: Rng + ?Sized>(
    world: &World,
    margin: f32,
    attempts: u32,
    rng: &mut R,
) -> SpawnOutcome {
    let mut point = world.deck.bounds.center();
    for _ in 0..attempts {
        point = uniform_in(&world.deck.bounds, rng);
        if is_open_spot(world, point, margin) {
            return SpawnOutcome { point, clear: true };
        }
    }
    SpawnOutcome {
        point,
        clear: false,
    }
}

fn sample_in_exit_compartment<R: Rng + ?Sized>(
    world: &World,
    exits: &[usize],
    margin: f32,
    attempts: u32,
    rng: &mut R,
) -> SpawnOutcome {
    let mut point = world.deck.bounds.center();
    for _ in 0..attempts {
        let ci = exits[rng.gen_range(0..exits.len())];
        let room = &world.compartments[ci].shape;
        point = uniform_in(&room.aabb(), rng);
        if room.contains_with_clearance(point, margin)
            && world.deck.contains_with_margin(point, margin)
            && world.compartment_index_at(point) == Some(ci)
        {
            return SpawnOutcome { point, clear: true };
        }
    }
    SpawnOutcome {
        point,
        clear: false,
    }
}

/// On the deck with `margin` clearance and outside every compartment and
/// station arrival zone grown by `margin`.
pub fn is_open_spot(world: &World, p: Point2, margin: f32) -> bool {
    world.deck.contains_with_margin(p, margin)
        && !world
            .compartments
            .iter()
            .any(|c| c.shape.expanded_by(margin).contains_point(p))
        && !world
            .stations
            .iter()
            .any(|s| s.inner.expanded_by(margin).contains_point(p))
}

fn uniform_in<R: Rng + ?Sized>(bounds: &Aabb, rng: &mut R) -> Point2 {
    Point2::new(
        bounds.min_x + rng.gen::<f32>() * bounds.width(),
        bounds.min_y + rng.gen::<f32>() * bounds.height(),
    )
}
