//! Reactive per-agent stepping: walk straight, sidestep when blocked.
//!
//! Algorithm per step:
//! 1. Pick a target: the deck-exit door while still inside the start room,
//!    otherwise the center of the assigned station's arrival zone
//! 2. Within `door::REACHED_DISTANCE` of the door → leave the room, no move.
//!    The next target is a point `door::EGRESS_DISTANCE` past the door so the
//!    footprint clears the doorway before turning for the station
//! 3. Propose a step of `speed * dt` straight at the target (never past it)
//! 4. Clear → commit. Blocked → sidestep perpendicular on the held side;
//!    repeated sidestep failures flip the side
//! 5. Body touching the station's arrival zone → arrived
//!
//! There is no global planning. An agent boxed in by obstacles keeps
//! probing forever; `Agent::blocked_steps` makes that visible to callers.

use std::f32::consts::FRAC_PI_2;

use rand::Rng;

use crate::agent::{Agent, MovementPhase};
use crate::constants::{agent::STUCK_FLIP_THRESHOLD, door};
use crate::geometry::Point2;
use crate::shape::Shape;
use crate::world::{Interface, World};

/// Closer than this (meters) to the egress waypoint counts as reached.
const WAYPOINT_REACHED: f32 = 1e-3;

/// What happened to an agent during one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// Already arrived; nothing done.
    Idle,
    /// Moved straight toward the target.
    Moved { distance: f32 },
    /// Straight move blocked; moved sideways instead.
    Sidestepped { distance: f32 },
    /// Neither move was possible. `flipped` when the avoidance side changed.
    Blocked { flipped: bool },
    /// Reached the deck-exit door and left the room.
    ExitedRoom,
    /// Entered the station's arrival zone.
    Arrived,
}

impl StepOutcome {
    /// Length of the committed move, zero when the agent stayed put.
    pub fn distance(&self) -> f32 {
        match self {
            StepOutcome::Moved { distance } | StepOutcome::Sidestepped { distance } => *distance,
            _ => 0.0,
        }
    }
}

/// Advance one agent by `dt` seconds; `t` is the simulation time stamped on
/// the recorded trajectory sample.
pub fn step_agent<R: Rng + ?Sized>(
    agent: &mut Agent,
    world: &World,
    dt: f32,
    t: f32,
    rng: &mut R,
) -> StepOutcome {
    if agent.is_arrived() {
        return StepOutcome::Idle;
    }
    if agent.phase == MovementPhase::Spawned {
        agent.phase = MovementPhase::EnRoute;
    }
    agent.steps += 1;

    let Some(station) = world.station(agent.station) else {
        log::debug!("Agent {} has no station #{}", agent.id, agent.station);
        agent.blocked_steps += 1;
        agent.record(t);
        return StepOutcome::Blocked { flipped: false };
    };

    let exit_door = agent
        .current_compartment
        .and_then(|c| world.deck_exit_for(c))
        .filter(|_| agent.must_exit_room());

    let mut outcome = match exit_door {
        Some(d) if agent.position.distance(&d.position) < door::REACHED_DISTANCE => {
            agent.phase = MovementPhase::ExitedRoom;
            agent.waypoint = egress_point(agent, world, d);
            log::debug!(
                "Agent {} left compartment #{:?} through `{}`",
                agent.id,
                agent.current_compartment,
                d.name
            );
            StepOutcome::ExitedRoom
        }
        Some(d) => advance(agent, world, d.position, dt, rng),
        None => {
            let target = agent.waypoint.unwrap_or_else(|| station.inner.center());
            let moved = advance(agent, world, target, dt, rng);
            if agent.waypoint.is_some()
                && (agent.position.distance(&target) < WAYPOINT_REACHED
                    || matches!(moved, StepOutcome::Blocked { .. }))
            {
                agent.waypoint = None;
            }
            moved
        }
    };

    if agent.body_at(agent.position).intersects(&station.inner) {
        agent.phase = MovementPhase::Arrived;
        log::debug!(
            "Agent {} arrived at `{}` after {:.2} m",
            agent.id,
            station.name,
            agent.distance
        );
        outcome = StepOutcome::Arrived;
    }

    agent.record(t);
    outcome
}

fn advance<R: Rng + ?Sized>(
    agent: &mut Agent,
    world: &World,
    target: Point2,
    dt: f32,
    rng: &mut R,
) -> StepOutcome {
    let offset = target - agent.position;
    let remaining = offset.length();
    let magnitude = (agent.speed * dt).min(remaining).max(0.0);
    if magnitude <= f32::EPSILON {
        return StepOutcome::Moved { distance: 0.0 };
    }
    let heading = offset.y.atan2(offset.x);

    let proposed = agent.position + Point2::from_angle(heading) * magnitude;
    if is_clear(agent, world, proposed) {
        commit(agent, proposed, magnitude);
        agent.in_avoidance = false;
        agent.stuck_count = 0;
        return StepOutcome::Moved {
            distance: magnitude,
        };
    }

    if !agent.in_avoidance {
        agent.in_avoidance = true;
        agent.avoidance_up = rng.gen_bool(0.5);
        agent.stuck_count = 0;
    }

    let side = if agent.avoidance_up {
        FRAC_PI_2
    } else {
        -FRAC_PI_2
    };
    let sidestep = agent.position + Point2::from_angle(heading + side) * magnitude;
    if is_clear(agent, world, sidestep) {
        commit(agent, sidestep, magnitude);
        return StepOutcome::Sidestepped {
            distance: magnitude,
        };
    }

    agent.blocked_steps += 1;
    agent.stuck_count += 1;
    if agent.stuck_count > STUCK_FLIP_THRESHOLD {
        agent.avoidance_up = !agent.avoidance_up;
        agent.stuck_count = 0;
        log::debug!(
            "Agent {} stuck at ({:.2}, {:.2}); avoiding {}",
            agent.id,
            agent.position.x,
            agent.position.y,
            if agent.avoidance_up { "left" } else { "right" }
        );
        return StepOutcome::Blocked { flipped: true };
    }
    StepOutcome::Blocked { flipped: false }
}

fn commit(agent: &mut Agent, to: Point2, magnitude: f32) {
    agent.position = to;
    agent.distance += magnitude;
}

/// Point `door::EGRESS_DISTANCE` past the door, away from the room's center.
/// `None` when that point is off the deck or inside a compartment.
fn egress_point(agent: &Agent, world: &World, door: &Interface) -> Option<Point2> {
    let room = world.compartments.get(agent.current_compartment?)?;
    let outward = door.position - room.shape.center();
    let len = outward.length();
    if len <= f32::EPSILON {
        return None;
    }
    let point = door.position + outward * (door::EGRESS_DISTANCE / len);
    let open = world.deck.contains(point)
        && !world
            .compartments
            .iter()
            .any(|c| c.shape.contains_point(point));
    open.then_some(point)
}

/// How far `p` sits inside `shape`; zero outside.
fn depth_inside(shape: &Shape, p: Point2) -> f32 {
    if shape.contains_point(p) {
        shape.boundary_distance(p)
    } else {
        0.0
    }
}

/// Near the door, from either end of the proposed move.
fn near_door(door: &Interface, from: Point2, to: Point2) -> bool {
    let radius = door.influence_radius();
    from.distance(&door.position) < radius || to.distance(&door.position) < radius
}

/// The agent could stand at `proposed` without walking through a wall.
pub fn is_clear(agent: &Agent, world: &World, proposed: Point2) -> bool {
    if !world.deck.contains(proposed) {
        return false;
    }
    let footprint = agent.footprint_at(proposed);

    for (i, compartment) in world.compartments.iter().enumerate() {
        if Some(i) != agent.current_compartment {
            if compartment.shape.intersects(&footprint) {
                return false;
            }
            continue;
        }

        let at_door = world
            .deck_exit_for(i)
            .is_some_and(|d| near_door(d, agent.position, proposed));

        if agent.must_exit_room() {
            // Inside its room: walls hold unless passing the door
            if !at_door && !compartment.shape.contains_shape(&footprint) {
                return false;
            }
        } else {
            // Left the room: only the doorway may be brushed, and never
            // deeper than the agent already stands
            if depth_inside(&compartment.shape, proposed)
                > depth_inside(&compartment.shape, agent.position)
            {
                return false;
            }
            if !at_door && compartment.shape.intersects(&footprint) {
                return false;
            }
        }
    }
    true
}
