//! Evacuee state: position, speed, accumulated distance, movement phase.

use serde::{Deserialize, Serialize};

use crate::constants::agent::{BODY_SIZE, FOOTPRINT_SIZE};
use crate::geometry::Point2;
use crate::shape::Shape;

/// Where an agent is in its evacuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementPhase {
    /// Created, not yet stepped.
    Spawned,
    /// Walking toward its room's deck exit or its station.
    EnRoute,
    /// Left its starting compartment through the deck-exit door.
    ExitedRoom,
    /// Inside its station's arrival zone. Terminal.
    Arrived,
}

/// One recorded trajectory sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub t: f32,
    pub x: f32,
    pub y: f32,
}

/// A single simulated evacuee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: u32,
    /// Walking speed in m/s, fixed at creation.
    pub speed: f32,
    pub position: Point2,
    /// Append-only; the spawn point is the first sample.
    pub trajectory: Vec<TrackPoint>,
    /// Sum of committed step lengths. Never decreases.
    pub distance: f32,
    /// Index into `World::stations`, fixed at spawn.
    pub station: usize,
    pub phase: MovementPhase,
    /// Compartment the agent started in, if it has a deck exit to leave by.
    pub current_compartment: Option<usize>,
    /// Point just outside the door to clear before heading for the station.
    pub waypoint: Option<Point2>,
    pub avoidance_up: bool,
    /// An avoidance episode is in progress (side already chosen).
    pub in_avoidance: bool,
    /// Consecutive failed sidesteps in the current avoidance episode.
    pub stuck_count: u32,
    /// Total steps where no move could be committed.
    pub blocked_steps: u64,
    /// Steps processed while not arrived.
    pub steps: u64,
}

impl Agent {
    pub fn new(id: u32, speed: f32, position: Point2, station: usize) -> Self {
        Self {
            id,
            speed,
            position,
            trajectory: vec![TrackPoint {
                t: 0.0,
                x: position.x,
                y: position.y,
            }],
            distance: 0.0,
            station,
            phase: MovementPhase::Spawned,
            current_compartment: None,
            waypoint: None,
            avoidance_up: true,
            in_avoidance: false,
            stuck_count: 0,
            blocked_steps: 0,
            steps: 0,
        }
    }

    /// Start inside `compartment` and leave through its deck exit first.
    pub fn in_compartment(mut self, compartment: usize) -> Self {
        self.current_compartment = Some(compartment);
        self
    }

    pub fn is_arrived(&self) -> bool {
        self.phase == MovementPhase::Arrived
    }

    pub fn has_exited_compartment(&self) -> bool {
        self.phase == MovementPhase::ExitedRoom
            || (self.phase == MovementPhase::Arrived && self.current_compartment.is_some())
    }

    /// Still has to reach its room's deck-exit door.
    pub fn must_exit_room(&self) -> bool {
        self.current_compartment.is_some()
            && matches!(self.phase, MovementPhase::Spawned | MovementPhase::EnRoute)
    }

    /// Body box used for arrival detection.
    pub fn body_at(&self, p: Point2) -> Shape {
        Shape::square(p, BODY_SIZE)
    }

    /// Wider footprint used for wall collision.
    pub fn footprint_at(&self, p: Point2) -> Shape {
        Shape::square(p, FOOTPRINT_SIZE)
    }

    pub(crate) fn record(&mut self, t: f32) {
        self.trajectory.push(TrackPoint {
            t,
            x: self.position.x,
            y: self.position.y,
        });
    }
}

/// True when every agent has reached its station (vacuously for none).
pub fn all_arrived(agents: &[Agent]) -> bool {
    agents.iter().all(Agent::is_arrived)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_agent_records_spawn_point() {
        let a = Agent::new(1001, 6.0, Point2::new(1.0, 2.0), 0);
        assert_eq!(a.trajectory.len(), 1);
        assert_eq!(a.trajectory[0], TrackPoint { t: 0.0, x: 1.0, y: 2.0 });
        assert_eq!(a.phase, MovementPhase::Spawned);
        assert!(!a.must_exit_room());
    }

    #[test]
    fn compartment_start_requires_exit() {
        let a = Agent::new(1001, 6.0, Point2::ORIGIN, 0).in_compartment(2);
        assert!(a.must_exit_room());
        assert!(!a.has_exited_compartment());
    }

    #[test]
    fn all_arrived_checks_every_agent() {
        let mut a = Agent::new(1, 5.0, Point2::ORIGIN, 0);
        let mut b = Agent::new(2, 5.0, Point2::ORIGIN, 0);
        assert!(all_arrived(&[]));
        assert!(!all_arrived(&[a.clone(), b.clone()]));
        a.phase = MovementPhase::Arrived;
        assert!(!all_arrived(&[a.clone(), b.clone()]));
        b.phase = MovementPhase::Arrived;
        assert!(all_arrived(&[a, b]));
    }

    #[test]
    fn footprint_is_wider_than_body() {
        let a = Agent::new(1, 5.0, Point2::ORIGIN, 0);
        let edge = Point2::new(0.25, 0.0);
        assert!(!a.body_at(Point2::ORIGIN).contains_point(edge));
        assert!(a.footprint_at(Point2::ORIGIN).contains_point(edge));
    }
}
