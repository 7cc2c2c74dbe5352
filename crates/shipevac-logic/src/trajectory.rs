//! Export records: per-agent trajectories and a whole-run summary.

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, TrackPoint};

/// One exported sample with the instantaneous speed leading into it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub t: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Distance from the previous sample divided by the time between them.
    pub v: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTrajectory {
    pub id: u32,
    pub speed: f32,
    /// Index into `World::stations`.
    pub assigned_station_index: usize,
    /// Station name, or empty if the index no longer resolves.
    pub assigned_station: String,
    pub path: Vec<TrajectoryPoint>,
    pub total_distance: f32,
}

impl AgentTrajectory {
    pub fn from_agent(agent: &Agent, station_name: &str, z: f32) -> Self {
        Self {
            id: agent.id,
            speed: agent.speed,
            assigned_station_index: agent.station,
            assigned_station: station_name.to_string(),
            path: with_velocity(&agent.trajectory, z),
            total_distance: agent.distance,
        }
    }
}

/// Attach `z` and per-sample speed. The first sample, and any sample with
/// no elapsed time, gets `v = 0`.
pub fn with_velocity(track: &[TrackPoint], z: f32) -> Vec<TrajectoryPoint> {
    let mut out = Vec::with_capacity(track.len());
    let mut prev: Option<&TrackPoint> = None;
    for p in track {
        let v = match prev {
            Some(q) if p.t - q.t > 0.0 => {
                let dx = p.x - q.x;
                let dy = p.y - q.y;
                (dx * dx + dy * dy).sqrt() / (p.t - q.t)
            }
            _ => 0.0,
        };
        out.push(TrajectoryPoint {
            t: p.t,
            x: p.x,
            y: p.y,
            z,
            v,
        });
        prev = Some(p);
    }
    out
}

/// Aggregate numbers for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub agents: usize,
    pub arrived: usize,
    pub elapsed: f32,
    pub steps: u64,
    /// Agents whose spawn point failed the clearance check.
    pub spawn_warnings: usize,
    /// Agents with at least one step where no move was possible.
    pub agents_blocked: usize,
    pub mean_distance: f32,
    pub max_distance: f32,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.arrived == self.agents
    }
}
