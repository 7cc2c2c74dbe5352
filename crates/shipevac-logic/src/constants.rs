//! Evacuation constants: agent footprint, door thresholds, load defaults.
//!
//! Plain `f32`/`u32` constants with no runtime dependency. Both the logic
//! crate and the headless simtest read these.

pub mod agent {
    /// Side of the square body used for arrival detection (meters).
    pub const BODY_SIZE: f32 = 0.4;
    /// Side of the square footprint used for wall collision (meters).
    pub const FOOTPRINT_SIZE: f32 = 1.5 * BODY_SIZE;
    /// First agent id; agents are numbered upward from here.
    pub const FIRST_ID: u32 = 1001;
    /// Consecutive failed sidesteps before the avoidance side flips.
    pub const STUCK_FLIP_THRESHOLD: u32 = 3;
}

pub mod door {
    /// An agent closer than this to its deck-exit door has left the room.
    pub const REACHED_DISTANCE: f32 = 0.5;
    /// Lower bound of the door-influence radius.
    pub const MIN_INFLUENCE_RADIUS: f32 = 0.75;
    /// Influence radius as a fraction of the larger door extent.
    pub const INFLUENCE_FACTOR: f32 = 0.75;
    /// How far past the door an exited agent walks before turning for its
    /// station. One footprint clears the wall on any approach angle.
    pub const EGRESS_DISTANCE: f32 = super::agent::FOOTPRINT_SIZE;
    /// Endpoint name that marks an interface as a deck exit.
    pub const DECK_ENDPOINT: &str = "deck";
}

pub mod station {
    /// Total shrink applied to each station extent for the arrival zone.
    pub const INNER_SHRINK: f32 = 1.0;
    /// Legacy compartment entry read as the single station.
    pub const LEGACY_COMPARTMENT_NAME: &str = "MusteringStation";
}

pub mod defaults {
    pub const DECK_LENGTH: f32 = 105.2;
    pub const DECK_WIDTH: f32 = 34.0;

    pub const STATION_X: f32 = 52.4;
    pub const STATION_Y: f32 = 0.0;
    pub const STATION_LENGTH: f32 = 5.0;
    pub const STATION_WIDTH: f32 = 10.0;
    pub const STATION_NAME: &str = "MES-default";

    pub const SPAWN_MARGIN: f32 = 0.5;
    pub const MAX_SPAWN_ATTEMPTS: u32 = 1000;
    pub const SPEED_MIN: f32 = 5.0;
    pub const SPEED_MAX: f32 = 8.0;
}

pub mod geometry {
    /// Tolerance for orientation tests in segment intersection.
    pub const EPSILON: f32 = 1e-6;
}
