//! Run parameters for a simulation and their validation.
//!
//! ```
//! use shipevac_logic::config::{validate_config, SimulationConfig};
//!
//! let config = SimulationConfig {
//!     seed: Some(7),
//!     ..SimulationConfig::default()
//! };
//! assert!(validate_config(&config).is_empty());
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::defaults;
use crate::spawn::SpawnMode;

/// Knobs that are not part of the deck arrangement itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Required clearance (m) between a spawn point and deck edges,
    /// compartments and station arrival zones.
    pub spawn_margin: f32,
    pub max_spawn_attempts: u32,
    /// Walking speed range in m/s; each agent draws once.
    pub speed_min: f32,
    pub speed_max: f32,
    pub spawn_mode: SpawnMode,
    /// Fixed seed for reproducible runs. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            spawn_margin: defaults::SPAWN_MARGIN,
            max_spawn_attempts: defaults::MAX_SPAWN_ATTEMPTS,
            speed_min: defaults::SPEED_MIN,
            speed_max: defaults::SPEED_MAX,
            spawn_mode: SpawnMode::Open,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Draw one walking speed. A reversed range is read low-to-high.
    pub fn sample_speed<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let lo = self.speed_min.min(self.speed_max);
        let hi = self.speed_min.max(self.speed_max);
        if hi - lo <= f32::EPSILON {
            return lo;
        }
        rng.gen_range(lo..=hi)
    }
}

/// Run parameter validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("spawn margin must be finite and non-negative, got {0}")]
    InvalidSpawnMargin(f32),
    #[error("walking speeds must be positive, got {0}")]
    NonPositiveSpeed(f32),
    #[error("speed range is reversed: {min} > {max}")]
    SpeedRangeReversed { min: f32, max: f32 },
    #[error("max_spawn_attempts is 0; one attempt will be made")]
    ZeroSpawnAttempts,
    #[error("time step must be finite and positive, got {0}")]
    InvalidTimeStep(f32),
}

/// Validate run parameters, returning all errors found.
pub fn validate_config(config: &SimulationConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if !config.spawn_margin.is_finite() || config.spawn_margin < 0.0 {
        errors.push(ConfigError::InvalidSpawnMargin(config.spawn_margin));
    }
    for speed in [config.speed_min, config.speed_max] {
        if !speed.is_finite() || speed <= 0.0 {
            errors.push(ConfigError::NonPositiveSpeed(speed));
        }
    }
    if config.speed_min > config.speed_max {
        errors.push(ConfigError::SpeedRangeReversed {
            min: config.speed_min,
            max: config.speed_max,
        });
    }
    if config.max_spawn_attempts == 0 {
        errors.push(ConfigError::ZeroSpawnAttempts);
    }

    errors
}

/// Check a caller-supplied step length.
pub fn validate_dt(dt: f32) -> Result<f32, ConfigError> {
    if dt.is_finite() && dt > 0.0 {
        Ok(dt)
    } else {
        Err(ConfigError::InvalidTimeStep(dt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn defaults_are_valid() {
        let config = SimulationConfig::default();
        assert!(validate_config(&config).is_empty());
        assert_eq!(config.spawn_margin, 0.5);
        assert_eq!(config.max_spawn_attempts, 1000);
        assert_eq!(config.spawn_mode, SpawnMode::Open);
    }

    #[test]
    fn reports_every_problem() {
        let config = SimulationConfig {
            spawn_margin: -1.0,
            speed_min: 9.0,
            speed_max: 0.0,
            max_spawn_attempts: 0,
            ..SimulationConfig::default()
        };
        let errors = validate_config(&config);
        assert!(errors.contains(&ConfigError::InvalidSpawnMargin(-1.0)));
        assert!(errors.contains(&ConfigError::NonPositiveSpeed(0.0)));
        assert!(errors.contains(&ConfigError::SpeedRangeReversed { min: 9.0, max: 0.0 }));
        assert!(errors.contains(&ConfigError::ZeroSpawnAttempts));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn speeds_stay_in_range() {
        let config = SimulationConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let s = config.sample_speed(&mut rng);
            assert!((5.0..=8.0).contains(&s));
        }
    }

    #[test]
    fn fixed_speed_range() {
        let config = SimulationConfig {
            speed_min: 2.0,
            speed_max: 2.0,
            ..SimulationConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(config.sample_speed(&mut rng), 2.0);
    }

    #[test]
    fn dt_must_be_positive() {
        assert_eq!(validate_dt(0.1), Ok(0.1));
        assert!(validate_dt(0.0).is_err());
        assert!(validate_dt(f32::NAN).is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"seed": 3, "spawn_mode": "InsideExitCompartment"}"#)
                .unwrap();
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.spawn_mode, SpawnMode::InsideExitCompartment);
        assert_eq!(config.speed_max, 8.0);
    }
}
