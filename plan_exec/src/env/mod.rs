//! # Environment
//!
//! The environment is the planner's model of the world: a bounded workspace containing spherical
//! obstacles. The problem formulator turns each obstacle into a cost term, and the solver worker
//! checks the trajectories it produces against it.
//!
//! The environment is shared between the event loop, which replaces the obstacles when the
//! environment changes, and the solver worker, which reads them when formulating a problem.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod watch;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{Arc, RwLock};

use log::info;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use util::params::{self, LoadError};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// An environment shared between threads.
pub type SharedEnv = Arc<RwLock<dyn Environment>>;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait Environment: Send + Sync {
    /// The current set of obstacles.
    fn obstacles(&self) -> &[Obstacle];

    /// Replace all obstacles.
    fn set_obstacles(&mut self, obstacles: Vec<Obstacle>);

    /// Returns true if a robot at `position` is inside the workspace and clear of every obstacle,
    /// where both are shrunk/grown by `margin_m`.
    fn is_valid(&self, position: &Vector3<f64>, margin_m: f64) -> bool;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A spherical obstacle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Obstacle {
    pub centre_m: Vector3<f64>,
    pub radius_m: f64,
}

/// Spherical obstacles inside an axis-aligned box.
#[derive(Debug, Clone)]
pub struct BallsInBox {
    min_m: Vector3<f64>,
    max_m: Vector3<f64>,
    obstacles: Vec<Obstacle>,
}

/// Parameters for the environment, loaded from `env.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvParams {
    /// Lower corner of the workspace
    pub bounds_min_m: [f64; 3],

    /// Upper corner of the workspace
    pub bounds_max_m: [f64; 3],

    /// How often the environment file is checked for changes
    pub watch_period_s: f64,

    #[serde(default)]
    pub obstacles: Vec<ObstacleParams>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObstacleParams {
    pub centre_m: [f64; 3],
    pub radius_m: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("Could not load the environment: {0}")]
    LoadError(#[from] LoadError),

    #[error("Could not read the environment file {0:?}: {1}")]
    FileError(std::path::PathBuf, std::io::Error),

    #[error("Workspace bounds are empty along axis {0}")]
    InvalidBounds(usize),

    #[error("Obstacle {index} has an invalid radius ({radius_m} m)")]
    InvalidRadius { index: usize, radius_m: f64 },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Obstacle {
    pub fn new(centre_m: Vector3<f64>, radius_m: f64) -> Self {
        Self { centre_m, radius_m }
    }
}

impl EnvParams {
    /// Load the environment parameters from the given parameter file.
    pub fn load(file: &str) -> Result<Self, EnvError> {
        let p: Self = params::load(file)?;
        p.validate()?;
        Ok(p)
    }

    /// Load the environment parameters from a file at an arbitrary path.
    pub fn load_path(path: &std::path::Path) -> Result<Self, EnvError> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| EnvError::FileError(path.to_path_buf(), e))?;
        let p: Self = params::from_str(&s)?;
        p.validate()?;
        Ok(p)
    }

    /// Build the obstacle list.
    pub fn obstacles(&self) -> Vec<Obstacle> {
        self.obstacles
            .iter()
            .map(|o| Obstacle::new(Vector3::from(o.centre_m), o.radius_m))
            .collect()
    }

    fn validate(&self) -> Result<(), EnvError> {
        for axis in 0..3 {
            if self.bounds_max_m[axis] <= self.bounds_min_m[axis] {
                return Err(EnvError::InvalidBounds(axis));
            }
        }

        for (index, o) in self.obstacles.iter().enumerate() {
            if !(o.radius_m >= 0.0) {
                return Err(EnvError::InvalidRadius {
                    index,
                    radius_m: o.radius_m,
                });
            }
        }

        Ok(())
    }
}

impl BallsInBox {
    pub fn new(params: &EnvParams) -> Result<Self, EnvError> {
        params.validate()?;

        info!(
            "Environment: {} obstacle(s) in [{:?}, {:?}]",
            params.obstacles.len(),
            params.bounds_min_m,
            params.bounds_max_m
        );

        Ok(Self {
            min_m: Vector3::from(params.bounds_min_m),
            max_m: Vector3::from(params.bounds_max_m),
            obstacles: params.obstacles(),
        })
    }

    /// Wrap the environment so it can be shared between threads.
    pub fn into_shared(self) -> SharedEnv {
        Arc::new(RwLock::new(self))
    }
}

impl Environment for BallsInBox {
    fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    fn set_obstacles(&mut self, obstacles: Vec<Obstacle>) {
        info!("Environment: now {} obstacle(s)", obstacles.len());
        self.obstacles = obstacles;
    }

    fn is_valid(&self, position: &Vector3<f64>, margin_m: f64) -> bool {
        for axis in 0..3 {
            if position[axis] < self.min_m[axis] + margin_m
                || position[axis] > self.max_m[axis] - margin_m
            {
                return false;
            }
        }

        self.obstacles
            .iter()
            .all(|o| (position - o.centre_m).norm() > o.radius_m + margin_m)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const ENV_TOML: &str = r#"
bounds_min_m = [-1.0, -5.0, 0.0]
bounds_max_m = [11.0, 5.0, 5.0]
watch_period_s = 1.0

[[obstacles]]
centre_m = [5.0, 0.0, 1.0]
radius_m = 0.5
"#;

    #[test]
    fn test_load_and_validity() {
        let p: EnvParams = params::from_str(ENV_TOML).unwrap();
        let env = BallsInBox::new(&p).unwrap();

        assert_eq!(env.obstacles().len(), 1);
        assert_eq!(env.obstacles()[0].centre_m, Vector3::new(5.0, 0.0, 1.0));

        // Clear of the obstacle and inside the box
        assert!(env.is_valid(&Vector3::new(0.0, 0.0, 1.0), 0.1));

        // Inside the obstacle, then only inside once the margin is added
        assert!(!env.is_valid(&Vector3::new(5.0, 0.0, 1.2), 0.0));
        assert!(env.is_valid(&Vector3::new(5.0, 0.0, 1.7), 0.1));
        assert!(!env.is_valid(&Vector3::new(5.0, 0.0, 1.7), 0.3));

        // Outside the box, and too near its edge for the margin
        assert!(!env.is_valid(&Vector3::new(12.0, 0.0, 1.0), 0.0));
        assert!(!env.is_valid(&Vector3::new(0.0, 4.9, 1.0), 0.2));
    }

    #[test]
    fn test_invalid_params() {
        let mut p: EnvParams = params::from_str(ENV_TOML).unwrap();
        p.bounds_max_m[1] = -5.0;
        assert!(matches!(BallsInBox::new(&p), Err(EnvError::InvalidBounds(1))));

        let mut p: EnvParams = params::from_str(ENV_TOML).unwrap();
        p.obstacles[0].radius_m = -1.0;
        assert!(matches!(
            BallsInBox::new(&p),
            Err(EnvError::InvalidRadius { index: 0, .. })
        ));
    }

    #[test]
    fn test_shared_update() {
        let p: EnvParams = params::from_str(ENV_TOML).unwrap();
        let env = BallsInBox::new(&p).unwrap().into_shared();

        env.write()
            .unwrap()
            .set_obstacles(vec![Obstacle::new(Vector3::new(1.0, 1.0, 1.0), 0.2); 3]);

        assert_eq!(env.read().unwrap().obstacles().len(), 3);
    }
}
