//! Environment file watcher
//!
//! Polls the environment parameter file and posts an [`Event::EnvironmentChanged`] into the event
//! queue whenever it is modified.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
        Arc,
    },
    thread::{self, JoinHandle},
    time::SystemTime,
};

use log::{debug, warn};
use util::time::seconds_to_std_duration;

use super::{EnvError, EnvParams, Obstacle};
use crate::sched::Event;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Tracks the modification time of the environment file.
#[derive(Debug)]
pub struct EnvWatch {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl EnvWatch {
    /// Start watching the file at `path`. The file's current contents are treated as already
    /// seen.
    pub fn new(path: PathBuf) -> Self {
        let last_modified = modified(&path).ok();
        Self {
            path,
            last_modified,
        }
    }

    /// Check the file, returning the new obstacles if it has changed since the last poll.
    pub fn poll(&mut self) -> Result<Option<Vec<Obstacle>>, EnvError> {
        let m = modified(&self.path)?;

        if self.last_modified == Some(m) {
            return Ok(None);
        }

        // Record the time before parsing so a bad file is only reported once
        self.last_modified = Some(m);

        debug!("Environment file {:?} modified, reloading", self.path);

        Ok(Some(EnvParams::load_path(&self.path)?.obstacles()))
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Spawn the watcher thread.
///
/// The thread exits when `stop` is set or when the event queue is closed.
pub fn spawn(
    path: PathBuf,
    period_s: f64,
    event_sender: Sender<Event>,
    stop: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    let period = seconds_to_std_duration(period_s);
    let mut watch = EnvWatch::new(path);

    thread::Builder::new()
        .name("env::watch".into())
        .spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                thread::sleep(period);

                match watch.poll() {
                    Ok(Some(obstacles)) => {
                        if event_sender
                            .send(Event::EnvironmentChanged(obstacles))
                            .is_err()
                        {
                            break;
                        }
                    }
                    Ok(None) => (),
                    Err(e) => warn!("Could not reload the environment: {}", e),
                }
            }
        })
}

fn modified(path: &Path) -> Result<SystemTime, EnvError> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| EnvError::FileError(path.to_path_buf(), e))
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    fn write_env(path: &PathBuf, num_obstacles: usize) {
        let mut s = String::from(
            "bounds_min_m = [0.0, 0.0, 0.0]\nbounds_max_m = [10.0, 10.0, 10.0]\nwatch_period_s = 0.1\n",
        );
        for i in 0..num_obstacles {
            s.push_str(&format!(
                "[[obstacles]]\ncentre_m = [{}.0, 1.0, 1.0]\nradius_m = 0.5\n",
                i
            ));
        }
        fs::write(path, s).unwrap();
    }

    #[test]
    fn test_poll_detects_change() {
        let path = std::env::temp_dir().join(format!("env_watch_{}.toml", std::process::id()));
        write_env(&path, 1);

        let mut watch = EnvWatch::new(path.clone());
        assert!(watch.poll().unwrap().is_none());

        // Make sure the modification time moves on even on coarse filesystems
        thread::sleep(Duration::from_millis(1100));
        write_env(&path, 2);

        let obstacles = watch.poll().unwrap().unwrap();
        assert_eq!(obstacles.len(), 2);
        assert!(watch.poll().unwrap().is_none());

        fs::remove_file(&path).unwrap();
        assert!(matches!(watch.poll(), Err(EnvError::FileError(..))));
    }
}
