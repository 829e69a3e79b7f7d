//! Bounded rental pool of analysis engine subprocesses.
//!
//! Instances are spawned once at construction, configured, and then
//! alternate between the idle queue and exactly one consumer. At any
//! instant idle + checked-out equals the construction size.

use std::collections::HashSet;
use std::collections::VecDeque;
use std::fmt;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::uci::{Engine, EngineError};

/// Transposition-table size handed to every instance, in megabytes.
const HASH_MB: u32 = 128;

/// Error type for pool construction and release failures.
#[derive(Debug)]
pub enum PoolError {
    /// The engine binary could not be spawned
    EnginePathNotFound { path: String },
    /// An instance failed to take its options during construction
    EngineSetup(EngineError),
    /// A released instance does not belong to this pool
    ForeignRelease { id: Uuid },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::EnginePathNotFound { path } => {
                write!(f, "engine path '{path}' not found")
            }
            PoolError::EngineSetup(e) => write!(f, "engine setup failed: {e}"),
            PoolError::ForeignRelease { id } => {
                write!(f, "instance {id} was not rented from this pool")
            }
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoolError::EngineSetup(e) => Some(e),
            _ => None,
        }
    }
}

/// A rented engine subprocess: a unique identity plus the live client.
pub struct EngineInstance {
    id: Uuid,
    pub engine: Engine,
}

impl EngineInstance {
    /// Identity used for release verification.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Fixed-size pool of engine instances.
pub struct EnginePool {
    ids: HashSet<Uuid>,
    idle: Mutex<VecDeque<EngineInstance>>,
    retry: Duration,
    size: usize,
}

impl EnginePool {
    /// Spawn `size` engines from `path`, configure their `Threads` and
    /// `Hash` options and queue them idle.
    ///
    /// Fails fatally when a subprocess cannot be spawned or refuses its
    /// options; a half-built pool tears its engines down on drop.
    pub fn new(
        path: &str,
        size: usize,
        threads: u32,
        retry: Duration,
    ) -> Result<EnginePool, PoolError> {
        let mut ids = HashSet::with_capacity(size);
        let mut idle = VecDeque::with_capacity(size);
        for n in 0..size {
            let mut engine = Engine::new(path).map_err(|e| {
                warn!("spawning engine {n} failed: {e}");
                PoolError::EnginePathNotFound {
                    path: path.to_string(),
                }
            })?;
            engine
                .set_option("Threads", &threads.to_string())
                .and_then(|()| engine.set_option("Hash", &HASH_MB.to_string()))
                .map_err(PoolError::EngineSetup)?;

            let id = Uuid::new_v4();
            ids.insert(id);
            idle.push_back(EngineInstance { id, engine });
        }
        info!("engine pool up: {size} instance(s) of '{path}'");
        Ok(EnginePool {
            ids,
            idle: Mutex::new(idle),
            retry,
            size,
        })
    }

    /// Rent an idle instance, blocking until one is available.
    ///
    /// Contention is handled by a bounded busy-wait: every failed
    /// attempt sleeps the construction-time retry interval before the
    /// next poll.
    #[must_use]
    pub fn acquire(&self) -> EngineInstance {
        loop {
            if let Some(instance) = self.idle.lock().pop_front() {
                debug!("acquired engine {}", instance.id);
                return instance;
            }
            thread::sleep(self.retry);
        }
    }

    /// Return a rented instance to the idle queue. Never blocks.
    ///
    /// An instance this pool did not create is refused with
    /// [`PoolError::ForeignRelease`] and dropped, which shuts its
    /// subprocess down.
    pub fn release(&self, instance: EngineInstance) -> Result<(), PoolError> {
        if !self.ids.contains(&instance.id) {
            return Err(PoolError::ForeignRelease { id: instance.id });
        }
        debug!("released engine {}", instance.id);
        self.idle.lock().push_back(instance);
        Ok(())
    }

    /// Shut down every idle instance and drain the queue.
    ///
    /// Checked-out instances finish their current command first; they
    /// die when their holder drops them.
    pub fn close(&self) {
        let mut idle = self.idle.lock();
        let drained = idle.len();
        idle.clear();
        info!("engine pool closed ({drained} idle instance(s) shut down)");
    }

    /// Construction-time pool size.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of instances currently idle.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }
}

impl Drop for EnginePool {
    fn drop(&mut self) {
        self.close();
    }
}
