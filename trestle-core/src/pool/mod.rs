// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! The bounded blocking object pool.
//!
//! Connector instances are expensive to create and prone to failure, so
//! they are pooled. One mutex and one condition variable serialize all
//! borrow/return/evict transitions; the health check deliberately runs
//! outside the lock because it may be slow I/O and must not block
//! unrelated borrowers.

mod manager;

pub use manager::{ConnectorPoolKey, ConnectorPoolManager};

use std::collections::{HashMap, VecDeque};
use std::sync::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::Error;

/// The create/check/dispose triple the pool drives resources through.
pub trait ResourceHandler<T: ?Sized>: Send + Sync {
    /// Creates a new resource. A failure here fails the borrower.
    fn create(&self) -> Result<Arc<T>, Error>;

    /// Liveness probe run on every borrow, outside the pool lock.
    fn check(&self, resource: &T) -> Result<(), Error>;

    /// Releases a resource. Failures are logged by the pool, never thrown.
    fn dispose(&self, resource: &T) -> Result<(), Error>;
}

/// Sizing and timing policy of one pool. Immutable once validated.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PoolConfig {
    /// Hard cap on concurrently borrowed resources.
    pub max_objects: usize,
    /// Idle resources beyond this are disposed immediately.
    pub max_idle: usize,
    /// Idle resources at or below this are kept even when stale.
    pub min_idle: usize,
    /// How long a borrow may block before failing resource-exhausted.
    pub max_wait: Duration,
    /// Idle age beyond which a resource above `min_idle` is evictable.
    pub min_evictable_idle_time: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            max_objects: 10,
            max_idle: 10,
            min_idle: 1,
            max_wait: Duration::from_millis(150_000),
            min_evictable_idle_time: Duration::from_millis(120_000),
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_objects == 0 {
            return Err(Error::invalid_argument("max_objects must be at least 1"));
        }
        if self.min_idle > self.max_idle {
            return Err(Error::invalid_argument(
                "min_idle must not exceed max_idle",
            ));
        }
        Ok(())
    }
}

struct PooledObject<T: ?Sized> {
    resource: Arc<T>,
    /// Last state-change time; for idle objects, when they went idle.
    since: Instant,
    /// True until the object survives its first return to the pool. A
    /// fresh object failing its health check fails the borrower; a stale
    /// idle one is silently replaced.
    fresh: bool,
}

struct PoolState<T: ?Sized> {
    /// Borrowed resources keyed by pointer identity. Two instances that
    /// compare equal are still distinct entries.
    active: HashMap<usize, PooledObject<T>>,
    /// Idle resources, oldest-idle at the front.
    idle: VecDeque<PooledObject<T>>,
    shutdown: bool,
}

fn identity_key<T: ?Sized>(resource: &Arc<T>) -> usize {
    Arc::as_ptr(resource).cast::<u8>() as usize
}

/// A bounded, blocking pool of failure-prone resources.
///
/// Every resource is in exactly one of three states: active (borrowed),
/// idle, or disposed. `active ≤ max_objects` always holds when a creation
/// is attempted; the idle set is trimmed lazily whenever it changes.
pub struct ObjectPool<T: ?Sized + Send + Sync> {
    state: Mutex<PoolState<T>>,
    available: Condvar,
    handler: Box<dyn ResourceHandler<T>>,
    config: PoolConfig,
}

impl<T: ?Sized + Send + Sync> ObjectPool<T> {
    pub fn new(
        handler: Box<dyn ResourceHandler<T>>,
        config: PoolConfig,
    ) -> Result<ObjectPool<T>, Error> {
        config.validate()?;
        Ok(ObjectPool {
            state: Mutex::new(PoolState {
                active: HashMap::new(),
                idle: VecDeque::new(),
                shutdown: false,
            }),
            available: Condvar::new(),
            handler,
            config,
        })
    }

    /// Borrows a resource, blocking up to `max_wait` when the pool is at
    /// capacity with nothing idle.
    ///
    /// The health check runs after the pool lock is released. An idle
    /// object failing it is disposed and the borrow retried; a freshly
    /// created object failing it surfaces the failure immediately, since
    /// that means the configuration or target is broken.
    pub fn borrow(&self) -> Result<Arc<T>, Error> {
        let start = Instant::now();
        loop {
            let (resource, fresh) = {
                let mut state = self.state.lock().unwrap();
                self.evict_idle(&mut state);
                let entry = loop {
                    if state.shutdown {
                        return Err(Error::PoolShutdown);
                    }
                    if let Some(mut entry) = state.idle.pop_front() {
                        entry.since = Instant::now();
                        break entry;
                    }
                    if state.active.len() < self.config.max_objects {
                        let resource = self.handler.create()?;
                        break PooledObject {
                            resource,
                            since: Instant::now(),
                            fresh: true,
                        };
                    }
                    let elapsed = start.elapsed();
                    if elapsed >= self.config.max_wait {
                        return Err(Error::PoolExhausted {
                            waited_millis: elapsed.as_millis() as u64,
                        });
                    }
                    let remaining = self.config.max_wait - elapsed;
                    let (next, _timeout) = self.available.wait_timeout(state, remaining).unwrap();
                    state = next;
                };
                let resource = entry.resource.clone();
                let fresh = entry.fresh;
                state.active.insert(identity_key(&resource), entry);
                (resource, fresh)
            };

            match self.handler.check(&resource) {
                Ok(()) => return Ok(resource),
                Err(check_err) => {
                    {
                        let mut state = self.state.lock().unwrap();
                        state.active.remove(&identity_key(&resource));
                        self.available.notify_all();
                    }
                    if let Err(dispose_err) = self.handler.dispose(&resource) {
                        warn!("failed to dispose unhealthy pooled object: {dispose_err}");
                    }
                    if fresh {
                        return Err(check_err);
                    }
                    debug!("idle pooled object failed health check, retrying: {check_err}");
                }
            }
        }
    }

    /// Returns a borrowed resource to the pool.
    ///
    /// Returning an object this pool never lent out (or returning one
    /// twice) is a programming error and fails without touching the
    /// pool's accounting.
    pub fn return_object(&self, resource: &Arc<T>) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        let mut entry = state
            .active
            .remove(&identity_key(resource))
            .ok_or_else(|| {
                Error::invalid_state("returned object was not borrowed from this pool")
            })?;
        entry.fresh = false;
        entry.since = Instant::now();
        state.idle.push_back(entry);
        self.evict_idle(&mut state);
        self.available.notify_all();
        Ok(())
    }

    /// Marks the pool closed and evicts everything idle.
    ///
    /// Pending borrowers fail fast; resources currently borrowed stay
    /// untouched and are disposed when their eventual return finds the
    /// pool shut down.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().unwrap();
        state.shutdown = true;
        self.evict_idle(&mut state);
        self.available.notify_all();
    }

    /// Disposes idle objects front-to-back while any eviction rule holds:
    /// the pool is shut down, the idle count exceeds `max_idle`, or the
    /// count exceeds `min_idle` and the oldest idle object is stale.
    fn evict_idle(&self, state: &mut PoolState<T>) {
        while let Some(oldest) = state.idle.front() {
            let evict = state.shutdown
                || state.idle.len() > self.config.max_idle
                || (state.idle.len() > self.config.min_idle
                    && oldest.since.elapsed() >= self.config.min_evictable_idle_time);
            if !evict {
                break;
            }
            let entry = state.idle.pop_front().unwrap();
            if let Err(err) = self.handler.dispose(&entry.resource) {
                warn!("failed to dispose evicted pooled object: {err}");
            }
        }
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().unwrap().active.len()
    }

    pub fn idle_count(&self) -> usize {
        self.state.lock().unwrap().idle.len()
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().unwrap().shutdown
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}
