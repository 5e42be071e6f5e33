use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

/// Options for one [`RequestCache::cached`] call.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheOptions {
    /// How long a stored value stays live. `None` disables storing.
    pub ttl: Option<Duration>,
    /// Bypass a live entry and refetch (still joins an in-flight fetch).
    pub force: bool,
}

impl CacheOptions {
    pub fn ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            force: false,
        }
    }

    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    fetched_at: Instant,
}

/// Shared result slot for callers that joined an in-flight fetch.
struct Flight<V> {
    result: Mutex<Option<Result<V, String>>>,
    done: Condvar,
}

struct State<V> {
    values: HashMap<String, Entry<V>>,
    in_flight: HashMap<String, Arc<Flight<V>>>,
}

/// Single-flight + TTL request cache keyed by string.
///
/// Concurrent `cached` calls for the same key share one producer
/// invocation; a completed value is served until its TTL elapses or the
/// key is invalidated. Producer failures are never cached and clear the
/// in-flight registration so the next caller retries from scratch.
pub struct RequestCache<V> {
    state: Mutex<State<V>>,
}

impl<V: Clone> Default for RequestCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> RequestCache<V> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                values: HashMap::new(),
                in_flight: HashMap::new(),
            }),
        }
    }

    /// Return the cached value for `key`, or produce it.
    ///
    /// The live-entry check, the in-flight check and the flight
    /// registration happen under one lock, so exactly one caller runs the
    /// producer no matter how many race on the key.
    pub fn cached<F>(&self, key: &str, opts: CacheOptions, producer: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        let flight = {
            let mut state = self.state.lock().unwrap();

            if !opts.force {
                if let (Some(ttl), Some(entry)) = (opts.ttl, state.values.get(key)) {
                    if entry.fetched_at.elapsed() < ttl {
                        return Ok(entry.value.clone());
                    }
                }
            }

            if let Some(flight) = state.in_flight.get(key) {
                let flight = Arc::clone(flight);
                drop(state);
                return Self::join(&flight);
            }

            let flight = Arc::new(Flight {
                result: Mutex::new(None),
                done: Condvar::new(),
            });
            state.in_flight.insert(key.to_string(), Arc::clone(&flight));
            flight
        };

        let produced = producer();

        let mut state = self.state.lock().unwrap();
        if let Ok(value) = &produced {
            if opts.ttl.is_some() {
                state.values.insert(
                    key.to_string(),
                    Entry {
                        value: value.clone(),
                        fetched_at: Instant::now(),
                    },
                );
            }
        }
        // An invalidation may have dropped this flight and a new one may
        // already be registered; only deregister our own.
        if let Some(current) = state.in_flight.get(key) {
            if Arc::ptr_eq(current, &flight) {
                state.in_flight.remove(key);
            }
        }
        drop(state);

        let shared = match &produced {
            Ok(v) => Ok(v.clone()),
            Err(e) => Err(format!("{e:#}")),
        };
        *flight.result.lock().unwrap() = Some(shared);
        flight.done.notify_all();

        produced
    }

    fn join(flight: &Flight<V>) -> Result<V> {
        let mut slot = flight.result.lock().unwrap();
        while slot.is_none() {
            slot = flight.done.wait(slot).unwrap();
        }
        match slot.as_ref().unwrap() {
            Ok(v) => Ok(v.clone()),
            Err(msg) => Err(anyhow!("shared fetch failed: {msg}")),
        }
    }

    /// Drop the entry and any in-flight registration for an exact key.
    pub fn invalidate_key(&self, key: &str) {
        let mut state = self.state.lock().unwrap();
        state.values.remove(key);
        state.in_flight.remove(key);
    }

    /// Drop every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        let mut state = self.state.lock().unwrap();
        state.values.retain(|k, _| !k.starts_with(prefix));
        state.in_flight.retain(|k, _| !k.starts_with(prefix));
    }

    /// Drop everything.
    pub fn clear_all(&self) {
        let mut state = self.state.lock().unwrap();
        state.values.clear();
        state.in_flight.clear();
    }

    /// Number of completed entries currently stored.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
