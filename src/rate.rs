// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The last observation of a single counter
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateState {
    pub timestamp: i64,
    pub value: f64,
    pub rate: f64,
}

/// How the engine turns a timestamp delta into the rate denominator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateUnit {
    /// Rate per unit of whatever timestamp the caller supplies, no conversion.
    PerTick,
    /// Timestamps are milliseconds, rate is per second.
    PerSecond,
}

impl Default for RateUnit {
    fn default() -> Self {
        RateUnit::PerTick
    }
}

impl RateUnit {
    // in f64, the i64 difference of two far apart timestamps overflows
    fn elapsed(&self, from: i64, to: i64) -> f64 {
        let delta = (to as f64) - (from as f64);
        match self {
            RateUnit::PerTick => delta,
            RateUnit::PerSecond => delta / 1000.0,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RateError {
    #[error("timestamp {timestamp} of `{key}` does not advance past {last}")]
    NonIncreasingTimestamp {
        key: String,
        last: i64,
        timestamp: i64,
    },
}

/// Keyed differencer of cumulative counters.
///
/// Holds only the most recent observation per key. The whole store sits
/// behind one lock, so a single instance may be shared between threads
/// polling different entities.
#[derive(Debug, Default)]
pub struct RateEngine {
    unit: RateUnit,
    store: Mutex<HashMap<String, RateState>>,
}

impl RateEngine {
    pub fn new(unit: RateUnit) -> Self {
        RateEngine {
            unit,
            store: Mutex::new(HashMap::new()),
        }
    }

    pub fn unit(&self) -> RateUnit {
        self.unit
    }

    // every critical section leaves the map consistent, a poisoned lock is safe to reuse
    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateState>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `value` at `timestamp` under `key`, return the rate since the
    /// previous observation of the key, `0.0` for the first one.
    pub fn observe(&self, key: &str, timestamp: i64, value: f64) -> Result<f64, RateError> {
        let mut store = self.lock();
        let state = self.next_state(&store, key, timestamp, value)?;
        Self::commit(&mut store, key, state);
        Ok(state.rate)
    }

    /// Observe several keys at one `timestamp`, all or nothing.
    ///
    /// Every key is checked under the same lock before any is written, so a
    /// rejected key leaves the whole batch unrecorded. Rates come back in the
    /// order of `observations`; a key repeated in the batch is differenced
    /// against the stored state and the last occurrence is kept.
    pub fn observe_all<K>(&self, timestamp: i64, observations: &[(K, f64)]) -> Result<Vec<f64>, RateError>
    where
        K: AsRef<str>,
    {
        let mut store = self.lock();
        let states = observations
            .iter()
            .map(|(key, value)| self.next_state(&store, key.as_ref(), timestamp, *value))
            .collect::<Result<Vec<_>, _>>()?;
        for ((key, _), state) in observations.iter().zip(&states) {
            Self::commit(&mut store, key.as_ref(), *state);
        }
        Ok(states.into_iter().map(|state| state.rate).collect())
    }

    fn next_state(
        &self,
        store: &HashMap<String, RateState>,
        key: &str,
        timestamp: i64,
        value: f64,
    ) -> Result<RateState, RateError> {
        let rate = match store.get(key) {
            None => 0.0,
            Some(last) if timestamp <= last.timestamp => {
                return Err(RateError::NonIncreasingTimestamp {
                    key: key.to_owned(),
                    last: last.timestamp,
                    timestamp,
                });
            },
            Some(last) => (value - last.value) / self.unit.elapsed(last.timestamp, timestamp),
        };
        Ok(RateState {
            timestamp,
            value,
            rate,
        })
    }

    fn commit(store: &mut HashMap<String, RateState>, key: &str, state: RateState) {
        match store.get_mut(key) {
            Some(slot) => *slot = state,
            None => {
                store.insert(key.to_owned(), state);
            },
        }
    }

    pub fn state(&self, key: &str) -> Option<RateState> {
        self.lock().get(key).cloned()
    }

    /// Drop every key starting with `prefix`, returns how many were removed
    pub fn forget(&self, prefix: &str) -> usize {
        let mut store = self.lock();
        let before = store.len();
        store.retain(|key, _| !key.starts_with(prefix));
        before - store.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
