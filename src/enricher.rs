// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use chrono::Utc;
use serde::{Serialize, Serializer, ser::Error as _};
use serde_json::{Map, Value};
use crate::{
    rate::RateEngine,
    snapshot::{Snapshot, SnapshotError, Entity},
    extract::{
        self, Extractor, Poll, Section, Cpu, CpuMetrics, Memory, MemoryMetrics, Blkio, BlkioMetrics,
        Network, NetworkMetrics,
    },
};

/// Source of the poll timestamp, milliseconds since epoch
pub trait Clock {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

impl<F> Clock for F
where
    F: Fn() -> i64,
{
    fn now_millis(&self) -> i64 {
        self()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedStats {
    pub cpu_stats: Section<CpuMetrics>,
    pub memory_stats: Section<MemoryMetrics>,
    pub blkio_stats: Section<BlkioMetrics>,
    pub networks: Section<NetworkMetrics>,
    raw: Option<Map<String, Value>>,
}

impl EnrichedStats {
    /// The raw snapshot, present when it was requested
    pub fn raw(&self) -> Option<&Map<String, Value>> {
        self.raw.as_ref()
    }

    /// Json document, enriched sections merged into the raw ones of the same name
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let mut document = self.raw.clone().unwrap_or_default();
        let sections = vec![
            (Cpu::SECTION, serde_json::to_value(&self.cpu_stats)?),
            (Memory::SECTION, serde_json::to_value(&self.memory_stats)?),
            (Blkio::SECTION, serde_json::to_value(&self.blkio_stats)?),
            (Network::SECTION, serde_json::to_value(&self.networks)?),
        ];
        for (name, section) in sections {
            merge(document.entry(name).or_insert(Value::Null), section);
        }
        Ok(Value::Object(document))
    }
}

impl Serialize for EnrichedStats {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

fn merge(target: &mut Value, patch: Value) {
    if let Value::Object(patch) = patch {
        if let Value::Object(target) = target {
            for (key, value) in patch {
                merge(target.entry(key).or_insert(Value::Null), value);
            }
            return;
        }
        *target = Value::Object(patch);
    } else {
        *target = patch;
    }
}

/// Turns raw snapshots into enriched stats, sharing one rate engine between polls
pub struct Enricher<C = SystemClock> {
    rates: Arc<RateEngine>,
    clock: C,
}

impl Enricher<SystemClock> {
    pub fn new(rates: Arc<RateEngine>) -> Self {
        Enricher {
            rates,
            clock: SystemClock,
        }
    }
}

impl<C> Enricher<C>
where
    C: Clock,
{
    pub fn with_clock(rates: Arc<RateEngine>, clock: C) -> Self {
        Enricher { rates, clock }
    }

    pub fn rates(&self) -> &Arc<RateEngine> {
        &self.rates
    }

    /// Read the clock once, every rate of this call uses that timestamp
    pub fn compute_enriched_stats<E>(
        &self,
        entity: &E,
        snapshot: &Snapshot,
        include_raw: bool,
    ) -> EnrichedStats
    where
        E: Entity + ?Sized,
    {
        let timestamp = self.clock.now_millis();
        self.compute_enriched_stats_at(timestamp, entity, snapshot, include_raw)
    }

    /// Replay a recorded snapshot at the time docker took it, its `read`
    /// field, instead of the time it is processed
    pub fn compute_recorded_stats<E>(
        &self,
        entity: &E,
        snapshot: &Snapshot,
        include_raw: bool,
    ) -> Result<EnrichedStats, SnapshotError>
    where
        E: Entity + ?Sized,
    {
        let timestamp = snapshot.read_millis()?;
        Ok(self.compute_enriched_stats_at(timestamp, entity, snapshot, include_raw))
    }

    pub fn compute_enriched_stats_at<E>(
        &self,
        timestamp: i64,
        entity: &E,
        snapshot: &Snapshot,
        include_raw: bool,
    ) -> EnrichedStats
    where
        E: Entity + ?Sized,
    {
        let poll = Poll {
            timestamp,
            entity_id: entity.short_id(),
            rates: &self.rates,
        };
        let stats = EnrichedStats {
            cpu_stats: extract::run::<Cpu>(&poll, snapshot),
            memory_stats: extract::run::<Memory>(&poll, snapshot),
            blkio_stats: extract::run::<Blkio>(&poll, snapshot),
            networks: extract::run::<Network>(&poll, snapshot),
            raw: if include_raw {
                Some(snapshot.raw().clone())
            } else {
                None
            },
        };
        tracing::debug!(entity = poll.entity_id, timestamp, "enriched stats");
        stats
    }
}
