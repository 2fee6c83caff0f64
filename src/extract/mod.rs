// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

pub mod cpu;
pub mod memory;
pub mod blkio;
pub mod network;

use serde::Serialize;
use thiserror::Error;
use crate::{
    rate::{RateEngine, RateError},
    snapshot::{Snapshot, SectionError},
};

pub use self::{
    cpu::{Cpu, CpuMetrics},
    memory::{Memory, MemoryMetrics},
    blkio::{Blkio, BlkioMetrics},
    network::{Network, NetworkMetrics},
};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(transparent)]
    Section(#[from] SectionError),
    #[error("memory limit is zero")]
    ZeroLimit,
    #[error("per cpu usage index {index} out of range, previous window has {len} entries")]
    CpuIndexOutOfRange { index: usize, len: usize },
    #[error(transparent)]
    Rate(#[from] RateError),
}

/// Everything shared by the extractors of one poll
#[derive(Clone, Copy)]
pub struct Poll<'a> {
    pub timestamp: i64,
    pub entity_id: &'a str,
    pub rates: &'a RateEngine,
}

/// One section of the enriched stats
pub trait Extractor {
    /// name of the section in the output, also the raw section it is merged into
    const SECTION: &'static str;
    /// human readable name used in the error message
    const LABEL: &'static str;

    type Metrics: Serialize;

    fn extract(poll: &Poll<'_>, snapshot: &Snapshot) -> Result<Self::Metrics, ExtractError>;
}

/// Either the computed metrics, or the error that replaced them
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Section<T> {
    Metrics(T),
    Failed(ErrorEntry),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEntry {
    pub error: ErrorMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMessage {
    pub message: String,
}

impl<T> Section<T> {
    pub fn metrics(&self) -> Option<&T> {
        match self {
            Section::Metrics(metrics) => Some(metrics),
            Section::Failed(_) => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Section::Metrics(_) => None,
            Section::Failed(entry) => Some(entry.error.message.as_str()),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Section::Failed(_))
    }
}

/// Run the extractor, the failure stays inside its own section
pub fn run<E>(poll: &Poll<'_>, snapshot: &Snapshot) -> Section<E::Metrics>
where
    E: Extractor,
{
    match E::extract(poll, snapshot) {
        Ok(metrics) => Section::Metrics(metrics),
        Err(error) => {
            tracing::warn!(
                entity = poll.entity_id,
                section = E::SECTION,
                error = tracing::field::display(&error),
                "failed to compute stats",
            );
            Section::Failed(ErrorEntry {
                error: ErrorMessage {
                    message: format!("Couldn't compute {} stats (API Version): {}", E::LABEL, error),
                },
            })
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use super::*;

    #[test]
    fn failed_section_shape() {
        let snapshot = Snapshot::from_value(json!({})).unwrap();
        let rates = RateEngine::default();
        let poll = Poll {
            timestamp: 1,
            entity_id: "abc",
            rates: &rates,
        };
        let section = run::<Memory>(&poll, &snapshot);
        assert!(section.is_failed());
        assert_eq!(
            section.error_message(),
            Some("Couldn't compute memory stats (API Version): missing field `memory_stats`"),
        );
        assert_eq!(
            serde_json::to_value(&section).unwrap(),
            json!({ "error": { "message": "Couldn't compute memory stats (API Version): missing field `memory_stats`" } }),
        );
    }

    #[test]
    fn metrics_section_shape() {
        let snapshot = Snapshot::from_value(json!({ "memory_stats": { "usage": 1, "limit": 4 } })).unwrap();
        let rates = RateEngine::default();
        let poll = Poll {
            timestamp: 1,
            entity_id: "abc",
            rates: &rates,
        };
        let section = run::<Memory>(&poll, &snapshot);
        assert_eq!(section.metrics().map(|m| m.usage_pct), Some(0.25));
        assert_eq!(serde_json::to_value(&section).unwrap(), json!({ "usage_pct": 0.25 }));
    }
}
