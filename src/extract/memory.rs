// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use serde::Serialize;
use crate::snapshot::{Snapshot, MemoryStats, Required};
use super::{Extractor, ExtractError, Poll};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryMetrics {
    pub usage_pct: f64,
}

pub struct Memory;

impl Extractor for Memory {
    const SECTION: &'static str = "memory_stats";
    const LABEL: &'static str = "memory";

    type Metrics = MemoryMetrics;

    fn extract(_: &Poll<'_>, snapshot: &Snapshot) -> Result<Self::Metrics, ExtractError> {
        extract(snapshot)
    }
}

pub fn extract(snapshot: &Snapshot) -> Result<MemoryMetrics, ExtractError> {
    let stats = snapshot.section::<MemoryStats>("memory_stats")?;
    let usage = stats.usage.required("memory_stats.usage")?;
    let limit = stats.limit.required("memory_stats.limit")?;
    if limit == 0.0 {
        return Err(ExtractError::ZeroLimit);
    }
    Ok(MemoryMetrics {
        usage_pct: usage / limit,
    })
}
