// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use serde::Serialize;
use crate::{
    rate::RateEngine,
    snapshot::{Snapshot, BlkioStats, BlkioEntry, Required},
};
use super::{Extractor, ExtractError, Poll};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlkioMetrics {
    pub read_bps: f64,
    pub write_bps: f64,
    pub total_bps: f64,
    pub read_iops: f64,
    pub write_iops: f64,
    pub total_iops: f64,
}

pub struct Blkio;

impl Extractor for Blkio {
    const SECTION: &'static str = "blkio_stats";
    const LABEL: &'static str = "BLKIO";

    type Metrics = BlkioMetrics;

    fn extract(poll: &Poll<'_>, snapshot: &Snapshot) -> Result<Self::Metrics, ExtractError> {
        extract(poll.rates, poll.timestamp, poll.entity_id, snapshot)
    }
}

/// One recursive array of the blkio section and the rate keys derived from it
struct Series {
    field: &'static str,
    op: &'static str,
    value: &'static str,
    key: &'static str,
}

const SERVICE_BYTES: Series = Series {
    field: "blkio_stats.io_service_bytes_recursive",
    op: "blkio_stats.io_service_bytes_recursive[].op",
    value: "blkio_stats.io_service_bytes_recursive[].value",
    key: "blk",
};

const SERVICED: Series = Series {
    field: "blkio_stats.io_serviced_recursive",
    op: "blkio_stats.io_serviced_recursive[].op",
    value: "blkio_stats.io_serviced_recursive[].value",
    key: "blk.io",
};

/// Cumulative counters summed over every device
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct OpTotals {
    read: f64,
    write: f64,
    total: f64,
}

impl OpTotals {
    fn sum(series: &Series, entries: Option<Vec<BlkioEntry>>) -> Result<Self, ExtractError> {
        let entries = entries.required(series.field)?;
        entries.into_iter().try_fold(OpTotals::default(), |mut totals, entry| -> Result<_, ExtractError> {
            let op = entry.op.required(series.op)?;
            let value = entry.value.required(series.value)?;
            match op.as_str() {
                "Read" => totals.read += value,
                "Write" => totals.write += value,
                "Total" => totals.total += value,
                _ => (),
            }
            Ok(totals)
        })
    }

    fn observations(&self, series: &Series, entity_id: &str) -> [(String, f64); 3] {
        let key = |op: &str| format!("{}.{}.{}", entity_id, series.key, op);
        [
            (key("read"), self.read),
            (key("write"), self.write),
            (key("total"), self.total),
        ]
    }
}

pub fn extract(
    rates: &RateEngine,
    timestamp: i64,
    entity_id: &str,
    snapshot: &Snapshot,
) -> Result<BlkioMetrics, ExtractError> {
    let stats = snapshot.section::<BlkioStats>("blkio_stats")?;
    let bytes = OpTotals::sum(&SERVICE_BYTES, stats.io_service_bytes_recursive)?;
    let operations = OpTotals::sum(&SERVICED, stats.io_serviced_recursive)?;

    // both series in one batch, a rejected key records none of the six
    let mut observations = bytes.observations(&SERVICE_BYTES, entity_id).to_vec();
    observations.extend_from_slice(&operations.observations(&SERVICED, entity_id));
    let observed = rates.observe_all(timestamp, &observations)?;
    Ok(BlkioMetrics {
        read_bps: observed[0],
        write_bps: observed[1],
        total_bps: observed[2],
        read_iops: observed[3],
        write_iops: observed[4],
        total_iops: observed[5],
    })
}
