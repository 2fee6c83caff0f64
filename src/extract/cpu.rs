// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use serde::Serialize;
use crate::snapshot::{Snapshot, CpuStats, Required};
use super::{Extractor, ExtractError, Poll};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Usage between the previous and the current window docker embeds in one snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuMetrics {
    pub per_cpu_usage_pct: Vec<f64>,
    pub total_usage_pct: f64,
    pub usage_in_kernelmode_pct: f64,
    pub usage_in_usermode_pct: f64,
}

pub struct Cpu;

impl Extractor for Cpu {
    const SECTION: &'static str = "cpu_stats";
    const LABEL: &'static str = "CPU";

    type Metrics = CpuMetrics;

    fn extract(_: &Poll<'_>, snapshot: &Snapshot) -> Result<Self::Metrics, ExtractError> {
        extract(snapshot)
    }
}

fn usage(previous: f64, current: f64) -> f64 {
    (current - previous) / NANOS_PER_SECOND
}

pub fn extract(snapshot: &Snapshot) -> Result<CpuMetrics, ExtractError> {
    let old = snapshot
        .section::<CpuStats>("precpu_stats")?
        .cpu_usage
        .required("precpu_stats.cpu_usage")?;
    let new = snapshot
        .section::<CpuStats>("cpu_stats")?
        .cpu_usage
        .required("cpu_stats.cpu_usage")?;

    let old_per_cpu = old
        .percpu_usage
        .required("precpu_stats.cpu_usage.percpu_usage")?;
    let new_per_cpu = new
        .percpu_usage
        .required("cpu_stats.cpu_usage.percpu_usage")?;
    // iterate the current window, the previous one must cover it
    let per_cpu_usage_pct = new_per_cpu
        .iter()
        .enumerate()
        .map(|(index, &current)| {
            old_per_cpu
                .get(index)
                .map(|&previous| usage(previous, current))
                .ok_or(ExtractError::CpuIndexOutOfRange {
                    index,
                    len: old_per_cpu.len(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CpuMetrics {
        per_cpu_usage_pct,
        total_usage_pct: usage(
            old.total_usage.required("precpu_stats.cpu_usage.total_usage")?,
            new.total_usage.required("cpu_stats.cpu_usage.total_usage")?,
        ),
        usage_in_kernelmode_pct: usage(
            old.usage_in_kernelmode
                .required("precpu_stats.cpu_usage.usage_in_kernelmode")?,
            new.usage_in_kernelmode
                .required("cpu_stats.cpu_usage.usage_in_kernelmode")?,
        ),
        usage_in_usermode_pct: usage(
            old.usage_in_usermode
                .required("precpu_stats.cpu_usage.usage_in_usermode")?,
            new.usage_in_usermode
                .required("cpu_stats.cpu_usage.usage_in_usermode")?,
        ),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use super::*;

    fn snapshot(precpu: Value, cpu: Value) -> Snapshot {
        Snapshot::from_value(json!({
            "precpu_stats": { "cpu_usage": precpu, "system_cpu_usage": 1 },
            "cpu_stats": { "cpu_usage": cpu, "system_cpu_usage": 2 }
        }))
        .unwrap()
    }

    #[test]
    fn one_second_of_total_usage() {
        let s = snapshot(
            json!({
                "percpu_usage": [100, 200],
                "total_usage": 300,
                "usage_in_usermode": 0,
                "usage_in_kernelmode": 1_000_000
            }),
            json!({
                "percpu_usage": [100_000_100u64, 200_000_300u64],
                "total_usage": 1_000_000_300u64,
                "usage_in_usermode": 500_000_000u64,
                "usage_in_kernelmode": 3_000_000
            }),
        );
        let metrics = extract(&s).unwrap();
        assert_eq!(metrics.total_usage_pct, 1.0);
        assert_eq!(metrics.per_cpu_usage_pct, vec![0.1, 0.2000001]);
        assert_eq!(metrics.usage_in_usermode_pct, 0.5);
        assert_eq!(metrics.usage_in_kernelmode_pct, 0.002);
    }

    #[test]
    fn previous_window_too_short() {
        let s = snapshot(
            json!({
                "percpu_usage": [100],
                "total_usage": 0,
                "usage_in_usermode": 0,
                "usage_in_kernelmode": 0
            }),
            json!({
                "percpu_usage": [100, 200],
                "total_usage": 0,
                "usage_in_usermode": 0,
                "usage_in_kernelmode": 0
            }),
        );
        assert!(matches!(
            extract(&s),
            Err(ExtractError::CpuIndexOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn missing_window() {
        let s = Snapshot::from_value(json!({ "cpu_stats": { "cpu_usage": {} } })).unwrap();
        let error = extract(&s).unwrap_err();
        assert_eq!(error.to_string(), "missing field `precpu_stats`");

        let s = snapshot(json!(null), json!({}));
        let error = extract(&s).unwrap_err();
        assert_eq!(error.to_string(), "missing field `precpu_stats.cpu_usage`");
    }

    #[test]
    fn non_numeric() {
        let s = snapshot(
            json!({ "percpu_usage": [0], "total_usage": "zero" }),
            json!({ "percpu_usage": [0], "total_usage": 0 }),
        );
        assert!(matches!(extract(&s), Err(ExtractError::Section(_))));
    }
}
