// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use crate::{
    rate::RateEngine,
    snapshot::{Snapshot, Networks},
};
use super::{Extractor, ExtractError, Poll};

/// Interface name -> `{counter}_ps` -> rate, plus the synthetic `all` interface
pub type NetworkMetrics = BTreeMap<String, BTreeMap<String, f64>>;

/// Name of the synthetic interface aggregating every other one
pub const ALL_INTERFACES: &str = "all";

pub struct Network;

impl Extractor for Network {
    const SECTION: &'static str = "networks";
    const LABEL: &'static str = "networks";

    type Metrics = NetworkMetrics;

    fn extract(poll: &Poll<'_>, snapshot: &Snapshot) -> Result<Self::Metrics, ExtractError> {
        extract(poll.rates, poll.timestamp, poll.entity_id, snapshot)
    }
}

/// The `all` interface sums the cumulative counters first and takes the rate
/// of the sum, it is not the sum of the per interface rates. The whole section
/// is observed as one batch, a rejected key records none of it.
pub fn extract(
    rates: &RateEngine,
    timestamp: i64,
    entity_id: &str,
    snapshot: &Snapshot,
) -> Result<NetworkMetrics, ExtractError> {
    let networks = snapshot.section::<Networks>("networks")?;

    let mut fields = Vec::new();
    let mut observations = Vec::new();
    let mut all = BTreeMap::<String, f64>::new();
    for (interface, counters) in &networks {
        for (metric, &value) in counters {
            let name = format!("{}_ps", metric);
            *all.entry(name.clone()).or_insert(0.0) += value;
            observations.push((format!("{}.{}.{}", entity_id, interface, metric), value));
            fields.push((interface, name));
        }
    }
    for (name, &total) in &all {
        observations.push((format!("{}.net.{}", entity_id, name), total));
    }

    let mut observed = rates.observe_all(timestamp, &observations)?.into_iter();
    let mut result = networks
        .keys()
        .map(|interface| (interface.clone(), BTreeMap::new()))
        .collect::<NetworkMetrics>();
    for ((interface, name), rate) in fields.into_iter().zip(&mut observed) {
        if let Some(interface_rates) = result.get_mut(interface) {
            interface_rates.insert(name, rate);
        }
    }
    let all = all
        .into_iter()
        .map(|(name, _)| name)
        .zip(observed)
        .collect::<BTreeMap<_, _>>();

    if result.contains_key(ALL_INTERFACES) {
        tracing::warn!(
            entity = entity_id,
            interface = ALL_INTERFACES,
            "interface is shadowed by the aggregate",
        );
    }
    result.insert(ALL_INTERFACES.to_owned(), all);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use super::*;

    fn snapshot(networks: Value) -> Snapshot {
        Snapshot::from_value(json!({ "networks": networks })).unwrap()
    }

    #[test]
    fn single_interface() {
        let rates = RateEngine::default();
        let first = extract(&rates, 1000, "abc", &snapshot(json!({ "eth0": { "rx_bytes": 1000 } })))
            .unwrap();
        assert_eq!(first["eth0"]["rx_bytes_ps"], 0.0);
        assert_eq!(first["all"]["rx_bytes_ps"], 0.0);

        let second = extract(&rates, 3000, "abc", &snapshot(json!({ "eth0": { "rx_bytes": 3000 } })))
            .unwrap();
        assert_eq!(second["eth0"]["rx_bytes_ps"], 1.0);
        assert_eq!(second["all"]["rx_bytes_ps"], 1.0);

        assert_eq!(rates.state("abc.eth0.rx_bytes").map(|s| s.value), Some(3000.0));
        assert_eq!(rates.state("abc.net.rx_bytes_ps").map(|s| s.value), Some(3000.0));
    }

    #[test]
    fn aggregate_is_rate_of_sum() {
        let rates = RateEngine::default();
        let networks = |eth0: u64, eth1: u64| {
            snapshot(json!({
                "eth0": { "rx_bytes": eth0, "tx_packets": 1 },
                "eth1": { "rx_bytes": eth1 }
            }))
        };
        extract(&rates, 0, "abc", &networks(100, 0)).unwrap();
        // eth1 disappears and comes back, the aggregate only sees the sums
        extract(&rates, 10, "abc", &snapshot(json!({ "eth0": { "rx_bytes": 200 } }))).unwrap();
        let metrics = extract(&rates, 20, "abc", &networks(300, 500)).unwrap();

        assert_eq!(metrics["eth0"]["rx_bytes_ps"], 10.0);
        assert_eq!(metrics["eth1"]["rx_bytes_ps"], 25.0);
        assert_eq!(metrics["all"]["rx_bytes_ps"], 60.0);
        assert_eq!(metrics["all"]["tx_packets_ps"], 0.0);
        assert_eq!(metrics.len(), 3);
    }

    #[test]
    fn empty_networks() {
        let rates = RateEngine::default();
        let metrics = extract(&rates, 1, "abc", &snapshot(json!({}))).unwrap();
        assert_eq!(metrics.len(), 1);
        assert!(metrics["all"].is_empty());
    }

    #[test]
    fn malformed_networks() {
        let rates = RateEngine::default();
        assert!(extract(&rates, 1, "abc", &Snapshot::default()).is_err());
        assert!(extract(&rates, 1, "abc", &snapshot(json!({ "eth0": { "rx_bytes": "lots" } }))).is_err());
        assert!(extract(&rates, 1, "abc", &snapshot(json!(["eth0"]))).is_err());
        assert!(rates.is_empty());
    }

    #[test]
    fn repeated_timestamp_fails() {
        let rates = RateEngine::default();
        let s = snapshot(json!({ "eth0": { "rx_bytes": 1 } }));
        extract(&rates, 1, "abc", &s).unwrap();
        assert!(matches!(extract(&rates, 1, "abc", &s), Err(ExtractError::Rate(_))));
    }

    #[test]
    fn failed_section_records_nothing() {
        let rates = RateEngine::default();
        extract(&rates, 5, "abc", &snapshot(json!({ "eth0": { "rx_bytes": 1 } }))).unwrap();

        // `a0` sorts before `eth0`, whose timestamp does not advance
        let s = snapshot(json!({ "a0": { "rx_bytes": 9 }, "eth0": { "rx_bytes": 2 } }));
        assert!(extract(&rates, 5, "abc", &s).is_err());
        assert!(rates.state("abc.a0.rx_bytes").is_none());
        assert_eq!(rates.state("abc.net.rx_bytes_ps").map(|s| s.value), Some(1.0));
        assert_eq!(rates.len(), 2);

        let metrics = extract(&rates, 6, "abc", &s).unwrap();
        assert_eq!(metrics["a0"]["rx_bytes_ps"], 0.0);
        assert_eq!(metrics["eth0"]["rx_bytes_ps"], 1.0);
        assert_eq!(metrics["all"]["rx_bytes_ps"], 10.0);
    }
}
