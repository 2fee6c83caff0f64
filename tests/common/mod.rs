// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use stats_enricher::snapshot::Record;

// two consecutive polls of the same container, two seconds apart
const DOCKER_STATS: &str = include_str!("../data/docker_stats.jsonl");

pub fn docker_stats() -> Vec<Record> {
    DOCKER_STATS
        .lines()
        .map(|line| line.parse().unwrap())
        .collect()
}
