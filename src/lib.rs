// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]

pub mod rate;
pub mod snapshot;
pub mod extract;
pub mod enricher;
pub mod configuration;

pub use self::{
    rate::{RateEngine, RateUnit, RateState, RateError},
    snapshot::{Snapshot, Entity, Container},
    extract::Section,
    enricher::{Enricher, EnrichedStats, Clock, SystemClock},
};
