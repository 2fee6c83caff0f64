// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

mod stat;
pub use self::stat::{
    Snapshot, SnapshotError, SectionError, Required, CpuStats, CpuUsage, MemoryStats, BlkioStats,
    BlkioEntry, Networks,
};

mod container;
pub use self::container::{Entity, Container, Record};
