// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use std::str::FromStr;
use serde::Deserialize;
use serde_json::Value;
use super::{Snapshot, SnapshotError};

/// Something being monitored, its short id namespaces every rate key
pub trait Entity {
    fn short_id(&self) -> &str;
}

impl Entity for str {
    fn short_id(&self) -> &str {
        self
    }
}

impl Entity for String {
    fn short_id(&self) -> &str {
        self.as_str()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Container {
    #[serde(alias = "Id")]
    pub id: String,
    #[serde(default, alias = "Name")]
    pub name: String,
}

impl Container {
    const SHORT_ID_LENGTH: usize = 12;

    pub fn new(id: &str) -> Self {
        Container {
            id: id.to_owned(),
            name: String::new(),
        }
    }
}

impl Entity for Container {
    // same truncation as `docker ps`
    fn short_id(&self) -> &str {
        self.id.get(..Self::SHORT_ID_LENGTH).unwrap_or(&self.id)
    }
}

/// One input line, either `{"id": .., "stats": {..}}` or a bare stats
/// document carrying its own `id`
#[derive(Debug, Clone)]
pub struct Record {
    pub container: Container,
    pub snapshot: Snapshot,
}

impl FromStr for Record {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[derive(Deserialize)]
        struct Wrapped {
            id: String,
            stats: Snapshot,
        }

        let value = serde_json::from_str::<Value>(s)?;
        if value.get("stats").map(Value::is_object).unwrap_or(false) {
            let Wrapped { id, stats } = serde_json::from_value(value)?;
            return Ok(Record {
                container: Container::new(&id),
                snapshot: stats,
            });
        }

        let snapshot = Snapshot::from_value(value)?;
        let container = snapshot
            .id()
            .map(Container::new)
            .ok_or(SnapshotError::MissingId)?;
        Ok(Record { container, snapshot })
    }
}
