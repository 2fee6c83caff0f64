// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use std::{collections::BTreeMap, str::FromStr};
use chrono::DateTime;
use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// One document of the docker `stats` endpoint, kept as received.
///
/// Sections are decoded lazily, one at a time, so a malformed section only
/// breaks the extractor that reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    raw: Map<String, Value>,
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot must be a json object, got {0}")]
    NotAnObject(&'static str),
    #[error("failed to parse snapshot {0}")]
    Parse(#[from] serde_json::Error),
    #[error("snapshot has no container id")]
    MissingId,
    #[error("snapshot has no `read` time")]
    MissingReadTime,
    #[error("malformed `read` time {0}")]
    ReadTime(#[from] chrono::ParseError),
}

impl FromStr for Snapshot {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_value(serde_json::from_str(s)?)
    }
}

#[derive(Error, Debug)]
pub enum SectionError {
    #[error("missing field `{0}`")]
    Missing(&'static str),
    #[error("malformed `{section}`: {source}")]
    Malformed {
        section: &'static str,
        source: serde_json::Error,
    },
}

impl Snapshot {
    pub fn from_value(value: Value) -> Result<Self, SnapshotError> {
        match value {
            Value::Object(raw) => Ok(Snapshot { raw }),
            Value::Null => Err(SnapshotError::NotAnObject("null")),
            Value::Bool(_) => Err(SnapshotError::NotAnObject("bool")),
            Value::Number(_) => Err(SnapshotError::NotAnObject("number")),
            Value::String(_) => Err(SnapshotError::NotAnObject("string")),
            Value::Array(_) => Err(SnapshotError::NotAnObject("array")),
        }
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// Docker reports the full container id next to the stats
    pub fn id(&self) -> Option<&str> {
        self.raw.get("id").and_then(Value::as_str)
    }

    /// When docker took the snapshot, milliseconds since epoch
    pub fn read_millis(&self) -> Result<i64, SnapshotError> {
        let read = self
            .raw
            .get("read")
            .and_then(Value::as_str)
            .ok_or(SnapshotError::MissingReadTime)?;
        Ok(DateTime::parse_from_rfc3339(read)?.timestamp_millis())
    }

    /// Decode the top level field `name`, `null` counts as absent.
    pub fn section<'a, T>(&'a self, name: &'static str) -> Result<T, SectionError>
    where
        T: Deserialize<'a>,
    {
        match self.raw.get(name) {
            None | Some(Value::Null) => Err(SectionError::Missing(name)),
            Some(value) => T::deserialize(value)
                .map_err(|source| SectionError::Malformed { section: name, source }),
        }
    }
}

/// Turns an absent optional field into a `SectionError::Missing`
pub trait Required<T> {
    fn required(self, path: &'static str) -> Result<T, SectionError>;
}

impl<T> Required<T> for Option<T> {
    fn required(self, path: &'static str) -> Result<T, SectionError> {
        self.ok_or(SectionError::Missing(path))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CpuStats {
    pub cpu_usage: Option<CpuUsage>,
}

// All CPU usage counters are cumulative, unit: nanoseconds
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CpuUsage {
    pub total_usage: Option<f64>,
    pub percpu_usage: Option<Vec<f64>>,
    pub usage_in_kernelmode: Option<f64>,
    pub usage_in_usermode: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryStats {
    pub usage: Option<f64>,
    pub limit: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlkioStats {
    pub io_service_bytes_recursive: Option<Vec<BlkioEntry>>,
    pub io_serviced_recursive: Option<Vec<BlkioEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlkioEntry {
    pub op: Option<String>,
    pub value: Option<f64>,
}

/// Interface name -> counter name -> cumulative value
pub type Networks = BTreeMap<String, BTreeMap<String, f64>>;
