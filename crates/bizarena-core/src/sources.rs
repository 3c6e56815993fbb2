//! In-memory data source for local runs and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::collaborators::{DataQuery, DataSource};
use crate::domain::{CollabResult, CollaboratorError};

/// Typed collections of JSON records plus optional per-round/stage payloads.
///
/// Typed queries return the matching collection filtered by field equality.
/// Untyped round or stage queries return the payload stored for that index,
/// or `{"round": n}` / `{"stage": n}` when none was stored.
#[derive(Debug, Clone, Default)]
pub struct StaticDataSource {
    collections: BTreeMap<String, Vec<Value>>,
    keyed: BTreeMap<String, Value>,
}

impl StaticDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, data_type: impl Into<String>, records: Vec<Value>) -> Self {
        self.collections.insert(data_type.into(), records);
        self
    }

    pub fn with_round(mut self, round: usize, data: Value) -> Self {
        self.keyed.insert(format!("round-{round}"), data);
        self
    }

    pub fn with_stage(mut self, stage: usize, data: Value) -> Self {
        self.keyed.insert(format!("stage-{stage}"), data);
        self
    }

    pub fn data_types(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }
}

#[async_trait]
impl DataSource for StaticDataSource {
    async fn get_data(&self, query: &DataQuery) -> CollabResult<Value> {
        if let Some(data_type) = &query.data_type {
            let records = self
                .collections
                .get(data_type)
                .ok_or_else(|| CollaboratorError::UnknownDataType(data_type.clone()))?;
            let filtered = records
                .iter()
                .filter(|record| {
                    query
                        .filters
                        .iter()
                        .all(|(key, value)| record.get(key) == Some(value))
                })
                .cloned()
                .collect();
            return Ok(Value::Array(filtered));
        }

        if let Some(round) = query.round {
            return Ok(self
                .keyed
                .get(&format!("round-{round}"))
                .cloned()
                .unwrap_or_else(|| json!({ "round": round })));
        }
        if let Some(stage) = query.stage {
            return Ok(self
                .keyed
                .get(&format!("stage-{stage}"))
                .cloned()
                .unwrap_or_else(|| json!({ "stage": stage })));
        }

        Err(CollaboratorError::failed(
            "query names neither a data type, a round nor a stage",
        ))
    }
}
