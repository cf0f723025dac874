use crate::data::{Did, Jwt};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};

/// Flags forwarded to the service-call layer when the engine fetches on its
/// own authority rather than the caller's
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallOptions {
    pub admin_pass: bool,
    pub skip_hooks: bool,
    pub skip_joins: bool,
}

impl CallOptions {
    /// The options used for the engine's internal reads: bypass authorization
    /// hooks and joins entirely
    pub fn privileged() -> Self {
        CallOptions {
            admin_pass: true,
            skip_hooks: true,
            skip_joins: true,
        }
    }
}

/// One page of records returned by a find-style call
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RecordPage {
    pub data: Vec<Value>,
    pub total: usize,
}

/// The generic CRUD surface the decision engine consumes. Implementations
/// are provided by the surrounding pipeline; the engine only ever reads
/// records, queries them, and patches the capability-update target.
#[async_trait]
pub trait ServiceStore: Send + Sync {
    async fn get_record(
        &self,
        service: &str,
        id: &str,
        options: &CallOptions,
    ) -> Result<Option<Value>>;

    async fn find_records(
        &self,
        service: &str,
        query: &Value,
        options: &CallOptions,
    ) -> Result<RecordPage>;

    async fn patch_record(
        &self,
        service: &str,
        id: &str,
        data: &Value,
        options: &CallOptions,
    ) -> Result<Value>;
}

/// One stored grant entry: the identities in `logins` may act as if they
/// held the embedded token
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapabilityGrant {
    #[serde(default)]
    pub logins: Vec<String>,
    pub ucan: Jwt,
}

/// A stored delegated-capability record, looked up by subject key
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelegatedCapabilityRecord {
    pub did: Did,
    #[serde(default)]
    pub caps: BTreeMap<String, CapabilityGrant>,
}

/// A basic in-memory [ServiceStore] keyed by service name and record id.
/// This will serve for tests and simple embeddings; practical deployments
/// implement [ServiceStore] over their own persistence.
#[derive(Clone, Default, Debug)]
pub struct MemoryServiceStore {
    services: Arc<Mutex<HashMap<String, BTreeMap<String, Value>>>>,
}

impl MemoryServiceStore {
    pub fn insert(&self, service: &str, id: &str, record: Value) {
        let mut services = self.services.lock().expect("poisoned mutex");
        services
            .entry(service.to_owned())
            .or_default()
            .insert(id.to_owned(), record);
    }

    fn record_matches(record: &Value, query: &Value) -> bool {
        let conditions = match query.as_object() {
            Some(conditions) => conditions,
            None => return true,
        };

        for (key, condition) in conditions {
            if key.starts_with('$') {
                continue;
            }

            let actual = record.get(key);

            let matched = match condition {
                Value::Object(operators) if operators.contains_key("$in") => operators
                    .get("$in")
                    .and_then(Value::as_array)
                    .map(|candidates| {
                        candidates
                            .iter()
                            .any(|candidate| Some(candidate) == actual)
                    })
                    .unwrap_or(false),
                other => actual == Some(other),
            };

            if !matched {
                return false;
            }
        }

        true
    }
}

#[async_trait]
impl ServiceStore for MemoryServiceStore {
    async fn get_record(
        &self,
        service: &str,
        id: &str,
        _options: &CallOptions,
    ) -> Result<Option<Value>> {
        let services = self.services.lock().map_err(|_| anyhow!("poisoned mutex"))?;
        Ok(services
            .get(service)
            .and_then(|records| records.get(id))
            .cloned())
    }

    async fn find_records(
        &self,
        service: &str,
        query: &Value,
        _options: &CallOptions,
    ) -> Result<RecordPage> {
        let services = self.services.lock().map_err(|_| anyhow!("poisoned mutex"))?;

        let mut data: Vec<Value> = services
            .get(service)
            .map(|records| {
                records
                    .values()
                    .filter(|record| Self::record_matches(record, query))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let total = data.len();

        if let Some(limit) = query.get("$limit").and_then(Value::as_u64) {
            data.truncate(limit as usize);
        }

        Ok(RecordPage { data, total })
    }

    async fn patch_record(
        &self,
        service: &str,
        id: &str,
        data: &Value,
        _options: &CallOptions,
    ) -> Result<Value> {
        let mut services = self.services.lock().map_err(|_| anyhow!("poisoned mutex"))?;

        let record = services
            .get_mut(service)
            .and_then(|records| records.get_mut(id))
            .ok_or_else(|| anyhow!("No record {} in service {}", id, service))?;

        if let (Some(target), Some(changes)) = (record.as_object_mut(), data.as_object()) {
            for (key, value) in changes {
                target.insert(key.clone(), value.clone());
            }
        }

        Ok(record.clone())
    }
}
