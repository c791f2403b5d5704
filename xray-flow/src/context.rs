use dashmap::DashMap;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{FlowError, Result};

/// Shared key/value state for the steps of one session.
///
/// Cloning is cheap; every clone sees the same map.
#[derive(Clone, Debug, Default)]
pub struct Context {
    data: Arc<DashMap<String, Value>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, key: impl Into<String>, value: impl Serialize) -> Result<()> {
        self.set_sync(key, value)
    }

    /// Synchronous variant, usable from edge conditions.
    pub fn set_sync(&self, key: impl Into<String>, value: impl Serialize) -> Result<()> {
        let key = key.into();
        let value = serde_json::to_value(value)
            .map_err(|e| FlowError::ContextError(format!("failed to serialize {key}: {e}")))?;
        self.data.insert(key, value);
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_sync(key)
    }

    pub fn get_sync<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Like [`Context::get`] but a missing or malformed entry is an error.
    pub async fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.get(key)
            .await
            .ok_or_else(|| FlowError::ContextError(format!("{key} not found in context")))
    }

    /// Append to a JSON array stored under `key`, creating it when absent.
    pub async fn push(&self, key: &str, item: impl Serialize) -> Result<()> {
        let item = serde_json::to_value(item)
            .map_err(|e| FlowError::ContextError(format!("failed to serialize {key}: {e}")))?;
        let mut entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry.value_mut() {
            Value::Array(items) => {
                items.push(item);
                Ok(())
            }
            _ => Err(FlowError::ContextError(format!("{key} is not a list"))),
        }
    }

    pub async fn remove(&self, key: &str) -> Option<Value> {
        self.data.remove(key).map(|(_, v)| v)
    }

    pub async fn clear(&self) {
        self.data.clear();
    }

    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.data
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_appends_in_order() {
        let context = Context::new();
        context.push("steps", "first").await.unwrap();
        context.push("steps", "second").await.unwrap();

        let steps: Vec<String> = context.get("steps").await.unwrap();
        assert_eq!(steps, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn push_onto_scalar_is_rejected() {
        let context = Context::new();
        context.set("steps", 3).await.unwrap();
        assert!(context.push("steps", "x").await.is_err());
    }

    #[tokio::test]
    async fn require_reports_missing_key() {
        let context = Context::new();
        let err = context.require::<String>("image").await.unwrap_err();
        assert!(err.to_string().contains("image not found"));
    }

    #[test]
    fn clones_share_state() {
        let context = Context::new();
        let other = context.clone();
        other.set_sync("age", 10).unwrap();
        assert_eq!(context.get_sync::<u32>("age"), Some(10));
    }
}
