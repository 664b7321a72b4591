use std::sync::Mutex;

use async_trait::async_trait;
use log::trace;
use serde_json::Value;

use super::{DocumentPort, StoreError};

/// Keeps the document in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryPort {
    value: Mutex<Option<Value>>,
}

impl InMemoryPort {
    pub fn with_value(value: Value) -> Self {
        Self {
            value: Mutex::new(Some(value)),
        }
    }

    /// The raw stored document.
    pub fn snapshot(&self) -> Option<Value> {
        self.value.lock().ok().and_then(|value| value.clone())
    }
}

#[async_trait]
impl DocumentPort for InMemoryPort {
    async fn get_json(&self) -> Result<Option<Value>, StoreError> {
        let value = self
            .value
            .lock()
            .map_err(|e| StoreError::Other(format!("in memory document lock poisoned: {}", e)))?;
        Ok(value.clone())
    }

    async fn set_json(&self, data: &Value) -> Result<(), StoreError> {
        let mut value = self
            .value
            .lock()
            .map_err(|e| StoreError::Other(format!("in memory document lock poisoned: {}", e)))?;
        trace!("Storing {}", data);
        *value = Some(data.clone());
        Ok(())
    }
}
