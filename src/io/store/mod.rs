use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde_json::Value;

use crate::schedule::document::{DeviceSettings, PersistedDocument};
use crate::time_util::mytime::TimeProvider;

pub mod dummy;
pub mod file;

/// Where the shared settings document lives. Mirrors the `get_json` / `set_json` commands.
#[async_trait]
pub trait DocumentPort: Send + Sync {
    /// The stored document, or None if nothing has been stored yet.
    async fn get_json(&self) -> Result<Option<Value>, StoreError>;

    /// Replace the stored document.
    async fn set_json(&self, data: &Value) -> Result<(), StoreError>;
}

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Other(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self {
            StoreError::Io(e) => write!(f, "I/O Error: {}", e),
            StoreError::Json(e) => write!(f, "Malformed Document: {}", e),
            StoreError::Other(e) => write!(f, "Store Error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Json(e)
    }
}

/// Read-modify-write access to the document holding every device's last applied schedule.
///
/// There is no locking across sessions: two sessions saving different devices at the same
/// time can race, and the later write wins in full.
pub struct SettingsStore<P, T> {
    port: P,
    time_provider: T,
}

impl<P: DocumentPort, T: TimeProvider> SettingsStore<P, T> {
    pub fn new(port: P, time_provider: T) -> Self {
        Self {
            port,
            time_provider,
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// The stored document. Never fails: anything missing or unreadable is an empty document.
    pub async fn get(&self) -> PersistedDocument {
        self.load().await.unwrap_or_else(|e| {
            error!("Failed to read stored settings, treating as empty: {}", e);
            PersistedDocument::empty()
        })
    }

    pub async fn save(&self, device_id: &str, settings: DeviceSettings) -> Result<(), StoreError> {
        // A read failure aborts rather than overwriting every other device with nothing.
        let mut document = self.load().await?;
        let saved_at = self.time_provider.get_utc_time();
        if settings.get_device_id() != device_id {
            warn!(
                "Settings for {} carry device id {}, storing under {}",
                device_id,
                settings.get_device_id(),
                device_id
            );
        }
        document.set_device(
            DeviceSettings::new(device_id.to_owned(), settings.get_schedule().clone()),
            saved_at,
        );

        self.port.set_json(&serde_json::to_value(&document)?).await?;
        debug!("Saved settings for {} at {}", device_id, saved_at);
        Ok(())
    }

    /// Forget every device's settings.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.port
            .set_json(&serde_json::to_value(PersistedDocument::empty())?)
            .await?;
        info!("Cleared all stored settings");
        Ok(())
    }

    async fn load(&self) -> Result<PersistedDocument, StoreError> {
        match self.port.get_json().await {
            Ok(Some(value)) => Ok(PersistedDocument::from_value(value)),
            Ok(None) => Ok(PersistedDocument::empty()),
            Err(StoreError::Json(e)) => {
                warn!("Stored settings are malformed, treating as empty: {}", e);
                Ok(PersistedDocument::empty())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::dummy::InMemoryPort;
    use super::*;
    use crate::schedule::codec::ScheduleCodec;
    use crate::schedule::ScheduleRow;
    use crate::time_util::mytime::DummyTimeProvider;
    use crate::time_util::test_utils::utc_datetime;

    fn store_with(port: InMemoryPort) -> SettingsStore<InMemoryPort, DummyTimeProvider> {
        SettingsStore::new(port, DummyTimeProvider::new(utc_datetime(2024, 1, 3, 15, 35, 32)))
    }

    fn settings(device_id: &str, temperature: f32) -> DeviceSettings {
        let rows = vec![ScheduleRow::new(7, 0, temperature).unwrap()];
        let schedule = ScheduleCodec::new().encode(device_id, &[rows], false);
        DeviceSettings::new(device_id.to_owned(), schedule)
    }

    #[tokio::test]
    async fn absent_document_is_empty() {
        let store = store_with(InMemoryPort::default());
        assert_eq!(store.get().await, PersistedDocument::empty());
    }

    #[tokio::test]
    async fn saves_merge_by_device() {
        let store = store_with(InMemoryPort::default());
        let a = settings("dev-A", 20.0);
        let b = settings("dev-B", 22.0);
        store.save("dev-A", a.clone()).await.unwrap();
        store.save("dev-B", b.clone()).await.unwrap();

        let document = store.get().await;
        assert_eq!(document.devices().len(), 2);
        assert_eq!(document.get_device("dev-A"), Some(&a));
        assert_eq!(document.get_device("dev-B"), Some(&b));
        assert_eq!(document.get_saved_at(), Some(utc_datetime(2024, 1, 3, 15, 35, 32)));
    }

    #[tokio::test]
    async fn save_replaces_the_same_device() {
        let store = store_with(InMemoryPort::default());
        store.save("dev-A", settings("dev-A", 20.0)).await.unwrap();
        let newer = settings("dev-A", 25.0);
        store.save("dev-A", newer.clone()).await.unwrap();
        let document = store.get().await;
        assert_eq!(document.devices().len(), 1);
        assert_eq!(document.get_device("dev-A"), Some(&newer));
    }

    #[tokio::test]
    async fn stored_shape() {
        let store = store_with(InMemoryPort::default());
        store.save("dev-A", settings("dev-A", 20.0)).await.unwrap();
        let raw = store.port().snapshot().unwrap();
        assert_eq!(raw["savedAt"], json!("2024-01-03T15:35:32Z"));
        assert_eq!(raw["devices"]["dev-A"]["deviceId"], json!("dev-A"));
        assert_eq!(
            raw["devices"]["dev-A"]["schedule"]["weekly_schedule"]["1"]["dayofweek"],
            json!(6)
        );
    }

    #[tokio::test]
    async fn clear_empties_every_device() {
        let store = store_with(InMemoryPort::default());
        store.save("dev-A", settings("dev-A", 20.0)).await.unwrap();
        store.save("dev-B", settings("dev-B", 20.0)).await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.get().await, PersistedDocument::empty());
        assert_eq!(store.port().snapshot(), Some(json!({"devices": {}})));
    }

    #[tokio::test]
    async fn malformed_document_is_replaced_on_save() {
        let store = store_with(InMemoryPort::with_value(json!("not a document")));
        assert_eq!(store.get().await, PersistedDocument::empty());
        store.save("dev-A", settings("dev-A", 20.0)).await.unwrap();
        assert_eq!(store.get().await.devices().len(), 1);
    }
}
