use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::WeeklySchedule;

/// The last schedule successfully applied to a single valve.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSettings {
    device_id: String,
    schedule: WeeklySchedule,
}

impl DeviceSettings {
    pub fn new(device_id: String, schedule: WeeklySchedule) -> Self {
        Self {
            device_id,
            schedule,
        }
    }

    pub fn get_device_id(&self) -> &str {
        &self.device_id
    }

    pub fn get_schedule(&self) -> &WeeklySchedule {
        &self.schedule
    }
}

/// The shared document holding every device's settings.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
    devices: BTreeMap<String, DeviceSettings>,
}

impl PersistedDocument {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Leniently read a stored document. Anything that cannot be understood is logged and
    /// treated as absent, a broken entry for one device does not hide the others.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut root) = value else {
            if !value.is_null() {
                warn!("Stored settings are not an object, ignoring: {}", value);
            }
            return Self::empty();
        };

        let saved_at = match root.remove("savedAt") {
            None | Some(Value::Null) => None,
            Some(raw) => match serde_json::from_value::<DateTime<Utc>>(raw.clone()) {
                Ok(saved_at) => Some(saved_at),
                Err(e) => {
                    warn!("Ignoring invalid savedAt {}: {}", raw, e);
                    None
                }
            },
        };

        let mut devices = BTreeMap::new();
        match root.remove("devices") {
            None | Some(Value::Null) => {}
            Some(Value::Object(entries)) => {
                for (device_id, entry) in entries {
                    match serde_json::from_value::<DeviceSettings>(entry) {
                        Ok(settings) => {
                            devices.insert(device_id, settings);
                        }
                        Err(e) => warn!("Ignoring stored settings for {}: {}", device_id, e),
                    }
                }
            }
            Some(other) => warn!("Stored devices are not an object, ignoring: {}", other),
        }

        Self { saved_at, devices }
    }

    pub fn get_saved_at(&self) -> Option<DateTime<Utc>> {
        self.saved_at
    }

    pub fn devices(&self) -> &BTreeMap<String, DeviceSettings> {
        &self.devices
    }

    pub fn get_device(&self, device_id: &str) -> Option<&DeviceSettings> {
        self.devices.get(device_id)
    }

    pub fn set_device(&mut self, settings: DeviceSettings, saved_at: DateTime<Utc>) {
        self.devices
            .insert(settings.get_device_id().to_owned(), settings);
        self.saved_at = Some(saved_at);
    }
}
