use std::fmt::{Display, Formatter};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::schedule::WeeklySchedule;

pub mod dummy;
pub mod hass;

pub const TOPIC_PREFIX: &str = "zigbee2mqtt";

/// The topic a valve listens on for configuration changes.
pub fn device_topic(device_id: &str) -> String {
    format!("{}/{}/set", TOPIC_PREFIX, device_id)
}

/// Sends a schedule to a valve. The only thing that talks to the physical device.
#[async_trait]
pub trait PublishGateway: Send + Sync {
    async fn publish(&self, device_id: &str, schedule: &WeeklySchedule) -> Result<(), PublishError>;
}

/// Service data for an `mqtt.publish` call.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PublishRequest {
    topic: String,
    payload: String,
    retain: bool,
}

impl PublishRequest {
    pub fn new(device_id: &str, schedule: &WeeklySchedule, retain: bool) -> Result<Self, serde_json::Error> {
        Ok(Self {
            topic: device_topic(device_id),
            payload: serde_json::to_string(schedule)?,
            retain,
        })
    }

    pub fn get_topic(&self) -> &str {
        &self.topic
    }

    pub fn get_payload(&self) -> &str {
        &self.payload
    }

    pub fn is_retained(&self) -> bool {
        self.retain
    }
}

#[derive(Debug)]
pub enum PublishError {
    Network(reqwest::Error),
    Timeout(Duration),
    Rejected { status: u16, body: String },
    Json(serde_json::Error),
    Other(String),
}

impl Display for PublishError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self {
            PublishError::Network(e) => write!(f, "Network Error: {}", e),
            PublishError::Timeout(after) => write!(f, "No response after {}s", after.as_secs_f32()),
            PublishError::Rejected { status, body } => write!(f, "Rejected ({}): {}", status, body),
            PublishError::Json(e) => write!(f, "Serialization Error: {}", e),
            PublishError::Other(e) => write!(f, "Unknown Error: {}", e),
        }
    }
}

impl std::error::Error for PublishError {}

impl From<serde_json::Error> for PublishError {
    fn from(e: serde_json::Error) -> Self {
        PublishError::Json(e)
    }
}
