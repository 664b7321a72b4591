use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Method, Request};

use super::{PublishError, PublishGateway, PublishRequest};
use crate::config::HomeAssistantConfig;
use crate::schedule::WeeklySchedule;

const MQTT_PUBLISH_SERVICE: &str = "api/services/mqtt/publish";

/// Publishes through Home Assistant's `mqtt.publish` service.
pub struct HomeAssistantGateway {
    base_url: String,
    token: String,
    timeout: Duration,
    retain: bool,
    client: Client,
}

impl HomeAssistantGateway {
    pub fn create(config: &HomeAssistantConfig) -> Self {
        Self::new(
            config.get_url().to_owned(),
            config.get_token().to_owned(),
            *config.get_timeout(),
            config.should_retain(),
        )
    }

    pub fn new(base_url: String, token: String, timeout: Duration, retain: bool) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
            timeout,
            retain,
            client: Client::new(),
        }
    }

    fn new_request(&self, method: Method, location: &str, body: String) -> Result<Request, reqwest::Error> {
        self.client
            .request(method, format!("{}/{}", self.base_url, location))
            .bearer_auth(&self.token)
            .header("Content-Type", "application/json;charset=UTF-8")
            .timeout(self.timeout)
            .body(body)
            .build()
    }

    fn classify(&self, e: reqwest::Error) -> PublishError {
        if e.is_timeout() {
            PublishError::Timeout(self.timeout)
        } else {
            PublishError::Network(e)
        }
    }
}

#[async_trait]
impl PublishGateway for HomeAssistantGateway {
    async fn publish(&self, device_id: &str, schedule: &WeeklySchedule) -> Result<(), PublishError> {
        let request_payload = PublishRequest::new(device_id, schedule, self.retain)?;
        let request_payload = serde_json::to_string(&request_payload)?;

        let request = self
            .new_request(Method::POST, MQTT_PUBLISH_SERVICE, request_payload)
            .map_err(PublishError::Network)?;

        debug!("Publishing schedule for {} via {}", device_id, self.base_url);
        let response = self.client.execute(request).await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!("Service successfully called [domain: mqtt, service: publish, topic: {}]", super::device_topic(device_id));
        Ok(())
    }
}
