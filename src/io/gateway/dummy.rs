use std::sync::mpsc::Receiver;
use std::sync::Mutex;

use async_trait::async_trait;
use log::info;

use super::{PublishError, PublishGateway, PublishRequest};
use crate::io::dummy::{read_all, DummyIO};
use crate::schedule::WeeklySchedule;

pub enum ModifyState {
    /// Reject every publish from now on with the given reason.
    Fail(String),
    Succeed,
}

/// Accepts publishes without a device, remembering what was sent.
pub struct DummyGateway {
    receiver: Mutex<Receiver<ModifyState>>,
    failure: Mutex<Option<String>>,
    published: Mutex<Vec<PublishRequest>>,
}

impl DummyIO for DummyGateway {
    type MessageType = ModifyState;
    type Config = ();

    fn new(receiver: Receiver<Self::MessageType>, _config: &Self::Config) -> Self {
        DummyGateway {
            receiver: Mutex::new(receiver),
            failure: Mutex::new(None),
            published: Mutex::new(Vec::new()),
        }
    }
}

impl DummyGateway {
    /// Everything published so far, oldest first.
    pub fn published(&self) -> Vec<PublishRequest> {
        self.published.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn update_state(&self) -> Result<(), PublishError> {
        let receiver = self.receiver.lock().map_err(|e| PublishError::Other(e.to_string()))?;
        let mut failure = self.failure.lock().map_err(|e| PublishError::Other(e.to_string()))?;
        read_all(&*receiver, |message| {
            *failure = match message {
                ModifyState::Fail(reason) => Some(reason),
                ModifyState::Succeed => None,
            };
        });
        Ok(())
    }
}

#[async_trait]
impl PublishGateway for DummyGateway {
    async fn publish(&self, device_id: &str, schedule: &WeeklySchedule) -> Result<(), PublishError> {
        self.update_state()?;
        let failure = self
            .failure
            .lock()
            .map_err(|e| PublishError::Other(e.to_string()))?
            .clone();
        if let Some(reason) = failure {
            info!("Dummy: rejecting publish to {}: {}", device_id, reason);
            return Err(PublishError::Other(reason));
        }

        let request = PublishRequest::new(device_id, schedule, false)?;
        info!("Dummy: publish to {}: {}", request.get_topic(), request.get_payload());
        self.published
            .lock()
            .map_err(|e| PublishError::Other(e.to_string()))?
            .push(request);
        Ok(())
    }
}
