use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info, warn};

use crate::config::DeviceConfig;
use crate::io::gateway::{PublishError, PublishGateway};
use crate::io::store::{DocumentPort, SettingsStore, StoreError};
use crate::schedule::codec::ScheduleCodec;
use crate::schedule::document::DeviceSettings;
use crate::schedule::grouping::EditableWeek;
use crate::schedule::WeeklySchedule;
use crate::time_util::mytime::TimeProvider;

#[derive(Debug)]
pub enum ApplyError {
    /// Another save has not finished yet.
    Busy,
    UnknownDevice(String),
    /// The valve did not accept the schedule. Nothing was stored.
    Publish(PublishError),
    /// The valve has the schedule but storing it failed.
    Store(StoreError),
}

impl Display for ApplyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplyError::Busy => write!(f, "A previous save is still in progress"),
            ApplyError::UnknownDevice(id) => write!(f, "Unknown device '{}'", id),
            ApplyError::Publish(e) => write!(f, "Failed to send schedule: {}", e),
            ApplyError::Store(e) => write!(f, "Schedule sent but not stored: {}", e),
        }
    }
}

impl std::error::Error for ApplyError {}

/// Released when the operation that took it finishes or is dropped part way.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn take(flag: &'a AtomicBool) -> Result<Self, ApplyError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(flag))
            .map_err(|_| ApplyError::Busy)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Keeps the stored settings and the valves in step. A schedule is only stored once the
/// valve has accepted it, so the store never shows a schedule the valve is not running.
pub struct ScheduleSync<G, P, T> {
    codec: ScheduleCodec,
    gateway: G,
    store: SettingsStore<P, T>,
    known_devices: HashSet<String>,
    in_flight: AtomicBool,
}

impl<G: PublishGateway, P: DocumentPort, T: TimeProvider> ScheduleSync<G, P, T> {
    pub fn new(codec: ScheduleCodec, gateway: G, store: SettingsStore<P, T>) -> Self {
        Self {
            codec,
            gateway,
            store,
            known_devices: HashSet::new(),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Set up for the configured devices, including their default temperatures.
    pub fn create(devices: &[DeviceConfig], gateway: G, store: SettingsStore<P, T>) -> Self {
        let mut codec = ScheduleCodec::new();
        for device in devices {
            if let Some(temperature) = device.get_default_temperature() {
                codec = codec.with_device_default(device.get_id(), temperature);
            }
        }
        let mut sync = Self::new(codec, gateway, store);
        sync.known_devices = devices.iter().map(|d| d.get_id().to_owned()).collect();
        sync
    }

    pub fn codec(&self) -> &ScheduleCodec {
        &self.codec
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn store(&self) -> &SettingsStore<P, T> {
        &self.store
    }

    fn check_device<'a>(&self, device_id: &'a str) -> Result<&'a str, ApplyError> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(ApplyError::UnknownDevice(device_id.to_owned()));
        }
        if !self.known_devices.is_empty() && !self.known_devices.contains(device_id) {
            warn!("{} is not a configured device", device_id);
        }
        Ok(device_id)
    }

    /// The editable week for a device as last applied, or the defaults.
    pub async fn restore(&self, device_id: &str) -> EditableWeek {
        let device_id = device_id.trim();
        let document = self.store.get().await;
        self.codec.restore_week(device_id, &document)
    }

    /// Send the week to the valve and, once it has been accepted, store it.
    /// The week itself is left as it is, so a failed attempt can simply be retried.
    pub async fn apply(&self, device_id: &str, week: &EditableWeek) -> Result<WeeklySchedule, ApplyError> {
        let _in_flight = InFlight::take(&self.in_flight)?;
        let device_id = self.check_device(device_id)?;

        let schedule = self.codec.encode(device_id, &week.grouped_rows(), week.is_merged());

        if let Err(e) = self.gateway.publish(device_id, &schedule).await {
            error!("Failed to publish schedule for {}: {}", device_id, e);
            return Err(ApplyError::Publish(e));
        }
        debug!("{} accepted its schedule", device_id);

        let settings = DeviceSettings::new(device_id.to_owned(), schedule.clone());
        if let Err(e) = self.store.save(device_id, settings).await {
            error!("{} is running a schedule that could not be stored: {}", device_id, e);
            return Err(ApplyError::Store(e));
        }

        info!("Applied and stored schedule for {}", device_id);
        Ok(schedule)
    }

    /// Forget the stored schedules of every device. The valves keep running theirs.
    pub async fn clear(&self) -> Result<(), ApplyError> {
        let _in_flight = InFlight::take(&self.in_flight)?;
        self.store.clear().await.map_err(ApplyError::Store)
    }
}
