//! A numbered set of sort devices
//!
//! `SortDeviceSet::init` builds `nr_devs` independent devices from one
//! [`DeviceConfig`]; callers address them by index the way device nodes are
//! addressed by minor number. `cleanup` tears the whole set down. Storage of a
//! device stays alive while sessions opened on it remain.

use std::sync::Arc;

use crate::config::{ConfigError, DeviceConfig};
use crate::device::SortDevice;
use crate::error::DeviceError;
use crate::notifier::{AsyncNotifier, NotificationQueue};
use crate::session::{AccessMode, Session};

pub struct SortDeviceSet {
    devices: Vec<SortDevice>,
    config: DeviceConfig,
}

impl SortDeviceSet {
    /// Create `config.nr_devs` devices, each with its own notification queue.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` does not validate.
    pub fn init(config: DeviceConfig) -> Result<Self, ConfigError> {
        Self::init_with(config, |_| Arc::new(NotificationQueue::new()))
    }

    /// Like [`SortDeviceSet::init`], asking `make_notifier` for each device's
    /// notifier by index.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` does not validate.
    pub fn init_with<F>(config: DeviceConfig, mut make_notifier: F) -> Result<Self, ConfigError>
    where
        F: FnMut(usize) -> Arc<dyn AsyncNotifier>,
    {
        config.validate()?;
        let devices = (0..config.nr_devs)
            .map(|index| SortDevice::create(index, config.buffer_size, make_notifier(index)))
            .collect();
        log::debug!(
            "sortdev: initialised {} device(s) of {} bytes",
            config.nr_devs,
            config.buffer_size
        );
        Ok(Self { devices, config })
    }

    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// # Errors
    ///
    /// `NoDevice` if `index` is out of range.
    pub fn device(&self, index: usize) -> Result<&SortDevice, DeviceError> {
        self.devices.get(index).ok_or(DeviceError::NoDevice)
    }

    /// Open a session on device `index`.
    ///
    /// # Errors
    ///
    /// `NoDevice` for a bad index, otherwise see [`SortDevice::open`].
    pub fn open(
        &self,
        index: usize,
        mode: AccessMode,
        blocking: bool,
    ) -> Result<Session, DeviceError> {
        self.device(index)?.open(mode, blocking)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SortDevice> {
        self.devices.iter()
    }

    /// Tear down every device in the set. Never fails.
    pub fn cleanup(self) {
        for device in &self.devices {
            let status = device.status();
            if status.readers > 0 || status.writers > 0 {
                log::debug!(
                    "sortdev{}: torn down with {} reader(s), {} writer(s) still open",
                    device.index(),
                    status.readers,
                    status.writers
                );
            }
        }
        log::debug!("sortdev: removed {} device(s)", self.devices.len());
    }
}

impl std::fmt::Debug for SortDeviceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SortDeviceSet")
            .field("config", &self.config)
            .field("devices", &self.devices)
            .finish()
    }
}
