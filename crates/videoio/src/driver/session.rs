// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use std::sync::Arc;

use super::{DeviceInfo, Driver, SessionHandle};
use crate::channel_id::Direction;
use crate::setup::SetupDescriptor;
use crate::{DeviceId, Error};

/// One attach of a card, detached when dropped.
///
/// Devices hold a session for card-wide queries; every open channel holds
/// its own so that DMA and sync waits of different channels never share a
/// handle.
pub struct DriverSession {
    driver: Arc<dyn Driver>,
    device_id: DeviceId,
    handle: SessionHandle,
    detached: bool,
}

impl DriverSession {
    /// Attach to card `device_id`.
    pub fn attach(driver: Arc<dyn Driver>, device_id: DeviceId) -> Result<Self, Error> {
        let handle = driver
            .attach(device_id)
            .map_err(|source| Error::AttachFailed { device_id, source })?;
        log::trace!("Attached to device {} ({:?})", device_id, handle);

        Ok(DriverSession {
            driver,
            device_id,
            handle,
            detached: false,
        })
    }

    /// Detach explicitly, reporting a failure instead of only logging it.
    pub fn detach(mut self) -> Result<(), Error> {
        self.detached = true;
        self.driver
            .detach(self.handle)
            .map_err(|source| Error::DetachFailed {
                device_id: self.device_id,
                source,
            })
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub fn device_info(&self) -> Result<DeviceInfo, Error> {
        Ok(self.driver.device_info(self.handle)?)
    }

    pub(crate) fn detect_input_setup(
        &self,
        setup: &mut SetupDescriptor,
    ) -> Result<(), super::DriverError> {
        self.driver.detect_input_setup(self.handle, setup)
    }

    pub(crate) fn recommended_input_setup(
        &self,
        setup: &mut SetupDescriptor,
    ) -> Result<(), super::DriverError> {
        self.driver.recommended_input_setup(self.handle, setup)
    }

    pub(crate) fn apply_setup(
        &self,
        direction: Direction,
        setup: &SetupDescriptor,
    ) -> Result<(), super::DriverError> {
        match direction {
            Direction::Input => self.driver.apply_input_setup(self.handle, setup),
            Direction::Output => self.driver.apply_output_setup(self.handle, setup),
        }
    }

    pub(crate) fn capture_latency_fields(&self) -> u32 {
        self.driver.capture_latency_fields(self.handle)
    }
}

impl Drop for DriverSession {
    fn drop(&mut self) {
        if self.detached {
            return;
        }
        if let Err(err) = self.driver.detach(self.handle) {
            log::error!("Error during detach of device {}: {}", self.device_id, err);
        }
    }
}
