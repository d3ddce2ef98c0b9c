// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use crate::config::Config;
use crate::device::Device;
use crate::driver::{Driver, DriverError};
use crate::{DeviceId, Error};

/// Every card found by the driver, keyed by serial number.
///
/// Cards are enumerated on first use and then never again for the lifetime
/// of the registry. A card that fails to attach is logged and left out; the
/// remaining cards are still registered. If the enumeration call itself
/// fails nothing is recorded and the next lookup tries again. The failure is
/// logged once; lookups that retry and fail again stay quiet.
pub struct DeviceRegistry {
    driver: Arc<dyn Driver>,
    config: Config,
    devices: OnceLock<BTreeMap<String, Device>>,
    init_lock: Mutex<()>,
    failure_logged: AtomicBool,
}

impl DeviceRegistry {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self::with_config(driver, Config::default())
    }

    pub fn with_config(driver: Arc<dyn Driver>, config: Config) -> Self {
        DeviceRegistry {
            driver,
            config,
            devices: OnceLock::new(),
            init_lock: Mutex::new(()),
            failure_logged: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Enumerate and attach all cards, returning how many were registered.
    ///
    /// Safe to call repeatedly and from several threads; only the first
    /// successful call touches the hardware.
    pub fn enumerate(&self) -> Result<usize, Error> {
        if let Some(devices) = self.devices.get() {
            return Ok(devices.len());
        }

        let _guard = self
            .init_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(devices) = self.devices.get() {
            return Ok(devices.len());
        }

        let devices = match self.attach_all() {
            Ok(devices) => devices,
            Err(err) => {
                if !self.failure_logged.swap(true, Ordering::Relaxed) {
                    log::error!("Device enumeration failed: {}", err);
                }
                return Err(err);
            }
        };
        self.failure_logged.store(false, Ordering::Relaxed);

        Ok(self.devices.get_or_init(|| devices).len())
    }

    fn attach_all(&self) -> Result<BTreeMap<String, Device>, Error> {
        let count = self.driver.enumerate()?;
        log::debug!("Driver reports {} device(s)", count);
        let count = DeviceId::try_from(count).map_err(|_| {
            log::debug!("Device count {} exceeds the id range", count);
            Error::Driver(DriverError::INVALID_DATA)
        })?;

        let mut devices = BTreeMap::new();
        for id in 1..=count {
            let device = match Device::attach(self.driver.clone(), id, self.config) {
                Ok(device) => device,
                Err(err) => {
                    log::error!("Error during device initialization: {}", err);
                    continue;
                }
            };
            log::info!("Found {} as device {}", device, id);
            if let Some(old) = devices.insert(device.serial().to_owned(), device) {
                log::warn!("Duplicate serial {}, replacing device {}", old.serial(), old.id());
            }
        }
        Ok(devices)
    }

    fn devices(&self) -> Option<&BTreeMap<String, Device>> {
        self.enumerate().ok()?;
        self.devices.get()
    }

    /// Look a card up by serial number.
    pub fn get(&self, serial: &str) -> Option<&Device> {
        self.devices()?.get(serial)
    }

    /// Look a card up by the driver's numeric id.
    pub fn get_by_id(&self, id: DeviceId) -> Option<&Device> {
        self.iter().find(|d| d.id() == id)
    }

    pub fn device(&self, serial: &str) -> Result<&Device, Error> {
        self.get(serial)
            .ok_or_else(|| Error::DeviceNotFound(serial.to_owned()))
    }

    pub fn device_by_id(&self, id: DeviceId) -> Result<&Device, Error> {
        self.get_by_id(id)
            .ok_or_else(|| Error::DeviceNotFound(id.to_string()))
    }

    /// Registered cards in serial number order.
    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices().into_iter().flat_map(|d| d.values())
    }

    pub fn for_each<F: FnMut(&Device)>(&self, f: F) {
        self.iter().for_each(f)
    }

    pub fn len(&self) -> usize {
        self.devices().map_or(0, |d| d.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCard, MockDriver};
    use std::cell::Cell;

    thread_local! {
        static ERRORS: Cell<usize> = const { Cell::new(0) };
    }

    /// Counts error records from this module on the logging thread.
    struct ErrorCounter;

    impl log::Log for ErrorCounter {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() == log::Level::Error
        }

        fn log(&self, record: &log::Record) {
            if record.level() == log::Level::Error && record.target() == "videoio::registry" {
                ERRORS.with(|n| n.set(n.get() + 1));
            }
        }

        fn flush(&self) {}
    }

    static COUNTER: ErrorCounter = ErrorCounter;

    fn logged_errors() -> usize {
        if log::set_logger(&COUNTER).is_ok() {
            log::set_max_level(log::LevelFilter::Error);
        }
        ERRORS.with(Cell::get)
    }

    fn two_cards() -> Arc<MockDriver> {
        Arc::new(
            MockDriver::new()
                .with_card(MockCard::new("SN200", "Card B"))
                .with_card(MockCard::new("SN100", "Card A")),
        )
    }

    #[test]
    fn test_lazy_enumeration() {
        let mock = two_cards();
        let registry = DeviceRegistry::new(mock.clone());
        assert_eq!(mock.open_sessions(), 0);

        assert_eq!(registry.get("SN100").map(|d| d.id()), Some(2));
        assert_eq!(mock.open_sessions(), 2);
        assert_eq!(registry.enumerate().unwrap(), 2);
        assert_eq!(mock.open_sessions(), 2);
    }

    #[test]
    fn test_lookup() {
        let registry = DeviceRegistry::new(two_cards());
        assert_eq!(registry.get_by_id(1).map(|d| d.serial()), Some("SN200"));
        assert!(registry.get("SN999").is_none());
        assert!(registry.get_by_id(0).is_none());
        assert!(matches!(registry.device("SN999"), Err(Error::DeviceNotFound(_))));

        let serials: Vec<&str> = registry.iter().map(|d| d.serial()).collect();
        assert_eq!(serials, vec!["SN100", "SN200"]);
    }

    #[test]
    fn test_attach_failure_skips_card() {
        let mock = Arc::new(
            MockDriver::new()
                .with_card(MockCard::new("SN1", "Good"))
                .with_card(MockCard::new("SN2", "Bad").failing_attach())
                .with_card(MockCard::new("SN3", "Good")),
        );
        let registry = DeviceRegistry::new(mock);
        assert_eq!(registry.enumerate().unwrap(), 2);
        assert!(registry.get("SN2").is_none());
        assert_eq!(registry.get("SN3").map(|d| d.id()), Some(3));
    }

    #[test]
    fn test_enumeration_failure_is_retried() {
        let mock = two_cards();
        mock.fail_enumerate(true);
        let registry = DeviceRegistry::new(mock.clone());
        assert!(registry.enumerate().is_err());
        assert!(registry.is_empty());

        mock.fail_enumerate(false);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_enumeration_failure_logged_once() {
        let mock = two_cards();
        mock.fail_enumerate(true);
        let registry = DeviceRegistry::new(mock.clone());

        let before = logged_errors();
        assert!(registry.enumerate().is_err());
        for _ in 0..5 {
            assert!(registry.get("SN100").is_none());
            assert!(registry.get_by_id(1).is_none());
            assert_eq!(registry.len(), 0);
        }
        assert_eq!(logged_errors() - before, 1);

        mock.fail_enumerate(false);
        assert_eq!(registry.len(), 2);
        assert_eq!(logged_errors() - before, 1);
    }

    #[test]
    fn test_device_count_outside_id_range() {
        let mock = Arc::new(
            MockDriver::new()
                .with_card(MockCard::new("SN1", "Sim"))
                .with_reported_count(u32::MAX),
        );
        let registry = DeviceRegistry::new(mock.clone());
        assert!(matches!(
            registry.enumerate(),
            Err(Error::Driver(DriverError::INVALID_DATA))
        ));
        assert_eq!(mock.open_sessions(), 0);
    }

    #[test]
    fn test_for_each() {
        let registry = DeviceRegistry::new(two_cards());
        let mut ids = Vec::new();
        registry.for_each(|d| ids.push(d.id()));
        assert_eq!(ids, vec![2, 1]);
    }
}
