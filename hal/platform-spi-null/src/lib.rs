//! No-op SPI backend
//!
//! Reports zero controllers, so every bus initialization fails with
//! `InvalidHost` and no device or transfer can ever be reached. Link this
//! backend for host builds of firmware that has no SPI hardware to talk to.
//!
//! Bus and device state are uninhabited types: the compiler proves the
//! transfer path is dead code.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

use core::convert::Infallible;

use platform_spi_hal::{BusConfig, DeviceConfig, DriverError, SpiBackend};

/// Backend with no SPI hardware
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

impl NullBackend {
    /// Create the backend
    pub const fn new() -> Self {
        Self
    }
}

impl SpiBackend for NullBackend {
    type Bus = Infallible;
    type Device = Infallible;

    fn host_count(&self) -> u8 {
        0
    }

    fn init_bus(&mut self, _config: &BusConfig) -> Result<Infallible, DriverError> {
        Err(DriverError::NoMemory)
    }

    fn add_device(
        &mut self,
        bus: &mut Infallible,
        _config: &DeviceConfig,
    ) -> Result<Infallible, DriverError> {
        match *bus {}
    }

    fn transmit(
        bus: &mut Infallible,
        _device: &mut Infallible,
        _tx: &[u8],
        _rx: Option<&mut [u8]>,
    ) -> Result<(), DriverError> {
        match *bus {}
    }

    fn remove_device(&mut self, bus: &mut Infallible, _device: Infallible) {
        match *bus {}
    }

    fn free_bus(&mut self, bus: Infallible) {
        match bus {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use platform_spi_hal::{BusInitError, SpiPlatform};
    use proptest::prelude::*;

    #[test]
    fn test_no_hosts() {
        let platform: SpiPlatform<NoopRawMutex, _> = SpiPlatform::new(NullBackend::new());
        assert_eq!(platform.host_count(), 0);
    }

    #[test]
    fn test_backend_init_is_absent() {
        let mut backend = NullBackend;
        assert_eq!(
            backend.init_bus(&BusConfig::new(0, 1, 2, 3)).err(),
            Some(DriverError::NoMemory)
        );
    }

    proptest! {
        #[test]
        fn prop_every_bus_fails(host_id in any::<u8>(), base in 0u8..250) {
            let platform: SpiPlatform<NoopRawMutex, _> = SpiPlatform::new(NullBackend::new());
            let config = BusConfig::new(host_id, base, base + 1, base + 2);
            prop_assert!(matches!(
                platform.initialize(config),
                Err(BusInitError::InvalidHost)
            ));
            prop_assert!(!platform.is_host_claimed(host_id));
        }
    }
}
