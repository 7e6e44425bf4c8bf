//! Backend contract
//!
//! A backend is the thin layer between the lifecycle core and a vendor
//! driver. The core validates arguments, tracks claims, serializes access
//! and logs; a backend only has to talk to the hardware.
//!
//! Exactly one backend is linked per build, so everything here is static
//! dispatch.

use crate::config::{BusConfig, DeviceConfig};
use crate::error::DriverError;

/// SPI backend
///
/// Implementations must be safe to call in the order the core guarantees:
/// `init_bus` before any `add_device` on that bus, `transmit` only on a
/// device added to the same bus, `remove_device` for every added device
/// before `free_bus`.
pub trait SpiBackend {
    /// Backend-private state of one initialized bus
    type Bus;

    /// Backend-private state of one attached device
    type Device;

    /// Number of physical SPI controllers this backend exposes
    fn host_count(&self) -> u8;

    /// Bring up the controller selected by `config.host_id`
    ///
    /// The core has already checked the host range, pin distinctness and
    /// that no live bus holds the host or any of the pins.
    fn init_bus(&mut self, config: &BusConfig) -> Result<Self::Bus, DriverError>;

    /// Register a chip-select-addressed peripheral on `bus`
    ///
    /// `config.clock_frequency_hz` is non-zero; the upper bound is the
    /// backend's to enforce.
    fn add_device(
        &mut self,
        bus: &mut Self::Bus,
        config: &DeviceConfig,
    ) -> Result<Self::Device, DriverError>;

    /// Exchange `tx.len()` bytes with one device, blocking until done
    ///
    /// Chip-select must be asserted for the whole exchange. When `rx` is
    /// present it has exactly `tx.len()` bytes and receives the response;
    /// otherwise the response is discarded. `tx` is never empty.
    fn transmit(
        bus: &mut Self::Bus,
        device: &mut Self::Device,
        tx: &[u8],
        rx: Option<&mut [u8]>,
    ) -> Result<(), DriverError>;

    /// Detach a device and give its chip-select back to the driver
    fn remove_device(&mut self, bus: &mut Self::Bus, device: Self::Device);

    /// Shut a bus down and give the controller back to the driver
    fn free_bus(&mut self, bus: Self::Bus);
}
