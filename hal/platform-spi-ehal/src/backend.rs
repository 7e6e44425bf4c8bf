//! [`SpiBackend`] over embedded-hal controllers
//!
//! Each host id indexes one [`SpiController`]. A device owns its
//! chip-select output; the bus driver is shared by every device on the host
//! and reconfigured only when the device being addressed changes clock or
//! mode.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{self, ErrorKind, SpiBus};
use platform_spi_hal::{BusConfig, DeviceConfig, DriverError, Mode, SpiBackend};

use crate::controller::{Reconfigure, SpiController};

/// Bus state for one open controller
pub struct EhalBus<C: SpiController> {
    host: u8,
    bus: C::Bus,
    active: Option<(u32, Mode)>,
}

impl<C: SpiController> EhalBus<C> {
    /// Host the bus runs on
    pub fn host(&self) -> u8 {
        self.host
    }

    /// Clock and mode the driver was last configured for
    pub fn active(&self) -> Option<(u32, Mode)> {
        self.active
    }
}

/// Device state: the chip-select output and its timing
pub struct EhalDevice<C: SpiController> {
    pin: u8,
    cs: C::ChipSelect,
    clock_frequency_hz: u32,
    mode: Mode,
}

impl<C: SpiController> EhalDevice<C> {
    /// Chip-select pin number
    pub fn pin(&self) -> u8 {
        self.pin
    }
}

/// Backend driving `N` embedded-hal SPI controllers
pub struct EhalBackend<C: SpiController, const N: usize> {
    controllers: [C; N],
}

impl<C: SpiController, const N: usize> EhalBackend<C, N> {
    /// Wrap the controllers, host id `i` maps to `controllers[i]`
    pub fn new(controllers: [C; N]) -> Self {
        Self { controllers }
    }

    /// Access a controller
    pub fn controller(&self, host: u8) -> Option<&C> {
        self.controllers.get(usize::from(host))
    }

    // The platform rejects hosts >= host_count() before calling in, so a
    // miss here means the backend was driven directly.
    fn controller_mut(&mut self, host: u8) -> Result<&mut C, DriverError> {
        self.controllers
            .get_mut(usize::from(host))
            .ok_or(DriverError::NoMemory)
    }
}

fn bus_error<E: spi::Error>(err: E) -> DriverError {
    match err.kind() {
        ErrorKind::ChipSelectFault => DriverError::ChipSelect,
        _ => DriverError::Bus,
    }
}

fn exchange<B: SpiBus<u8>>(bus: &mut B, tx: &[u8], rx: Option<&mut [u8]>) -> Result<(), B::Error> {
    match rx {
        Some(rx) => bus.transfer(rx, tx)?,
        None => bus.write(tx)?,
    }
    bus.flush()
}

impl<C: SpiController, const N: usize> SpiBackend for EhalBackend<C, N> {
    type Bus = EhalBus<C>;
    type Device = EhalDevice<C>;

    fn host_count(&self) -> u8 {
        u8::try_from(N).unwrap_or(u8::MAX)
    }

    fn init_bus(&mut self, config: &BusConfig) -> Result<EhalBus<C>, DriverError> {
        let bus = self.controller_mut(config.host_id)?.open(config)?;
        Ok(EhalBus {
            host: config.host_id,
            bus,
            active: None,
        })
    }

    fn add_device(
        &mut self,
        bus: &mut EhalBus<C>,
        config: &DeviceConfig,
    ) -> Result<EhalDevice<C>, DriverError> {
        let controller = self.controller_mut(bus.host)?;
        if config.clock_frequency_hz > controller.max_frequency_hz() {
            return Err(DriverError::UnsupportedFrequency);
        }

        let mut cs = controller.chip_select(config.chip_select_pin)?;
        if cs.set_high().is_err() {
            controller.release_chip_select(config.chip_select_pin, cs);
            return Err(DriverError::ChipSelect);
        }

        Ok(EhalDevice {
            pin: config.chip_select_pin,
            cs,
            clock_frequency_hz: config.clock_frequency_hz,
            mode: config.mode,
        })
    }

    fn transmit(
        bus: &mut EhalBus<C>,
        device: &mut EhalDevice<C>,
        tx: &[u8],
        rx: Option<&mut [u8]>,
    ) -> Result<(), DriverError> {
        let wanted = (device.clock_frequency_hz, device.mode);
        if bus.active != Some(wanted) {
            bus.active = None;
            bus.bus.reconfigure(wanted.0, wanted.1)?;
            bus.active = Some(wanted);
        }

        device.cs.set_low().map_err(|_| DriverError::ChipSelect)?;
        let result = exchange(&mut bus.bus, tx, rx).map_err(bus_error);
        let deassert = device.cs.set_high().map_err(|_| DriverError::ChipSelect);
        result?;
        deassert
    }

    fn remove_device(&mut self, bus: &mut EhalBus<C>, mut device: EhalDevice<C>) {
        if device.cs.set_high().is_err() {
            warn!("[NCSS:{}] Chip select stuck on release", device.pin);
        }
        match self.controller_mut(bus.host) {
            Ok(controller) => controller.release_chip_select(device.pin, device.cs),
            Err(_) => warn!("No controller for host {}", bus.host),
        }
    }

    fn free_bus(&mut self, bus: EhalBus<C>) {
        let host = bus.host;
        match self.controller_mut(host) {
            Ok(controller) => {
                controller.close(bus.bus);
                debug!("Closed SPI controller {}", host);
            }
            Err(_) => warn!("No controller for host {}", host),
        }
    }
}
