//! Controller with board-fixed wiring
//!
//! Most boards route one SPI peripheral to a known set of pins, with a few
//! GPIOs set aside as chip selects. [`FixedController`] holds the
//! already-constructed chip-HAL driver and outputs and lends them out by pin
//! number, so runtime configuration only has to name the pins.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;
use heapless::Vec;
use platform_spi_hal::{BusConfig, DriverError};

use crate::controller::{Reconfigure, SpiController};

struct ChipSelectSlot<CS> {
    pin: u8,
    output: Option<CS>,
}

/// One SPI peripheral wired to fixed pins with up to `K` chip selects
pub struct FixedController<B, CS, const K: usize> {
    mosi_pin: u8,
    miso_pin: u8,
    sclk_pin: u8,
    max_frequency_hz: u32,
    bus: Option<B>,
    chip_selects: Vec<ChipSelectSlot<CS>, K>,
}

impl<B, CS, const K: usize> FixedController<B, CS, K>
where
    B: SpiBus<u8> + Reconfigure,
    CS: OutputPin,
{
    /// Wrap a bus driver routed to `mosi`/`miso`/`sclk`
    pub fn new(bus: B, mosi_pin: u8, miso_pin: u8, sclk_pin: u8, max_frequency_hz: u32) -> Self {
        Self {
            mosi_pin,
            miso_pin,
            sclk_pin,
            max_frequency_hz,
            bus: Some(bus),
            chip_selects: Vec::new(),
        }
    }

    /// Register a chip-select output
    ///
    /// Hands the output back if all `K` slots are taken or the pin is
    /// already registered.
    pub fn with_chip_select(mut self, pin: u8, output: CS) -> Result<Self, CS> {
        if self.chip_selects.iter().any(|slot| slot.pin == pin) {
            return Err(output);
        }
        let slot = ChipSelectSlot {
            pin,
            output: Some(output),
        };
        match self.chip_selects.push(slot) {
            Ok(()) => Ok(self),
            Err(slot) => match slot.output {
                Some(output) => Err(output),
                None => Ok(self),
            },
        }
    }

    /// Check if the bus driver is lent out
    pub fn is_open(&self) -> bool {
        self.bus.is_none()
    }

    /// Check if a chip-select output is lent out
    pub fn is_chip_select_taken(&self, pin: u8) -> bool {
        self.chip_selects
            .iter()
            .any(|slot| slot.pin == pin && slot.output.is_none())
    }

    fn slot_mut(&mut self, pin: u8) -> Option<&mut ChipSelectSlot<CS>> {
        self.chip_selects.iter_mut().find(|slot| slot.pin == pin)
    }
}

impl<B, CS, const K: usize> SpiController for FixedController<B, CS, K>
where
    B: SpiBus<u8> + Reconfigure,
    CS: OutputPin,
{
    type Bus = B;
    type ChipSelect = CS;

    fn max_frequency_hz(&self) -> u32 {
        self.max_frequency_hz
    }

    fn open(&mut self, config: &BusConfig) -> Result<B, DriverError> {
        let wired = [self.mosi_pin, self.miso_pin, self.sclk_pin];
        if config.pins() != wired {
            return Err(DriverError::InvalidPin);
        }
        self.bus.take().ok_or(DriverError::NoMemory)
    }

    fn close(&mut self, bus: B) {
        self.bus = Some(bus);
    }

    fn chip_select(&mut self, pin: u8) -> Result<CS, DriverError> {
        self.slot_mut(pin)
            .and_then(|slot| slot.output.take())
            .ok_or(DriverError::InvalidPin)
    }

    fn release_chip_select(&mut self, pin: u8, cs: CS) {
        if let Some(slot) = self.slot_mut(pin) {
            slot.output = Some(cs);
        }
    }
}
