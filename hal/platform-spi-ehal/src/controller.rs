//! Controller abstraction
//!
//! One [`SpiController`] per physical SPI peripheral. It hands out the
//! embedded-hal bus driver for the configured signal pins and the
//! chip-select outputs, and takes them back on release.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{self, SpiBus};
use platform_spi_hal::{BusConfig, DriverError, Mode, Phase, Polarity};

/// Translate a platform mode into the embedded-hal one
///
/// For [`Reconfigure`] implementations handing the mode to a chip HAL.
pub const fn ehal_mode(mode: Mode) -> spi::Mode {
    spi::Mode {
        polarity: match mode.polarity() {
            Polarity::IdleLow => spi::Polarity::IdleLow,
            Polarity::IdleHigh => spi::Polarity::IdleHigh,
        },
        phase: match mode.phase() {
            Phase::CaptureOnFirstTransition => spi::Phase::CaptureOnFirstTransition,
            Phase::CaptureOnSecondTransition => spi::Phase::CaptureOnSecondTransition,
        },
    }
}

/// Runtime clock/mode reconfiguration of a bus driver
///
/// embedded-hal 1.0 leaves this out of `SpiBus`; chip HALs expose it under
/// their own names (`set_config`, `set_frequency`, ...).
pub trait Reconfigure {
    /// Apply clock frequency and mode for the next exchange
    fn reconfigure(&mut self, clock_frequency_hz: u32, mode: Mode) -> Result<(), DriverError>;
}

/// One SPI peripheral instance
pub trait SpiController {
    /// Bus driver for the MOSI/MISO/SCLK lines
    type Bus: SpiBus<u8> + Reconfigure;

    /// Chip-select output, active low
    type ChipSelect: OutputPin;

    /// Fastest clock the controller can generate
    fn max_frequency_hz(&self) -> u32;

    /// Bring the peripheral up on the configured signal pins
    fn open(&mut self, config: &BusConfig) -> Result<Self::Bus, DriverError>;

    /// Shut the peripheral down and take the bus driver back
    fn close(&mut self, bus: Self::Bus);

    /// Take the output for a chip-select pin
    fn chip_select(&mut self, pin: u8) -> Result<Self::ChipSelect, DriverError>;

    /// Give a chip-select output back
    fn release_chip_select(&mut self, pin: u8, cs: Self::ChipSelect);
}
