//! SPI bus and device configuration
//!
//! Caller-supplied, immutable descriptions of a bus (host + signal lines)
//! and of a peripheral on that bus (clock, mode, chip-select).

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::BusInitError;

/// Bus configuration
///
/// Selects a physical controller and the three shared signal lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusConfig {
    /// Controller index, must be below the backend's host count
    pub host_id: u8,
    /// Data out (controller to peripheral)
    pub mosi_pin: u8,
    /// Data in (peripheral to controller)
    pub miso_pin: u8,
    /// Clock
    pub sclk_pin: u8,
    /// Largest single transfer in bytes (None = unlimited)
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_transfer_size: Option<usize>,
}

impl BusConfig {
    /// Create a new bus config with no transfer size cap
    pub const fn new(host_id: u8, mosi_pin: u8, miso_pin: u8, sclk_pin: u8) -> Self {
        Self {
            host_id,
            mosi_pin,
            miso_pin,
            sclk_pin,
            max_transfer_size: None,
        }
    }

    /// Cap the size of a single transfer on this bus
    pub const fn with_max_transfer_size(mut self, bytes: usize) -> Self {
        self.max_transfer_size = Some(bytes);
        self
    }

    /// Signal lines in (MOSI, MISO, SCLK) order
    pub const fn pins(&self) -> [u8; 3] {
        [self.mosi_pin, self.miso_pin, self.sclk_pin]
    }

    /// Check the pin assignment is self-consistent
    ///
    /// The host range is checked against the backend at initialization.
    pub fn validate(&self) -> Result<(), BusInitError> {
        if self.mosi_pin == self.miso_pin
            || self.mosi_pin == self.sclk_pin
            || self.miso_pin == self.sclk_pin
        {
            return Err(BusInitError::DuplicatePin);
        }
        Ok(())
    }
}

/// Device configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceConfig {
    /// Clock frequency in Hz
    pub clock_frequency_hz: u32,
    /// Clock polarity/phase combination
    pub mode: Mode,
    /// Chip-select (NCSS) pin, active low
    pub chip_select_pin: u8,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            clock_frequency_hz: 1_000_000, // 1 MHz
            mode: Mode::Mode0,
            chip_select_pin: 0,
        }
    }
}

impl DeviceConfig {
    /// Create a new device config
    pub const fn new(chip_select_pin: u8, clock_frequency_hz: u32, mode: Mode) -> Self {
        Self {
            clock_frequency_hz,
            mode,
            chip_select_pin,
        }
    }

    /// Same device with a different clock
    pub const fn with_frequency(mut self, clock_frequency_hz: u32) -> Self {
        self.clock_frequency_hz = clock_frequency_hz;
        self
    }

    /// Same device with a different mode
    pub const fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
}

/// SPI clock polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Clock idles low (CPOL=0)
    IdleLow,
    /// Clock idles high (CPOL=1)
    IdleHigh,
}

/// SPI clock phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Data captured on first clock transition (CPHA=0)
    CaptureOnFirstTransition,
    /// Data captured on second clock transition (CPHA=1)
    CaptureOnSecondTransition,
}

/// SPI mode (combined polarity and phase)
///
/// Serialized as its mode number (0-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
#[repr(u8)]
pub enum Mode {
    /// Mode 0: CPOL=0, CPHA=0
    #[default]
    Mode0 = 0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1 = 1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2 = 2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3 = 3,
}

impl Mode {
    /// Build a mode from its polarity and phase
    pub const fn new(polarity: Polarity, phase: Phase) -> Self {
        match (polarity, phase) {
            (Polarity::IdleLow, Phase::CaptureOnFirstTransition) => Mode::Mode0,
            (Polarity::IdleLow, Phase::CaptureOnSecondTransition) => Mode::Mode1,
            (Polarity::IdleHigh, Phase::CaptureOnFirstTransition) => Mode::Mode2,
            (Polarity::IdleHigh, Phase::CaptureOnSecondTransition) => Mode::Mode3,
        }
    }

    /// Clock polarity (CPOL)
    pub const fn polarity(self) -> Polarity {
        match self {
            Mode::Mode0 | Mode::Mode1 => Polarity::IdleLow,
            Mode::Mode2 | Mode::Mode3 => Polarity::IdleHigh,
        }
    }

    /// Clock phase (CPHA)
    pub const fn phase(self) -> Phase {
        match self {
            Mode::Mode0 | Mode::Mode2 => Phase::CaptureOnFirstTransition,
            Mode::Mode1 | Mode::Mode3 => Phase::CaptureOnSecondTransition,
        }
    }

    /// Mode number (0-3)
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<Mode> for (Polarity, Phase) {
    fn from(mode: Mode) -> Self {
        (mode.polarity(), mode.phase())
    }
}

impl From<(Polarity, Phase)> for Mode {
    fn from((polarity, phase): (Polarity, Phase)) -> Self {
        Mode::new(polarity, phase)
    }
}

impl From<Mode> for u8 {
    fn from(mode: Mode) -> Self {
        mode.as_u8()
    }
}

/// Mode number outside 0-3
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidMode(pub u8);

impl fmt::Display for InvalidMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid SPI mode {} (expected 0-3)", self.0)
    }
}

impl TryFrom<u8> for Mode {
    type Error = InvalidMode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Mode::Mode0),
            1 => Ok(Mode::Mode1),
            2 => Ok(Mode::Mode2),
            3 => Ok(Mode::Mode3),
            other => Err(InvalidMode(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_polarity_phase() {
        assert_eq!(
            <(Polarity, Phase)>::from(Mode::Mode0),
            (Polarity::IdleLow, Phase::CaptureOnFirstTransition)
        );
        assert_eq!(
            <(Polarity, Phase)>::from(Mode::Mode1),
            (Polarity::IdleLow, Phase::CaptureOnSecondTransition)
        );
        assert_eq!(
            <(Polarity, Phase)>::from(Mode::Mode2),
            (Polarity::IdleHigh, Phase::CaptureOnFirstTransition)
        );
        assert_eq!(
            <(Polarity, Phase)>::from(Mode::Mode3),
            (Polarity::IdleHigh, Phase::CaptureOnSecondTransition)
        );
    }

    #[test]
    fn test_mode_numbers() {
        for n in 0..4u8 {
            let mode = Mode::try_from(n).unwrap();
            assert_eq!(mode.as_u8(), n);
            assert_eq!(Mode::from((mode.polarity(), mode.phase())), mode);
        }
        assert_eq!(Mode::try_from(4), Err(InvalidMode(4)));
    }

    #[test]
    fn test_bus_config_rejects_shared_pins() {
        assert!(BusConfig::new(0, 23, 19, 18).validate().is_ok());
        assert_eq!(
            BusConfig::new(0, 23, 23, 18).validate(),
            Err(BusInitError::DuplicatePin)
        );
        assert_eq!(
            BusConfig::new(0, 23, 19, 23).validate(),
            Err(BusInitError::DuplicatePin)
        );
        assert_eq!(
            BusConfig::new(0, 23, 18, 18).validate(),
            Err(BusInitError::DuplicatePin)
        );
    }

    #[test]
    fn test_device_config_builders() {
        let dev = DeviceConfig::new(5, 8_000_000, Mode::Mode0)
            .with_mode(Mode::Mode3)
            .with_frequency(4_000_000);
        assert_eq!(dev.chip_select_pin, 5);
        assert_eq!(dev.clock_frequency_hz, 4_000_000);
        assert_eq!(dev.mode, Mode::Mode3);
    }
}
