//! Error types
//!
//! Every operation returns a recoverable error. Backends report
//! [`DriverError`]; the lifecycle core wraps it in the error of the
//! operation that failed, so callers can tell a bus that would not come up
//! from a device that could not be attached or a transfer that failed.

use core::fmt;

/// Errors reported by a backend's underlying driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// Pin cannot serve the requested function on this controller
    InvalidPin,
    /// Clock rate outside the controller's range
    UnsupportedFrequency,
    /// Mode not supported by the controller
    UnsupportedMode,
    /// Resource exhaustion while allocating bus or device state
    NoMemory,
    /// Bus fault during an exchange
    Bus,
    /// Chip-select line could not be driven
    ChipSelect,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            DriverError::InvalidPin => "pin not usable for this function",
            DriverError::UnsupportedFrequency => "unsupported clock frequency",
            DriverError::UnsupportedMode => "unsupported SPI mode",
            DriverError::NoMemory => "out of memory",
            DriverError::Bus => "bus fault",
            DriverError::ChipSelect => "chip-select fault",
        };
        f.write_str(msg)
    }
}

/// Bus initialization failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusInitError {
    /// Host id is not below the backend's host count
    InvalidHost,
    /// Two of MOSI/MISO/SCLK share a pin
    DuplicatePin,
    /// Host already has a live bus
    HostInUse,
    /// A signal pin is claimed by another bus or device
    PinInUse,
    /// Platform state was borrowed by a re-entrant call
    Busy,
    /// Backend rejected the configuration
    Driver(DriverError),
}

/// Device attachment failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttachError {
    /// Clock frequency is zero
    InvalidFrequency,
    /// Chip-select pin is claimed by another bus or device
    PinInUse,
    /// Platform state was borrowed, or a transfer holds the bus
    Busy,
    /// Backend rejected the configuration
    Driver(DriverError),
}

/// Transfer failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError {
    /// Receive buffer shorter than the send buffer
    BufferTooSmall,
    /// Transfer exceeds the bus's maximum transfer size
    TooLarge,
    /// Device or bus already has a transfer in flight
    Busy,
    /// Backend reported a failure during the exchange
    Driver(DriverError),
}

/// Any SPI failure, tagged by the operation that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiError {
    /// Bus initialization failed
    BusInit(BusInitError),
    /// Device attachment failed
    Attach(AttachError),
    /// Transfer failed
    Transfer(TransferError),
}

impl From<BusInitError> for SpiError {
    fn from(e: BusInitError) -> Self {
        SpiError::BusInit(e)
    }
}

impl From<AttachError> for SpiError {
    fn from(e: AttachError) -> Self {
        SpiError::Attach(e)
    }
}

impl From<TransferError> for SpiError {
    fn from(e: TransferError) -> Self {
        SpiError::Transfer(e)
    }
}

impl fmt::Display for SpiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpiError::BusInit(BusInitError::Driver(e)) => write!(f, "bus init failed: {}", e),
            SpiError::BusInit(e) => write!(f, "bus init failed: {:?}", e),
            SpiError::Attach(AttachError::Driver(e)) => write!(f, "device attach failed: {}", e),
            SpiError::Attach(e) => write!(f, "device attach failed: {:?}", e),
            SpiError::Transfer(TransferError::Driver(e)) => write!(f, "transfer failed: {}", e),
            SpiError::Transfer(e) => write!(f, "transfer failed: {:?}", e),
        }
    }
}
