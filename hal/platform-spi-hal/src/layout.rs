//! Board SPI layout
//!
//! Names every bus and device on a board so firmware can look up
//! configurations instead of hardcoding pin numbers. With the `serde`
//! feature a layout can be read from TOML:
//!
//! ```toml
//! [[bus]]
//! name = "main"
//! host_id = 1
//! mosi_pin = 23
//! miso_pin = 19
//! sclk_pin = 18
//!
//! [[device]]
//! name = "flash"
//! bus = "main"
//! chip_select_pin = 5
//! clock_frequency_hz = 10000000
//! mode = 0
//! ```
//!
//! and persisted to flash in postcard format with [`SpiLayout::encode`].

use heapless::{String, Vec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::claims::ClaimSet;
use crate::config::{BusConfig, DeviceConfig, Mode};

/// Maximum buses per layout
pub const MAX_BUSES: usize = 4;

/// Maximum devices per layout
pub const MAX_DEVICES: usize = 16;

/// Maximum bus/device name length
pub const MAX_NAME_LEN: usize = 16;

/// Layout errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayoutError {
    /// Name longer than MAX_NAME_LEN
    NameTooLong,
    /// Too many buses or devices
    TooManyItems,
    /// Two buses or two devices share a name
    DuplicateName,
    /// Two buses bound to the same host
    DuplicateHost,
    /// A pin is used twice across the layout
    DuplicatePin,
    /// Device references a bus that is not in the layout
    UnknownBus,
    /// Device clock is zero
    InvalidFrequency,
    /// Buffer too small for the encoded layout
    Encode,
    /// Stored layout is corrupted or from an incompatible version
    Decode,
}

/// Named bus
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusEntry {
    /// Bus name (e.g., "main", "display")
    pub name: String<MAX_NAME_LEN>,
    /// Controller index
    pub host_id: u8,
    /// Data out pin
    pub mosi_pin: u8,
    /// Data in pin
    pub miso_pin: u8,
    /// Clock pin
    pub sclk_pin: u8,
    /// Transfer size cap in bytes
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_transfer_size: Option<usize>,
}

impl BusEntry {
    /// Bus configuration for this entry
    pub fn config(&self) -> BusConfig {
        BusConfig {
            host_id: self.host_id,
            mosi_pin: self.mosi_pin,
            miso_pin: self.miso_pin,
            sclk_pin: self.sclk_pin,
            max_transfer_size: self.max_transfer_size,
        }
    }
}

/// Named device
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceEntry {
    /// Device name (e.g., "flash", "imu")
    pub name: String<MAX_NAME_LEN>,
    /// Name of the bus the device sits on
    pub bus: String<MAX_NAME_LEN>,
    /// Chip-select pin
    pub chip_select_pin: u8,
    /// Clock frequency in Hz
    pub clock_frequency_hz: u32,
    /// SPI mode number
    #[cfg_attr(feature = "serde", serde(default))]
    pub mode: Mode,
}

impl DeviceEntry {
    /// Device configuration for this entry
    pub fn config(&self) -> DeviceConfig {
        DeviceConfig::new(self.chip_select_pin, self.clock_frequency_hz, self.mode)
    }
}

/// All SPI buses and devices of a board
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpiLayout {
    /// Buses
    #[cfg_attr(feature = "serde", serde(default, rename = "bus"))]
    pub buses: Vec<BusEntry, MAX_BUSES>,
    /// Devices
    #[cfg_attr(feature = "serde", serde(default, rename = "device"))]
    pub devices: Vec<DeviceEntry, MAX_DEVICES>,
}

fn name(s: &str) -> Result<String<MAX_NAME_LEN>, LayoutError> {
    let mut out = String::new();
    out.push_str(s).map_err(|_| LayoutError::NameTooLong)?;
    Ok(out)
}

impl SpiLayout {
    /// Create an empty layout
    pub const fn new() -> Self {
        Self {
            buses: Vec::new(),
            devices: Vec::new(),
        }
    }

    /// Add a named bus
    pub fn add_bus(&mut self, bus_name: &str, config: BusConfig) -> Result<(), LayoutError> {
        let entry = BusEntry {
            name: name(bus_name)?,
            host_id: config.host_id,
            mosi_pin: config.mosi_pin,
            miso_pin: config.miso_pin,
            sclk_pin: config.sclk_pin,
            max_transfer_size: config.max_transfer_size,
        };
        self.buses
            .push(entry)
            .map_err(|_| LayoutError::TooManyItems)
    }

    /// Add a named device on a named bus
    pub fn add_device(
        &mut self,
        device_name: &str,
        bus_name: &str,
        config: DeviceConfig,
    ) -> Result<(), LayoutError> {
        let entry = DeviceEntry {
            name: name(device_name)?,
            bus: name(bus_name)?,
            chip_select_pin: config.chip_select_pin,
            clock_frequency_hz: config.clock_frequency_hz,
            mode: config.mode,
        };
        self.devices
            .push(entry)
            .map_err(|_| LayoutError::TooManyItems)
    }

    /// Look up a bus by name
    pub fn bus(&self, bus_name: &str) -> Option<BusConfig> {
        self.buses
            .iter()
            .find(|b| b.name.as_str() == bus_name)
            .map(BusEntry::config)
    }

    /// Look up a device and the bus it sits on
    pub fn device(&self, device_name: &str) -> Option<(BusConfig, DeviceConfig)> {
        let device = self.devices.iter().find(|d| d.name.as_str() == device_name)?;
        let bus = self.bus(device.bus.as_str())?;
        Some((bus, device.config()))
    }

    /// Devices on a named bus
    pub fn devices_on<'a>(&'a self, bus_name: &'a str) -> impl Iterator<Item = &'a DeviceEntry> {
        self.devices
            .iter()
            .filter(move |d| d.bus.as_str() == bus_name)
    }

    /// Check the layout for conflicts
    ///
    /// Catches everything the platform would reject at bring-up except
    /// host range and driver limits, which depend on the backend.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let mut hosts = ClaimSet::new();
        let mut pins = ClaimSet::new();

        for (i, bus) in self.buses.iter().enumerate() {
            if self.buses[..i].iter().any(|b| b.name == bus.name) {
                return Err(LayoutError::DuplicateName);
            }
            if !hosts.claim(bus.host_id) {
                return Err(LayoutError::DuplicateHost);
            }
            if bus.config().validate().is_err() || !pins.claim_all(&bus.config().pins()) {
                return Err(LayoutError::DuplicatePin);
            }
        }

        for (i, device) in self.devices.iter().enumerate() {
            if self.devices[..i].iter().any(|d| d.name == device.name) {
                return Err(LayoutError::DuplicateName);
            }
            if !self.buses.iter().any(|b| b.name == device.bus) {
                return Err(LayoutError::UnknownBus);
            }
            if device.clock_frequency_hz == 0 {
                return Err(LayoutError::InvalidFrequency);
            }
            if !pins.claim(device.chip_select_pin) {
                return Err(LayoutError::DuplicatePin);
            }
        }

        Ok(())
    }

    /// Serialize into `buf` for flash storage
    ///
    /// Returns the number of bytes written.
    #[cfg(feature = "serde")]
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, LayoutError> {
        postcard::to_slice(self, buf)
            .map(|used| used.len())
            .map_err(|_| LayoutError::Encode)
    }

    /// Deserialize a layout written by [`SpiLayout::encode`]
    #[cfg(feature = "serde")]
    pub fn decode(bytes: &[u8]) -> Result<Self, LayoutError> {
        postcard::from_bytes(bytes).map_err(|_| LayoutError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> SpiLayout {
        let mut layout = SpiLayout::new();
        layout
            .add_bus("main", BusConfig::new(1, 23, 19, 18))
            .unwrap();
        layout
            .add_bus("aux", BusConfig::new(0, 13, 12, 14).with_max_transfer_size(64))
            .unwrap();
        layout
            .add_device("flash", "main", DeviceConfig::new(5, 10_000_000, Mode::Mode0))
            .unwrap();
        layout
            .add_device("imu", "main", DeviceConfig::new(4, 1_000_000, Mode::Mode3))
            .unwrap();
        layout
            .add_device("dac", "aux", DeviceConfig::new(15, 20_000_000, Mode::Mode1))
            .unwrap();
        layout
    }

    #[test]
    fn test_valid_layout() {
        let layout = board();
        assert_eq!(layout.validate(), Ok(()));

        let (bus, dev) = layout.device("imu").unwrap();
        assert_eq!(bus, BusConfig::new(1, 23, 19, 18));
        assert_eq!(dev.chip_select_pin, 4);
        assert_eq!(dev.mode, Mode::Mode3);

        assert_eq!(layout.bus("aux").unwrap().max_transfer_size, Some(64));
        assert!(layout.device("missing").is_none());
        assert_eq!(layout.devices_on("main").count(), 2);
    }

    #[test]
    fn test_duplicate_chip_select() {
        let mut layout = board();
        layout
            .add_device("eeprom", "aux", DeviceConfig::new(5, 1_000_000, Mode::Mode0))
            .unwrap();
        assert_eq!(layout.validate(), Err(LayoutError::DuplicatePin));
    }

    #[test]
    fn test_chip_select_on_signal_pin() {
        let mut layout = board();
        layout
            .add_device("eeprom", "aux", DeviceConfig::new(18, 1_000_000, Mode::Mode0))
            .unwrap();
        assert_eq!(layout.validate(), Err(LayoutError::DuplicatePin));
    }

    #[test]
    fn test_duplicate_host() {
        let mut layout = board();
        layout
            .add_bus("third", BusConfig::new(1, 1, 2, 3))
            .unwrap();
        assert_eq!(layout.validate(), Err(LayoutError::DuplicateHost));
    }

    #[test]
    fn test_unknown_bus() {
        let mut layout = board();
        layout
            .add_device("radio", "nope", DeviceConfig::new(2, 1_000_000, Mode::Mode0))
            .unwrap();
        assert_eq!(layout.validate(), Err(LayoutError::UnknownBus));
    }

    #[test]
    fn test_duplicate_device_name() {
        let mut layout = board();
        layout
            .add_device("flash", "aux", DeviceConfig::new(2, 1_000_000, Mode::Mode0))
            .unwrap();
        assert_eq!(layout.validate(), Err(LayoutError::DuplicateName));
    }

    #[test]
    fn test_zero_frequency() {
        let mut layout = board();
        layout
            .add_device("radio", "aux", DeviceConfig::new(2, 0, Mode::Mode0))
            .unwrap();
        assert_eq!(layout.validate(), Err(LayoutError::InvalidFrequency));
    }

    #[test]
    fn test_name_too_long() {
        let mut layout = SpiLayout::new();
        assert_eq!(
            layout.add_bus("a-very-long-bus-name", BusConfig::new(0, 1, 2, 3)),
            Err(LayoutError::NameTooLong)
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_parse_toml() {
        let input = r#"
            [[bus]]
            name = "main"
            host_id = 1
            mosi_pin = 23
            miso_pin = 19
            sclk_pin = 18

            [[device]]
            name = "flash"
            bus = "main"
            chip_select_pin = 5
            clock_frequency_hz = 10000000
            mode = 0

            [[device]]
            name = "imu"
            bus = "main"
            chip_select_pin = 4
            clock_frequency_hz = 1000000
            mode = 3
        "#;

        let layout: SpiLayout = toml::from_str(input).unwrap();
        assert_eq!(layout.validate(), Ok(()));
        assert_eq!(layout.buses.len(), 1);
        assert_eq!(layout.buses[0].max_transfer_size, None);

        let (bus, imu) = layout.device("imu").unwrap();
        assert_eq!(bus.host_id, 1);
        assert_eq!(imu.mode, Mode::Mode3);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_parse_toml_rejects_bad_mode() {
        let input = r#"
            [[device]]
            name = "flash"
            bus = "main"
            chip_select_pin = 5
            clock_frequency_hz = 10000000
            mode = 7
        "#;
        assert!(toml::from_str::<SpiLayout>(input).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_flash_persistence() {
        let layout = board();
        let mut buf = [0u8; 512];
        let len = layout.encode(&mut buf).unwrap();

        let restored = SpiLayout::decode(&buf[..len]).unwrap();
        assert_eq!(restored, layout);

        assert_eq!(layout.encode(&mut buf[..4]), Err(LayoutError::Encode));
    }
}
