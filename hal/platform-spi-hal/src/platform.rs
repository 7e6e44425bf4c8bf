//! Bus and device lifecycle
//!
//! [`SpiPlatform`] owns the active backend and the host/pin claims.
//! [`Bus`] borrows the platform, [`Device`] borrows its bus, so a handle can
//! never outlive what it was created from. Dropping a handle releases its
//! claims and tells the backend.
//!
//! # Locking
//!
//! State sits in `embassy_sync` blocking mutexes, generic over the raw
//! mutex `M`:
//!
//! - platform state (`RefCell`): held while claiming/releasing hosts and
//!   pins and for the backend's setup/teardown calls
//! - bus state (`Cell<Option<_>>`): taken out for the whole of any device's
//!   transfer, so only one exchange runs on a bus at a time
//! - device state (`Cell<Option<_>>`): taken out for the device's own
//!   transfer, one in flight at a time
//!
//! Bus and device state are moved out under the lock and put back after
//! the backend call, so no lock is held while bytes are on the wire. With
//! `CriticalSectionRawMutex` interrupts are only masked for the swap, never
//! for a whole exchange. A call that finds state already taken, or the
//! platform state borrowed, gets `Busy`.
//!
//! For firmware where every handle lives on one executor, `NoopRawMutex` (or
//! `ThreadModeRawMutex`) is enough; pick `CriticalSectionRawMutex` only when
//! handles are shared with interrupts or another core.

use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::backend::SpiBackend;
use crate::claims::ClaimSet;
use crate::config::{BusConfig, DeviceConfig};
use crate::error::{AttachError, BusInitError, TransferError};

struct PlatformState<B> {
    backend: B,
    hosts: ClaimSet,
    pins: ClaimSet,
}

/// Move a value out of its slot, `None` if someone else holds it
fn take_slot<M: RawMutex, T>(slot: &Mutex<M, Cell<Option<T>>>) -> Option<T> {
    slot.lock(Cell::take)
}

fn put_slot<M: RawMutex, T>(slot: &Mutex<M, Cell<Option<T>>>, value: T) {
    slot.lock(|cell| cell.set(Some(value)));
}

/// Process-wide SPI platform
///
/// One per firmware image, wrapping the backend linked into the build.
pub struct SpiPlatform<M: RawMutex, B: SpiBackend> {
    host_count: u8,
    state: Mutex<M, RefCell<PlatformState<B>>>,
}

impl<M: RawMutex, B: SpiBackend> SpiPlatform<M, B> {
    /// Wrap a backend
    pub fn new(backend: B) -> Self {
        Self {
            host_count: backend.host_count(),
            state: Mutex::new(RefCell::new(PlatformState {
                backend,
                hosts: ClaimSet::new(),
                pins: ClaimSet::new(),
            })),
        }
    }

    /// Number of SPI controllers the backend exposes
    pub fn host_count(&self) -> u8 {
        self.host_count
    }

    /// Check if a host has a live bus
    pub fn is_host_claimed(&self, host_id: u8) -> bool {
        self.state.lock(|state| {
            state
                .try_borrow()
                .map(|state| state.hosts.is_claimed(host_id))
                .unwrap_or(true)
        })
    }

    /// Check if a pin is held by a live bus or device
    pub fn is_pin_claimed(&self, pin: u8) -> bool {
        self.state.lock(|state| {
            state
                .try_borrow()
                .map(|state| state.pins.is_claimed(pin))
                .unwrap_or(true)
        })
    }

    /// Initialize a bus
    ///
    /// Claims the host and the three signal pins until the returned handle
    /// is dropped.
    pub fn initialize(&self, config: BusConfig) -> Result<Bus<'_, M, B>, BusInitError> {
        config.validate()?;
        if config.host_id >= self.host_count {
            return Err(BusInitError::InvalidHost);
        }

        let driver = self.state.lock(|state| {
            let mut state = state.try_borrow_mut().map_err(|_| BusInitError::Busy)?;
            if state.hosts.is_claimed(config.host_id) {
                return Err(BusInitError::HostInUse);
            }
            if config.pins().iter().any(|&pin| state.pins.is_claimed(pin)) {
                return Err(BusInitError::PinInUse);
            }

            let driver = state
                .backend
                .init_bus(&config)
                .map_err(BusInitError::Driver)?;
            state.hosts.claim(config.host_id);
            state.pins.claim_all(&config.pins());
            Ok(driver)
        })?;

        debug!("Initialized SPI for host {}", config.host_id);

        Ok(Bus {
            platform: self,
            config,
            driver: Mutex::new(Cell::new(Some(driver))),
        })
    }
}

/// Initialized SPI bus
pub struct Bus<'p, M: RawMutex, B: SpiBackend> {
    platform: &'p SpiPlatform<M, B>,
    config: BusConfig,
    driver: Mutex<M, Cell<Option<B::Bus>>>,
}

impl<'p, M: RawMutex, B: SpiBackend> Bus<'p, M, B> {
    /// Host this bus is bound to
    pub fn host(&self) -> u8 {
        self.config.host_id
    }

    /// Configuration the bus was initialized with
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Attach a device on its own chip-select line
    ///
    /// Claims the chip-select pin until the returned handle is dropped.
    /// Fails with `Busy` when called while a transfer holds the bus.
    pub fn attach(&self, config: DeviceConfig) -> Result<Device<'_, 'p, M, B>, AttachError> {
        if config.clock_frequency_hz == 0 {
            return Err(AttachError::InvalidFrequency);
        }

        let mut bus = take_slot(&self.driver).ok_or(AttachError::Busy)?;
        let result = self.platform.state.lock(|state| {
            let mut state = state.try_borrow_mut().map_err(|_| AttachError::Busy)?;
            if state.pins.is_claimed(config.chip_select_pin) {
                return Err(AttachError::PinInUse);
            }

            let device = state
                .backend
                .add_device(&mut bus, &config)
                .map_err(AttachError::Driver)?;
            state.pins.claim(config.chip_select_pin);
            Ok(device)
        });
        put_slot(&self.driver, bus);
        let driver = result?;

        debug!(
            "[NCSS:{}] Added device mode {} for host {}",
            config.chip_select_pin,
            config.mode.as_u8(),
            self.config.host_id
        );

        Ok(Device {
            bus: self,
            config,
            driver: Mutex::new(Cell::new(Some(driver))),
            stats: Mutex::new(Cell::new(DeviceStats::default())),
        })
    }
}

impl<'p, M: RawMutex, B: SpiBackend> Drop for Bus<'p, M, B> {
    fn drop(&mut self) {
        let host = self.config.host_id;
        let pins = self.config.pins();
        // Devices borrow the bus, so nothing else can be holding its state
        let Some(driver) = take_slot(&self.driver) else {
            return;
        };

        self.platform.state.lock(|state| match state.try_borrow_mut() {
            Ok(mut state) => {
                state.backend.free_bus(driver);
                state.hosts.release(host);
                for pin in pins {
                    state.pins.release(pin);
                }
                debug!("Released SPI host {}", host);
            }
            Err(_) => warn!("Host {} dropped while platform busy, claims kept", host),
        });
    }
}

/// Per-device transfer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceStats {
    /// Completed transfers
    pub transfers: u32,
    /// Bytes clocked out
    pub bytes_sent: u64,
    /// Bytes captured into receive buffers
    pub bytes_received: u64,
    /// Transfers the driver failed
    pub failures: u32,
}

/// Peripheral attached to a [`Bus`]
pub struct Device<'b, 'p, M: RawMutex, B: SpiBackend> {
    bus: &'b Bus<'p, M, B>,
    config: DeviceConfig,
    driver: Mutex<M, Cell<Option<B::Device>>>,
    stats: Mutex<M, Cell<DeviceStats>>,
}

impl<'b, 'p, M: RawMutex, B: SpiBackend> Device<'b, 'p, M, B> {
    /// Host of the owning bus
    pub fn host(&self) -> u8 {
        self.bus.host()
    }

    /// Configuration the device was attached with
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Counters since attach
    pub fn stats(&self) -> DeviceStats {
        self.stats.lock(Cell::get)
    }

    /// Exchange `tx.len()` bytes with the device
    ///
    /// With `rx`, the first `tx.len()` bytes of it receive the response;
    /// without it the response is discarded. Blocks until the exchange is
    /// done and returns the number of bytes transferred. An empty `tx` is a
    /// no-op returning 0.
    ///
    /// Returns `Busy` without touching the bus if this device or another
    /// device on the same bus is mid-transfer.
    pub fn transfer(&self, tx: &[u8], rx: Option<&mut [u8]>) -> Result<usize, TransferError> {
        let size = tx.len();
        if size == 0 {
            return Ok(0);
        }
        if let Some(max) = self.bus.config.max_transfer_size {
            if size > max {
                return Err(TransferError::TooLarge);
            }
        }
        let rx = match rx {
            Some(rx) => Some(rx.get_mut(..size).ok_or(TransferError::BufferTooSmall)?),
            None => None,
        };
        let rxsize = if rx.is_some() { size } else { 0 };
        let cs = self.config.chip_select_pin;

        let mut device = take_slot(&self.driver).ok_or(TransferError::Busy)?;
        let result = match take_slot(&self.bus.driver) {
            Some(mut bus) => {
                let result = B::transmit(&mut bus, &mut device, tx, rx);
                put_slot(&self.bus.driver, bus);
                result.map_err(TransferError::Driver)
            }
            None => Err(TransferError::Busy),
        };
        put_slot(&self.driver, device);

        self.stats.lock(|stats| {
            let mut s = stats.get();
            match result {
                Ok(()) => {
                    s.transfers = s.transfers.saturating_add(1);
                    s.bytes_sent = s.bytes_sent.saturating_add(size as u64);
                    s.bytes_received = s.bytes_received.saturating_add(rxsize as u64);
                }
                Err(TransferError::Driver(_)) => s.failures = s.failures.saturating_add(1),
                Err(_) => {}
            }
            stats.set(s);
        });

        match result {
            Ok(()) => {
                trace!("[NCSS:{}] Sent {}, received {} bytes", cs, size, rxsize);
                Ok(size)
            }
            Err(e) => {
                warn!("[NCSS:{}] Transfer of {} bytes failed", cs, size);
                Err(e)
            }
        }
    }

    /// Send-only transfer
    pub fn write(&self, tx: &[u8]) -> Result<usize, TransferError> {
        self.transfer(tx, None)
    }
}

impl<'b, 'p, M: RawMutex, B: SpiBackend> Drop for Device<'b, 'p, M, B> {
    fn drop(&mut self) {
        let cs = self.config.chip_select_pin;
        let Some(device) = take_slot(&self.driver) else {
            return;
        };
        let Some(mut bus) = take_slot(&self.bus.driver) else {
            warn!("[NCSS:{}] Dropped during a transfer on its bus, pin kept", cs);
            return;
        };

        self.bus.platform.state.lock(|state| match state.try_borrow_mut() {
            Ok(mut state) => {
                state.backend.remove_device(&mut bus, device);
                state.pins.release(cs);
                debug!("[NCSS:{}] Removed device from host {}", cs, self.bus.host());
            }
            Err(_) => warn!("[NCSS:{}] Dropped while platform busy, pin kept", cs),
        });
        put_slot(&self.bus.driver, bus);
    }
}
