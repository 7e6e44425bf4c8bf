//! embedded-hal SPI backend
//!
//! Implements [`platform_spi_hal::SpiBackend`] on top of embedded-hal 1.0
//! `SpiBus` drivers and `OutputPin` chip selects, so any chip HAL that
//! speaks embedded-hal can sit under the platform SPI contract.
//!
//! Chip select is driven by the backend, not the peripheral: it is held
//! high from attach, pulled low for exactly one exchange, and released
//! high again whether or not the exchange succeeded.
//!
//! # Usage
//!
//! ```ignore
//! let spi0 = FixedController::<_, _, 2>::new(spi_bus, 19, 16, 18, 62_500_000)
//!     .with_chip_select(17, cs_flash)?
//!     .with_chip_select(20, cs_sensor)?;
//! let platform: SpiPlatform<NoopRawMutex, _> =
//!     SpiPlatform::new(EhalBackend::new([spi0]));
//! ```
//!
//! The platform never holds its lock while bytes are on the wire, so
//! `CriticalSectionRawMutex` is also safe when handles are shared with
//! interrupts; it only masks them while state is swapped in and out.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod backend;
pub mod controller;
pub mod fixed;

#[cfg(test)]
mod mock;

pub use backend::{EhalBackend, EhalBus, EhalDevice};
pub use controller::{ehal_mode, Reconfigure, SpiController};
pub use fixed::FixedController;
