//! platform-spi Hardware Abstraction Layer
//!
//! This crate defines the SPI contract application code is written against.
//! A backend crate (no-op, embedded-hal, ...) implements [`SpiBackend`] and
//! is selected by which one the firmware links, so call sites never change
//! between host builds and hardware builds.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application firmware                   │
//! └─────────────────────────────────────────┘
//!                     │  SpiPlatform / Bus / Device
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  platform-spi-hal (this crate)          │
//! │  validation, claims, locking, logging   │
//! └─────────────────────────────────────────┘
//!                     │  SpiBackend
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ platform-spi- │       │ platform-spi- │
//! │     null      │       │     ehal      │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! // Single executor: no cross-context locking needed
//! let platform: SpiPlatform<NoopRawMutex, _> = SpiPlatform::new(backend);
//! let bus = platform.initialize(BusConfig::new(1, 23, 19, 18))?;
//! let flash = bus.attach(DeviceConfig::new(5, 10_000_000, Mode::Mode0))?;
//!
//! let mut id = [0u8; 4];
//! flash.transfer(&[0x9F, 0, 0, 0], Some(&mut id))?;
//! ```
//!
//! See [`platform`] for how the raw mutex choice affects interrupt latency.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod backend;
pub mod claims;
pub mod config;
pub mod error;
pub mod layout;
pub mod platform;

// Re-export key types at crate root for convenience
pub use backend::SpiBackend;
pub use config::{BusConfig, DeviceConfig, Mode, Phase, Polarity};
pub use error::{AttachError, BusInitError, DriverError, SpiError, TransferError};
pub use layout::SpiLayout;
pub use platform::{Bus, Device, DeviceStats, SpiPlatform};
