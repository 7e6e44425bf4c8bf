//! Loopback bus and recording pins for tests

use std::sync::{Arc, Mutex};

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::spi::{self, ErrorKind, SpiBus};
use platform_spi_hal::{DriverError, Mode};

use crate::controller::Reconfigure;

/// Everything that happened on the wire, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Configure(u32, Mode),
    CsLow(u8),
    CsHigh(u8),
    Write(Vec<u8>),
    Transfer(Vec<u8>),
    Flush,
}

#[derive(Clone, Default)]
pub struct Wire {
    ops: Arc<Mutex<Vec<Op>>>,
}

impl Wire {
    pub fn push(&self, op: Op) {
        self.ops.lock().unwrap().push(op);
    }

    pub fn take(&self) -> Vec<Op> {
        std::mem::take(&mut *self.ops.lock().unwrap())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BusFault(pub ErrorKind);

impl spi::Error for BusFault {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Bus whose MISO is tied to MOSI
pub struct LoopbackBus {
    wire: Wire,
    fault: Arc<Mutex<Option<ErrorKind>>>,
}

impl LoopbackBus {
    pub fn new(wire: &Wire) -> Self {
        Self {
            wire: wire.clone(),
            fault: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle that makes the next exchange fail with `kind`
    pub fn fault_handle(&self) -> Arc<Mutex<Option<ErrorKind>>> {
        self.fault.clone()
    }

    fn check(&self) -> Result<(), BusFault> {
        match self.fault.lock().unwrap().take() {
            Some(kind) => Err(BusFault(kind)),
            None => Ok(()),
        }
    }
}

impl spi::ErrorType for LoopbackBus {
    type Error = BusFault;
}

impl SpiBus<u8> for LoopbackBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), BusFault> {
        self.check()?;
        words.fill(0);
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), BusFault> {
        self.check()?;
        self.wire.push(Op::Write(words.to_vec()));
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), BusFault> {
        self.check()?;
        self.wire.push(Op::Transfer(write.to_vec()));
        for (i, byte) in read.iter_mut().enumerate() {
            *byte = write.get(i).copied().unwrap_or(0);
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), BusFault> {
        self.check()?;
        self.wire.push(Op::Transfer(words.to_vec()));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BusFault> {
        self.wire.push(Op::Flush);
        Ok(())
    }
}

impl Reconfigure for LoopbackBus {
    fn reconfigure(&mut self, clock_frequency_hz: u32, mode: Mode) -> Result<(), DriverError> {
        self.wire.push(Op::Configure(clock_frequency_hz, mode));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PinFault;

impl digital::Error for PinFault {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

/// Chip-select output that records its level changes
pub struct RecordingPin {
    pin: u8,
    wire: Wire,
    stuck: bool,
}

impl RecordingPin {
    pub fn new(pin: u8, wire: &Wire) -> Self {
        Self {
            pin,
            wire: wire.clone(),
            stuck: false,
        }
    }

    /// Pin whose driver rejects every level change
    pub fn stuck(pin: u8, wire: &Wire) -> Self {
        Self {
            stuck: true,
            ..Self::new(pin, wire)
        }
    }
}

impl digital::ErrorType for RecordingPin {
    type Error = PinFault;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), PinFault> {
        if self.stuck {
            return Err(PinFault);
        }
        self.wire.push(Op::CsLow(self.pin));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), PinFault> {
        if self.stuck {
            return Err(PinFault);
        }
        self.wire.push(Op::CsHigh(self.pin));
        Ok(())
    }
}
