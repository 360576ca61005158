//! `embedded-hal` 1.0 adapters
//!
//! Lets ecosystem drivers written against `embedded-hal` run on any bound
//! backend. The lifecycle is still driven through [`Lifecycle`](crate::Lifecycle);
//! a context that is not configured fails every trait call with
//! `NotConfigured`.

use embedded_hal::digital;
use embedded_hal::i2c::{self, Operation, SevenBitAddress, TenBitAddress};
use embedded_hal::spi;

use crate::error::{ErrorKind, HalResult};
use crate::gpio::{GpioBackend, GpioPin, Level};
use crate::i2c::{I2cAddress, I2cBackend, I2cMaster, MAX_WRITE_READ_LEN};
use crate::spi::{SpiBackend, SpiMaster};

impl i2c::Error for ErrorKind {
    fn kind(&self) -> i2c::ErrorKind {
        match self {
            ErrorKind::HardwareFailure => i2c::ErrorKind::Bus,
            _ => i2c::ErrorKind::Other,
        }
    }
}

impl spi::Error for ErrorKind {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

impl digital::Error for ErrorKind {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

/// Largest run of adjacent writes merged into one write phase
pub const MAX_MERGED_WRITE_LEN: usize = 256;

impl<'b, B: ?Sized + I2cBackend> I2cMaster<'b, B> {
    /// Run an `embedded-hal` operation list as a single bus transaction
    ///
    /// Adjacent writes are concatenated and adjacent reads are filled from
    /// one read phase, so the list maps onto one [`write`](Self::write),
    /// [`read`](Self::read) or [`write_then_read`](Self::write_then_read).
    /// Lists with a write after a read, merged writes longer than
    /// [`MAX_MERGED_WRITE_LEN`] or merged reads longer than
    /// [`MAX_WRITE_READ_LEN`] cannot be expressed that way and fail with
    /// `InvalidArgument` before anything reaches the bus.
    fn run_operations(
        &mut self,
        address: I2cAddress,
        operations: &mut [Operation<'_>],
    ) -> HalResult<()> {
        let first_read = operations
            .iter()
            .position(|op| matches!(op, Operation::Read(_)))
            .unwrap_or(operations.len());
        let (writes, reads) = operations.split_at_mut(first_read);
        if reads.iter().any(|op| matches!(op, Operation::Write(_))) {
            return Err(ErrorKind::InvalidArgument);
        }

        let mut merged = [0u8; MAX_MERGED_WRITE_LEN];
        let bytes: &[u8] = match &*writes {
            [] => &[],
            [Operation::Write(bytes)] => *bytes,
            _ => {
                let mut len = 0;
                for op in writes.iter() {
                    if let Operation::Write(chunk) = op {
                        let end = len + chunk.len();
                        merged
                            .get_mut(len..end)
                            .ok_or(ErrorKind::InvalidArgument)?
                            .copy_from_slice(chunk);
                        len = end;
                    }
                }
                &merged[..len]
            }
        };

        match reads {
            [] => self.write(address, bytes),
            [Operation::Read(buffer)] if bytes.is_empty() => self.read(address, buffer),
            [Operation::Read(buffer)] => self.write_then_read(address, bytes, buffer),
            _ => {
                let total: usize = reads
                    .iter()
                    .map(|op| match op {
                        Operation::Read(buffer) => buffer.len(),
                        Operation::Write(_) => 0,
                    })
                    .sum();
                if total > MAX_WRITE_READ_LEN {
                    return Err(ErrorKind::InvalidArgument);
                }

                let mut staging = [0u8; MAX_WRITE_READ_LEN];
                self.write_then_read(address, bytes, &mut staging[..total])?;
                let mut offset = 0;
                for op in reads.iter_mut() {
                    if let Operation::Read(buffer) = op {
                        let end = offset + buffer.len();
                        buffer.copy_from_slice(&staging[offset..end]);
                        offset = end;
                    }
                }
                Ok(())
            }
        }
    }
}

impl<'b, B: ?Sized + I2cBackend> i2c::ErrorType for I2cMaster<'b, B> {
    type Error = ErrorKind;
}

impl<'b, B: ?Sized + I2cBackend> i2c::I2c<SevenBitAddress> for I2cMaster<'b, B> {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.run_operations(I2cAddress::SevenBit(address), operations)
    }
}

impl<'b, B: ?Sized + I2cBackend> i2c::I2c<TenBitAddress> for I2cMaster<'b, B> {
    fn transaction(
        &mut self,
        address: TenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.run_operations(I2cAddress::TenBit(address), operations)
    }
}

impl<'b, B: ?Sized + SpiBackend> spi::ErrorType for SpiMaster<'b, B> {
    type Error = ErrorKind;
}

impl<'b, B: ?Sized + SpiBackend> spi::SpiBus<u8> for SpiMaster<'b, B> {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        SpiMaster::read(self, words)
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        SpiMaster::write(self, words)
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        if write.len() <= read.len() {
            return SpiMaster::transfer(self, write, read);
        }
        let (head, tail) = write.split_at(read.len());
        SpiMaster::transfer(self, head, read)?;
        SpiMaster::write(self, tail)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        SpiMaster::transfer_in_place(self, words)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        // transfers complete before returning; only the state gate remains
        SpiMaster::write(self, &[])
    }
}

impl<'b, B: ?Sized + GpioBackend> digital::ErrorType for GpioPin<'b, B> {
    type Error = ErrorKind;
}

impl<'b, B: ?Sized + GpioBackend> digital::OutputPin for GpioPin<'b, B> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write_level(Level::Low)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write_level(Level::High)
    }
}

impl<'b, B: ?Sized + GpioBackend> digital::StatefulOutputPin for GpioPin<'b, B> {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        GpioPin::is_high(self)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        GpioPin::is_high(self).map(|high| !high)
    }

    fn toggle(&mut self) -> Result<(), Self::Error> {
        GpioPin::toggle(self)
    }
}

impl<'b, B: ?Sized + GpioBackend> digital::InputPin for GpioPin<'b, B> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        GpioPin::is_high(self)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        GpioPin::is_high(self).map(|high| !high)
    }
}
