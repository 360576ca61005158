//! SPI (Serial Peripheral Interface) master contract

use crate::binding::{Backend, ConfigExt, PeripheralConfig, PeripheralKind};
use crate::context::Context;
use crate::error::{ErrorKind, HalResult};
use crate::time::Timeout;

/// SPI mode (clock polarity and phase)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiMode {
    /// CPOL=0, CPHA=0
    Mode0,
    /// CPOL=0, CPHA=1
    Mode1,
    /// CPOL=1, CPHA=0
    Mode2,
    /// CPOL=1, CPHA=1
    Mode3,
}

impl SpiMode {
    /// Clock idles high (CPOL=1)
    pub const fn idle_high(self) -> bool {
        matches!(self, SpiMode::Mode2 | SpiMode::Mode3)
    }

    /// Data captured on the second clock edge (CPHA=1)
    pub const fn capture_on_second_edge(self) -> bool {
        matches!(self, SpiMode::Mode1 | SpiMode::Mode3)
    }
}

/// SPI bit order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

/// SPI configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiConfig {
    /// SCK frequency in Hz
    pub frequency: u32,
    pub mode: SpiMode,
    pub bit_order: BitOrder,
    /// Byte clocked out when the caller supplies fewer output bytes than it reads
    pub fill: u8,
    pub timeout: Timeout,
    pub ext: ConfigExt,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self::MODE0_1MHZ
    }
}

impl SpiConfig {
    /// Mode 0, MSB first, 1 MHz
    pub const MODE0_1MHZ: Self = Self {
        frequency: 1_000_000,
        mode: SpiMode::Mode0,
        bit_order: BitOrder::MsbFirst,
        fill: 0xFF,
        timeout: Timeout::DEFAULT,
        ext: ConfigExt::NONE,
    };

    pub const fn with_frequency(mut self, frequency: u32) -> Self {
        self.frequency = frequency;
        self
    }

    pub const fn with_mode(mut self, mode: SpiMode) -> Self {
        self.mode = mode;
        self
    }

    pub const fn with_bit_order(mut self, bit_order: BitOrder) -> Self {
        self.bit_order = bit_order;
        self
    }

    pub const fn with_fill(mut self, fill: u8) -> Self {
        self.fill = fill;
        self
    }

    pub const fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = timeout;
        self
    }

    pub const fn with_ext(mut self, ext: ConfigExt) -> Self {
        self.ext = ext;
        self
    }
}

impl PeripheralConfig for SpiConfig {
    const KIND: PeripheralKind = PeripheralKind::Spi;

    fn validate(&self) -> HalResult<()> {
        if self.frequency == 0 {
            return Err(ErrorKind::InvalidConfig);
        }
        Ok(())
    }
}

/// Limits an SPI backend declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiCapabilities {
    /// Highest SCK frequency in Hz
    pub max_frequency: u32,
    /// Whether LSB-first shifting is supported
    pub lsb_first: bool,
}

impl Default for SpiCapabilities {
    fn default() -> Self {
        Self {
            max_frequency: 10_000_000,
            lsb_first: true,
        }
    }
}

/// SPI master backend
pub trait SpiBackend: Backend<Config = SpiConfig> {
    fn capabilities(&self) -> SpiCapabilities;

    /// Clock `input.len()` bytes
    ///
    /// `output` is never longer than `input`; once it runs out, `fill` is
    /// clocked out instead. Neither slice is empty.
    fn transfer(
        &mut self,
        output: &[u8],
        input: &mut [u8],
        fill: u8,
        timeout: Timeout,
    ) -> HalResult<()>;

    /// Clock out `output`, discarding whatever is received
    fn write(&mut self, output: &[u8], timeout: Timeout) -> HalResult<()>;
}

/// SPI master context bound to backend `B`
pub struct SpiMaster<'b, B: ?Sized + SpiBackend> {
    ctx: Context<'b, B>,
}

/// SPI master bound through dynamic dispatch
pub type DynSpi<'b> = SpiMaster<'b, dyn SpiBackend + 'b>;

/// Chunk size used by [`SpiMaster::transfer_in_place`]
const IN_PLACE_CHUNK: usize = 64;

impl<'b, B: ?Sized + SpiBackend> SpiMaster<'b, B> {
    pub fn new(id: u16, backend: &'b mut B) -> Self {
        Self {
            ctx: Context::new(id, backend),
        }
    }

    pub fn context(&self) -> &Context<'b, B> {
        &self.ctx
    }

    pub fn capabilities(&self) -> SpiCapabilities {
        self.ctx.backend().capabilities()
    }

    fn check_config(backend: &B, config: &SpiConfig) -> HalResult<()> {
        let caps = backend.capabilities();
        if config.frequency > caps.max_frequency {
            return Err(ErrorKind::InvalidConfig);
        }
        if config.bit_order == BitOrder::LsbFirst && !caps.lsb_first {
            return Err(ErrorKind::InvalidConfig);
        }
        Ok(())
    }

    /// Full-duplex exchange of `input.len()` bytes
    ///
    /// A short `output` is padded with the configured fill byte; an `output`
    /// longer than `input` is rejected.
    pub fn transfer(&mut self, output: &[u8], input: &mut [u8]) -> HalResult<()> {
        let (backend, config) = self.ctx.operate()?;
        if output.len() > input.len() {
            return Err(ErrorKind::InvalidArgument);
        }
        if input.is_empty() {
            return Ok(());
        }
        backend.transfer(output, input, config.fill, config.timeout)
    }

    /// Clock out `output`, discarding received bytes
    pub fn write(&mut self, output: &[u8]) -> HalResult<()> {
        let (backend, config) = self.ctx.operate()?;
        if output.is_empty() {
            return Ok(());
        }
        backend.write(output, config.timeout)
    }

    /// Fill `input` while clocking out the fill byte
    pub fn read(&mut self, input: &mut [u8]) -> HalResult<()> {
        self.transfer(&[], input)
    }

    /// Exchange `words` in place
    ///
    /// Runs as a sequence of transfers of at most 64 bytes each. If a chunk
    /// fails, earlier chunks have already been exchanged.
    pub fn transfer_in_place(&mut self, words: &mut [u8]) -> HalResult<()> {
        let (backend, config) = self.ctx.operate()?;
        let mut staging = [0u8; IN_PLACE_CHUNK];
        for chunk in words.chunks_mut(IN_PLACE_CHUNK) {
            let output = &mut staging[..chunk.len()];
            output.copy_from_slice(chunk);
            backend.transfer(output, chunk, config.fill, config.timeout)?;
        }
        Ok(())
    }
}

delegate_lifecycle!(SpiMaster, SpiBackend);
