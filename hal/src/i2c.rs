//! I2C (Inter-Integrated Circuit) master contract

use crate::binding::{Backend, ConfigExt, PeripheralConfig, PeripheralKind};
use crate::context::Context;
use crate::error::{ErrorKind, HalResult};
use crate::time::Timeout;

/// Largest read phase accepted by [`I2cMaster::write_then_read`]
///
/// The read phase is staged on the stack so that a failed transaction never
/// leaves partial data in the caller's buffer.
pub const MAX_WRITE_READ_LEN: usize = 256;

/// I2C address (7-bit or 10-bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cAddress {
    SevenBit(u8),
    TenBit(u16),
}

impl I2cAddress {
    /// Raw address value
    pub const fn raw(self) -> u16 {
        match self {
            I2cAddress::SevenBit(addr) => addr as u16,
            I2cAddress::TenBit(addr) => addr,
        }
    }

    /// Whether the value fits the address width
    pub const fn is_well_formed(self) -> bool {
        match self {
            I2cAddress::SevenBit(addr) => addr <= 0x7F,
            I2cAddress::TenBit(addr) => addr <= 0x3FF,
        }
    }
}

/// I2C speed mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cSpeed {
    /// Standard mode (100 kHz)
    Standard,
    /// Fast mode (400 kHz)
    Fast,
    /// Fast mode plus (1 MHz)
    FastPlus,
    /// High speed mode (3.4 MHz)
    HighSpeed,
}

impl I2cSpeed {
    /// Nominal SCL frequency in Hz
    pub const fn hz(self) -> u32 {
        match self {
            I2cSpeed::Standard => 100_000,
            I2cSpeed::Fast => 400_000,
            I2cSpeed::FastPlus => 1_000_000,
            I2cSpeed::HighSpeed => 3_400_000,
        }
    }
}

/// I2C configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cConfig {
    pub speed: I2cSpeed,
    /// Upper bound for every transaction on this context
    pub timeout: Timeout,
    pub ext: ConfigExt,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl I2cConfig {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self {
        speed: I2cSpeed::Standard,
        timeout: Timeout::DEFAULT,
        ext: ConfigExt::NONE,
    };

    /// Fast mode (400 kHz)
    pub const FAST: Self = Self {
        speed: I2cSpeed::Fast,
        ..Self::STANDARD
    };

    /// Sets the speed mode.
    pub const fn with_speed(mut self, speed: I2cSpeed) -> Self {
        self.speed = speed;
        self
    }

    /// Sets the per-transaction timeout.
    pub const fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the backend extension slot.
    pub const fn with_ext(mut self, ext: ConfigExt) -> Self {
        self.ext = ext;
        self
    }
}

impl PeripheralConfig for I2cConfig {
    const KIND: PeripheralKind = PeripheralKind::I2c;
}

/// Limits an I2C backend declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cCapabilities {
    /// Fastest speed mode the backend can drive
    pub max_speed: I2cSpeed,
    /// Whether 10-bit addressing is supported
    pub ten_bit: bool,
}

impl Default for I2cCapabilities {
    fn default() -> Self {
        Self {
            max_speed: I2cSpeed::Fast,
            ten_bit: false,
        }
    }
}

/// I2C master backend
///
/// Called only while the context is configured, with well-formed addresses
/// and non-empty buffers.
pub trait I2cBackend: Backend<Config = I2cConfig> {
    /// Declared limits
    fn capabilities(&self) -> I2cCapabilities;

    /// START - ADDR(W) - DATA - STOP
    fn write(&mut self, address: I2cAddress, bytes: &[u8], timeout: Timeout) -> HalResult<()>;

    /// START - ADDR(R) - DATA - STOP
    fn read(&mut self, address: I2cAddress, buffer: &mut [u8], timeout: Timeout) -> HalResult<()>;

    /// START - ADDR(W) - DATA - REPEATED_START - ADDR(R) - DATA - STOP
    ///
    /// No other transaction on the same bus may interleave between the two
    /// phases.
    fn write_read(
        &mut self,
        address: I2cAddress,
        bytes: &[u8],
        buffer: &mut [u8],
        timeout: Timeout,
    ) -> HalResult<()>;
}

/// I2C master context bound to backend `B`
pub struct I2cMaster<'b, B: ?Sized + I2cBackend> {
    ctx: Context<'b, B>,
}

/// I2C master bound through dynamic dispatch
pub type DynI2c<'b> = I2cMaster<'b, dyn I2cBackend + 'b>;

impl<'b, B: ?Sized + I2cBackend> I2cMaster<'b, B> {
    /// Bind `backend` to bus `id`
    pub fn new(id: u16, backend: &'b mut B) -> Self {
        Self {
            ctx: Context::new(id, backend),
        }
    }

    /// Underlying context
    pub fn context(&self) -> &Context<'b, B> {
        &self.ctx
    }

    /// Limits declared by the bound backend
    pub fn capabilities(&self) -> I2cCapabilities {
        self.ctx.backend().capabilities()
    }

    fn check_config(backend: &B, config: &I2cConfig) -> HalResult<()> {
        if config.speed > backend.capabilities().max_speed {
            return Err(ErrorKind::InvalidConfig);
        }
        Ok(())
    }

    /// Write `bytes` to the device at `address`
    pub fn write(&mut self, address: I2cAddress, bytes: &[u8]) -> HalResult<()> {
        let (backend, config) = self.ctx.operate()?;
        check_address(backend.capabilities(), address)?;
        if bytes.is_empty() {
            return Ok(());
        }
        backend.write(address, bytes, config.timeout)
    }

    /// Fill `buffer` from the device at `address`
    pub fn read(&mut self, address: I2cAddress, buffer: &mut [u8]) -> HalResult<()> {
        let (backend, config) = self.ctx.operate()?;
        check_address(backend.capabilities(), address)?;
        if buffer.is_empty() {
            return Ok(());
        }
        backend.read(address, buffer, config.timeout)
    }

    /// Write `bytes`, then read into `buffer` with a repeated start
    ///
    /// Atomic with respect to other users of the same bus. On error `buffer`
    /// is left untouched. `buffer` may hold at most [`MAX_WRITE_READ_LEN`]
    /// bytes.
    pub fn write_then_read(
        &mut self,
        address: I2cAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> HalResult<()> {
        let (backend, config) = self.ctx.operate()?;
        check_address(backend.capabilities(), address)?;
        if buffer.len() > MAX_WRITE_READ_LEN {
            return Err(ErrorKind::InvalidArgument);
        }

        let mut staging = [0u8; MAX_WRITE_READ_LEN];
        let staged = &mut staging[..buffer.len()];

        match (bytes.is_empty(), buffer.is_empty()) {
            (true, true) => return Ok(()),
            (false, true) => return backend.write(address, bytes, config.timeout),
            (true, false) => backend.read(address, staged, config.timeout)?,
            (false, false) => backend.write_read(address, bytes, staged, config.timeout)?,
        }

        buffer.copy_from_slice(staged);
        Ok(())
    }
}

delegate_lifecycle!(I2cMaster, I2cBackend);

fn check_address(capabilities: I2cCapabilities, address: I2cAddress) -> HalResult<()> {
    if !address.is_well_formed() {
        return Err(ErrorKind::InvalidArgument);
    }
    if matches!(address, I2cAddress::TenBit(_)) && !capabilities.ten_bit {
        return Err(ErrorKind::InvalidArgument);
    }
    Ok(())
}
