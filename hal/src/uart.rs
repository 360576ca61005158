//! UART (Universal Asynchronous Receiver/Transmitter) contract
//!
//! The backend contract is small: write everything, read at
//! least one byte, flush. Framed reads live in [`framing`].

use crate::binding::{Backend, ConfigExt, PeripheralConfig, PeripheralKind};
use crate::context::Context;
use crate::error::{ErrorKind, HalResult};
use crate::time::Timeout;

/// UART data bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl DataBits {
    pub const fn bits(self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

/// UART stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}

/// UART parity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// UART flow control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlowControl {
    None,
    RtsCts,
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub flow_control: FlowControl,
    /// Bound for `write` and `flush`
    pub timeout: Timeout,
    pub ext: ConfigExt,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self::BAUD_115200_8N1
    }
}

impl UartConfig {
    /// 115200 baud, 8 data bits, no parity, one stop bit
    pub const BAUD_115200_8N1: Self = Self {
        baud_rate: 115_200,
        data_bits: DataBits::Eight,
        stop_bits: StopBits::One,
        parity: Parity::None,
        flow_control: FlowControl::None,
        timeout: Timeout::DEFAULT,
        ext: ConfigExt::NONE,
    };

    /// 9600 baud, 8N1
    pub const BAUD_9600_8N1: Self = Self {
        baud_rate: 9_600,
        ..Self::BAUD_115200_8N1
    };

    pub const fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub const fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub const fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub const fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    pub const fn with_flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
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

    /// Whether two endpoints with these settings can talk to each other
    pub fn line_matches(&self, other: &UartConfig) -> bool {
        self.baud_rate == other.baud_rate
            && self.data_bits == other.data_bits
            && self.stop_bits == other.stop_bits
            && self.parity == other.parity
    }
}

impl PeripheralConfig for UartConfig {
    const KIND: PeripheralKind = PeripheralKind::Uart;

    fn validate(&self) -> HalResult<()> {
        if self.baud_rate == 0 {
            return Err(ErrorKind::InvalidConfig);
        }
        Ok(())
    }
}

/// Limits a UART backend declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartCapabilities {
    pub max_baud_rate: u32,
    /// Narrowest supported character
    pub min_data_bits: DataBits,
    pub hardware_flow_control: bool,
}

impl Default for UartCapabilities {
    fn default() -> Self {
        Self {
            max_baud_rate: 921_600,
            min_data_bits: DataBits::Seven,
            hardware_flow_control: false,
        }
    }
}

/// UART backend
pub trait UartBackend: Backend<Config = UartConfig> {
    fn capabilities(&self) -> UartCapabilities;

    /// Queue every byte of `bytes` for transmission
    fn write(&mut self, bytes: &[u8], timeout: Timeout) -> HalResult<()>;

    /// Receive at least one and at most `buffer.len()` bytes
    ///
    /// Returns `Timeout` if nothing arrived in time.
    fn read(&mut self, buffer: &mut [u8], timeout: Timeout) -> HalResult<usize>;

    /// Wait until every queued byte has left the transmitter
    fn flush(&mut self, timeout: Timeout) -> HalResult<()>;
}

/// UART port context bound to backend `B`
pub struct UartPort<'b, B: ?Sized + UartBackend> {
    ctx: Context<'b, B>,
}

/// UART port bound through dynamic dispatch
pub type DynUart<'b> = UartPort<'b, dyn UartBackend + 'b>;

impl<'b, B: ?Sized + UartBackend> UartPort<'b, B> {
    /// Bind `backend` to port `id`
    pub fn new(id: u16, backend: &'b mut B) -> Self {
        Self {
            ctx: Context::new(id, backend),
        }
    }

    pub fn context(&self) -> &Context<'b, B> {
        &self.ctx
    }

    fn check_config(backend: &B, config: &UartConfig) -> HalResult<()> {
        let caps = backend.capabilities();
        if config.baud_rate > caps.max_baud_rate || config.data_bits < caps.min_data_bits {
            return Err(ErrorKind::InvalidConfig);
        }
        if config.flow_control == FlowControl::RtsCts && !caps.hardware_flow_control {
            return Err(ErrorKind::InvalidConfig);
        }
        Ok(())
    }

    /// Transmit `bytes` within the configured timeout
    pub fn write(&mut self, bytes: &[u8]) -> HalResult<()> {
        let (backend, config) = self.ctx.operate()?;
        if bytes.is_empty() {
            return Ok(());
        }
        backend.write(bytes, config.timeout)
    }

    /// Receive up to `buffer.len()` bytes
    ///
    /// Returns the number of bytes received, at least one unless `buffer` is
    /// empty.
    pub fn read(&mut self, buffer: &mut [u8], timeout: Timeout) -> HalResult<usize> {
        let (backend, _) = self.ctx.operate()?;
        if buffer.is_empty() {
            return Ok(0);
        }
        backend.read(buffer, timeout)
    }

    /// Block until transmission completes, within the configured timeout
    pub fn flush(&mut self) -> HalResult<()> {
        let (backend, config) = self.ctx.operate()?;
        backend.flush(config.timeout)
    }
}

delegate_lifecycle!(UartPort, UartBackend);

impl<'b, B: ?Sized + UartBackend> framing::ReadSome for UartPort<'b, B> {
    fn read_some(&mut self, buffer: &mut [u8], timeout: Timeout) -> HalResult<usize> {
        self.read(buffer, timeout)
    }
}

pub mod framing {
    //! Framed reads over a byte stream
    //!
    //! Every helper takes one overall timeout and a [`Clock`] to track it;
    //! each underlying read gets only the time that is left.

    use crate::error::{ErrorKind, HalResult};
    use crate::time::{Clock, Deadline, Timeout};

    /// Source of "at least one byte" reads
    pub trait ReadSome {
        /// Read between one and `buffer.len()` bytes, or `Timeout`
        fn read_some(&mut self, buffer: &mut [u8], timeout: Timeout) -> HalResult<usize>;
    }

    /// Framed reads, available on every [`ReadSome`] source
    pub trait FramedRead: ReadSome {
        /// Fill `buffer` completely
        ///
        /// On `Timeout` the bytes received so far stay in `buffer`.
        fn read_exact<C: Clock + ?Sized>(
            &mut self,
            clock: &C,
            buffer: &mut [u8],
            timeout: Timeout,
        ) -> HalResult<()> {
            let deadline = Deadline::after(clock, timeout);
            let mut filled = 0;
            while filled < buffer.len() {
                if filled > 0 {
                    deadline.check(clock)?;
                }
                filled += self.read_some(&mut buffer[filled..], deadline.remaining(clock))?;
            }
            Ok(())
        }

        /// Read until `delimiter` has been received
        ///
        /// Returns the frame length including the delimiter. A frame that
        /// does not fit `buffer` is `InvalidArgument`.
        fn read_until<C: Clock + ?Sized>(
            &mut self,
            clock: &C,
            delimiter: u8,
            buffer: &mut [u8],
            timeout: Timeout,
        ) -> HalResult<usize> {
            let deadline = Deadline::after(clock, timeout);
            for len in 0..buffer.len() {
                if len > 0 {
                    deadline.check(clock)?;
                }
                self.read_some(&mut buffer[len..=len], deadline.remaining(clock))?;
                if buffer[len] == delimiter {
                    return Ok(len + 1);
                }
            }
            Err(ErrorKind::InvalidArgument)
        }

        /// Read one `\n`-terminated line
        ///
        /// The returned slice excludes the terminator and a preceding `\r`.
        fn read_line<'a, C: Clock + ?Sized>(
            &mut self,
            clock: &C,
            buffer: &'a mut [u8],
            timeout: Timeout,
        ) -> HalResult<&'a [u8]> {
            let len = self.read_until(clock, b'\n', buffer, timeout)?;
            let line = &buffer[..len - 1];
            Ok(line.strip_suffix(b"\r").unwrap_or(line))
        }
    }

    impl<T: ReadSome + ?Sized> FramedRead for T {}
}
