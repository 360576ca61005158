//! Recording mock backends
//!
//! Each mock records the calls it receives into a fixed-capacity log (the
//! first [`LOG_DEPTH`], later ones are dropped silently) and answers data
//! operations from a queue of scripted [`Reply`]s. Nothing allocates, so the
//! mocks work in `no_std` test harnesses too.
//!
//! ```
//! use hal::i2c::{I2cAddress, I2cConfig, I2cMaster};
//! use hal::mock::{I2cCall, MockI2c};
//! use hal::Lifecycle;
//!
//! let mut mock = MockI2c::new();
//! let mut bus = I2cMaster::new(0, &mut mock);
//! bus.init().unwrap();
//! bus.set_config(&I2cConfig::FAST).unwrap();
//! bus.write(I2cAddress::SevenBit(0x50), &[1, 2, 3]).unwrap();
//! drop(bus);
//!
//! assert_eq!(mock.calls().len(), 1);
//! assert!(matches!(&mock.calls()[0], I2cCall::Write { bytes, .. } if bytes[..] == [1, 2, 3]));
//! ```

/// Implement `Backend` by forwarding to a `lifecycle: MockLifecycle` field
macro_rules! mock_backend {
    ($mock:ty, $config:ty) => {
        impl $crate::binding::Backend for $mock {
            type Config = $config;

            fn info(&self) -> $crate::binding::BackendInfo {
                self.lifecycle.info
            }

            fn init(&mut self, id: $crate::binding::PeripheralId) -> $crate::error::HalResult<()> {
                self.lifecycle.init(id)
            }

            fn configure(&mut self, config: &$config) -> $crate::error::HalResult<()> {
                self.lifecycle.configure(config)
            }

            fn deinit(&mut self) -> $crate::error::HalResult<()> {
                self.lifecycle.deinit()
            }
        }
    };
}

mod gpio;
mod i2c;
mod spi;
mod uart;

pub use gpio::{GpioCall, MockGpio};
pub use i2c::{I2cCall, MockI2c};
pub use spi::{MockSpi, SpiCall};
pub use uart::{MockUart, UartCall};

use heapless::{Deque, Vec};

use crate::binding::{BackendInfo, PeripheralId};
use crate::error::{ErrorKind, HalResult};

/// Calls kept per log
///
/// Once a log is full, further calls are still answered but no longer
/// recorded.
pub const LOG_DEPTH: usize = 32;

/// Bytes kept per recorded buffer; longer buffers are truncated
pub const DATA_DEPTH: usize = 64;

/// Replies that can be queued ahead of time
pub const SCRIPT_DEPTH: usize = 8;

/// Recorded payload
pub type Bytes = Vec<u8, DATA_DEPTH>;

/// Copy up to [`DATA_DEPTH`] bytes into a recorded payload
pub fn bytes(data: &[u8]) -> Bytes {
    let mut out = Bytes::new();
    let _ = out.extend_from_slice(&data[..data.len().min(DATA_DEPTH)]);
    out
}

/// Scripted answer to the next data operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Succeed; received bytes come from this payload (zero-padded)
    Data(Bytes),
    /// Fail before anything reaches the bus
    Fail(ErrorKind),
    /// Complete the write phase, scribble over the receive buffer, then fail
    FailAfterWrite(ErrorKind),
}

/// Lifecycle hook invocations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCall {
    Init(PeripheralId),
    Configure,
    Deinit,
}

/// Lifecycle half shared by every mock
#[derive(Debug, Clone)]
pub struct MockLifecycle<C> {
    pub info: BackendInfo,
    pub calls: Vec<LifecycleCall, LOG_DEPTH>,
    /// Last configuration passed to `configure`
    pub config: Option<C>,
    pub fail_init: Option<ErrorKind>,
    pub fail_configure: Option<ErrorKind>,
    /// Successful `configure` calls before `fail_configure` takes effect;
    /// `None` applies it from the first call
    pub fail_configure_after: Option<usize>,
    pub fail_deinit: Option<ErrorKind>,
    accepted: usize,
}

impl<C: Copy> MockLifecycle<C> {
    pub const fn new(info: BackendInfo) -> Self {
        Self {
            info,
            calls: Vec::new(),
            config: None,
            fail_init: None,
            fail_configure: None,
            fail_configure_after: None,
            fail_deinit: None,
            accepted: 0,
        }
    }

    fn init(&mut self, id: PeripheralId) -> HalResult<()> {
        let _ = self.calls.push(LifecycleCall::Init(id));
        self.fail_init.map_or(Ok(()), Err)
    }

    fn configure(&mut self, config: &C) -> HalResult<()> {
        let _ = self.calls.push(LifecycleCall::Configure);
        if let Some(e) = self.fail_configure {
            if self.fail_configure_after.map_or(true, |n| self.accepted >= n) {
                return Err(e);
            }
        }
        self.accepted += 1;
        self.config = Some(*config);
        Ok(())
    }

    fn deinit(&mut self) -> HalResult<()> {
        let _ = self.calls.push(LifecycleCall::Deinit);
        self.config = None;
        self.fail_deinit.map_or(Ok(()), Err)
    }

    /// Number of recorded `init` calls
    pub fn inits(&self) -> usize {
        self.count(|call| matches!(call, LifecycleCall::Init(_)))
    }

    /// Number of recorded `deinit` calls
    pub fn deinits(&self) -> usize {
        self.count(|call| matches!(call, LifecycleCall::Deinit))
    }

    fn count(&self, pred: impl Fn(&LifecycleCall) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }
}

/// Queue of scripted replies
#[derive(Debug, Clone, Default)]
pub struct Script {
    replies: Deque<Reply, SCRIPT_DEPTH>,
}

impl Script {
    pub const fn new() -> Self {
        Self {
            replies: Deque::new(),
        }
    }

    /// Queue a reply; hands it back if the script is full
    pub fn push(&mut self, reply: Reply) -> Result<(), Reply> {
        self.replies.push_back(reply)
    }

    /// Next reply, if any
    pub fn pop(&mut self) -> Option<Reply> {
        self.replies.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }
}

/// Copy `data` into `buffer`, zero-filling the rest
fn fill_from(buffer: &mut [u8], data: &[u8]) {
    let n = data.len().min(buffer.len());
    buffer[..n].copy_from_slice(&data[..n]);
    buffer[n..].fill(0);
}
