use heapless::Vec;

use super::{bytes, fill_from, Bytes, MockLifecycle, Reply, Script, LOG_DEPTH};
use crate::binding::{BackendInfo, ThreadSafety};
use crate::error::HalResult;
use crate::i2c::{I2cAddress, I2cBackend, I2cCapabilities, I2cConfig};
use crate::time::Timeout;

/// Data operation observed by [`MockI2c`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum I2cCall {
    Write { address: I2cAddress, bytes: Bytes },
    Read { address: I2cAddress, len: usize },
    WriteRead { address: I2cAddress, bytes: Bytes, len: usize },
}

/// Recording I2C backend
///
/// Without a scripted reply, writes succeed and reads return zeros. Every
/// data operation pops one reply, writes included: a queued
/// [`Reply::Data`] meant for a later read is consumed and discarded by any
/// write that comes first.
#[derive(Debug, Clone)]
pub struct MockI2c {
    pub lifecycle: MockLifecycle<I2cConfig>,
    pub capabilities: I2cCapabilities,
    pub script: Script,
    /// Timeout passed with the most recent data operation
    pub last_timeout: Option<Timeout>,
    calls: Vec<I2cCall, LOG_DEPTH>,
}

impl MockI2c {
    pub const INFO: BackendInfo = BackendInfo::new("mock-i2c", 4, ThreadSafety::NotThreadSafe);

    pub fn new() -> Self {
        Self::with_info(Self::INFO)
    }

    pub fn with_info(info: BackendInfo) -> Self {
        Self {
            lifecycle: MockLifecycle::new(info),
            capabilities: I2cCapabilities {
                ten_bit: true,
                ..I2cCapabilities::default()
            },
            script: Script::new(),
            last_timeout: None,
            calls: Vec::new(),
        }
    }

    /// Queue the reply for the next data operation
    pub fn queue(&mut self, reply: Reply) -> Result<(), Reply> {
        self.script.push(reply)
    }

    /// Recorded data operations, oldest first
    pub fn calls(&self) -> &[I2cCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn record(&mut self, call: I2cCall, timeout: Timeout) {
        let _ = self.calls.push(call);
        self.last_timeout = Some(timeout);
    }

    fn answer(&mut self, buffer: &mut [u8]) -> HalResult<()> {
        match self.script.pop() {
            None => {
                buffer.fill(0);
                Ok(())
            }
            Some(Reply::Data(data)) => {
                fill_from(buffer, &data);
                Ok(())
            }
            Some(Reply::Fail(e)) => Err(e),
            Some(Reply::FailAfterWrite(e)) => {
                buffer.fill(0xEE);
                Err(e)
            }
        }
    }
}

impl Default for MockI2c {
    fn default() -> Self {
        Self::new()
    }
}

mock_backend!(MockI2c, I2cConfig);

impl I2cBackend for MockI2c {
    fn capabilities(&self) -> I2cCapabilities {
        self.capabilities
    }

    fn write(&mut self, address: I2cAddress, data: &[u8], timeout: Timeout) -> HalResult<()> {
        self.record(
            I2cCall::Write {
                address,
                bytes: bytes(data),
            },
            timeout,
        );
        match self.script.pop() {
            Some(Reply::Fail(e)) | Some(Reply::FailAfterWrite(e)) => Err(e),
            _ => Ok(()),
        }
    }

    fn read(&mut self, address: I2cAddress, buffer: &mut [u8], timeout: Timeout) -> HalResult<()> {
        self.record(
            I2cCall::Read {
                address,
                len: buffer.len(),
            },
            timeout,
        );
        self.answer(buffer)
    }

    fn write_read(
        &mut self,
        address: I2cAddress,
        data: &[u8],
        buffer: &mut [u8],
        timeout: Timeout,
    ) -> HalResult<()> {
        self.record(
            I2cCall::WriteRead {
                address,
                bytes: bytes(data),
                len: buffer.len(),
            },
            timeout,
        );
        self.answer(buffer)
    }
}
