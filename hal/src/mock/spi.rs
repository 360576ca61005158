use heapless::Vec;

use super::{bytes, fill_from, Bytes, MockLifecycle, Reply, Script, LOG_DEPTH};
use crate::binding::{BackendInfo, ThreadSafety};
use crate::error::HalResult;
use crate::spi::{SpiBackend, SpiCapabilities, SpiConfig};
use crate::time::Timeout;

/// Data operation observed by [`MockSpi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpiCall {
    Transfer { output: Bytes, len: usize, fill: u8 },
    Write { bytes: Bytes },
}

/// Recording SPI backend
///
/// Without a scripted reply, MISO is looped back to MOSI: every clocked-in
/// byte equals the byte clocked out, fill bytes included.
#[derive(Debug, Clone)]
pub struct MockSpi {
    pub lifecycle: MockLifecycle<SpiConfig>,
    pub capabilities: SpiCapabilities,
    pub script: Script,
    calls: Vec<SpiCall, LOG_DEPTH>,
}

impl MockSpi {
    pub const INFO: BackendInfo = BackendInfo::new("mock-spi", 2, ThreadSafety::NotThreadSafe);

    pub fn new() -> Self {
        Self::with_info(Self::INFO)
    }

    pub fn with_info(info: BackendInfo) -> Self {
        Self {
            lifecycle: MockLifecycle::new(info),
            capabilities: SpiCapabilities::default(),
            script: Script::new(),
            calls: Vec::new(),
        }
    }

    pub fn queue(&mut self, reply: Reply) -> Result<(), Reply> {
        self.script.push(reply)
    }

    pub fn calls(&self) -> &[SpiCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl Default for MockSpi {
    fn default() -> Self {
        Self::new()
    }
}

mock_backend!(MockSpi, SpiConfig);

impl SpiBackend for MockSpi {
    fn capabilities(&self) -> SpiCapabilities {
        self.capabilities
    }

    fn transfer(
        &mut self,
        output: &[u8],
        input: &mut [u8],
        fill: u8,
        _timeout: Timeout,
    ) -> HalResult<()> {
        let _ = self.calls.push(SpiCall::Transfer {
            output: bytes(output),
            len: input.len(),
            fill,
        });
        match self.script.pop() {
            None => {
                for (i, slot) in input.iter_mut().enumerate() {
                    *slot = output.get(i).copied().unwrap_or(fill);
                }
                Ok(())
            }
            Some(Reply::Data(data)) => {
                fill_from(input, &data);
                Ok(())
            }
            Some(Reply::Fail(e)) => Err(e),
            Some(Reply::FailAfterWrite(e)) => {
                input.fill(0xEE);
                Err(e)
            }
        }
    }

    fn write(&mut self, output: &[u8], _timeout: Timeout) -> HalResult<()> {
        let _ = self.calls.push(SpiCall::Write {
            bytes: bytes(output),
        });
        match self.script.pop() {
            Some(Reply::Fail(e)) | Some(Reply::FailAfterWrite(e)) => Err(e),
            _ => Ok(()),
        }
    }
}
