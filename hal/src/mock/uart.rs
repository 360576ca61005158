use heapless::{Deque, Vec};

use super::{bytes, Bytes, MockLifecycle, Reply, Script, LOG_DEPTH};
use crate::binding::{BackendInfo, ThreadSafety};
use crate::error::{ErrorKind, HalResult};
use crate::time::Timeout;
use crate::uart::{UartBackend, UartCapabilities, UartConfig};

/// Bytes the receive queue can hold
pub const RX_DEPTH: usize = 128;

/// Bytes of transmitted data kept
pub const TX_DEPTH: usize = 256;

/// Data operation observed by [`MockUart`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UartCall {
    Write { bytes: Bytes },
    Read { len: usize, timeout: Timeout },
    Flush,
}

/// Recording UART backend
///
/// Received bytes come from a queue filled with [`MockUart::feed`]; a read
/// with nothing queued times out immediately. Scripted `Fail` replies take
/// precedence over queued data.
#[derive(Debug, Clone)]
pub struct MockUart {
    pub lifecycle: MockLifecycle<UartConfig>,
    pub capabilities: UartCapabilities,
    pub script: Script,
    /// Largest number of bytes a single read returns
    pub max_chunk: usize,
    rx: Deque<u8, RX_DEPTH>,
    tx: Vec<u8, TX_DEPTH>,
    calls: Vec<UartCall, LOG_DEPTH>,
}

impl MockUart {
    pub const INFO: BackendInfo = BackendInfo::new("mock-uart", 2, ThreadSafety::NotThreadSafe);

    pub fn new() -> Self {
        Self::with_info(Self::INFO)
    }

    pub fn with_info(info: BackendInfo) -> Self {
        Self {
            lifecycle: MockLifecycle::new(info),
            capabilities: UartCapabilities::default(),
            script: Script::new(),
            max_chunk: usize::MAX,
            rx: Deque::new(),
            tx: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Make `data` available to subsequent reads
    ///
    /// Returns the number of bytes queued; the rest did not fit.
    pub fn feed(&mut self, data: &[u8]) -> usize {
        data.iter()
            .take_while(|&&byte| self.rx.push_back(byte).is_ok())
            .count()
    }

    /// Everything written so far
    pub fn transmitted(&self) -> &[u8] {
        &self.tx
    }

    pub fn queue(&mut self, reply: Reply) -> Result<(), Reply> {
        self.script.push(reply)
    }

    pub fn calls(&self) -> &[UartCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn scripted_failure(&mut self) -> HalResult<()> {
        match self.script.pop() {
            Some(Reply::Fail(e)) | Some(Reply::FailAfterWrite(e)) => Err(e),
            _ => Ok(()),
        }
    }
}

impl Default for MockUart {
    fn default() -> Self {
        Self::new()
    }
}

mock_backend!(MockUart, UartConfig);

impl UartBackend for MockUart {
    fn capabilities(&self) -> UartCapabilities {
        self.capabilities
    }

    fn write(&mut self, data: &[u8], _timeout: Timeout) -> HalResult<()> {
        let _ = self.calls.push(UartCall::Write { bytes: bytes(data) });
        self.scripted_failure()?;
        let _ = self.tx.extend_from_slice(&data[..data.len().min(TX_DEPTH - self.tx.len())]);
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8], timeout: Timeout) -> HalResult<usize> {
        let _ = self.calls.push(UartCall::Read {
            len: buffer.len(),
            timeout,
        });
        self.scripted_failure()?;
        if self.rx.is_empty() {
            return Err(ErrorKind::Timeout);
        }
        let mut n = 0;
        while n < buffer.len().min(self.max_chunk) {
            match self.rx.pop_front() {
                Some(byte) => {
                    buffer[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn flush(&mut self, _timeout: Timeout) -> HalResult<()> {
        let _ = self.calls.push(UartCall::Flush);
        self.scripted_failure()
    }
}
