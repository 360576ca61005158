//! Null-modem UART pair
//!
//! Two endpoints joined by a pair of bounded byte queues. Every byte travels
//! with the line settings of the endpoint that sent it, so a receiver
//! configured differently sees a framing error instead of data. Reads and
//! writes wait cooperatively through [`block_until`].

use std::collections::VecDeque;
use std::sync::Arc;

use hal::binding::{Backend, BackendInfo, PeripheralId, ThreadSafety};
use hal::time::{block_until, Clock, Deadline, Timeout};
use hal::uart::{DataBits, FlowControl, UartBackend, UartCapabilities, UartConfig};
use hal::{ErrorKind, HalResult};
use parking_lot::Mutex;

use crate::fault::{check_ext, FaultQueue, SimFault};

/// Bytes one direction of the link buffers before the sender waits
pub const LINE_CAPACITY: usize = 64;

#[derive(Default)]
struct Line {
    queue: VecDeque<(u8, UartConfig)>,
    /// Bytes dropped because the queue was full
    overrun: bool,
    faults: FaultQueue,
}

struct Link {
    /// Indexed by the receiving endpoint
    lines: [Line; 2],
    capacity: usize,
}

/// One end of a simulated serial link
pub struct SimUart<C: Clock> {
    clock: C,
    side: usize,
    link: Arc<Mutex<Link>>,
    config: Option<UartConfig>,
    sent: u64,
}

impl<C: Clock + Clone> SimUart<C> {
    /// Two connected endpoints, instance 0 and instance 1
    pub fn pair(clock: C) -> (Self, Self) {
        Self::pair_with_capacity(clock, LINE_CAPACITY)
    }

    pub fn pair_with_capacity(clock: C, capacity: usize) -> (Self, Self) {
        let link = Arc::new(Mutex::new(Link {
            lines: [Line::default(), Line::default()],
            capacity,
        }));
        let a = Self {
            clock: clock.clone(),
            side: 0,
            link: Arc::clone(&link),
            config: None,
            sent: 0,
        };
        let b = Self {
            clock,
            side: 1,
            link,
            config: None,
            sent: 0,
        };
        (a, b)
    }
}

impl<C: Clock> SimUart<C> {
    fn peer(&self) -> usize {
        1 - self.side
    }

    /// Fail this endpoint's next read with `fault`
    pub fn inject(&self, fault: SimFault) {
        self.link.lock().lines[self.side].faults.inject(fault);
    }

    /// Bytes waiting to be read by this endpoint
    pub fn pending(&self) -> usize {
        self.link.lock().lines[self.side].queue.len()
    }

    /// Bytes this endpoint has put on the wire
    pub fn bytes_sent(&self) -> u64 {
        self.sent
    }

    fn config(&self) -> HalResult<UartConfig> {
        self.config.ok_or(ErrorKind::NotConfigured)
    }
}

impl<C: Clock> Backend for SimUart<C> {
    type Config = UartConfig;

    fn info(&self) -> BackendInfo {
        BackendInfo::new("sim-uart", 2, ThreadSafety::SerializedPerContext)
    }

    fn init(&mut self, id: PeripheralId) -> HalResult<()> {
        if usize::from(id.index()) != self.side {
            return Err(SimFault::NoSuchInstance(id.index()).into());
        }
        Ok(())
    }

    fn configure(&mut self, config: &UartConfig) -> HalResult<()> {
        check_ext(&config.ext)?;
        self.config = Some(*config);
        Ok(())
    }

    fn deinit(&mut self) -> HalResult<()> {
        self.config = None;
        // a released receiver drops whatever was still queued for it
        let mut link = self.link.lock();
        let line = &mut link.lines[self.side];
        line.queue.clear();
        line.overrun = false;
        Ok(())
    }
}

impl<C: Clock> UartBackend for SimUart<C> {
    fn capabilities(&self) -> UartCapabilities {
        UartCapabilities {
            max_baud_rate: 3_000_000,
            min_data_bits: DataBits::Five,
            hardware_flow_control: true,
        }
    }

    fn write(&mut self, bytes: &[u8], timeout: Timeout) -> HalResult<()> {
        let config = self.config()?;
        let peer = self.peer();
        let deadline = Deadline::after(&self.clock, timeout);

        for &byte in bytes {
            block_until(&self.clock, deadline.remaining(&self.clock), || {
                let mut link = self.link.lock();
                let capacity = link.capacity;
                let line = &mut link.lines[peer];
                if line.queue.len() < capacity {
                    line.queue.push_back((byte, config));
                    Ok(())
                } else if config.flow_control == FlowControl::RtsCts {
                    // receiver holds CTS until there is room
                    Err(nb::Error::WouldBlock)
                } else {
                    line.overrun = true;
                    Ok(())
                }
            })?;
            self.sent += 1;
        }
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8], timeout: Timeout) -> HalResult<usize> {
        let config = self.config()?;
        let side = self.side;

        block_until(&self.clock, timeout, || {
            let mut link = self.link.lock();
            let line = &mut link.lines[side];
            line.faults
                .take()
                .map_err(|fault| nb::Error::Other(fault.into()))?;
            if line.overrun {
                line.overrun = false;
                return Err(nb::Error::Other(SimFault::Overrun.into()));
            }

            let mut count = 0;
            while count < buffer.len() {
                let Some(&(byte, sent_with)) = line.queue.front() else {
                    break;
                };
                if !sent_with.line_matches(&config) {
                    if count > 0 {
                        break;
                    }
                    line.queue.pop_front();
                    log::debug!("uart{}: framing error", side);
                    return Err(nb::Error::Other(SimFault::Framing.into()));
                }
                buffer[count] = byte;
                line.queue.pop_front();
                count += 1;
            }

            if count == 0 {
                Err(nb::Error::WouldBlock)
            } else {
                Ok(count)
            }
        })
    }

    fn flush(&mut self, _timeout: Timeout) -> HalResult<()> {
        // bytes are on the wire as soon as they are queued
        self.config().map(|_| ())
    }
}
