//! Simulated hardware faults
//!
//! Simulation backends fail with [`SimFault`] internally and convert at the
//! contract boundary, where every variant becomes exactly one [`ErrorKind`].

use std::collections::VecDeque;

use hal::{ConfigExt, ErrorKind};
use thiserror::Error;

/// `ConfigExt` tag understood by every simulation backend
pub const SIM_EXT_TAG: u16 = 0x5349;

/// Internal failure of a simulation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimFault {
    #[error("no device acknowledged address {address:#x}")]
    Nack { address: u16 },
    #[error("arbitration lost")]
    ArbitrationLost,
    #[error("bus held by another transaction")]
    BusBusy,
    #[error("bus lock not acquired in time")]
    LockTimeout,
    #[error("peripheral stalled")]
    Stalled,
    #[error("framing error: line settings differ between endpoints")]
    Framing,
    #[error("receive overrun")]
    Overrun,
    #[error("instance {0} does not exist on this backend")]
    NoSuchInstance(u16),
    #[error("instance {0} is already claimed")]
    Claimed(u16),
    #[error("unsupported extension tag {0:#x}")]
    UnsupportedExt(u16),
}

impl From<SimFault> for ErrorKind {
    fn from(fault: SimFault) -> Self {
        match fault {
            SimFault::Nack { .. }
            | SimFault::ArbitrationLost
            | SimFault::Framing
            | SimFault::Overrun => ErrorKind::HardwareFailure,
            SimFault::BusBusy | SimFault::Claimed(_) => ErrorKind::Busy,
            SimFault::LockTimeout | SimFault::Stalled => ErrorKind::Timeout,
            SimFault::NoSuchInstance(_) => ErrorKind::InvalidArgument,
            SimFault::UnsupportedExt(_) => ErrorKind::InvalidConfig,
        }
    }
}

/// Reject extension slots meant for some other backend
pub fn check_ext(ext: &ConfigExt) -> Result<(), SimFault> {
    if ext.is_none() || ext.tag == SIM_EXT_TAG {
        Ok(())
    } else {
        Err(SimFault::UnsupportedExt(ext.tag))
    }
}

/// One-shot faults queued for upcoming operations
#[derive(Debug, Default)]
pub struct FaultQueue {
    pending: VecDeque<SimFault>,
}

impl FaultQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next operation with `fault`
    pub fn inject(&mut self, fault: SimFault) {
        log::debug!("fault queued: {}", fault);
        self.pending.push_back(fault);
    }

    /// `Err` with the oldest queued fault, if any
    pub fn take(&mut self) -> Result<(), SimFault> {
        match self.pending.pop_front() {
            Some(fault) => {
                log::debug!("fault injected: {}", fault);
                Err(fault)
            }
            None => Ok(()),
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
