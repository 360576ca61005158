//! Timeouts, deadlines and cooperative polling
//!
//! Contracts never block indefinitely: every data operation carries a
//! [`Timeout`], either passed explicitly or inherited from configuration.
//! Backends check it at their own poll points, typically through
//! [`block_until`].

use core::fmt;

use crate::error::{ErrorKind, HalResult};

/// Upper bound on how long an operation may block
///
/// There is no "forever" value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timeout(u32);

impl Timeout {
    /// Poll once, never wait
    pub const IMMEDIATE: Self = Self(0);

    /// Default timeout used by configuration presets (100 ms)
    pub const DEFAULT: Self = Self::from_millis(100);

    /// Create a timeout from microseconds
    pub const fn from_micros(us: u32) -> Self {
        Self(us)
    }

    /// Create a timeout from milliseconds (saturating)
    pub const fn from_millis(ms: u32) -> Self {
        Self(ms.saturating_mul(1_000))
    }

    /// Timeout in microseconds
    pub const fn as_micros(self) -> u32 {
        self.0
    }

    /// Timeout in whole milliseconds
    pub const fn as_millis(self) -> u32 {
        self.0 / 1_000
    }

    /// Whether this timeout allows no waiting at all
    pub const fn is_immediate(self) -> bool {
        self.0 == 0
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Timeout {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}us", self.0);
    }
}

/// Monotonic time source used by backends to evaluate deadlines
pub trait Clock {
    /// Microseconds since an arbitrary, fixed epoch
    fn now_micros(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_micros(&self) -> u64 {
        (**self).now_micros()
    }
}

/// Absolute point in time after which an operation must give up
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline {
    at: u64,
}

impl Deadline {
    /// Deadline `timeout` from now
    pub fn after<C: Clock + ?Sized>(clock: &C, timeout: Timeout) -> Self {
        Self {
            at: clock
                .now_micros()
                .saturating_add(u64::from(timeout.as_micros())),
        }
    }

    /// Whether the deadline has passed
    pub fn has_expired<C: Clock + ?Sized>(&self, clock: &C) -> bool {
        clock.now_micros() >= self.at
    }

    /// Time left before the deadline
    pub fn remaining<C: Clock + ?Sized>(&self, clock: &C) -> Timeout {
        let left = self.at.saturating_sub(clock.now_micros());
        Timeout::from_micros(u32::try_from(left).unwrap_or(u32::MAX))
    }

    /// `Err(Timeout)` once the deadline has passed
    pub fn check<C: Clock + ?Sized>(&self, clock: &C) -> HalResult<()> {
        if self.has_expired(clock) {
            Err(ErrorKind::Timeout)
        } else {
            Ok(())
        }
    }
}

/// Poll `poll` until it completes, fails, or `timeout` elapses
///
/// `poll` returns `Err(nb::Error::WouldBlock)` while the hardware is not
/// ready. It is always called at least once, so an immediate timeout still
/// gets one attempt.
pub fn block_until<C, T, F>(clock: &C, timeout: Timeout, mut poll: F) -> HalResult<T>
where
    C: Clock + ?Sized,
    F: FnMut() -> nb::Result<T, ErrorKind>,
{
    let deadline = Deadline::after(clock, timeout);
    loop {
        match poll() {
            Ok(value) => return Ok(value),
            Err(nb::Error::Other(e)) => return Err(e),
            Err(nb::Error::WouldBlock) => {
                if deadline.has_expired(clock) {
                    return Err(ErrorKind::Timeout);
                }
                core::hint::spin_loop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    /// Advances by `step` microseconds on every read
    struct SteppingClock {
        now: Cell<u64>,
        step: u64,
    }

    impl Clock for SteppingClock {
        fn now_micros(&self) -> u64 {
            let now = self.now.get();
            self.now.set(now + self.step);
            now
        }
    }

    #[test]
    fn timeout_conversions() {
        assert_eq!(Timeout::from_millis(5).as_micros(), 5_000);
        assert_eq!(Timeout::from_micros(2_500).as_millis(), 2);
        assert_eq!(Timeout::from_millis(u32::MAX).as_micros(), u32::MAX);
        assert!(Timeout::IMMEDIATE.is_immediate());
        assert_eq!(Timeout::default(), Timeout::from_millis(100));
    }

    #[test]
    fn deadline_expires() {
        let clock = SteppingClock { now: Cell::new(0), step: 10 };
        let deadline = Deadline::after(&clock, Timeout::from_micros(25));
        assert!(deadline.check(&clock).is_ok());
        assert!(deadline.check(&clock).is_ok());
        assert_eq!(deadline.check(&clock), Err(ErrorKind::Timeout));
    }

    #[test]
    fn block_until_times_out() {
        let clock = SteppingClock { now: Cell::new(0), step: 100 };
        let result: HalResult<()> =
            block_until(&clock, Timeout::from_millis(1), || Err(nb::Error::WouldBlock));
        assert_eq!(result, Err(ErrorKind::Timeout));
    }

    #[test]
    fn block_until_completes_and_propagates() {
        let clock = SteppingClock { now: Cell::new(0), step: 1 };
        let mut polls = 0;
        let value = block_until(&clock, Timeout::from_millis(1), || {
            polls += 1;
            if polls < 3 {
                Err(nb::Error::WouldBlock)
            } else {
                Ok(polls)
            }
        });
        assert_eq!(value, Ok(3));

        let failed: HalResult<()> = block_until(&clock, Timeout::IMMEDIATE, || {
            Err(nb::Error::Other(ErrorKind::HardwareFailure))
        });
        assert_eq!(failed, Err(ErrorKind::HardwareFailure));
    }

    #[test]
    fn immediate_timeout_polls_once() {
        let clock = SteppingClock { now: Cell::new(0), step: 1 };
        let mut polls = 0;
        let result: HalResult<()> = block_until(&clock, Timeout::IMMEDIATE, || {
            polls += 1;
            Err(nb::Error::WouldBlock)
        });
        assert_eq!(result, Err(ErrorKind::Timeout));
        assert_eq!(polls, 1);
    }
}
