//! Register-level GPIO bank
//!
//! A bare-metal style backend: 32 pins share one set of bank registers, and
//! every register update happens inside a critical section, so a
//! read-modify-write on one pin never loses a concurrent update to another.
//! The bank can live in a `static`.

use core::cell::RefCell;

use critical_section::Mutex;
use hal::binding::{Backend, BackendInfo, PeripheralId, ThreadSafety};
use hal::gpio::{Direction, GpioBackend, GpioCapabilities, GpioConfig, Level, Pull};
use hal::{ErrorKind, HalResult};

use crate::fault::{check_ext, SimFault};

/// Pins per bank
pub const BANK_WIDTH: u16 = 32;

#[derive(Debug, Clone, Copy, Default)]
struct BankRegs {
    /// 1 = output
    dir: u32,
    out: u32,
    pull_up: u32,
    pull_down: u32,
    /// Pins with an external driver attached
    external: u32,
    /// Level applied by external drivers
    external_level: u32,
    claimed: u32,
}

impl BankRegs {
    const RESET: Self = Self {
        dir: 0,
        out: 0,
        pull_up: 0,
        pull_down: 0,
        external: 0,
        external_level: 0,
        claimed: 0,
    };

    fn level(&self, mask: u32) -> Level {
        let high = if self.dir & mask != 0 {
            self.out & mask != 0
        } else if self.external & mask != 0 {
            self.external_level & mask != 0
        } else {
            // floating pins read low
            self.pull_up & mask != 0
        };
        Level::from(high)
    }
}

fn set_bits(reg: &mut u32, mask: u32, on: bool) {
    if on {
        *reg |= mask;
    } else {
        *reg &= !mask;
    }
}

/// One bank of 32 pins
pub struct PinBank {
    regs: Mutex<RefCell<BankRegs>>,
}

impl PinBank {
    pub const fn new() -> Self {
        Self {
            regs: Mutex::new(RefCell::new(BankRegs::RESET)),
        }
    }

    /// Backend for one pin of this bank; the pin is chosen at `init`
    pub fn pin(&self) -> BankPin<'_> {
        BankPin {
            bank: self,
            mask: None,
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut BankRegs) -> R) -> R {
        critical_section::with(|cs| f(&mut self.regs.borrow_ref_mut(cs)))
    }

    /// Drive input `pin` from outside the chip
    pub fn drive_input(&self, pin: u8, level: Level) {
        let mask = bit(pin);
        self.with(|regs| {
            regs.external |= mask;
            set_bits(&mut regs.external_level, mask, level.is_high());
        });
    }

    /// Disconnect the external driver from `pin`; it floats to its pull
    pub fn release_input(&self, pin: u8) {
        let mask = bit(pin);
        self.with(|regs| regs.external &= !mask);
    }

    /// Level currently seen on `pin`
    pub fn level(&self, pin: u8) -> Level {
        let mask = bit(pin);
        self.with(|regs| regs.level(mask))
    }

    pub fn is_output(&self, pin: u8) -> bool {
        let mask = bit(pin);
        self.with(|regs| regs.dir & mask != 0)
    }

    pub fn is_claimed(&self, pin: u8) -> bool {
        let mask = bit(pin);
        self.with(|regs| regs.claimed & mask != 0)
    }
}

impl Default for PinBank {
    fn default() -> Self {
        Self::new()
    }
}

fn bit(pin: u8) -> u32 {
    1u32.checked_shl(u32::from(pin)).unwrap_or(0)
}

/// Backend for a single pin of a [`PinBank`]
pub struct BankPin<'a> {
    bank: &'a PinBank,
    mask: Option<u32>,
}

impl<'a> BankPin<'a> {
    fn mask(&self) -> HalResult<u32> {
        self.mask.ok_or(ErrorKind::NotInitialized)
    }
}

impl<'a> Backend for BankPin<'a> {
    type Config = GpioConfig;

    fn info(&self) -> BackendInfo {
        BackendInfo::new("sim-gpio", BANK_WIDTH, ThreadSafety::LockFree)
    }

    fn init(&mut self, id: PeripheralId) -> HalResult<()> {
        let pin = id.index();
        if pin >= BANK_WIDTH {
            return Err(SimFault::NoSuchInstance(pin).into());
        }
        let mask = 1u32 << pin;
        self.bank.with(|regs| {
            if regs.claimed & mask != 0 {
                return Err(SimFault::Claimed(pin));
            }
            regs.claimed |= mask;
            Ok(())
        })?;
        self.mask = Some(mask);
        log::debug!("gpio{}: claimed", pin);
        Ok(())
    }

    fn configure(&mut self, config: &GpioConfig) -> HalResult<()> {
        check_ext(&config.ext)?;
        let mask = self.mask()?;
        self.bank.with(|regs| {
            set_bits(&mut regs.pull_up, mask, config.pull == Pull::Up);
            set_bits(&mut regs.pull_down, mask, config.pull == Pull::Down);
            if config.direction == Direction::Output {
                set_bits(&mut regs.out, mask, config.initial.is_high());
            }
            set_bits(&mut regs.dir, mask, config.direction == Direction::Output);
        });
        Ok(())
    }

    fn deinit(&mut self) -> HalResult<()> {
        if let Some(mask) = self.mask.take() {
            self.bank.with(|regs| {
                regs.dir &= !mask;
                regs.out &= !mask;
                regs.pull_up &= !mask;
                regs.pull_down &= !mask;
                regs.claimed &= !mask;
            });
        }
        Ok(())
    }
}

impl<'a> GpioBackend for BankPin<'a> {
    fn capabilities(&self) -> GpioCapabilities {
        GpioCapabilities {
            pull_up: true,
            pull_down: true,
            open_drain: false,
        }
    }

    fn set_direction(&mut self, direction: Direction) -> HalResult<()> {
        let mask = self.mask()?;
        self.bank
            .with(|regs| set_bits(&mut regs.dir, mask, direction == Direction::Output));
        Ok(())
    }

    fn read_level(&mut self) -> HalResult<Level> {
        let mask = self.mask()?;
        Ok(self.bank.with(|regs| regs.level(mask)))
    }

    fn write_level(&mut self, level: Level) -> HalResult<()> {
        let mask = self.mask()?;
        self.bank
            .with(|regs| set_bits(&mut regs.out, mask, level.is_high()));
        Ok(())
    }

    fn toggle(&mut self) -> HalResult<()> {
        let mask = self.mask()?;
        self.bank.with(|regs| regs.out ^= mask);
        Ok(())
    }
}
