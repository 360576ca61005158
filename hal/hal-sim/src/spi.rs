//! Register-level SPI controller
//!
//! Models a polled controller: writing the data register starts shifting one
//! byte, the busy flag stays set for eight bit times at the configured
//! frequency, and the received byte is read back once busy clears. Busy is
//! polled through [`block_until`] against a single deadline covering the
//! whole transfer.

use hal::binding::{Backend, BackendInfo, PeripheralId, ThreadSafety};
use hal::spi::{BitOrder, SpiBackend, SpiCapabilities, SpiConfig, SpiMode};
use hal::time::{block_until, Clock, Deadline, Timeout};
use hal::{ErrorKind, HalResult};

use crate::fault::check_ext;

/// Byte returned when no device drives MISO
pub const IDLE_MISO: u8 = 0xFF;

/// Device model on the other end of the bus
pub trait SpiTarget {
    /// Chip select asserted
    fn select(&mut self) {}

    /// Exchange one byte in wire order
    fn exchange(&mut self, mosi: u8) -> u8;

    /// Chip select released
    fn deselect(&mut self) {}
}

/// Echo device: MISO repeats the byte just received on MOSI
#[derive(Debug, Default, Clone, Copy)]
pub struct Loopback;

impl SpiTarget for Loopback {
    fn exchange(&mut self, mosi: u8) -> u8 {
        mosi
    }
}

#[derive(Debug, Clone, Copy)]
struct Control {
    enabled: bool,
    frequency: u32,
    mode: SpiMode,
    lsb_first: bool,
}

/// Simulated SPI controller driven by clock `C`
pub struct SimSpi<C: Clock> {
    clock: C,
    control: Control,
    /// Busy until this clock reading
    busy_until: u64,
    stalled: bool,
    data: u8,
    target: Option<Box<dyn SpiTarget>>,
    clocked: u64,
}

impl<C: Clock> SimSpi<C> {
    /// Controller with nothing attached; MISO idles high
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            control: Control {
                enabled: false,
                frequency: 0,
                mode: SpiMode::Mode0,
                lsb_first: false,
            },
            busy_until: 0,
            stalled: false,
            data: IDLE_MISO,
            target: None,
            clocked: 0,
        }
    }

    /// Controller with MISO wired to MOSI
    pub fn loopback(clock: C) -> Self {
        let mut spi = Self::new(clock);
        spi.attach(Loopback);
        spi
    }

    /// Attach a device, replacing the previous one
    pub fn attach(&mut self, target: impl SpiTarget + 'static) {
        self.target = Some(Box::new(target));
    }

    pub fn detach(&mut self) {
        self.target = None;
    }

    /// Keep the busy flag set forever; transfers time out
    pub fn stall(&mut self, stalled: bool) {
        self.stalled = stalled;
    }

    /// Mode programmed by the last configuration
    pub fn mode(&self) -> SpiMode {
        self.control.mode
    }

    pub fn is_enabled(&self) -> bool {
        self.control.enabled
    }

    /// Bytes shifted since creation
    pub fn bytes_clocked(&self) -> u64 {
        self.clocked
    }

    fn byte_time(&self) -> u64 {
        let frequency = u64::from(self.control.frequency.max(1));
        8_000_000u64.div_ceil(frequency)
    }

    fn busy(&self) -> bool {
        self.stalled || self.clock.now_micros() < self.busy_until
    }

    fn wait_idle(&self, deadline: &Deadline) -> HalResult<()> {
        block_until(&self.clock, deadline.remaining(&self.clock), || {
            if self.busy() {
                Err(nb::Error::WouldBlock)
            } else {
                Ok(())
            }
        })
    }

    /// Write the data register, wait for the shift, read it back
    fn shift(&mut self, mosi: u8, deadline: &Deadline) -> HalResult<u8> {
        self.wait_idle(deadline)?;

        let lsb_first = self.control.lsb_first;
        let wire_out = if lsb_first { mosi.reverse_bits() } else { mosi };
        let wire_in = match self.target.as_mut() {
            Some(target) => target.exchange(wire_out),
            None => IDLE_MISO,
        };
        self.data = if lsb_first { wire_in.reverse_bits() } else { wire_in };
        self.busy_until = self.clock.now_micros().saturating_add(self.byte_time());
        self.clocked += 1;

        self.wait_idle(deadline)?;
        Ok(self.data)
    }

    fn with_selected<R>(&mut self, f: impl FnOnce(&mut Self) -> HalResult<R>) -> HalResult<R> {
        if !self.control.enabled {
            return Err(ErrorKind::NotConfigured);
        }
        if let Some(target) = self.target.as_mut() {
            target.select();
        }
        let result = f(self);
        if let Some(target) = self.target.as_mut() {
            target.deselect();
        }
        if let Err(e) = &result {
            log::trace!("spi: transfer failed after {} bytes: {:?}", self.clocked, e);
        }
        result
    }
}

impl<C: Clock> Backend for SimSpi<C> {
    type Config = SpiConfig;

    fn info(&self) -> BackendInfo {
        BackendInfo::new("sim-spi", 2, ThreadSafety::NotThreadSafe)
    }

    fn init(&mut self, _id: PeripheralId) -> HalResult<()> {
        self.busy_until = 0;
        self.data = IDLE_MISO;
        Ok(())
    }

    fn configure(&mut self, config: &SpiConfig) -> HalResult<()> {
        check_ext(&config.ext)?;
        self.control = Control {
            enabled: true,
            frequency: config.frequency,
            mode: config.mode,
            lsb_first: config.bit_order == BitOrder::LsbFirst,
        };
        Ok(())
    }

    fn deinit(&mut self) -> HalResult<()> {
        self.control.enabled = false;
        Ok(())
    }
}

impl<C: Clock> SpiBackend for SimSpi<C> {
    fn capabilities(&self) -> SpiCapabilities {
        SpiCapabilities {
            max_frequency: 20_000_000,
            lsb_first: true,
        }
    }

    fn transfer(
        &mut self,
        output: &[u8],
        input: &mut [u8],
        fill: u8,
        timeout: Timeout,
    ) -> HalResult<()> {
        let deadline = Deadline::after(&self.clock, timeout);
        self.with_selected(|spi| {
            for (i, slot) in input.iter_mut().enumerate() {
                let mosi = output.get(i).copied().unwrap_or(fill);
                *slot = spi.shift(mosi, &deadline)?;
            }
            Ok(())
        })
    }

    fn write(&mut self, output: &[u8], timeout: Timeout) -> HalResult<()> {
        let deadline = Deadline::after(&self.clock, timeout);
        self.with_selected(|spi| {
            for &byte in output {
                spi.shift(byte, &deadline)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::clock::ManualClock;
    use hal::{Lifecycle, SpiMaster};

    /// Records MOSI, answers with a fixed byte
    #[derive(Clone, Default)]
    struct Probe {
        seen: Rc<RefCell<Vec<u8>>>,
        selects: Rc<RefCell<u32>>,
    }

    impl SpiTarget for Probe {
        fn select(&mut self) {
            *self.selects.borrow_mut() += 1;
        }

        fn exchange(&mut self, mosi: u8) -> u8 {
            self.seen.borrow_mut().push(mosi);
            0x01
        }
    }

    #[test]
    fn loopback_pads_with_fill() {
        let mut sim = SimSpi::loopback(ManualClock::stepping(1));
        let mut bus = SpiMaster::new(0, &mut sim);
        bus.init().unwrap();
        bus.set_config(&SpiConfig::MODE0_1MHZ.with_fill(0xA5)).unwrap();
        let mut input = [0u8; 4];
        bus.transfer(&[1, 2], &mut input).unwrap();
        assert_eq!(input, [1, 2, 0xA5, 0xA5]);
        drop(bus);
        assert_eq!(sim.bytes_clocked(), 4);
    }

    #[test]
    fn lsb_first_reverses_wire_order() {
        let probe = Probe::default();
        let mut sim = SimSpi::new(ManualClock::stepping(1));
        sim.attach(probe.clone());
        let mut bus = SpiMaster::new(1, &mut sim);
        bus.init().unwrap();
        bus.set_config(&SpiConfig::MODE0_1MHZ.with_bit_order(BitOrder::LsbFirst))
            .unwrap();
        let mut input = [0u8; 1];
        bus.transfer(&[0x01], &mut input).unwrap();
        assert_eq!(*probe.seen.borrow(), [0x80]);
        assert_eq!(input, [0x80]);
        assert_eq!(*probe.selects.borrow(), 1);
    }

    #[test]
    fn no_device_reads_idle_level() {
        let mut sim = SimSpi::new(ManualClock::stepping(1));
        let mut bus = SpiMaster::new(0, &mut sim);
        bus.init().unwrap();
        bus.set_config(&SpiConfig::MODE0_1MHZ.with_mode(SpiMode::Mode3))
            .unwrap();
        let mut input = [0u8; 2];
        bus.read(&mut input).unwrap();
        assert_eq!(input, [IDLE_MISO; 2]);
        drop(bus);
        assert_eq!(sim.mode(), SpiMode::Mode3);
    }

    #[test]
    fn stalled_controller_times_out() {
        let mut sim = SimSpi::loopback(ManualClock::stepping(50));
        sim.stall(true);
        let mut bus = SpiMaster::new(0, &mut sim);
        bus.init().unwrap();
        bus.set_config(&SpiConfig::MODE0_1MHZ.with_timeout(Timeout::from_millis(1)))
            .unwrap();
        assert_eq!(bus.write(&[1, 2, 3]), Err(ErrorKind::Timeout));
    }

    #[test]
    fn slow_clock_exceeds_deadline() {
        // 8 us per byte at 1 MHz, 40 us allowed, each clock reading moves 1 us
        let mut sim = SimSpi::loopback(ManualClock::stepping(1));
        let mut bus = SpiMaster::new(0, &mut sim);
        bus.init().unwrap();
        bus.set_config(&SpiConfig::MODE0_1MHZ.with_timeout(Timeout::from_micros(40)))
            .unwrap();
        assert_eq!(bus.write(&[0; 16]), Err(ErrorKind::Timeout));
        assert_eq!(bus.write(&[0]), Ok(()));
    }

    #[test]
    fn deinit_disables_controller() {
        let mut sim = SimSpi::loopback(ManualClock::stepping(1));
        let mut bus = SpiMaster::new(0, &mut sim);
        bus.init().unwrap();
        bus.set_config(&SpiConfig::default()).unwrap();
        bus.deinit().unwrap();
        drop(bus);
        assert!(!sim.is_enabled());
    }
}
