//! Shared I2C bus
//!
//! Models an RTOS-style driver: one physical bus, several contexts (one per
//! device driver) each holding a [`SharedI2c`] handle. Every transaction,
//! including both phases of a combined write-read, runs under the bus mutex,
//! and waiting for that mutex counts against the operation's timeout.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hal::binding::{Backend, BackendInfo, PeripheralId, ThreadSafety};
use hal::i2c::{I2cAddress, I2cBackend, I2cCapabilities, I2cConfig, I2cSpeed};
use hal::time::Timeout;
use hal::{ErrorKind, HalResult};
use parking_lot::Mutex;

use crate::fault::{check_ext, FaultQueue, SimFault};

/// Device model attached to a simulated bus
pub trait I2cTarget: Send {
    /// Data written by the master after the address phase
    fn write(&mut self, bytes: &[u8]) -> Result<(), SimFault>;

    /// Data requested by the master after the address phase
    fn read(&mut self, buffer: &mut [u8]) -> Result<(), SimFault>;
}

impl<T: I2cTarget> I2cTarget for Arc<Mutex<T>> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SimFault> {
        self.lock().write(bytes)
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<(), SimFault> {
        self.lock().read(buffer)
    }
}

/// Generic register-pointer device (EEPROMs, most sensors)
///
/// The first byte of a write selects the register; further bytes are
/// stored from there on. Reads start at the selected register. The pointer
/// auto-increments and wraps at 256.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    registers: [u8; 256],
    pointer: u8,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            registers: [0; 256],
            pointer: 0,
        }
    }

    /// Preload `values` starting at register `start`
    pub fn with_registers(mut self, start: u8, values: &[u8]) -> Self {
        for (offset, value) in values.iter().enumerate() {
            self.registers[usize::from(start.wrapping_add(offset as u8))] = *value;
        }
        self
    }

    pub fn get(&self, register: u8) -> u8 {
        self.registers[usize::from(register)]
    }

    pub fn set(&mut self, register: u8, value: u8) {
        self.registers[usize::from(register)] = value;
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cTarget for RegisterFile {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SimFault> {
        if let Some((&pointer, data)) = bytes.split_first() {
            self.pointer = pointer;
            for &byte in data {
                self.registers[usize::from(self.pointer)] = byte;
                self.pointer = self.pointer.wrapping_add(1);
            }
        }
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<(), SimFault> {
        for slot in buffer {
            *slot = self.registers[usize::from(self.pointer)];
            self.pointer = self.pointer.wrapping_add(1);
        }
        Ok(())
    }
}

struct Device {
    address: I2cAddress,
    target: Box<dyn I2cTarget>,
}

struct Bus {
    devices: Vec<Device>,
    faults: FaultQueue,
    transactions: u64,
    hold: Duration,
}

impl Bus {
    fn target(&mut self, address: I2cAddress) -> Result<&mut (dyn I2cTarget + 'static), SimFault> {
        self.devices
            .iter_mut()
            .find(|device| device.address == address)
            .map(|device| device.target.as_mut())
            .ok_or(SimFault::Nack {
                address: address.raw(),
            })
    }
}

/// One physical I2C bus
pub struct SharedI2cBus {
    index: u16,
    state: Mutex<Bus>,
}

impl SharedI2cBus {
    /// Bus number `index`, with no devices attached
    pub fn new(index: u16) -> Arc<Self> {
        Arc::new(Self {
            index,
            state: Mutex::new(Bus {
                devices: Vec::new(),
                faults: FaultQueue::new(),
                transactions: 0,
                hold: Duration::ZERO,
            }),
        })
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    /// New backend handle for one context on this bus
    pub fn handle(self: &Arc<Self>) -> SharedI2c {
        SharedI2c {
            bus: Arc::clone(self),
            config: None,
        }
    }

    /// Attach a device model, replacing any device at the same address
    pub fn attach(&self, address: I2cAddress, target: impl I2cTarget + 'static) {
        let mut bus = self.state.lock();
        bus.devices.retain(|device| device.address != address);
        bus.devices.push(Device {
            address,
            target: Box::new(target),
        });
        log::debug!("i2c{}: device attached at {:#x}", self.index, address.raw());
    }

    /// Remove the device at `address`; later transactions to it are NACKed
    pub fn detach(&self, address: I2cAddress) -> bool {
        let mut bus = self.state.lock();
        let before = bus.devices.len();
        bus.devices.retain(|device| device.address != address);
        before != bus.devices.len()
    }

    /// Fail the next transaction with `fault`
    pub fn inject(&self, fault: SimFault) {
        self.state.lock().faults.inject(fault);
    }

    /// Keep the bus locked for `hold` after every transaction
    pub fn set_hold_time(&self, hold: Duration) {
        self.state.lock().hold = hold;
    }

    /// Completed or failed transactions that acquired the bus
    pub fn transactions(&self) -> u64 {
        self.state.lock().transactions
    }

    fn transact<R>(
        &self,
        timeout: Timeout,
        op: impl FnOnce(&mut Bus) -> Result<R, SimFault>,
    ) -> HalResult<R> {
        let wait = Duration::from_micros(u64::from(timeout.as_micros()));
        let mut bus = self.state.try_lock_for(wait).ok_or(SimFault::LockTimeout)?;
        bus.transactions += 1;
        let result = bus.faults.take().and_then(|()| op(&mut *bus));
        if !bus.hold.is_zero() {
            thread::sleep(bus.hold);
        }
        result.map_err(|fault| {
            log::trace!("i2c{}: {}", self.index, fault);
            ErrorKind::from(fault)
        })
    }
}

/// Backend handle bound to one context on a [`SharedI2cBus`]
pub struct SharedI2c {
    bus: Arc<SharedI2cBus>,
    config: Option<I2cConfig>,
}

impl SharedI2c {
    pub fn bus(&self) -> &Arc<SharedI2cBus> {
        &self.bus
    }

    /// Configuration applied by the contract, if any
    pub fn config(&self) -> Option<&I2cConfig> {
        self.config.as_ref()
    }
}

impl Backend for SharedI2c {
    type Config = I2cConfig;

    fn info(&self) -> BackendInfo {
        BackendInfo::new(
            "sim-i2c",
            self.bus.index.saturating_add(1),
            ThreadSafety::SerializedPerContext,
        )
    }

    fn init(&mut self, id: PeripheralId) -> HalResult<()> {
        if id.index() != self.bus.index {
            return Err(SimFault::NoSuchInstance(id.index()).into());
        }
        Ok(())
    }

    fn configure(&mut self, config: &I2cConfig) -> HalResult<()> {
        check_ext(&config.ext)?;
        self.config = Some(*config);
        Ok(())
    }

    fn deinit(&mut self) -> HalResult<()> {
        self.config = None;
        Ok(())
    }
}

impl I2cBackend for SharedI2c {
    fn capabilities(&self) -> I2cCapabilities {
        I2cCapabilities {
            max_speed: I2cSpeed::FastPlus,
            ten_bit: true,
        }
    }

    fn write(&mut self, address: I2cAddress, bytes: &[u8], timeout: Timeout) -> HalResult<()> {
        self.bus
            .transact(timeout, |bus| bus.target(address)?.write(bytes))
    }

    fn read(&mut self, address: I2cAddress, buffer: &mut [u8], timeout: Timeout) -> HalResult<()> {
        self.bus
            .transact(timeout, |bus| bus.target(address)?.read(buffer))
    }

    fn write_read(
        &mut self,
        address: I2cAddress,
        bytes: &[u8],
        buffer: &mut [u8],
        timeout: Timeout,
    ) -> HalResult<()> {
        self.bus.transact(timeout, |bus| {
            let target = bus.target(address)?;
            target.write(bytes)?;
            target.read(buffer)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEV: I2cAddress = I2cAddress::SevenBit(0x50);

    #[test]
    fn register_file_pointer_semantics() {
        let mut regs = RegisterFile::new().with_registers(0xFE, &[1, 2, 3]);
        assert_eq!(regs.get(0xFF), 2);
        assert_eq!(regs.get(0x00), 3);

        regs.write(&[0x10, 0xAA, 0xBB]).unwrap();
        assert_eq!(regs.get(0x11), 0xBB);
        regs.write(&[0x10]).unwrap();
        let mut buf = [0u8; 2];
        regs.read(&mut buf).unwrap();
        assert_eq!(buf, [0xAA, 0xBB]);
    }

    #[test]
    fn missing_device_is_nack() {
        let bus = SharedI2cBus::new(0);
        let mut handle = bus.handle();
        assert_eq!(
            handle.write(DEV, &[0], Timeout::IMMEDIATE),
            Err(ErrorKind::HardwareFailure)
        );
        bus.attach(DEV, RegisterFile::new());
        assert_eq!(handle.write(DEV, &[0], Timeout::IMMEDIATE), Ok(()));
        assert!(bus.detach(DEV));
        assert!(!bus.detach(DEV));
    }

    #[test]
    fn injected_fault_hits_next_transaction_only() {
        let bus = SharedI2cBus::new(0);
        bus.attach(DEV, RegisterFile::new());
        bus.inject(SimFault::ArbitrationLost);
        let mut handle = bus.handle();
        let mut buf = [0u8; 1];
        assert_eq!(
            handle.write_read(DEV, &[0], &mut buf, Timeout::IMMEDIATE),
            Err(ErrorKind::HardwareFailure)
        );
        assert_eq!(handle.write_read(DEV, &[0], &mut buf, Timeout::IMMEDIATE), Ok(()));
        assert_eq!(bus.transactions(), 2);
    }

    #[test]
    fn init_checks_bus_index() {
        let bus = SharedI2cBus::new(2);
        let mut handle = bus.handle();
        assert_eq!(handle.info().instances, 3);
        assert_eq!(
            handle.init(PeripheralId::new(1)),
            Err(ErrorKind::InvalidArgument)
        );
        assert_eq!(handle.init(PeripheralId::new(2)), Ok(()));
    }

    #[test]
    fn foreign_extension_is_rejected() {
        let bus = SharedI2cBus::new(0);
        let mut handle = bus.handle();
        let config = I2cConfig::FAST.with_ext(hal::ConfigExt::new(0x77, [0; 4]));
        assert_eq!(handle.configure(&config), Err(ErrorKind::InvalidConfig));
        assert!(handle.config().is_none());
    }
}
