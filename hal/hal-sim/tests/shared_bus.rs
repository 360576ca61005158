//! Several contexts on one simulated I2C bus, driven from separate threads

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use embedded_hal::i2c::{I2c, Operation};
use hal::i2c::{I2cAddress, I2cConfig};
use hal::time::Timeout;
use hal::{ErrorKind, I2cMaster, Lifecycle};
use hal_sim::{RegisterFile, SharedI2cBus, SimFault};

const EEPROM: I2cAddress = I2cAddress::SevenBit(0x50);

#[test]
fn combined_transactions_are_never_interleaved() {
    let bus = SharedI2cBus::new(0);
    bus.attach(EEPROM, RegisterFile::new());

    let workers: Vec<_> = [0x00u8, 0x80]
        .into_iter()
        .map(|base| {
            let bus = Arc::clone(&bus);
            thread::spawn(move || {
                let mut backend = bus.handle();
                let mut ctx = I2cMaster::new(0, &mut backend);
                ctx.init().unwrap();
                ctx.set_config(&I2cConfig::FAST.with_timeout(Timeout::from_millis(500)))
                    .unwrap();

                for round in 0..200u32 {
                    let value = base.wrapping_add(round as u8);
                    ctx.write(EEPROM, &[base, value, value]).unwrap();
                    let mut back = [0u8; 2];
                    ctx.write_then_read(EEPROM, &[base], &mut back).unwrap();
                    // the other thread only ever touches its own registers
                    assert_eq!(back, [value, value]);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(bus.transactions(), 800);
}

#[test]
fn waiting_for_the_bus_counts_against_the_timeout() {
    let bus = SharedI2cBus::new(0);
    bus.attach(EEPROM, RegisterFile::new());
    bus.set_hold_time(Duration::from_millis(200));

    let started = Arc::new(Barrier::new(2));
    let holder = {
        let bus = Arc::clone(&bus);
        let started = Arc::clone(&started);
        thread::spawn(move || {
            let mut backend = bus.handle();
            let mut ctx = I2cMaster::new(0, &mut backend);
            ctx.init().unwrap();
            ctx.set_config(&I2cConfig::FAST).unwrap();
            started.wait();
            ctx.write(EEPROM, &[0x00, 0x01]).unwrap();
        })
    };

    let mut backend = bus.handle();
    let mut ctx = I2cMaster::new(0, &mut backend);
    ctx.init().unwrap();
    ctx.set_config(&I2cConfig::FAST.with_timeout(Timeout::from_millis(5)))
        .unwrap();
    started.wait();
    thread::sleep(Duration::from_millis(50));

    let mut byte = [0u8; 1];
    assert_eq!(
        ctx.write_then_read(EEPROM, &[0x00], &mut byte),
        Err(ErrorKind::Timeout)
    );
    assert_eq!(byte, [0]);
    holder.join().unwrap();
}

#[test]
fn faults_reach_the_contract_as_error_kinds() {
    let bus = SharedI2cBus::new(0);
    bus.attach(EEPROM, RegisterFile::new().with_registers(0, &[0x42]));
    let mut backend = bus.handle();
    let mut ctx = I2cMaster::new(0, &mut backend);
    ctx.init().unwrap();
    ctx.set_config(&I2cConfig::FAST).unwrap();
    let mut byte = [0u8; 1];

    bus.inject(SimFault::BusBusy);
    assert_eq!(
        ctx.write_then_read(EEPROM, &[0x00], &mut byte),
        Err(ErrorKind::Busy)
    );
    assert!(ErrorKind::Busy.is_retryable());
    assert_eq!(ctx.write_then_read(EEPROM, &[0x00], &mut byte), Ok(()));
    assert_eq!(byte, [0x42]);

    assert_eq!(
        ctx.read(I2cAddress::SevenBit(0x51), &mut byte),
        Err(ErrorKind::HardwareFailure)
    );
}

#[test]
fn pointer_then_payload_is_one_write() {
    let bus = SharedI2cBus::new(0);
    bus.attach(EEPROM, RegisterFile::new());
    let mut backend = bus.handle();
    let mut ctx = I2cMaster::new(0, &mut backend);
    ctx.init().unwrap();
    ctx.set_config(&I2cConfig::FAST).unwrap();

    let mut operations = [Operation::Write(&[0x10]), Operation::Write(&[0xAB])];
    I2c::transaction(&mut ctx, 0x50u8, &mut operations).unwrap();
    assert_eq!(bus.transactions(), 1);

    let mut byte = [0u8; 1];
    I2c::write_read(&mut ctx, 0x50u8, &[0x10], &mut byte).unwrap();
    assert_eq!(byte, [0xAB]);
    assert_eq!(bus.transactions(), 2);
}
