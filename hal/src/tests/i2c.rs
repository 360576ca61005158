use crate::error::ErrorKind;
use crate::i2c::{I2cAddress, I2cCapabilities, I2cConfig, I2cMaster, I2cSpeed, MAX_WRITE_READ_LEN};
use crate::mock::{bytes, I2cCall, MockI2c, Reply, LOG_DEPTH};
use crate::time::Timeout;
use crate::{Lifecycle, LifecycleState};

const EEPROM: I2cAddress = I2cAddress::SevenBit(0x50);
const SENSOR: I2cAddress = I2cAddress::SevenBit(0x76);

fn configured(mock: &mut MockI2c) -> I2cMaster<'_, MockI2c> {
    let mut bus = I2cMaster::new(0, mock);
    bus.init().unwrap();
    bus.set_config(&I2cConfig::FAST).unwrap();
    bus
}

#[test]
fn write_reaches_backend_exactly_once() {
    let mut mock = MockI2c::new();
    let mut bus = configured(&mut mock);
    bus.write(EEPROM, &[1, 2, 3]).unwrap();
    drop(bus);

    assert_eq!(
        mock.calls(),
        &[I2cCall::Write {
            address: EEPROM,
            bytes: bytes(&[1, 2, 3]),
        }]
    );
}

#[test]
fn operations_inherit_configured_timeout() {
    let mut mock = MockI2c::new();
    let mut bus = I2cMaster::new(0, &mut mock);
    bus.init().unwrap();
    bus.set_config(&I2cConfig::STANDARD.with_timeout(Timeout::from_millis(7)))
        .unwrap();
    bus.read(EEPROM, &mut [0u8; 4]).unwrap();
    drop(bus);
    assert_eq!(mock.last_timeout, Some(Timeout::from_millis(7)));
}

#[test]
fn data_operations_require_configured() {
    let mut mock = MockI2c::new();
    let mut bus = I2cMaster::new(0, &mut mock);
    let mut buf = [0u8; 2];

    assert_eq!(bus.write(EEPROM, &[1]), Err(ErrorKind::NotConfigured));
    bus.init().unwrap();
    assert_eq!(bus.read(EEPROM, &mut buf), Err(ErrorKind::NotConfigured));
    assert_eq!(
        bus.write_then_read(EEPROM, &[0], &mut buf),
        Err(ErrorKind::NotConfigured)
    );
    assert_eq!(bus.state(), LifecycleState::Initialized);
    drop(bus);
    assert!(mock.calls().is_empty());
}

#[test]
fn failed_read_phase_leaves_buffer_untouched() {
    let mut mock = MockI2c::new();
    mock.queue(Reply::FailAfterWrite(ErrorKind::HardwareFailure))
        .unwrap();
    let mut bus = configured(&mut mock);

    let mut buf = [0xAAu8; 3];
    assert_eq!(
        bus.write_then_read(SENSOR, &[0xFA], &mut buf),
        Err(ErrorKind::HardwareFailure)
    );
    assert_eq!(buf, [0xAA; 3]);
    assert_eq!(bus.state(), LifecycleState::Configured);
    drop(bus);
    assert_eq!(
        mock.calls(),
        &[I2cCall::WriteRead {
            address: SENSOR,
            bytes: bytes(&[0xFA]),
            len: 3,
        }]
    );
}

#[test]
fn write_then_read_copies_on_success() {
    let mut mock = MockI2c::new();
    mock.queue(Reply::Data(bytes(&[0x80, 0x00, 0x12]))).unwrap();
    let mut bus = configured(&mut mock);

    let mut buf = [0u8; 3];
    bus.write_then_read(SENSOR, &[0xFA], &mut buf).unwrap();
    assert_eq!(buf, [0x80, 0x00, 0x12]);
}

#[test]
fn oversized_combined_read_is_rejected() {
    let mut mock = MockI2c::new();
    let mut bus = configured(&mut mock);
    let mut buf = [0u8; MAX_WRITE_READ_LEN + 1];
    assert_eq!(
        bus.write_then_read(SENSOR, &[0], &mut buf),
        Err(ErrorKind::InvalidArgument)
    );
    drop(bus);
    assert!(mock.calls().is_empty());
}

#[test]
fn zero_length_transfers_skip_backend() {
    let mut mock = MockI2c::new();
    let mut bus = configured(&mut mock);
    bus.write(EEPROM, &[]).unwrap();
    bus.read(EEPROM, &mut []).unwrap();
    bus.write_then_read(EEPROM, &[], &mut []).unwrap();
    drop(bus);
    assert!(mock.calls().is_empty());
}

#[test]
fn write_only_combined_transaction_is_a_write() {
    let mut mock = MockI2c::new();
    let mut bus = configured(&mut mock);
    bus.write_then_read(EEPROM, &[0x10], &mut []).unwrap();
    drop(bus);
    assert!(matches!(mock.calls(), [I2cCall::Write { .. }]));
}

#[test]
fn malformed_addresses_are_rejected_before_backend() {
    let mut mock = MockI2c::new();
    mock.capabilities.ten_bit = false;
    let mut bus = configured(&mut mock);

    assert_eq!(
        bus.write(I2cAddress::SevenBit(0x80), &[1]),
        Err(ErrorKind::InvalidArgument)
    );
    assert_eq!(
        bus.write(I2cAddress::TenBit(0x150), &[1]),
        Err(ErrorKind::InvalidArgument)
    );
    // Checked even when there is nothing to transfer
    assert_eq!(
        bus.read(I2cAddress::SevenBit(0xFF), &mut []),
        Err(ErrorKind::InvalidArgument)
    );
    drop(bus);
    assert!(mock.calls().is_empty());
}

#[test]
fn speed_above_capability_is_invalid_config() {
    let mut mock = MockI2c::new();
    mock.capabilities = I2cCapabilities {
        max_speed: I2cSpeed::Standard,
        ten_bit: false,
    };
    let mut bus = I2cMaster::new(0, &mut mock);
    bus.init().unwrap();
    assert_eq!(bus.set_config(&I2cConfig::FAST), Err(ErrorKind::InvalidConfig));
    assert_eq!(bus.state(), LifecycleState::Initialized);
    bus.set_config(&I2cConfig::STANDARD).unwrap();
    drop(bus);
    assert_eq!(mock.lifecycle.config, Some(I2cConfig::STANDARD));
}

#[test]
fn backend_errors_are_returned_verbatim() {
    let mut mock = MockI2c::new();
    for kind in [ErrorKind::Busy, ErrorKind::Timeout, ErrorKind::HardwareFailure] {
        mock.queue(Reply::Fail(kind)).unwrap();
    }
    let mut bus = configured(&mut mock);
    assert_eq!(bus.write(EEPROM, &[1]), Err(ErrorKind::Busy));
    assert_eq!(bus.read(EEPROM, &mut [0]), Err(ErrorKind::Timeout));
    assert_eq!(
        bus.write_then_read(EEPROM, &[1], &mut [0]),
        Err(ErrorKind::HardwareFailure)
    );
    assert_eq!(bus.state(), LifecycleState::Configured);
}

#[test]
fn mock_write_consumes_queued_data() {
    let mut mock = MockI2c::new();
    mock.queue(Reply::Data(bytes(&[0xAA]))).unwrap();
    let mut bus = configured(&mut mock);
    bus.write(EEPROM, &[0x00]).unwrap();
    let mut byte = [0xFFu8; 1];
    bus.read(EEPROM, &mut byte).unwrap();
    assert_eq!(byte, [0x00]);
}

#[test]
fn mock_log_stops_at_depth() {
    let mut mock = MockI2c::new();
    let mut bus = configured(&mut mock);
    for i in 0..LOG_DEPTH + 3 {
        bus.write(EEPROM, &[i as u8]).unwrap();
    }
    drop(bus);
    assert_eq!(mock.calls().len(), LOG_DEPTH);
    let last = [(LOG_DEPTH - 1) as u8];
    assert!(matches!(
        &mock.calls()[LOG_DEPTH - 1],
        I2cCall::Write { bytes, .. } if bytes[..] == last
    ));
}
