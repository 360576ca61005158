use crate::error::ErrorKind;
use crate::gpio::{Direction, GpioCapabilities, GpioConfig, GpioPin, Level, Pull};
use crate::mock::{GpioCall, MockGpio};
use crate::{Lifecycle, LifecycleState};

#[test]
fn output_scenario() {
    let mut mock = MockGpio::new();
    let mut pin = GpioPin::new(5, &mut mock);

    pin.init().unwrap();
    assert_eq!(pin.write_level(Level::High), Err(ErrorKind::NotConfigured));
    pin.set_config(&GpioConfig::OUTPUT).unwrap();
    assert_eq!(pin.write_level(Level::High), Ok(()));
    assert_eq!(pin.read_level(), Ok(Level::High));
    drop(pin);

    assert_eq!(mock.calls(), &[GpioCall::Write(Level::High), GpioCall::Read]);
    assert_eq!(mock.driven(), Level::High);
}

#[test]
fn input_pin_rejects_write_and_toggle() {
    let mut mock = MockGpio::new();
    mock.external = Level::High;
    let mut pin = GpioPin::new(2, &mut mock);
    pin.init().unwrap();
    pin.set_config(&GpioConfig::INPUT).unwrap();

    assert_eq!(pin.write_level(Level::High), Err(ErrorKind::InvalidArgument));
    assert_eq!(pin.toggle(), Err(ErrorKind::InvalidArgument));
    assert_eq!(pin.read_level(), Ok(Level::High));
    assert_eq!(pin.state(), LifecycleState::Configured);
    drop(pin);

    assert_eq!(mock.calls(), &[GpioCall::Read]);
}

#[test]
fn set_direction_updates_retained_config() {
    let mut mock = MockGpio::new();
    let mut pin = GpioPin::new(0, &mut mock);
    pin.init().unwrap();
    pin.set_config(&GpioConfig::INPUT).unwrap();

    pin.set_direction(Direction::Output).unwrap();
    assert_eq!(pin.direction(), Some(Direction::Output));
    pin.toggle().unwrap();
    pin.set_direction(Direction::Input).unwrap();
    assert_eq!(pin.set_low(), Err(ErrorKind::InvalidArgument));
    drop(pin);

    assert_eq!(
        mock.calls(),
        &[
            GpioCall::SetDirection(Direction::Output),
            GpioCall::Toggle,
            GpioCall::SetDirection(Direction::Input),
        ]
    );
}

#[test]
fn failed_set_direction_keeps_direction() {
    let mut mock = MockGpio::new();
    mock.fail_next = Some(ErrorKind::HardwareFailure);
    let mut pin = GpioPin::new(0, &mut mock);
    pin.init().unwrap();
    pin.set_config(&GpioConfig::OUTPUT).unwrap();
    assert_eq!(
        pin.set_direction(Direction::Input),
        Err(ErrorKind::HardwareFailure)
    );
    assert_eq!(pin.direction(), Some(Direction::Output));
    assert_eq!(pin.set_high(), Ok(()));
}

#[test]
fn initial_level_is_applied_on_configure() {
    let mut mock = MockGpio::new();
    let mut pin = GpioPin::new(1, &mut mock);
    pin.init().unwrap();
    pin.set_config(&GpioConfig::OUTPUT.with_initial(Level::High)).unwrap();
    assert_eq!(pin.is_high(), Ok(true));
}

#[test]
fn unsupported_pull_is_invalid_config() {
    let mut mock = MockGpio::new();
    mock.capabilities = GpioCapabilities {
        pull_down: false,
        ..GpioCapabilities::default()
    };
    let mut pin = GpioPin::new(1, &mut mock);
    pin.init().unwrap();
    assert_eq!(
        pin.set_config(&GpioConfig::INPUT.with_pull(Pull::Down)),
        Err(ErrorKind::InvalidConfig)
    );
    pin.set_config(&GpioConfig::INPUT_PULL_UP).unwrap();
}

#[test]
fn pin_outside_backend_range() {
    let mut mock = MockGpio::new();
    let mut pin = GpioPin::new(MockGpio::INFO.instances, &mut mock);
    assert_eq!(pin.init(), Err(ErrorKind::InvalidArgument));
    drop(pin);
    assert_eq!(mock.lifecycle.inits(), 0);
}
