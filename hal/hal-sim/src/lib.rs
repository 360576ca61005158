//! Host simulation backends
//!
//! Backends for the HAL contracts that run on a development host, one for
//! each binding style a real port would use:
//!
//! - [`i2c::SharedI2c`]: RTOS-style, several contexts share one bus behind a
//!   mutex, and waiting for the bus counts against the operation timeout
//! - [`spi::SimSpi`]: bare-metal style polled controller with a busy flag
//! - [`gpio::PinBank`]: bank registers updated inside critical sections
//! - [`uart::SimUart`]: null-modem pair with bounded queues
//!
//! [`directory::StaticDirectory`] is a reference integration layer that owns
//! contexts bound to any of these and hands them out by logical id.
//!
//! ## Example
//! ```
//! use hal::i2c::{I2cAddress, I2cConfig};
//! use hal::{I2cMaster, Lifecycle};
//! use hal_sim::i2c::{RegisterFile, SharedI2cBus};
//!
//! let bus = SharedI2cBus::new(0);
//! bus.attach(I2cAddress::SevenBit(0x50), RegisterFile::new().with_registers(0x10, &[0xC0, 0xDE]));
//!
//! let mut backend = bus.handle();
//! let mut eeprom = I2cMaster::new(0, &mut backend);
//! eeprom.init().unwrap();
//! eeprom.set_config(&I2cConfig::FAST).unwrap();
//!
//! let mut word = [0u8; 2];
//! eeprom.write_then_read(I2cAddress::SevenBit(0x50), &[0x10], &mut word).unwrap();
//! assert_eq!(word, [0xC0, 0xDE]);
//! ```

pub mod clock;
pub mod directory;
pub mod fault;
pub mod gpio;
pub mod i2c;
pub mod spi;
pub mod uart;

pub use clock::{ManualClock, SystemClock};
pub use directory::StaticDirectory;
pub use fault::{SimFault, SIM_EXT_TAG};
pub use gpio::{BankPin, PinBank};
pub use i2c::{I2cTarget, RegisterFile, SharedI2c, SharedI2cBus};
pub use spi::{SimSpi, SpiTarget};
pub use uart::SimUart;
