//! Peripheral contract layer for embedded systems
//!
//! This crate defines backend-agnostic contracts for I2C, SPI, GPIO and UART,
//! a lifecycle state machine enforced uniformly on every peripheral instance,
//! and the traits a backend implements to fulfil a contract. Drivers written
//! against the contracts run unchanged on an RTOS-wrapped backend, a
//! bare-metal register backend, or a recording mock.
//!
//! ```text
//! driver ──▶ ResourceDirectory ──▶ I2cMaster / SpiMaster / GpioPin / UartPort
//!                                        │ lifecycle + argument checks
//!                                        ▼
//!                                   XBackend (concrete or dyn)
//! ```
//!
//! Nothing in this crate allocates.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]

// Must come first so the logging macros are visible in every module
#[macro_use]
mod fmt;

pub mod binding;
#[macro_use]
pub mod context;
pub mod directory;
pub mod error;
pub mod gpio;
pub mod i2c;
pub mod lifecycle;
pub mod spi;
pub mod time;
pub mod uart;

#[cfg(feature = "embedded-hal")]
pub mod compat;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use binding::{Backend, BackendInfo, ConfigExt, PeripheralConfig, PeripheralId, PeripheralKind, ThreadSafety};
pub use context::{Context, Lifecycle};
pub use directory::{LogicalId, LookupError, ResourceDirectory};
pub use error::{ErrorClass, ErrorKind, HalResult};
pub use gpio::{DynGpio, GpioPin};
pub use i2c::{DynI2c, I2cAddress, I2cMaster};
pub use lifecycle::{LifecycleState, Transition};
pub use spi::{DynSpi, SpiMaster};
pub use time::{Clock, Deadline, Timeout};
pub use uart::{DynUart, UartPort};
