//! Backend binding
//!
//! A backend is anything that can bring a peripheral up and down, validate a
//! configuration, and execute the operations of one contract while mapping
//! its own failures onto [`ErrorKind`](crate::ErrorKind). The lifecycle half
//! lives in [`Backend`]; each contract adds its data operations in a
//! sub-trait ([`I2cBackend`](crate::i2c::I2cBackend),
//! [`SpiBackend`](crate::spi::SpiBackend), [`GpioBackend`](crate::gpio::GpioBackend),
//! [`UartBackend`](crate::uart::UartBackend)).
//!
//! Every backend trait is object safe, so a context may be bound to a
//! concrete backend type or to `dyn XBackend` without any change to the
//! contract code.

use core::fmt;

use crate::error::HalResult;

/// Bus, port or pin index of one peripheral instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeripheralId(u16);

impl PeripheralId {
    /// Create an identifier from a raw index
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Raw index
    pub const fn index(self) -> u16 {
        self.0
    }
}

impl From<u16> for PeripheralId {
    fn from(index: u16) -> Self {
        Self(index)
    }
}

impl fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PeripheralId {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", self.0);
    }
}

/// Peripheral contract kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PeripheralKind {
    I2c,
    Spi,
    Gpio,
    Uart,
}

impl PeripheralKind {
    /// Short lowercase name used in log messages
    pub const fn name(self) -> &'static str {
        match self {
            PeripheralKind::I2c => "i2c",
            PeripheralKind::Spi => "spi",
            PeripheralKind::Gpio => "gpio",
            PeripheralKind::Uart => "uart",
        }
    }
}

impl fmt::Display for PeripheralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Concurrency guarantee a backend documents for its operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ThreadSafety {
    /// Callers must serialize all access themselves
    NotThreadSafe,
    /// Operations on contexts sharing one backend instance are serialized
    /// internally (e.g. a mutex embedded in the private state)
    SerializedPerContext,
    /// Operations may run concurrently without locks
    LockFree,
}

/// Static description a backend publishes about itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BackendInfo {
    /// Human-readable backend name
    pub name: &'static str,
    /// Number of valid instance indices: `0..instances`
    pub instances: u16,
    /// Concurrency guarantee
    pub thread_safety: ThreadSafety,
}

impl BackendInfo {
    /// Create a backend description
    pub const fn new(name: &'static str, instances: u16, thread_safety: ThreadSafety) -> Self {
        Self {
            name,
            instances,
            thread_safety,
        }
    }

    /// Whether `id` is within the declared instance range
    pub const fn accepts(&self, id: PeripheralId) -> bool {
        id.index() < self.instances
    }
}

/// Backend-specific configuration slot
///
/// Contents are meaningful only to the backend whose `tag` matches; backends
/// reject unknown non-zero tags with `InvalidConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigExt {
    /// Backend-defined discriminator, `0` means "no extension"
    pub tag: u16,
    /// Backend-defined payload
    pub words: [u32; 4],
}

impl ConfigExt {
    /// No extension
    pub const NONE: Self = Self {
        tag: 0,
        words: [0; 4],
    };

    /// Create an extension for the backend identified by `tag`
    pub const fn new(tag: u16, words: [u32; 4]) -> Self {
        Self { tag, words }
    }

    /// Whether the slot is empty
    pub const fn is_none(&self) -> bool {
        self.tag == 0
    }
}

/// Configuration value accepted by `set_config`
pub trait PeripheralConfig: Copy {
    /// Contract this configuration belongs to
    const KIND: PeripheralKind;

    /// Backend-independent sanity checks
    fn validate(&self) -> HalResult<()> {
        Ok(())
    }
}

/// Lifecycle half of every backend
///
/// The contract layer guarantees the call order: `init` only on an
/// uninitialized context with an id inside [`BackendInfo::instances`],
/// `configure` only after a successful `init` and with a configuration that
/// passed [`PeripheralConfig::validate`], and `deinit` only while the context
/// is initialized or configured.
pub trait Backend {
    /// Configuration type for this contract
    type Config: PeripheralConfig;

    /// Static description of this backend
    fn info(&self) -> BackendInfo;

    /// Bring the hardware up for instance `id`
    fn init(&mut self, id: PeripheralId) -> HalResult<()>;

    /// Apply a configuration
    fn configure(&mut self, config: &Self::Config) -> HalResult<()>;

    /// Release every resource acquired since `init`
    fn deinit(&mut self) -> HalResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_accepts_declared_range() {
        let info = BackendInfo::new("test", 4, ThreadSafety::NotThreadSafe);
        assert!(info.accepts(PeripheralId::new(0)));
        assert!(info.accepts(PeripheralId::new(3)));
        assert!(!info.accepts(PeripheralId::new(4)));
    }

    #[test]
    fn config_ext_defaults_to_none() {
        assert!(ConfigExt::default().is_none());
        assert!(ConfigExt::NONE.is_none());
        assert!(!ConfigExt::new(0x51, [1, 0, 0, 0]).is_none());
    }
}
