//! Resource directory
//!
//! Drivers name the peripherals they need with application-level logical
//! identifiers. An integration layer, outside this crate, owns the contexts
//! and their backends and hands out `&mut` access by logical id, so driver
//! code never names a backend type.

use core::fmt;

use crate::error::{ErrorKind, HalResult};
use crate::gpio::DynGpio;
use crate::i2c::DynI2c;
use crate::spi::DynSpi;
use crate::uart::DynUart;

/// Finite, enumerable set of logical resource names
pub trait LogicalId: Copy + Eq + fmt::Debug + 'static {
    /// Every identifier, in index order
    const ALL: &'static [Self];

    /// Position of `self` in [`LogicalId::ALL`]
    fn index(self) -> usize;
}

/// Failed directory lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LookupError {
    /// No context of the requested kind is mapped to this id
    NotFound,
    /// Lookup before [`ResourceDirectory::init`]
    NotInitialized,
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::NotFound => write!(f, "no resource mapped to this id"),
            LookupError::NotInitialized => write!(f, "resource directory not initialized"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LookupError {}

impl From<LookupError> for ErrorKind {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::NotFound => ErrorKind::InvalidArgument,
            LookupError::NotInitialized => ErrorKind::NotInitialized,
        }
    }
}

/// Maps logical ids onto already-allocated contexts
///
/// Contexts handed out are bound through `dyn` backends, so the caller sees
/// only the contract. Each lookup method defaults to `NotFound`; a directory
/// overrides the kinds it actually provides.
pub trait ResourceDirectory<'b> {
    type Id: LogicalId;

    /// Build the mapping. One-time; calling it again is a no-op success.
    fn init(&mut self) -> HalResult<()>;

    fn is_initialized(&self) -> bool;

    fn i2c(&mut self, id: Self::Id) -> Result<&mut DynI2c<'b>, LookupError> {
        let _ = id;
        Err(self.missing())
    }

    fn spi(&mut self, id: Self::Id) -> Result<&mut DynSpi<'b>, LookupError> {
        let _ = id;
        Err(self.missing())
    }

    fn gpio(&mut self, id: Self::Id) -> Result<&mut DynGpio<'b>, LookupError> {
        let _ = id;
        Err(self.missing())
    }

    fn uart(&mut self, id: Self::Id) -> Result<&mut DynUart<'b>, LookupError> {
        let _ = id;
        Err(self.missing())
    }

    /// Error for an unmapped id: `NotInitialized` before `init`, `NotFound` after
    fn missing(&self) -> LookupError {
        if self.is_initialized() {
            LookupError::NotFound
        } else {
            LookupError::NotInitialized
        }
    }
}
