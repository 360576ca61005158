//! Common error types for contract operations
//!
//! Every backend maps its internal failures onto [`ErrorKind`] before they
//! cross the contract boundary. Drivers never observe backend-specific error
//! types.

use core::fmt;

/// Error kind shared by every peripheral contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Argument outside the accepted range (address, pin, buffer length)
    InvalidArgument,
    /// Configuration violates generic or backend-declared constraints
    InvalidConfig,
    /// Context has not been initialized
    NotInitialized,
    /// Context was already initialized and not deinitialized since
    AlreadyInitialized,
    /// Context has not been configured
    NotConfigured,
    /// Peripheral or bus is busy
    Busy,
    /// Operation did not complete before its deadline
    Timeout,
    /// Hardware reported a failure (NACK, framing, bus fault)
    HardwareFailure,
}

/// Coarse classification of an [`ErrorKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorClass {
    /// Bad argument or configuration; a caller bug, never retried
    Validation,
    /// Operation issued in the wrong lifecycle state; a caller bug
    State,
    /// Transient or environmental failure; the caller may retry
    Operation,
}

impl ErrorKind {
    /// All error kinds, in status-code order
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::InvalidArgument,
        ErrorKind::InvalidConfig,
        ErrorKind::NotInitialized,
        ErrorKind::AlreadyInitialized,
        ErrorKind::NotConfigured,
        ErrorKind::Busy,
        ErrorKind::Timeout,
        ErrorKind::HardwareFailure,
    ];

    /// Classify this error
    pub const fn class(self) -> ErrorClass {
        match self {
            ErrorKind::InvalidArgument | ErrorKind::InvalidConfig => ErrorClass::Validation,
            ErrorKind::NotInitialized | ErrorKind::AlreadyInitialized | ErrorKind::NotConfigured => {
                ErrorClass::State
            }
            ErrorKind::Busy | ErrorKind::Timeout | ErrorKind::HardwareFailure => {
                ErrorClass::Operation
            }
        }
    }

    /// Whether a caller may reasonably retry the operation
    pub const fn is_retryable(self) -> bool {
        matches!(self.class(), ErrorClass::Operation)
    }

    /// Stable non-zero status code. `0` is reserved for success.
    pub const fn code(self) -> i32 {
        match self {
            ErrorKind::InvalidArgument => 1,
            ErrorKind::InvalidConfig => 2,
            ErrorKind::NotInitialized => 3,
            ErrorKind::AlreadyInitialized => 4,
            ErrorKind::NotConfigured => 5,
            ErrorKind::Busy => 6,
            ErrorKind::Timeout => 7,
            ErrorKind::HardwareFailure => 8,
        }
    }

    /// Inverse of [`ErrorKind::code`]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(ErrorKind::InvalidArgument),
            2 => Some(ErrorKind::InvalidConfig),
            3 => Some(ErrorKind::NotInitialized),
            4 => Some(ErrorKind::AlreadyInitialized),
            5 => Some(ErrorKind::NotConfigured),
            6 => Some(ErrorKind::Busy),
            7 => Some(ErrorKind::Timeout),
            8 => Some(ErrorKind::HardwareFailure),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::InvalidConfig => write!(f, "invalid configuration"),
            Self::NotInitialized => write!(f, "peripheral not initialized"),
            Self::AlreadyInitialized => write!(f, "peripheral already initialized"),
            Self::NotConfigured => write!(f, "peripheral not configured"),
            Self::Busy => write!(f, "peripheral busy"),
            Self::Timeout => write!(f, "operation timeout"),
            Self::HardwareFailure => write!(f, "hardware failure"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ErrorKind {}

#[cfg(feature = "defmt")]
impl defmt::Format for ErrorKind {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            ErrorKind::InvalidArgument => defmt::write!(fmt, "InvalidArgument"),
            ErrorKind::InvalidConfig => defmt::write!(fmt, "InvalidConfig"),
            ErrorKind::NotInitialized => defmt::write!(fmt, "NotInitialized"),
            ErrorKind::AlreadyInitialized => defmt::write!(fmt, "AlreadyInitialized"),
            ErrorKind::NotConfigured => defmt::write!(fmt, "NotConfigured"),
            ErrorKind::Busy => defmt::write!(fmt, "Busy"),
            ErrorKind::Timeout => defmt::write!(fmt, "Timeout"),
            ErrorKind::HardwareFailure => defmt::write!(fmt, "HardwareFailure"),
        }
    }
}

/// Result type for contract operations
pub type HalResult<T> = Result<T, ErrorKind>;

/// Encode a result as a status code (`0` on success)
pub fn status_code<T>(result: &HalResult<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(kind) => kind.code(),
    }
}

/// Decode a status code produced by [`status_code`]
///
/// Returns `None` for codes outside the stable set.
pub fn from_status_code(code: i32) -> Option<HalResult<()>> {
    if code == 0 {
        return Some(Ok(()));
    }
    ErrorKind::from_code(code).map(Err)
}
