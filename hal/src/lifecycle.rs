//! Lifecycle state machine shared by every contract
//!
//! ```text
//!               init                 set_config
//! Uninitialized ────▶ Initialized ──────────────▶ Configured ◀─┐
//!       ▲                  │                          │  │      │ set_config
//!       │      deinit      │          deinit          │  └──────┘ operate
//!       └──────────────────┴──────────────────────────┘
//! ```
//!
//! There is no separate "operational" state: data operations are permitted
//! exactly when the context is [`LifecycleState::Configured`].

use core::fmt;

use crate::error::{ErrorKind, HalResult};

/// Lifecycle state of one peripheral context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LifecycleState {
    /// No backend resources are held
    #[default]
    Uninitialized,
    /// Backend brought up, no configuration accepted yet
    Initialized,
    /// Configuration accepted; data operations permitted
    Configured,
}

/// Requests that drive the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    /// `init`
    Init,
    /// `set_config`
    Configure,
    /// Any data operation (read, write, transfer, toggle, ...)
    Operate,
    /// `deinit`
    Deinit,
}

impl Transition {
    /// All transitions
    pub const ALL: [Transition; 4] = [
        Transition::Init,
        Transition::Configure,
        Transition::Operate,
        Transition::Deinit,
    ];
}

impl LifecycleState {
    /// All states
    pub const ALL: [LifecycleState; 3] = [
        LifecycleState::Uninitialized,
        LifecycleState::Initialized,
        LifecycleState::Configured,
    ];

    /// Apply a transition
    ///
    /// Total over every `(state, transition)` pair: the result is either the
    /// next state or the state error the request must be rejected with.
    pub const fn next(self, transition: Transition) -> HalResult<LifecycleState> {
        use LifecycleState::*;

        match (self, transition) {
            (Uninitialized, Transition::Init) => Ok(Initialized),
            (Initialized | Configured, Transition::Init) => Err(ErrorKind::AlreadyInitialized),

            (Uninitialized, Transition::Configure) => Err(ErrorKind::NotInitialized),
            (Initialized | Configured, Transition::Configure) => Ok(Configured),

            (Configured, Transition::Operate) => Ok(Configured),
            (Uninitialized | Initialized, Transition::Operate) => Err(ErrorKind::NotConfigured),

            (_, Transition::Deinit) => Ok(Uninitialized),
        }
    }

    /// Whether data operations are permitted
    pub const fn is_configured(self) -> bool {
        matches!(self, LifecycleState::Configured)
    }

    /// Whether the backend currently holds resources for this context
    pub const fn is_active(self) -> bool {
        !matches!(self, LifecycleState::Uninitialized)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Uninitialized => write!(f, "uninitialized"),
            LifecycleState::Initialized => write!(f, "initialized"),
            LifecycleState::Configured => write!(f, "configured"),
        }
    }
}
