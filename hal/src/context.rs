//! Per-instance context
//!
//! A [`Context`] is the stable front of one peripheral instance: its
//! identifier, its lifecycle state, a copy of the last accepted
//! configuration, and a borrow of the backend that fulfils the contract. The
//! backend's private state is reachable only through that borrow.
//!
//! Contexts are created by the caller (stack, `static`, arena slot) and the
//! contract layer never allocates or frees one. The lifecycle state is only
//! ever changed by [`Lifecycle`] operations.

use core::fmt;

use crate::binding::{Backend, BackendInfo, PeripheralConfig, PeripheralId, PeripheralKind};
use crate::error::{ErrorKind, HalResult};
use crate::lifecycle::{LifecycleState, Transition};

/// Uniform lifecycle operations implemented by every contract type
pub trait Lifecycle {
    /// Configuration accepted by `set_config`
    type Config: PeripheralConfig;

    /// Instance identifier
    fn id(&self) -> PeripheralId;

    /// Current lifecycle state
    fn state(&self) -> LifecycleState;

    /// `Uninitialized` → `Initialized`
    fn init(&mut self) -> HalResult<()>;

    /// `Initialized | Configured` → `Configured`
    fn set_config(&mut self, config: &Self::Config) -> HalResult<()>;

    /// Any state → `Uninitialized`; a no-op on an uninitialized context
    fn deinit(&mut self) -> HalResult<()>;
}

/// Lifecycle state plus backend binding for one peripheral instance
pub struct Context<'b, B: ?Sized + Backend> {
    id: PeripheralId,
    state: LifecycleState,
    config: Option<B::Config>,
    backend: &'b mut B,
}

impl<'b, B: ?Sized + Backend> Context<'b, B> {
    /// Bind `backend` to a new, uninitialized context
    ///
    /// The binding is fixed for the lifetime of the context.
    pub fn new(id: u16, backend: &'b mut B) -> Self {
        Self {
            id: PeripheralId::new(id),
            state: LifecycleState::Uninitialized,
            config: None,
            backend,
        }
    }

    /// Instance identifier
    pub fn id(&self) -> PeripheralId {
        self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Last accepted configuration, if configured
    pub fn config(&self) -> Option<&B::Config> {
        self.config.as_ref()
    }

    /// Description published by the bound backend
    pub fn backend_info(&self) -> BackendInfo {
        self.backend.info()
    }

    /// Read-only access to the bound backend
    ///
    /// Intended for capability queries; all mutation goes through the
    /// contract.
    pub fn backend(&self) -> &B {
        &*self.backend
    }

    fn kind(&self) -> PeripheralKind {
        <B::Config as PeripheralConfig>::KIND
    }

    fn transition(&self, transition: Transition) -> HalResult<LifecycleState> {
        self.state.next(transition).map_err(|e| {
            warn!(
                "{}{}: {:?} rejected in state {:?}: {:?}",
                self.kind().name(),
                self.id.index(),
                transition,
                self.state,
                e
            );
            e
        })
    }

    /// `set_config` with an extra check against backend-declared limits
    ///
    /// `check` runs after the state check and the generic validation and
    /// before the backend sees the configuration.
    pub(crate) fn configure_with<F>(&mut self, config: &B::Config, check: F) -> HalResult<()>
    where
        F: FnOnce(&B, &B::Config) -> HalResult<()>,
    {
        let next = self.transition(Transition::Configure)?;

        if let Err(e) = config.validate().and_then(|()| check(&*self.backend, config)) {
            warn!(
                "{}{}: configuration rejected: {:?}",
                self.kind().name(),
                self.id.index(),
                e
            );
            return Err(e);
        }

        self.backend.configure(config)?;
        self.config = Some(*config);
        self.state = next;
        debug!("{}{}: configured", self.kind().name(), self.id.index());
        Ok(())
    }

    /// Gate a data operation on the `Configured` state
    ///
    /// Returns the bound backend together with the active configuration.
    pub(crate) fn operate(&mut self) -> HalResult<(&mut B, B::Config)> {
        self.transition(Transition::Operate)?;
        let config = self.config.ok_or(ErrorKind::NotConfigured)?;
        Ok((&mut *self.backend, config))
    }

    /// Update the retained configuration after an operation changed it
    pub(crate) fn update_config(&mut self, update: impl FnOnce(&mut B::Config)) {
        if let Some(config) = self.config.as_mut() {
            update(config);
        }
    }
}

impl<'b, B: ?Sized + Backend> Lifecycle for Context<'b, B> {
    type Config = B::Config;

    fn id(&self) -> PeripheralId {
        self.id
    }

    fn state(&self) -> LifecycleState {
        self.state
    }

    fn init(&mut self) -> HalResult<()> {
        let next = self.transition(Transition::Init)?;

        let info = self.backend.info();
        if !info.accepts(self.id) {
            warn!(
                "{}{}: outside {} instance range 0..{}",
                self.kind().name(),
                self.id.index(),
                info.name,
                info.instances
            );
            return Err(ErrorKind::InvalidArgument);
        }

        self.backend.init(self.id)?;
        self.state = next;
        debug!(
            "{}{}: initialized on {}",
            self.kind().name(),
            self.id.index(),
            info.name
        );
        Ok(())
    }

    fn set_config(&mut self, config: &Self::Config) -> HalResult<()> {
        self.configure_with(config, |_, _| Ok(()))
    }

    fn deinit(&mut self) -> HalResult<()> {
        if !self.state.is_active() {
            return Ok(());
        }

        let result = self.backend.deinit();
        self.state = LifecycleState::Uninitialized;
        self.config = None;

        match result {
            Ok(()) => debug!("{}{}: deinitialized", self.kind().name(), self.id.index()),
            Err(e) => warn!(
                "{}{}: backend release failed: {:?}",
                self.kind().name(),
                self.id.index(),
                e
            ),
        }
        result
    }
}

impl<'b, B: ?Sized + Backend> fmt::Debug for Context<'b, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("kind", &self.kind())
            .field("id", &self.id)
            .field("state", &self.state)
            .field("backend", &self.backend.info().name)
            .finish()
    }
}

/// Implement [`Lifecycle`] for a contract wrapper holding a `ctx` field and
/// exposing a `check_config` capability check.
macro_rules! delegate_lifecycle {
    ($contract:ident, $backend:ident) => {
        impl<'b, B: ?Sized + $backend> $crate::context::Lifecycle for $contract<'b, B> {
            type Config = <B as $crate::binding::Backend>::Config;

            fn id(&self) -> $crate::binding::PeripheralId {
                self.ctx.id()
            }

            fn state(&self) -> $crate::lifecycle::LifecycleState {
                self.ctx.state()
            }

            fn init(&mut self) -> $crate::error::HalResult<()> {
                $crate::context::Lifecycle::init(&mut self.ctx)
            }

            fn set_config(&mut self, config: &Self::Config) -> $crate::error::HalResult<()> {
                self.ctx.configure_with(config, Self::check_config)
            }

            fn deinit(&mut self) -> $crate::error::HalResult<()> {
                $crate::context::Lifecycle::deinit(&mut self.ctx)
            }
        }
    };
}
