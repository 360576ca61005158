//! Fixed-capacity resource directory
//!
//! The integration layer registers each logical id together with its backend,
//! instance index and boot configuration; [`ResourceDirectory::init`] then
//! brings every context up in registration order. Storage is a `heapless`
//! arena sized at compile time, searched by logical id.

use hal::directory::{LogicalId, LookupError, ResourceDirectory};
use hal::gpio::{GpioBackend, GpioConfig};
use hal::i2c::{I2cBackend, I2cConfig};
use hal::spi::{SpiBackend, SpiConfig};
use hal::uart::{UartBackend, UartConfig};
use hal::{
    DynGpio, DynI2c, DynSpi, DynUart, ErrorKind, GpioPin, HalResult, I2cMaster, Lifecycle,
    SpiMaster, UartPort,
};

enum Slot<'b> {
    I2c(DynI2c<'b>, I2cConfig),
    Spi(DynSpi<'b>, SpiConfig),
    Gpio(DynGpio<'b>, GpioConfig),
    Uart(DynUart<'b>, UartConfig),
}

impl<'b> Slot<'b> {
    fn bring_up(&mut self) -> HalResult<()> {
        match self {
            Slot::I2c(ctx, config) => ctx.init().and_then(|()| ctx.set_config(config)),
            Slot::Spi(ctx, config) => ctx.init().and_then(|()| ctx.set_config(config)),
            Slot::Gpio(ctx, config) => ctx.init().and_then(|()| ctx.set_config(config)),
            Slot::Uart(ctx, config) => ctx.init().and_then(|()| ctx.set_config(config)),
        }
    }

    fn release(&mut self) -> HalResult<()> {
        match self {
            Slot::I2c(ctx, _) => ctx.deinit(),
            Slot::Spi(ctx, _) => ctx.deinit(),
            Slot::Gpio(ctx, _) => ctx.deinit(),
            Slot::Uart(ctx, _) => ctx.deinit(),
        }
    }
}

/// Directory holding up to `N` contexts
pub struct StaticDirectory<'b, Id: LogicalId, const N: usize> {
    slots: heapless::Vec<(Id, Slot<'b>), N>,
    initialized: bool,
}

impl<'b, Id: LogicalId, const N: usize> StaticDirectory<'b, Id, N> {
    pub const fn new() -> Self {
        Self {
            slots: heapless::Vec::new(),
            initialized: false,
        }
    }

    /// Registered logical ids, in registration order
    pub fn ids(&self) -> heapless::Vec<Id, N> {
        self.slots.iter().map(|(id, _)| *id).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn register(&mut self, id: Id, slot: Slot<'b>) -> HalResult<()> {
        if self.initialized {
            return Err(ErrorKind::AlreadyInitialized);
        }
        if self.slots.iter().any(|(existing, _)| *existing == id) {
            log::warn!("directory: {:?} registered twice", id);
            return Err(ErrorKind::InvalidArgument);
        }
        self.slots
            .push((id, slot))
            .map_err(|_| ErrorKind::InvalidArgument)
    }

    pub fn register_i2c(
        &mut self,
        id: Id,
        index: u16,
        backend: &'b mut dyn I2cBackend,
        config: I2cConfig,
    ) -> HalResult<()> {
        self.register(id, Slot::I2c(I2cMaster::new(index, backend), config))
    }

    pub fn register_spi(
        &mut self,
        id: Id,
        index: u16,
        backend: &'b mut dyn SpiBackend,
        config: SpiConfig,
    ) -> HalResult<()> {
        self.register(id, Slot::Spi(SpiMaster::new(index, backend), config))
    }

    pub fn register_gpio(
        &mut self,
        id: Id,
        index: u16,
        backend: &'b mut dyn GpioBackend,
        config: GpioConfig,
    ) -> HalResult<()> {
        self.register(id, Slot::Gpio(GpioPin::new(index, backend), config))
    }

    pub fn register_uart(
        &mut self,
        id: Id,
        index: u16,
        backend: &'b mut dyn UartBackend,
        config: UartConfig,
    ) -> HalResult<()> {
        self.register(id, Slot::Uart(UartPort::new(index, backend), config))
    }

    /// Release every context; the directory can be initialized again
    ///
    /// Every context is released even if some fail; the first failure is
    /// returned.
    pub fn deinit_all(&mut self) -> HalResult<()> {
        let mut first = Ok(());
        for (id, slot) in self.slots.iter_mut().rev() {
            if let Err(e) = slot.release() {
                log::warn!("directory: releasing {:?} failed: {:?}", id, e);
                first = first.and(Err(e));
            }
        }
        self.initialized = false;
        first
    }

    fn slot(&mut self, id: Id) -> Result<&mut Slot<'b>, LookupError> {
        if !self.initialized {
            return Err(LookupError::NotInitialized);
        }
        self.slots
            .iter_mut()
            .find(|(existing, _)| *existing == id)
            .map(|(_, slot)| slot)
            .ok_or(LookupError::NotFound)
    }
}

impl<'b, Id: LogicalId, const N: usize> Default for StaticDirectory<'b, Id, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'b, Id: LogicalId, const N: usize> ResourceDirectory<'b> for StaticDirectory<'b, Id, N> {
    type Id = Id;

    fn init(&mut self) -> HalResult<()> {
        if self.initialized {
            return Ok(());
        }
        for done in 0..self.slots.len() {
            let (id, slot) = &mut self.slots[done];
            if let Err(e) = slot.bring_up() {
                log::warn!("directory: bringing up {:?} failed: {:?}", id, e);
                // leave nothing half-initialized behind
                let _ = slot.release();
                for (_, earlier) in self.slots[..done].iter_mut().rev() {
                    let _ = earlier.release();
                }
                return Err(e);
            }
        }
        self.initialized = true;
        log::info!("directory: {} resources ready", self.slots.len());
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn i2c(&mut self, id: Id) -> Result<&mut DynI2c<'b>, LookupError> {
        match self.slot(id)? {
            Slot::I2c(ctx, _) => Ok(ctx),
            _ => Err(LookupError::NotFound),
        }
    }

    fn spi(&mut self, id: Id) -> Result<&mut DynSpi<'b>, LookupError> {
        match self.slot(id)? {
            Slot::Spi(ctx, _) => Ok(ctx),
            _ => Err(LookupError::NotFound),
        }
    }

    fn gpio(&mut self, id: Id) -> Result<&mut DynGpio<'b>, LookupError> {
        match self.slot(id)? {
            Slot::Gpio(ctx, _) => Ok(ctx),
            _ => Err(LookupError::NotFound),
        }
    }

    fn uart(&mut self, id: Id) -> Result<&mut DynUart<'b>, LookupError> {
        match self.slot(id)? {
            Slot::Uart(ctx, _) => Ok(ctx),
            _ => Err(LookupError::NotFound),
        }
    }
}
