//! GPIO (General Purpose Input/Output) pin contract

use core::ops::Not;

use crate::binding::{Backend, ConfigExt, PeripheralConfig, PeripheralKind};
use crate::context::Context;
use crate::error::{ErrorKind, HalResult};

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Input,
    Output,
}

/// GPIO pin levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Low level (0V)
    Low,
    /// High level (VCC)
    High,
}

impl Level {
    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }

    /// The opposite level
    pub const fn toggled(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        self.toggled()
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Internal bias resistor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    None,
    Up,
    Down,
}

/// Output driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Drive {
    PushPull,
    OpenDrain,
}

/// GPIO configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpioConfig {
    pub direction: Direction,
    pub pull: Pull,
    pub drive: Drive,
    /// Level driven as soon as the pin becomes an output
    pub initial: Level,
    pub ext: ConfigExt,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self::INPUT
    }
}

impl GpioConfig {
    /// Floating input
    pub const INPUT: Self = Self {
        direction: Direction::Input,
        pull: Pull::None,
        drive: Drive::PushPull,
        initial: Level::Low,
        ext: ConfigExt::NONE,
    };

    /// Input with pull-up resistor
    pub const INPUT_PULL_UP: Self = Self {
        pull: Pull::Up,
        ..Self::INPUT
    };

    /// Push-pull output, initially low
    pub const OUTPUT: Self = Self {
        direction: Direction::Output,
        ..Self::INPUT
    };

    /// Open-drain output, initially released (high)
    pub const OUTPUT_OPEN_DRAIN: Self = Self {
        direction: Direction::Output,
        drive: Drive::OpenDrain,
        initial: Level::High,
        ..Self::INPUT
    };

    pub const fn with_pull(mut self, pull: Pull) -> Self {
        self.pull = pull;
        self
    }

    pub const fn with_initial(mut self, initial: Level) -> Self {
        self.initial = initial;
        self
    }

    pub const fn with_ext(mut self, ext: ConfigExt) -> Self {
        self.ext = ext;
        self
    }
}

impl PeripheralConfig for GpioConfig {
    const KIND: PeripheralKind = PeripheralKind::Gpio;
}

/// Features a GPIO backend declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpioCapabilities {
    pub pull_up: bool,
    pub pull_down: bool,
    pub open_drain: bool,
}

impl Default for GpioCapabilities {
    fn default() -> Self {
        Self {
            pull_up: true,
            pull_down: true,
            open_drain: true,
        }
    }
}

/// GPIO pin backend
pub trait GpioBackend: Backend<Config = GpioConfig> {
    fn capabilities(&self) -> GpioCapabilities;

    /// Switch between input and output
    fn set_direction(&mut self, direction: Direction) -> HalResult<()>;

    /// Sample the pin
    fn read_level(&mut self) -> HalResult<Level>;

    /// Drive the pin; only called on outputs
    fn write_level(&mut self, level: Level) -> HalResult<()>;

    /// Invert the driven level; only called on outputs
    fn toggle(&mut self) -> HalResult<()> {
        let level = self.read_level()?;
        self.write_level(level.toggled())
    }
}

/// GPIO pin context bound to backend `B`
pub struct GpioPin<'b, B: ?Sized + GpioBackend> {
    ctx: Context<'b, B>,
}

/// GPIO pin bound through dynamic dispatch
pub type DynGpio<'b> = GpioPin<'b, dyn GpioBackend + 'b>;

impl<'b, B: ?Sized + GpioBackend> GpioPin<'b, B> {
    /// Bind `backend` to pin `id`
    pub fn new(id: u16, backend: &'b mut B) -> Self {
        Self {
            ctx: Context::new(id, backend),
        }
    }

    pub fn context(&self) -> &Context<'b, B> {
        &self.ctx
    }

    /// Current direction, if configured
    pub fn direction(&self) -> Option<Direction> {
        self.ctx.config().map(|config| config.direction)
    }

    fn check_config(backend: &B, config: &GpioConfig) -> HalResult<()> {
        let caps = backend.capabilities();
        let pull_ok = match config.pull {
            Pull::None => true,
            Pull::Up => caps.pull_up,
            Pull::Down => caps.pull_down,
        };
        if !pull_ok || (config.drive == Drive::OpenDrain && !caps.open_drain) {
            return Err(ErrorKind::InvalidConfig);
        }
        Ok(())
    }

    /// Change direction without a full reconfiguration
    pub fn set_direction(&mut self, direction: Direction) -> HalResult<()> {
        let (backend, _) = self.ctx.operate()?;
        backend.set_direction(direction)?;
        self.ctx.update_config(|config| config.direction = direction);
        Ok(())
    }

    /// Sample the pin; permitted in both directions
    pub fn read_level(&mut self) -> HalResult<Level> {
        let (backend, _) = self.ctx.operate()?;
        backend.read_level()
    }

    /// Drive the pin; `InvalidArgument` on an input
    pub fn write_level(&mut self, level: Level) -> HalResult<()> {
        let (backend, config) = self.ctx.operate()?;
        if config.direction == Direction::Input {
            return Err(ErrorKind::InvalidArgument);
        }
        backend.write_level(level)
    }

    /// Invert the driven level; `InvalidArgument` on an input
    pub fn toggle(&mut self) -> HalResult<()> {
        let (backend, config) = self.ctx.operate()?;
        if config.direction == Direction::Input {
            return Err(ErrorKind::InvalidArgument);
        }
        backend.toggle()
    }

    pub fn set_high(&mut self) -> HalResult<()> {
        self.write_level(Level::High)
    }

    pub fn set_low(&mut self) -> HalResult<()> {
        self.write_level(Level::Low)
    }

    pub fn is_high(&mut self) -> HalResult<bool> {
        self.read_level().map(Level::is_high)
    }
}

delegate_lifecycle!(GpioPin, GpioBackend);
