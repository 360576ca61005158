use heapless::Vec;

use super::{MockLifecycle, LOG_DEPTH};
use crate::binding::{Backend, BackendInfo, PeripheralId, ThreadSafety};
use crate::error::{ErrorKind, HalResult};
use crate::gpio::{Direction, GpioBackend, GpioCapabilities, GpioConfig, Level};

/// Data operation observed by [`MockGpio`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioCall {
    SetDirection(Direction),
    Read,
    Write(Level),
    Toggle,
}

/// Recording GPIO backend modelling a single pin
#[derive(Debug, Clone)]
pub struct MockGpio {
    pub lifecycle: MockLifecycle<GpioConfig>,
    pub capabilities: GpioCapabilities,
    /// Level applied to the pin from outside, seen while it is an input
    pub external: Level,
    /// Error returned by the next data operation
    pub fail_next: Option<ErrorKind>,
    direction: Direction,
    driven: Level,
    calls: Vec<GpioCall, LOG_DEPTH>,
}

impl MockGpio {
    pub const INFO: BackendInfo = BackendInfo::new("mock-gpio", 32, ThreadSafety::NotThreadSafe);

    pub fn new() -> Self {
        Self::with_info(Self::INFO)
    }

    pub fn with_info(info: BackendInfo) -> Self {
        Self {
            lifecycle: MockLifecycle::new(info),
            capabilities: GpioCapabilities::default(),
            external: Level::Low,
            fail_next: None,
            direction: Direction::Input,
            driven: Level::Low,
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[GpioCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Direction as last applied by the contract
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Level the pin drives while it is an output
    pub fn driven(&self) -> Level {
        self.driven
    }

    fn record(&mut self, call: GpioCall) -> HalResult<()> {
        let _ = self.calls.push(call);
        self.fail_next.take().map_or(Ok(()), Err)
    }
}

impl Default for MockGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MockGpio {
    type Config = GpioConfig;

    fn info(&self) -> BackendInfo {
        self.lifecycle.info
    }

    fn init(&mut self, id: PeripheralId) -> HalResult<()> {
        self.lifecycle.init(id)
    }

    fn configure(&mut self, config: &GpioConfig) -> HalResult<()> {
        self.lifecycle.configure(config)?;
        self.direction = config.direction;
        self.driven = config.initial;
        Ok(())
    }

    fn deinit(&mut self) -> HalResult<()> {
        self.direction = Direction::Input;
        self.lifecycle.deinit()
    }
}

impl GpioBackend for MockGpio {
    fn capabilities(&self) -> GpioCapabilities {
        self.capabilities
    }

    fn set_direction(&mut self, direction: Direction) -> HalResult<()> {
        self.record(GpioCall::SetDirection(direction))?;
        self.direction = direction;
        Ok(())
    }

    fn read_level(&mut self) -> HalResult<Level> {
        self.record(GpioCall::Read)?;
        Ok(match self.direction {
            Direction::Input => self.external,
            Direction::Output => self.driven,
        })
    }

    fn write_level(&mut self, level: Level) -> HalResult<()> {
        self.record(GpioCall::Write(level))?;
        self.driven = level;
        Ok(())
    }

    fn toggle(&mut self) -> HalResult<()> {
        self.record(GpioCall::Toggle)?;
        self.driven = self.driven.toggled();
        Ok(())
    }
}
