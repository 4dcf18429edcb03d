//! Board Drivers
//!
//! One generic driver ([`DeviceDriver`]) runs the polling cycle for any board.
//! Each board only contributes a state record and a static register map
//! through [`DeviceState`].

mod air_conditioner;
mod curtain;
mod driver;

pub use air_conditioner::{AcField, AirConditioner, AirConditionerState};
pub use curtain::{CurtainController, CurtainField, CurtainState};
pub use driver::DeviceDriver;

use serde::Serialize;
use std::fmt;

use crate::protocol::{ConnectionState, HealthStatus, LinkHealth};

/// One entry of a board's register map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterSpec<F> {
    /// Fixed-point value read as fraction register then integer register
    Pair {
        /// Field the decoded value is stored in
        field: F,
        /// Register answering the fractional digit
        fraction: u8,
        /// Register answering the integer part
        integer: u8,
    },
    /// Single raw byte
    Byte {
        /// Field the byte is stored in
        field: F,
        /// Register answering the byte
        register: u8,
    },
}

impl<F: Copy> RegisterSpec<F> {
    /// Field this entry feeds
    pub fn field(&self) -> F {
        match *self {
            RegisterSpec::Pair { field, .. } | RegisterSpec::Byte { field, .. } => field,
        }
    }

    /// Register ids in query order
    pub fn registers(&self) -> Vec<u8> {
        match *self {
            RegisterSpec::Pair {
                fraction, integer, ..
            } => vec![fraction, integer],
            RegisterSpec::Byte { register, .. } => vec![register],
        }
    }
}

/// Decoded value for one field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Reconstructed fixed-point value
    Fixed(f64),
    /// Single raw byte
    Raw(u8),
}

impl Reading {
    /// Value as a decimal
    pub fn value(self) -> f64 {
        match self {
            Reading::Fixed(v) => v,
            Reading::Raw(b) => b as f64,
        }
    }

    /// Value as a device integer
    pub fn raw(self) -> u8 {
        match self {
            Reading::Fixed(v) => v.clamp(0.0, u8::MAX as f64) as u8,
            Reading::Raw(b) => b,
        }
    }
}

/// Cached state of one board plus its register map
pub trait DeviceState: Default + Clone + fmt::Debug + Serialize + Send + Sync + 'static {
    /// Logical fields of the board
    type Field: Copy + fmt::Debug + Send + 'static;

    /// Board name used in logs and snapshots
    const NAME: &'static str;

    /// Registers in polling order
    const REGISTERS: &'static [RegisterSpec<Self::Field>];

    /// Overwrite `field` with a fresh reading
    fn store(&mut self, field: Self::Field, reading: Reading);
}

/// Where a cycle's values came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleSource {
    /// Polled from the board
    Hardware,
    /// Drawn from the simulator
    Simulation,
    /// Link closed, nothing happened
    Skipped,
}

/// Outcome of one `update()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Where the values came from
    pub source: CycleSource,
    /// Fields overwritten this cycle
    pub updated: usize,
    /// Fields left at their previous value
    pub stale: usize,
    /// Link condition after the cycle
    pub health: HealthStatus,
}

impl CycleReport {
    pub(crate) fn skipped(health: HealthStatus) -> Self {
        Self {
            source: CycleSource::Skipped,
            updated: 0,
            stale: 0,
            health,
        }
    }

    pub(crate) fn simulated(updated: usize, health: HealthStatus) -> Self {
        Self {
            source: CycleSource::Simulation,
            updated,
            stale: 0,
            health,
        }
    }

    /// Whether every field was refreshed
    pub fn is_complete(&self) -> bool {
        self.source != CycleSource::Skipped && self.stale == 0
    }
}

/// Point-in-time view of one board for collaborators
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSnapshot<S> {
    /// Board name
    pub device: &'static str,
    /// Link lifecycle state
    pub connection: ConnectionState,
    /// Link condition
    pub health_status: HealthStatus,
    /// Transfer accounting
    pub health: LinkHealth,
    /// Completed `update()` calls
    pub cycles: u64,
    /// Result of the most recent `update()`
    pub last_cycle: Option<CycleReport>,
    /// Cached values
    pub values: S,
}
