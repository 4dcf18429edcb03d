//! # HomeLink Core Library
//!
//! Protocol layer for the HomeLink air conditioner and curtain boards.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - The fixed-point wire codec (tagged SET bytes, raw GET replies)
//! - Serial (and serial-over-TCP) links with bounded reads and health tracking
//! - A generic register-polling driver with air conditioner and curtain variants
//! - A seeded sensor simulator for running the curtain board without hardware
//! - A poll worker that serializes cycles and setpoint writes per board
//!
//! ## Example
//!
//! ```rust,ignore
//! use homelink_core::{config::ConnectionConfig, device::AirConditioner};
//!
//! let mut ac = AirConditioner::new(ConnectionConfig::default());
//! ac.open("/dev/ttyUSB0")?;
//!
//! ac.update();
//! println!("Ambient: {:.1} C", ac.ambient_temperature());
//!
//! ac.set_desired_temp(23.5)?;
//! ```

pub mod config;
pub mod device;
pub mod protocol;
pub mod simulation;
pub mod worker;

#[cfg(test)]
mod testing;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConnectionConfig, SimulationRanges, SystemConfig, ValueRange};
    pub use crate::device::{
        AirConditioner, AirConditionerState, CurtainController, CurtainState, CycleReport,
        DeviceSnapshot,
    };
    pub use crate::protocol::{ConnectionState, HealthStatus, LinkHealth, ProtocolError};
    pub use crate::simulation::{SensorSimulator, SimulationSource};
    pub use crate::worker::{PollHandle, PolledDevice};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
