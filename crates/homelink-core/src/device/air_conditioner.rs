//! Board 1: air conditioner
//!
//! Registers (GET): 0x01 desired fraction, 0x02 desired integer,
//! 0x03 ambient fraction, 0x04 ambient integer, 0x05 fan speed.

use serde::{Deserialize, Serialize};

use super::{CycleReport, DeviceDriver, DeviceSnapshot, DeviceState, Reading, RegisterSpec};
use crate::config::{ConnectionConfig, DESIRED_TEMPERATURE_RANGE};
use crate::protocol::{ByteChannel, ConnectionState, LinkHealth, ProtocolError, SendOutcome};

/// Fields reported by the air conditioner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcField {
    /// Target temperature pair, 0x01/0x02
    DesiredTemperature,
    /// Room temperature pair, 0x03/0x04
    AmbientTemperature,
    /// Fan speed byte, 0x05
    FanSpeed,
}

/// Last known air conditioner values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirConditionerState {
    /// Measured room temperature (°C)
    pub ambient_temperature: f64,
    /// Target temperature as reported by the board (°C)
    pub desired_temperature: f64,
    /// Fan speed in the board's unit (rps)
    pub fan_speed: u8,
}

impl DeviceState for AirConditionerState {
    type Field = AcField;

    const NAME: &'static str = "air-conditioner";

    const REGISTERS: &'static [RegisterSpec<AcField>] = &[
        RegisterSpec::Pair {
            field: AcField::DesiredTemperature,
            fraction: 0x01,
            integer: 0x02,
        },
        RegisterSpec::Pair {
            field: AcField::AmbientTemperature,
            fraction: 0x03,
            integer: 0x04,
        },
        RegisterSpec::Byte {
            field: AcField::FanSpeed,
            register: 0x05,
        },
    ];

    fn store(&mut self, field: AcField, reading: Reading) {
        match field {
            AcField::DesiredTemperature => self.desired_temperature = reading.value(),
            AcField::AmbientTemperature => self.ambient_temperature = reading.value(),
            AcField::FanSpeed => self.fan_speed = reading.raw(),
        }
    }
}

/// Air conditioner board driver
pub struct AirConditioner {
    driver: DeviceDriver<AirConditionerState>,
}

impl AirConditioner {
    /// Create a disconnected driver
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            driver: DeviceDriver::new(config),
        }
    }

    /// Open `port`
    pub fn open(&mut self, port: &str) -> Result<(), ProtocolError> {
        self.driver.open(port)
    }

    /// Open the configured port
    pub fn connect(&mut self) -> Result<(), ProtocolError> {
        self.driver.connect()
    }

    /// Adopt an already-open channel
    pub fn attach(&mut self, channel: Box<dyn ByteChannel>) -> Result<(), ProtocolError> {
        self.driver.attach(channel)
    }

    /// Close the link. Cached values are kept.
    pub fn close(&mut self) {
        self.driver.close();
    }

    /// Whether the link is open
    pub fn is_connected(&self) -> bool {
        self.driver.is_connected()
    }

    /// Link lifecycle state
    pub fn connection_state(&self) -> ConnectionState {
        self.driver.connection_state()
    }

    /// Transfer accounting
    pub fn health(&self) -> &LinkHealth {
        self.driver.health()
    }

    /// Poll every register once. No-op unless connected.
    pub fn update(&mut self) -> CycleReport {
        self.driver.poll()
    }

    /// Send a new target temperature
    ///
    /// Values outside 10.0..=50.0 are rejected before any byte is sent.
    /// The write is fire-and-forget: the board's copy is read back on the
    /// next cycle and overwrites the cached value.
    pub fn set_desired_temp(&mut self, value: f64) -> Result<(), ProtocolError> {
        let value = DESIRED_TEMPERATURE_RANGE
            .validate("desired temperature", value)
            .inspect_err(|e| tracing::warn!(error = %e, "setpoint rejected"))?;

        if self.driver.write_setpoint(value) == SendOutcome::NotOpen {
            tracing::warn!(value, "air conditioner link closed, setpoint not delivered");
        }
        Ok(())
    }

    /// Last room temperature read (°C)
    pub fn ambient_temperature(&self) -> f64 {
        self.driver.state().ambient_temperature
    }

    /// Target temperature as last reported by the board (°C)
    pub fn desired_temperature(&self) -> f64 {
        self.driver.state().desired_temperature
    }

    /// Last fan speed read (rps)
    pub fn fan_speed(&self) -> u8 {
        self.driver.state().fan_speed
    }

    /// Cached values
    pub fn state(&self) -> &AirConditionerState {
        self.driver.state()
    }

    /// Point-in-time view
    pub fn snapshot(&self) -> DeviceSnapshot<AirConditionerState> {
        self.driver.snapshot()
    }
}
