//! Board 2: curtain motor and outdoor sensors
//!
//! Registers (GET, fraction then integer): 0x01/0x02 curtain position,
//! 0x03/0x04 outdoor temperature, 0x05/0x06 outdoor pressure,
//! 0x07/0x08 light intensity.
//!
//! In simulation mode the sensors come from a [`SimulationSource`] and the
//! link stays closed; hardware and simulated data never mix.

use serde::{Deserialize, Serialize};

use super::{
    CycleReport, DeviceDriver, DeviceSnapshot, DeviceState, Reading, RegisterSpec,
};
use crate::config::{ConnectionConfig, CURTAIN_POSITION_RANGE};
use crate::protocol::{ByteChannel, ConnectionState, LinkHealth, ProtocolError, SendOutcome};
use crate::simulation::{SensorSimulator, SimulationSource};

/// Fields reported by the curtain board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurtainField {
    /// 0x01/0x02
    CurtainPosition,
    /// 0x03/0x04
    OutdoorTemperature,
    /// 0x05/0x06
    OutdoorPressure,
    /// 0x07/0x08
    LightIntensity,
}

/// Last known curtain board values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurtainState {
    /// Curtain position (0 open, 100 closed)
    pub curtain_position: f64,
    /// Outdoor temperature (°C)
    pub outdoor_temperature: f64,
    /// Outdoor pressure (hPa)
    pub outdoor_pressure: f64,
    /// Light intensity (lux)
    pub light_intensity: f64,
    /// Values come from the simulator
    pub simulation_active: bool,
}

impl DeviceState for CurtainState {
    type Field = CurtainField;

    const NAME: &'static str = "curtain";

    const REGISTERS: &'static [RegisterSpec<CurtainField>] = &[
        RegisterSpec::Pair {
            field: CurtainField::CurtainPosition,
            fraction: 0x01,
            integer: 0x02,
        },
        RegisterSpec::Pair {
            field: CurtainField::OutdoorTemperature,
            fraction: 0x03,
            integer: 0x04,
        },
        RegisterSpec::Pair {
            field: CurtainField::OutdoorPressure,
            fraction: 0x05,
            integer: 0x06,
        },
        RegisterSpec::Pair {
            field: CurtainField::LightIntensity,
            fraction: 0x07,
            integer: 0x08,
        },
    ];

    fn store(&mut self, field: CurtainField, reading: Reading) {
        let value = reading.value();
        match field {
            CurtainField::CurtainPosition => self.curtain_position = value,
            CurtainField::OutdoorTemperature => self.outdoor_temperature = value,
            CurtainField::OutdoorPressure => self.outdoor_pressure = value,
            CurtainField::LightIntensity => self.light_intensity = value,
        }
    }
}

/// Curtain and sensor board driver
pub struct CurtainController {
    driver: DeviceDriver<CurtainState>,
    simulator: Box<dyn SimulationSource>,
}

impl CurtainController {
    /// Create a disconnected driver with an entropy-seeded simulator
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_simulator(config, SensorSimulator::default())
    }

    /// Create a disconnected driver drawing simulated values from `simulator`
    pub fn with_simulator(
        config: ConnectionConfig,
        simulator: impl SimulationSource + 'static,
    ) -> Self {
        Self {
            driver: DeviceDriver::new(config),
            simulator: Box::new(simulator),
        }
    }

    /// Open `port`
    ///
    /// Refused while simulation is active; leave simulation mode first.
    pub fn open(&mut self, port: &str) -> Result<(), ProtocolError> {
        self.ensure_hardware_mode()?;
        self.driver.open(port)
    }

    /// Open the configured port
    pub fn connect(&mut self) -> Result<(), ProtocolError> {
        self.ensure_hardware_mode()?;
        self.driver.connect()
    }

    /// Adopt an already-open channel
    pub fn attach(&mut self, channel: Box<dyn ByteChannel>) -> Result<(), ProtocolError> {
        self.ensure_hardware_mode()?;
        self.driver.attach(channel)
    }

    fn ensure_hardware_mode(&self) -> Result<(), ProtocolError> {
        if self.is_simulation_active() {
            Err(ProtocolError::SimulationActive)
        } else {
            Ok(())
        }
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

    /// Switch between simulated and hardware data
    ///
    /// Entering simulation closes an open link. Leaving it does not reconnect.
    pub fn set_simulation_mode(&mut self, active: bool) {
        if self.is_simulation_active() == active {
            return;
        }
        if active && self.driver.is_connected() {
            self.driver.close();
        }
        self.driver.state_mut().simulation_active = active;
        tracing::info!(active, "curtain simulation mode changed");
    }

    /// Whether sensor values come from the simulator
    pub fn is_simulation_active(&self) -> bool {
        self.driver.state().simulation_active
    }

    /// Refresh sensor values from the simulator or the board
    pub fn update(&mut self) -> CycleReport {
        if !self.is_simulation_active() {
            return self.driver.poll();
        }

        let sample = self.simulator.sample();
        let state = self.driver.state_mut();
        state.outdoor_temperature = sample.outdoor_temperature;
        state.outdoor_pressure = sample.outdoor_pressure;
        state.light_intensity = sample.light_intensity;
        let health = self.driver.health().status();
        self.driver.finish(CycleReport::simulated(3, health))
    }

    /// Move the curtain, clamping into 0..=100
    ///
    /// Returns the clamped value. In simulation it becomes the cached
    /// position immediately; otherwise it is sent to the board. A
    /// non-finite value is ignored and the cached position is returned.
    pub fn set_curtain_status(&mut self, value: f64) -> f64 {
        if !value.is_finite() {
            tracing::warn!(value, "ignoring non-finite curtain position");
            return self.curtain_status();
        }
        let value = CURTAIN_POSITION_RANGE.clamp(value);

        if self.is_simulation_active() {
            self.driver.state_mut().curtain_position = value;
            tracing::debug!(value, "simulated curtain position set");
            return value;
        }

        if self.driver.write_setpoint(value) == SendOutcome::NotOpen {
            tracing::warn!(value, "curtain link closed, position not delivered");
        }
        value
    }

    /// Cached curtain position
    pub fn curtain_status(&self) -> f64 {
        self.driver.state().curtain_position
    }

    /// Cached outdoor temperature (°C)
    pub fn outdoor_temperature(&self) -> f64 {
        self.driver.state().outdoor_temperature
    }

    /// Cached outdoor pressure (hPa)
    pub fn outdoor_pressure(&self) -> f64 {
        self.driver.state().outdoor_pressure
    }

    /// Cached light intensity (lux)
    pub fn light_intensity(&self) -> f64 {
        self.driver.state().light_intensity
    }

    /// Cached values
    pub fn state(&self) -> &CurtainState {
        self.driver.state()
    }

    /// Point-in-time view
    pub fn snapshot(&self) -> DeviceSnapshot<CurtainState> {
        self.driver.snapshot()
    }
}
