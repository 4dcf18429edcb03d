//! Configuration and shared value objects
//!
//! Connection settings for each board, the simulation value domains and the
//! setpoint limits the drivers enforce. [`SystemConfig`] is stored as JSON;
//! any field missing from the file takes its default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::protocol::{
    ProtocolError, DEFAULT_BAUD_RATE, DEFAULT_INTER_BYTE_DELAY_MS, DEFAULT_TIMEOUT_MS,
};

/// Closed interval of allowed values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    /// Lower bound (inclusive)
    pub min: f64,
    /// Upper bound (inclusive)
    pub max: f64,
}

impl ValueRange {
    /// Create a range from `min` to `max`
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether both bounds are finite and `min <= max`
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Whether `value` lies within the range
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Nearest value within the range
    ///
    /// The range must be valid; see [`ValueRange::is_valid`].
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Reject `value` unless it lies within the range
    pub fn validate(&self, field: &'static str, value: f64) -> Result<f64, ProtocolError> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(ProtocolError::Validation {
                field,
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// Allowed desired temperature for the air conditioner (°C)
pub const DESIRED_TEMPERATURE_RANGE: ValueRange = ValueRange::new(10.0, 50.0);

/// Allowed curtain position (% closed)
pub const CURTAIN_POSITION_RANGE: ValueRange = ValueRange::new(0.0, 100.0);

/// Connection/communication settings for one board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Serial port name, or `tcp://host:port` for a bridge
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Reply timeout in milliseconds
    pub timeout_ms: u64,
    /// Pause after each SET byte in milliseconds
    pub inter_byte_delay_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            inter_byte_delay_ms: DEFAULT_INTER_BYTE_DELAY_MS,
        }
    }
}

impl ConnectionConfig {
    /// Default settings on `port`
    pub fn for_port(port: &str) -> Self {
        Self {
            port_name: port.to_string(),
            ..Self::default()
        }
    }

    /// Reply timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Pause after each SET byte
    pub fn inter_byte_delay(&self) -> Duration {
        Duration::from_millis(self.inter_byte_delay_ms)
    }
}

/// Value domains used by the sensor simulator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationRanges {
    /// Outdoor temperature (°C)
    pub temperature: ValueRange,
    /// Outdoor pressure (hPa)
    pub pressure: ValueRange,
    /// Light intensity (lux)
    pub light: ValueRange,
}

impl Default for SimulationRanges {
    fn default() -> Self {
        Self {
            temperature: ValueRange::new(15.0, 30.0),
            pressure: ValueRange::new(1000.0, 1020.0),
            light: ValueRange::new(200.0, 800.0),
        }
    }
}

impl SimulationRanges {
    fn named(&self) -> [(&'static str, ValueRange); 3] {
        [
            ("temperature", self.temperature),
            ("pressure", self.pressure),
            ("light", self.light),
        ]
    }

    /// Reject empty or non-finite ranges
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self.named().into_iter().find(|(_, range)| !range.is_valid()) {
            Some((name, range)) => Err(ProtocolError::Config(format!(
                "simulation {} range {}..={} is empty or not finite",
                name, range.min, range.max
            ))),
            None => Ok(()),
        }
    }

    /// Copy with every invalid range replaced by its default
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let pick = |range: ValueRange, default: ValueRange| {
            if range.is_valid() {
                range
            } else {
                tracing::warn!(?range, "invalid simulation range, using default");
                default
            }
        };
        Self {
            temperature: pick(self.temperature, defaults.temperature),
            pressure: pick(self.pressure, defaults.pressure),
            light: pick(self.light, defaults.light),
        }
    }
}

/// Whole-system settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Board 1
    pub air_conditioner: ConnectionConfig,
    /// Board 2
    pub curtain: ConnectionConfig,
    /// Time between polling cycles in milliseconds
    pub poll_interval_ms: u64,
    /// Start the curtain board in simulation mode
    pub simulate_curtain: bool,
    /// Simulator value domains
    pub simulation: SimulationRanges,
    /// Default log level for the console
    pub log_level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            air_conditioner: ConnectionConfig::for_port("COM7"),
            curtain: ConnectionConfig::for_port("COM9"),
            poll_interval_ms: 500,
            simulate_curtain: false,
            simulation: SimulationRanges::default(),
            log_level: "info".to_string(),
        }
    }
}

impl SystemConfig {
    /// Parse settings from JSON
    ///
    /// Simulation ranges must be non-empty and finite.
    pub fn from_json(content: &str) -> Result<Self, ProtocolError> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| ProtocolError::Config(e.to_string()))?;
        config.simulation.validate()?;
        Ok(config)
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, ProtocolError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
            .map_err(|e| ProtocolError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Write settings to a JSON file
    pub fn save(&self, path: &Path) -> Result<(), ProtocolError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ProtocolError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Time between polling cycles
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
