//! Simulation Mode - synthetic outdoor sensor data
//!
//! Stands in for the curtain board's sensors when no hardware is attached.
//! Each reading is drawn independently and uniformly from its configured
//! range and rounded to one decimal, the resolution of the wire format.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{SimulationRanges, ValueRange};

/// One set of simulated outdoor readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    /// °C
    pub outdoor_temperature: f64,
    /// hPa
    pub outdoor_pressure: f64,
    /// lux
    pub light_intensity: f64,
}

/// Anything that can produce simulated readings
pub trait SimulationSource: Send {
    /// Draw the next set of readings
    fn sample(&mut self) -> SensorSample;
}

/// Uniform sensor simulator over an injected random source
pub struct SensorSimulator<R = StdRng> {
    rng: R,
    ranges: SimulationRanges,
}

impl SensorSimulator<StdRng> {
    /// Simulator seeded from OS entropy
    pub fn new(ranges: SimulationRanges) -> Self {
        Self::with_rng(StdRng::from_entropy(), ranges)
    }

    /// Reproducible simulator
    pub fn seeded(seed: u64, ranges: SimulationRanges) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), ranges)
    }
}

impl Default for SensorSimulator<StdRng> {
    fn default() -> Self {
        Self::new(SimulationRanges::default())
    }
}

impl<R: Rng> SensorSimulator<R> {
    /// Simulator drawing from `rng`
    ///
    /// Empty or non-finite ranges fall back to their defaults.
    pub fn with_rng(rng: R, ranges: SimulationRanges) -> Self {
        Self {
            rng,
            ranges: ranges.sanitized(),
        }
    }

    /// Configured value domains
    pub fn ranges(&self) -> &SimulationRanges {
        &self.ranges
    }

    fn draw(&mut self, range: ValueRange) -> f64 {
        let raw = self.rng.gen_range(range.min..=range.max);
        // Rounding may step past a bound that has more than one decimal
        range.clamp((raw * 10.0).round() / 10.0)
    }
}

impl<R: Rng + Send> SimulationSource for SensorSimulator<R> {
    fn sample(&mut self) -> SensorSample {
        let ranges = self.ranges;
        SensorSample {
            outdoor_temperature: self.draw(ranges.temperature),
            outdoor_pressure: self.draw(ranges.pressure),
            light_intensity: self.draw(ranges.light),
        }
    }
}
