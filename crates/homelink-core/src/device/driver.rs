//! Generic polling driver

use super::{CycleReport, CycleSource, DeviceSnapshot, DeviceState, Reading, RegisterSpec};
use crate::config::ConnectionConfig;
use crate::protocol::{
    decode_get, encode_set, ByteChannel, ConnectionState, HealthStatus, Link, LinkHealth,
    ProtocolError, SendOutcome,
};

/// Driver for one board: a link, the cached state and the polling cycle
pub struct DeviceDriver<S: DeviceState> {
    link: Link,
    state: S,
    cycles: u64,
    last_cycle: Option<CycleReport>,
}

impl<S: DeviceState> DeviceDriver<S> {
    /// Create a disconnected driver
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            link: Link::new(config),
            state: S::default(),
            cycles: 0,
            last_cycle: None,
        }
    }

    /// Cached values
    pub fn state(&self) -> &S {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Underlying link
    pub fn link(&self) -> &Link {
        &self.link
    }

    /// Change the port used by the next `connect`
    pub fn set_port(&mut self, port: &str) {
        self.link.set_port(port);
    }

    /// Open `port` at the configured baud rate
    pub fn open(&mut self, port: &str) -> Result<(), ProtocolError> {
        let baud = self.link.config().baud_rate;
        self.link.open(port, baud)
    }

    /// Open the configured port
    pub fn connect(&mut self) -> Result<(), ProtocolError> {
        self.link.connect()
    }

    /// Adopt an already-open channel
    pub fn attach(&mut self, channel: Box<dyn ByteChannel>) -> Result<(), ProtocolError> {
        self.link.attach(channel)
    }

    /// Close the link. Cached values are kept.
    pub fn close(&mut self) {
        self.link.close();
    }

    /// Whether the link is open
    pub fn is_connected(&self) -> bool {
        self.link.is_open()
    }

    /// Link lifecycle state
    pub fn connection_state(&self) -> ConnectionState {
        self.link.state()
    }

    /// Transfer accounting
    pub fn health(&self) -> &LinkHealth {
        self.link.health()
    }

    /// Run one polling cycle over the register map
    ///
    /// A pair is decoded only when both of its bytes arrive; otherwise the
    /// field keeps its previous value. Every register is queried regardless of
    /// earlier silence in the same cycle.
    pub fn poll(&mut self) -> CycleReport {
        if !self.link.is_open() {
            return self.finish(CycleReport::skipped(HealthStatus::Closed));
        }

        let mut updated = 0;
        let mut stale = 0;
        for spec in S::REGISTERS {
            let reading = match *spec {
                RegisterSpec::Pair {
                    fraction, integer, ..
                } => {
                    let fraction_byte = self.link.round_trip(fraction);
                    let integer_byte = self.link.round_trip(integer);
                    match (integer_byte, fraction_byte) {
                        (Some(i), Some(f)) => Some(Reading::Fixed(decode_get(i, f))),
                        _ => None,
                    }
                }
                RegisterSpec::Byte { register, .. } => {
                    self.link.round_trip(register).map(Reading::Raw)
                }
            };

            match reading {
                Some(reading) => {
                    self.state.store(spec.field(), reading);
                    updated += 1;
                }
                None => {
                    tracing::debug!(
                        device = S::NAME,
                        field = ?spec.field(),
                        "no complete reply, keeping previous value"
                    );
                    stale += 1;
                }
            }
        }

        self.finish(CycleReport {
            source: CycleSource::Hardware,
            updated,
            stale,
            health: self.link.health().status(),
        })
    }

    /// Record a cycle that produced its values some other way
    pub(crate) fn finish(&mut self, report: CycleReport) -> CycleReport {
        self.cycles += 1;
        self.last_cycle = Some(report);
        report
    }

    /// Encode `value` and push it to the board, fraction byte first
    pub fn write_setpoint(&mut self, value: f64) -> SendOutcome {
        let command = encode_set(value);
        tracing::info!(
            device = S::NAME,
            value,
            bytes = format_args!("{:02x?}", command.bytes()),
            "sending setpoint"
        );
        self.link.send_command(command)
    }

    /// Point-in-time view for collaborators
    pub fn snapshot(&self) -> DeviceSnapshot<S> {
        DeviceSnapshot {
            device: S::NAME,
            connection: self.link.state(),
            health_status: self.link.health().status(),
            health: self.link.health().clone(),
            cycles: self.cycles,
            last_cycle: self.last_cycle,
            values: self.state.clone(),
        }
    }
}
