//! Link management
//!
//! Owns the byte channel to one board and handles its open/close lifecycle.
//! Transfer faults never escape as errors: they come back as typed outcomes
//! and are tallied in [`LinkHealth`] so a caller can watch the link degrade.

use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use super::{
    codec::SetCommand,
    serial::{open_port, validate_settings},
    stream::{ByteChannel, SerialChannel, TcpChannel},
    ProtocolError,
};
use crate::config::ConnectionConfig;

/// Prefix selecting a TCP bridge instead of a serial device
pub const TCP_SCHEME: &str = "tcp://";

/// Silent round trips in a row before the link is reported as silent
const SILENT_THRESHOLD: u32 = 3;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Opening the port
    Connecting,
    /// Connected and ready
    Connected,
}

/// Result of sending one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Byte handed to the channel
    Sent,
    /// Link closed, nothing transferred
    NotOpen,
    /// Channel rejected the write
    Fault,
}

/// Result of waiting for one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A reply byte arrived
    Byte(u8),
    /// Timeout elapsed with nothing received
    NoReply,
    /// Channel is broken
    Fault,
    /// Link closed, nothing read
    NotOpen,
}

impl ReadOutcome {
    /// The received byte, if any
    pub fn byte(self) -> Option<u8> {
        match self {
            ReadOutcome::Byte(b) => Some(b),
            _ => None,
        }
    }
}

/// Overall link condition derived from recent transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Link closed
    Closed,
    /// Board answering
    Healthy,
    /// Open but the board has stopped answering
    Silent,
    /// Most recent transfer failed at the channel level
    Broken,
}

/// Transfer accounting for one link
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkHealth {
    /// Bytes written
    pub tx_bytes: u64,
    /// Bytes received
    pub rx_bytes: u64,
    /// Reads that timed out
    pub timeouts: u64,
    /// Channel-level send or receive failures
    pub faults: u64,
    /// Timeouts since the last received byte
    pub consecutive_silent: u32,
    /// Failures since the last successful transfer
    pub consecutive_faults: u32,
    /// Message of the most recent failure
    pub last_fault: Option<String>,
    open: bool,
}

impl LinkHealth {
    /// Current condition
    pub fn status(&self) -> HealthStatus {
        if !self.open {
            HealthStatus::Closed
        } else if self.consecutive_faults > 0 {
            HealthStatus::Broken
        } else if self.consecutive_silent >= SILENT_THRESHOLD {
            HealthStatus::Silent
        } else {
            HealthStatus::Healthy
        }
    }

    fn record_sent(&mut self) {
        self.tx_bytes += 1;
        self.consecutive_faults = 0;
    }

    fn record_received(&mut self) {
        self.rx_bytes += 1;
        self.consecutive_silent = 0;
        self.consecutive_faults = 0;
    }

    fn record_timeout(&mut self) {
        self.timeouts += 1;
        self.consecutive_silent = self.consecutive_silent.saturating_add(1);
    }

    fn record_fault(&mut self, message: String) {
        self.faults += 1;
        self.consecutive_faults = self.consecutive_faults.saturating_add(1);
        self.last_fault = Some(message);
    }

    fn set_open(&mut self, open: bool) {
        self.open = open;
        self.consecutive_silent = 0;
        self.consecutive_faults = 0;
    }
}

/// Byte link to a single board
pub struct Link {
    /// Open channel, if any
    channel: Option<Box<dyn ByteChannel>>,
    /// Current connection state
    state: ConnectionState,
    /// Port and timing settings
    config: ConnectionConfig,
    /// Transfer accounting
    health: LinkHealth,
}

impl Link {
    /// Create a closed link
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            channel: None,
            state: ConnectionState::Disconnected,
            config,
            health: LinkHealth::default(),
        }
    }

    /// Link settings
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Change the port used by the next `connect`
    pub fn set_port(&mut self, port: &str) {
        self.config.port_name = port.to_string();
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether bytes can be transferred
    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// Transfer accounting
    pub fn health(&self) -> &LinkHealth {
        &self.health
    }

    /// Configure `port` and `baud_rate`, then connect
    pub fn open(&mut self, port: &str, baud_rate: u32) -> Result<(), ProtocolError> {
        self.config.port_name = port.to_string();
        self.config.baud_rate = baud_rate;
        self.connect()
    }

    /// Open the configured port
    ///
    /// A port name starting with `tcp://` connects to a serial bridge instead.
    pub fn connect(&mut self) -> Result<(), ProtocolError> {
        if self.is_open() {
            tracing::debug!(port = %self.config.port_name, "reopening link");
            self.close();
        }

        self.state = ConnectionState::Connecting;
        let result = match self.config.port_name.strip_prefix(TCP_SCHEME) {
            Some(addr) => {
                let addr = addr.to_string();
                self.connect_tcp(&addr)
            }
            None => self.connect_serial(),
        };

        if let Err(e) = &result {
            tracing::warn!(port = %self.config.port_name, error = %e, "failed to open link");
            self.state = ConnectionState::Disconnected;
        }
        result
    }

    fn connect_serial(&mut self) -> Result<(), ProtocolError> {
        let port = open_port(
            &self.config.port_name,
            Some(self.config.baud_rate),
            Some(self.config.timeout()),
        )?;
        self.attach(Box::new(SerialChannel::new(port)))
    }

    fn connect_tcp(&mut self, addr: &str) -> Result<(), ProtocolError> {
        validate_settings(addr, self.config.baud_rate)?;
        let stream = TcpStream::connect(addr).map_err(|e| ProtocolError::ConnectionFailed {
            port: format!("{}{}", TCP_SCHEME, addr),
            reason: e.to_string(),
        })?;
        self.attach(Box::new(TcpChannel::new(stream)))
    }

    /// Open a TCP serial bridge at `addr` (`host:port`)
    pub fn open_tcp(&mut self, addr: &str) -> Result<(), ProtocolError> {
        self.config.port_name = format!("{}{}", TCP_SCHEME, addr);
        self.connect()
    }

    /// Adopt an already-open channel
    pub fn attach(&mut self, mut channel: Box<dyn ByteChannel>) -> Result<(), ProtocolError> {
        channel.prepare(self.config.timeout())?;

        tracing::info!(
            endpoint = %channel.describe(),
            baud = self.config.baud_rate,
            timeout_ms = self.config.timeout_ms,
            "link open"
        );
        self.channel = Some(channel);
        self.state = ConnectionState::Connected;
        self.health.set_open(true);
        Ok(())
    }

    /// Close the link. Safe to call when already closed.
    pub fn close(&mut self) {
        if let Some(channel) = self.channel.take() {
            tracing::info!(endpoint = %channel.describe(), "link closed");
        }
        self.state = ConnectionState::Disconnected;
        self.health.set_open(false);
    }

    /// Send one byte, best effort
    pub fn send_byte(&mut self, byte: u8) -> SendOutcome {
        let Some(channel) = self.channel.as_mut() else {
            return SendOutcome::NotOpen;
        };

        match channel.write_all(&[byte]).and_then(|_| channel.flush()) {
            Ok(()) => {
                self.health.record_sent();
                SendOutcome::Sent
            }
            Err(e) => {
                tracing::warn!(byte = format_args!("{:#04x}", byte), error = %e, "send failed");
                self.health.record_fault(e.to_string());
                SendOutcome::Fault
            }
        }
    }

    /// Wait up to the configured timeout for one byte
    pub fn read_byte(&mut self) -> ReadOutcome {
        let Some(channel) = self.channel.as_mut() else {
            return ReadOutcome::NotOpen;
        };

        let mut buf = [0u8; 1];
        match channel.read(&mut buf) {
            Ok(1) => {
                self.health.record_received();
                ReadOutcome::Byte(buf[0])
            }
            Ok(_) => {
                tracing::warn!("channel reached end of stream");
                self.health.record_fault("end of stream".to_string());
                ReadOutcome::Fault
            }
            Err(e) if is_timeout(&e) => {
                self.health.record_timeout();
                ReadOutcome::NoReply
            }
            Err(e) => {
                tracing::warn!(error = %e, "receive failed");
                self.health.record_fault(e.to_string());
                ReadOutcome::Fault
            }
        }
    }

    /// Query one register and wait for its reply byte
    pub fn round_trip(&mut self, register: u8) -> Option<u8> {
        if self.send_byte(register) != SendOutcome::Sent {
            return None;
        }
        let reply = self.read_byte();
        tracing::debug!(
            register = format_args!("{:#04x}", register),
            reply = ?reply,
            "round trip"
        );
        reply.byte()
    }

    /// Transmit a SET command, pausing after each byte for the board to process it
    pub fn send_command(&mut self, command: SetCommand) -> SendOutcome {
        let delay = self.config.inter_byte_delay();
        let mut outcome = SendOutcome::Sent;
        for byte in command.bytes() {
            tracing::debug!(byte = format_args!("{:#04x}", byte), "set byte");
            match self.send_byte(byte) {
                SendOutcome::Sent => {}
                other => outcome = other,
            }
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
        outcome
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.close();
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
