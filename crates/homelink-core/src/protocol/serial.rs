//! Serial port setup

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::time::Duration;

use super::{ProtocolError, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};

/// Check a port name and baud rate before touching the OS
pub fn validate_settings(name: &str, baud_rate: u32) -> Result<(), ProtocolError> {
    if name.trim().is_empty() {
        return Err(ProtocolError::InvalidConfig(
            "port name is empty".to_string(),
        ));
    }
    if baud_rate == 0 {
        return Err(ProtocolError::InvalidConfig(format!(
            "baud rate for {} must be non-zero",
            name
        )));
    }
    Ok(())
}

/// Open a serial port as 8N1 without flow control
///
/// A missing or busy device is a [`ProtocolError::ConnectionFailed`]; only a
/// malformed name or baud rate is [`ProtocolError::InvalidConfig`].
pub fn open_port(
    name: &str,
    baud_rate: Option<u32>,
    timeout: Option<Duration>,
) -> Result<Box<dyn SerialPort>, ProtocolError> {
    let baud = baud_rate.unwrap_or(DEFAULT_BAUD_RATE);
    validate_settings(name, baud)?;

    serialport::new(name, baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(timeout.unwrap_or(Duration::from_millis(DEFAULT_TIMEOUT_MS)))
        .open()
        .map_err(|e| ProtocolError::ConnectionFailed {
            port: name.to_string(),
            reason: e.to_string(),
        })
}
