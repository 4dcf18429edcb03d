//! Byte channels a [`Link`](super::Link) can drive
//!
//! A board is reached either through a local serial port or through a
//! serial-over-TCP bridge (ser2net style). Both look the same to the link:
//! a blocking byte stream with a bounded read wait.

use serialport::{ClearBuffer, SerialPort};
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

/// Blocking byte stream to one board
pub trait ByteChannel: Read + Write + Send {
    /// Bound every read and write by `timeout`, then drop bytes left over
    /// from before the link was opened
    fn prepare(&mut self, timeout: Duration) -> io::Result<()>;

    /// Endpoint name for logs
    fn describe(&self) -> String;
}

/// Local serial port
pub struct SerialChannel(Box<dyn SerialPort>);

impl SerialChannel {
    /// Wrap an open port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self(port)
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl ByteChannel for SerialChannel {
    fn prepare(&mut self, timeout: Duration) -> io::Result<()> {
        self.0.set_timeout(timeout).map_err(io::Error::other)?;
        self.0.clear(ClearBuffer::All).map_err(io::Error::other)
    }

    fn describe(&self) -> String {
        self.0.name().unwrap_or_else(|| "serial".to_string())
    }
}

/// Serial-over-TCP bridge
pub struct TcpChannel(TcpStream);

impl TcpChannel {
    /// Wrap a connected stream, disabling Nagle
    pub fn new(stream: TcpStream) -> Self {
        // Single-byte round trips must not wait in Nagle's buffer
        let _ = stream.set_nodelay(true);
        Self(stream)
    }

    /// Read until the socket has nothing queued
    fn drain(&mut self) -> io::Result<()> {
        let mut scratch = [0u8; 64];
        loop {
            match self.0.read(&mut scratch) {
                Ok(0) => return Ok(()),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }
}

impl Read for TcpChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for TcpChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl ByteChannel for TcpChannel {
    fn prepare(&mut self, timeout: Duration) -> io::Result<()> {
        self.0.set_read_timeout(Some(timeout))?;
        self.0.set_write_timeout(Some(timeout))?;

        self.0.set_nonblocking(true)?;
        let drained = self.drain();
        self.0.set_nonblocking(false)?;
        drained
    }

    fn describe(&self) -> String {
        match self.0.peer_addr() {
            Ok(addr) => format!("{}{}", super::TCP_SCHEME, addr),
            Err(_) => "tcp".to_string(),
        }
    }
}
