//! Virtual board for integration tests
//!
//! Serves the board protocol on a local TCP socket so tests can exercise the
//! full stack: `Link::open_tcp`, the drivers and the codec.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use homelink_core::config::ConnectionConfig;
use homelink_core::protocol::codec::{is_set_fraction, is_set_integer, payload};

/// Register contents and what the board has seen
#[derive(Default)]
pub struct BoardMemory {
    pub registers: HashMap<u8, u8>,
    pub silent: HashSet<u8>,
    /// Values assembled from SET pairs
    pub setpoints: Vec<f64>,
    /// Raw SET bytes in arrival order
    pub set_bytes: Vec<u8>,
    pub queries: Vec<u8>,
    pending_fraction: Option<u8>,
}

pub struct VirtualBoard {
    pub addr: SocketAddr,
    pub memory: Arc<Mutex<BoardMemory>>,
    /// (fraction, integer) registers a SET pair lands in
    setpoint_registers: (u8, u8),
    stream: Arc<Mutex<Option<TcpStream>>>,
}

impl VirtualBoard {
    pub fn start(registers: &[(u8, u8)], setpoint_registers: (u8, u8)) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let memory = Arc::new(Mutex::new(BoardMemory {
            registers: registers.iter().copied().collect(),
            ..BoardMemory::default()
        }));
        let stream_slot = Arc::new(Mutex::new(None));

        let board_memory = memory.clone();
        let slot = stream_slot.clone();
        thread::spawn(move || {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            *slot.lock().unwrap() = stream.try_clone().ok();
            serve(stream, board_memory, setpoint_registers);
        });

        Self {
            addr,
            memory,
            setpoint_registers,
            stream: stream_slot,
        }
    }

    /// Air conditioner register layout; SETs land in the desired pair
    pub fn air_conditioner(desired: (u8, u8), ambient: (u8, u8), fan: u8) -> Self {
        Self::start(
            &[
                (0x01, desired.1),
                (0x02, desired.0),
                (0x03, ambient.1),
                (0x04, ambient.0),
                (0x05, fan),
            ],
            (0x01, 0x02),
        )
    }

    /// Curtain register layout; SETs land in the position pair
    pub fn curtain(values: [(u8, u8); 4]) -> Self {
        let mut registers = Vec::new();
        for (i, (integer, fraction)) in values.iter().enumerate() {
            let base = 0x01 + 2 * i as u8;
            registers.push((base, *fraction));
            registers.push((base + 1, *integer));
        }
        Self::start(&registers, (0x01, 0x02))
    }

    pub fn url(&self) -> String {
        self.addr.to_string()
    }

    pub fn silence(&self, register: u8) {
        self.memory.lock().unwrap().silent.insert(register);
    }

    pub fn set_register(&self, register: u8, value: u8) {
        self.memory.lock().unwrap().registers.insert(register, value);
    }

    /// Drop the connection as if the cable were pulled
    pub fn unplug(&self) {
        if let Some(stream) = self.stream.lock().unwrap().take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

fn serve(mut stream: TcpStream, memory: Arc<Mutex<BoardMemory>>, setpoint: (u8, u8)) {
    let mut byte = [0u8; 1];
    loop {
        match stream.read(&mut byte) {
            Ok(1) => {}
            _ => return,
        }
        let b = byte[0];
        let reply = {
            let mut mem = memory.lock().unwrap();
            if is_set_fraction(b) {
                mem.set_bytes.push(b);
                mem.pending_fraction = Some(payload(b));
                None
            } else if is_set_integer(b) {
                mem.set_bytes.push(b);
                if let Some(fraction) = mem.pending_fraction.take() {
                    let integer = payload(b);
                    mem.registers.insert(setpoint.0, fraction);
                    mem.registers.insert(setpoint.1, integer);
                    mem.setpoints.push(integer as f64 + fraction as f64 / 10.0);
                }
                None
            } else {
                mem.queries.push(b);
                if mem.silent.contains(&b) {
                    None
                } else {
                    mem.registers.get(&b).copied()
                }
            }
        };
        if let Some(reply) = reply {
            if stream.write_all(&[reply]).is_err() {
                return;
            }
        }
    }
}

/// Link settings tuned for fast tests
pub fn test_config() -> ConnectionConfig {
    let mut config = ConnectionConfig::default();
    config.timeout_ms = 50;
    config.inter_byte_delay_ms = 1;
    config
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
