//! In-memory board used by unit tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::protocol::codec::{is_set_fraction, is_set_integer};
use crate::protocol::ByteChannel;

/// Answers GET queries from a register table and records everything sent
#[derive(Default)]
pub struct FakeBoard {
    pub registers: HashMap<u8, u8>,
    pub silent: HashSet<u8>,
    pub sent: Vec<u8>,
    pub fail_writes: bool,
    pending: VecDeque<u8>,
}

impl FakeBoard {
    pub fn shared(registers: &[(u8, u8)]) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            registers: registers.iter().copied().collect(),
            ..Self::default()
        }))
    }

    pub fn channel(board: &Arc<Mutex<Self>>) -> Box<dyn ByteChannel> {
        Box::new(FakeChannel(board.clone()))
    }

    /// Bytes carrying a SET tag
    pub fn set_bytes(&self) -> Vec<u8> {
        self.sent
            .iter()
            .copied()
            .filter(|b| is_set_fraction(*b) || is_set_integer(*b))
            .collect()
    }
}

struct FakeChannel(Arc<Mutex<FakeBoard>>);

impl Read for FakeChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.lock().unwrap().pending.pop_front() {
            Some(b) => {
                buf[0] = b;
                Ok(1)
            }
            None => Err(io::Error::new(io::ErrorKind::TimedOut, "timed out")),
        }
    }
}

impl Write for FakeChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut board = self.0.lock().unwrap();
        if board.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
        }
        for &byte in buf {
            board.sent.push(byte);
            if is_set_fraction(byte) || is_set_integer(byte) || board.silent.contains(&byte) {
                continue;
            }
            if let Some(&reply) = board.registers.get(&byte) {
                board.pending.push_back(reply);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ByteChannel for FakeChannel {
    fn prepare(&mut self, _timeout: Duration) -> io::Result<()> {
        self.0.lock().unwrap().pending.clear();
        Ok(())
    }

    fn describe(&self) -> String {
        "fake-board".to_string()
    }
}
