//! Poll worker
//!
//! A dedicated OS thread owns one driver and is the only code that touches
//! its link. Polling cycles and setpoint writes run strictly one after the
//! other: commands queue up on a channel and are drained between cycles, so
//! a reply byte can never be matched to the wrong query.
//!
//! Snapshots are published on a `tokio::sync::watch` channel after every
//! cycle and command, readable both from sync code and from async tasks.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::{oneshot, watch};

use crate::device::{
    AirConditioner, AirConditionerState, CurtainController, CurtainState, CycleReport,
    DeviceSnapshot, DeviceState,
};
use crate::protocol::ProtocolError;

/// A driver that can be run by a [`PollHandle`]
pub trait PolledDevice: Send + 'static {
    /// Cached state type
    type State: DeviceState;
    /// Board specific commands
    type Command: Send + 'static;

    /// Run one `update()`
    fn poll(&mut self) -> CycleReport;
    /// Open the link, optionally on a new port
    fn connect(&mut self, port: Option<&str>) -> Result<(), ProtocolError>;
    /// Close the link
    fn close(&mut self);
    /// Apply a board specific command
    fn execute(&mut self, command: Self::Command);
    /// Current view
    fn snapshot(&self) -> DeviceSnapshot<Self::State>;
}

/// Commands for the air conditioner worker
pub enum AcCommand {
    /// Validate and send a new target temperature
    SetDesiredTemp {
        /// Target in °C
        value: f64,
        /// Validation result
        reply: oneshot::Sender<Result<(), ProtocolError>>,
    },
}

/// Commands for the curtain worker
pub enum CurtainCommand {
    /// Move the curtain; replies with the clamped position
    SetPosition {
        /// Requested position, clamped into 0..=100
        value: f64,
        /// Position actually applied
        reply: oneshot::Sender<f64>,
    },
    /// Enter or leave simulation mode
    SetSimulation(bool),
}

impl PolledDevice for AirConditioner {
    type State = AirConditionerState;
    type Command = AcCommand;

    fn poll(&mut self) -> CycleReport {
        self.update()
    }

    fn connect(&mut self, port: Option<&str>) -> Result<(), ProtocolError> {
        match port {
            Some(port) => self.open(port),
            None => AirConditioner::connect(self),
        }
    }

    fn close(&mut self) {
        AirConditioner::close(self);
    }

    fn execute(&mut self, command: AcCommand) {
        match command {
            AcCommand::SetDesiredTemp { value, reply } => {
                let _ = reply.send(self.set_desired_temp(value));
            }
        }
    }

    fn snapshot(&self) -> DeviceSnapshot<AirConditionerState> {
        AirConditioner::snapshot(self)
    }
}

impl PolledDevice for CurtainController {
    type State = CurtainState;
    type Command = CurtainCommand;

    fn poll(&mut self) -> CycleReport {
        self.update()
    }

    fn connect(&mut self, port: Option<&str>) -> Result<(), ProtocolError> {
        match port {
            Some(port) => self.open(port),
            None => CurtainController::connect(self),
        }
    }

    fn close(&mut self) {
        CurtainController::close(self);
    }

    fn execute(&mut self, command: CurtainCommand) {
        match command {
            CurtainCommand::SetPosition { value, reply } => {
                let _ = reply.send(self.set_curtain_status(value));
            }
            CurtainCommand::SetSimulation(active) => self.set_simulation_mode(active),
        }
    }

    fn snapshot(&self) -> DeviceSnapshot<CurtainState> {
        CurtainController::snapshot(self)
    }
}

enum WorkerMessage<C> {
    Device(C),
    Connect {
        port: Option<String>,
        reply: oneshot::Sender<Result<(), ProtocolError>>,
    },
    Close,
    /// Run a cycle now instead of waiting for the interval
    PollNow,
    Shutdown,
}

/// Handle to a running poll worker
pub struct PollHandle<D: PolledDevice> {
    commands: mpsc::Sender<WorkerMessage<D::Command>>,
    snapshots: watch::Receiver<DeviceSnapshot<D::State>>,
    thread: Option<thread::JoinHandle<D>>,
}

impl<D: PolledDevice> PollHandle<D> {
    /// Move `device` onto its own thread and poll it every `interval`
    pub fn spawn(device: D, interval: Duration) -> Result<Self, ProtocolError> {
        let (command_tx, command_rx) = mpsc::channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(device.snapshot());
        let name = format!("poll-{}", D::State::NAME);

        let thread = thread::Builder::new()
            .name(name)
            .spawn(move || run(device, interval, command_rx, snapshot_tx))?;

        Ok(Self {
            commands: command_tx,
            snapshots: snapshot_rx,
            thread: Some(thread),
        })
    }

    fn post(&self, message: WorkerMessage<D::Command>) -> Result<(), ProtocolError> {
        self.commands
            .send(message)
            .map_err(|_| ProtocolError::WorkerStopped)
    }

    /// Queue a board specific command
    pub fn send(&self, command: D::Command) -> Result<(), ProtocolError> {
        self.post(WorkerMessage::Device(command))
    }

    /// Open the link, optionally on a new port
    pub async fn connect(&self, port: Option<String>) -> Result<(), ProtocolError> {
        let (reply, rx) = oneshot::channel();
        self.post(WorkerMessage::Connect { port, reply })?;
        rx.await.map_err(|_| ProtocolError::WorkerStopped)?
    }

    /// Close the link
    pub fn close(&self) -> Result<(), ProtocolError> {
        self.post(WorkerMessage::Close)
    }

    /// Run a cycle as soon as the worker is free
    pub fn poll_now(&self) -> Result<(), ProtocolError> {
        self.post(WorkerMessage::PollNow)
    }

    /// Most recently published snapshot
    pub fn latest(&self) -> DeviceSnapshot<D::State> {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every publish
    pub fn subscribe(&self) -> watch::Receiver<DeviceSnapshot<D::State>> {
        self.snapshots.clone()
    }

    /// Stop after the current unit of work and hand the driver back
    pub fn shutdown(mut self) -> Result<D, ProtocolError> {
        let _ = self.commands.send(WorkerMessage::Shutdown);
        let thread = self.thread.take().ok_or(ProtocolError::WorkerStopped)?;
        thread.join().map_err(|_| ProtocolError::WorkerStopped)
    }
}

impl PollHandle<AirConditioner> {
    /// Validate and send a new target temperature
    pub async fn set_desired_temp(&self, value: f64) -> Result<(), ProtocolError> {
        let (reply, rx) = oneshot::channel();
        self.send(AcCommand::SetDesiredTemp { value, reply })?;
        rx.await.map_err(|_| ProtocolError::WorkerStopped)?
    }
}

impl PollHandle<CurtainController> {
    /// Move the curtain; returns the clamped position
    pub async fn set_curtain_status(&self, value: f64) -> Result<f64, ProtocolError> {
        let (reply, rx) = oneshot::channel();
        self.send(CurtainCommand::SetPosition { value, reply })?;
        rx.await.map_err(|_| ProtocolError::WorkerStopped)
    }

    /// Enter or leave simulation mode
    pub fn set_simulation_mode(&self, active: bool) -> Result<(), ProtocolError> {
        self.send(CurtainCommand::SetSimulation(active))
    }
}

impl<D: PolledDevice> Drop for PollHandle<D> {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.commands.send(WorkerMessage::Shutdown);
        }
    }
}

fn run<D: PolledDevice>(
    mut device: D,
    interval: Duration,
    commands: mpsc::Receiver<WorkerMessage<D::Command>>,
    snapshots: watch::Sender<DeviceSnapshot<D::State>>,
) -> D {
    let device_name = D::State::NAME;
    tracing::debug!(device = device_name, ?interval, "poll worker started");

    let mut next_poll = Instant::now();
    loop {
        // A due cycle runs before the next command, however many are queued
        if Instant::now() >= next_poll {
            let report = device.poll();
            tracing::trace!(device = device_name, ?report, "cycle complete");
            next_poll = Instant::now() + interval;
            snapshots.send_replace(device.snapshot());
        }

        let wait = next_poll.saturating_duration_since(Instant::now());
        match commands.recv_timeout(wait) {
            Ok(WorkerMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(WorkerMessage::PollNow) => {
                next_poll = Instant::now();
                continue;
            }
            Ok(WorkerMessage::Device(command)) => device.execute(command),
            Ok(WorkerMessage::Connect { port, reply }) => {
                let _ = reply.send(device.connect(port.as_deref()));
            }
            Ok(WorkerMessage::Close) => device.close(),
        }
        snapshots.send_replace(device.snapshot());
    }

    tracing::debug!(device = device_name, "poll worker stopped");
    device
}
