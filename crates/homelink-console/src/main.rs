//! HomeLink console
//!
//! Opens both boards, polls them on worker threads and accepts line commands
//! on stdin.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use homelink_core::prelude::*;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

mod commands;

use commands::{Board, ConsoleCommand, HELP};

/// Console for the HomeLink air conditioner and curtain boards
#[derive(Debug, Parser)]
#[command(name = "homelink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Air conditioner port (overrides the configuration file)
    #[arg(long)]
    ac_port: Option<String>,

    /// Curtain board port (overrides the configuration file)
    #[arg(long)]
    curtain_port: Option<String>,

    /// Start the curtain board in simulation mode
    #[arg(long)]
    simulate: bool,

    /// Polling interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,
}

fn load_config(cli: &Cli) -> anyhow::Result<SystemConfig> {
    let mut config = match &cli.config {
        Some(path) => SystemConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => SystemConfig::default(),
    };

    if let Some(port) = &cli.ac_port {
        config.air_conditioner.port_name = port.clone();
    }
    if let Some(port) = &cli.curtain_port {
        config.curtain.port_name = port.clone();
    }
    if let Some(interval) = cli.interval_ms {
        config.poll_interval_ms = interval;
    }
    config.simulate_curtain |= cli.simulate;
    Ok(config)
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("homelink={level},homelink_core={level}").into()
            }),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.log_level);

    let mut ac = AirConditioner::new(config.air_conditioner.clone());
    if let Err(e) = ac.connect() {
        tracing::error!(error = %e, "air conditioner unavailable");
    }

    let mut curtain = CurtainController::with_simulator(
        config.curtain.clone(),
        SensorSimulator::new(config.simulation),
    );
    if config.simulate_curtain {
        curtain.set_simulation_mode(true);
    } else if let Err(e) = curtain.connect() {
        tracing::error!(error = %e, "curtain board unavailable");
    }

    let interval = config.poll_interval();
    let ac = PollHandle::spawn(ac, interval).context("starting air conditioner worker")?;
    let curtain = PollHandle::spawn(curtain, interval).context("starting curtain worker")?;

    let mut ac_updates = ac.subscribe();
    let mut curtain_updates = curtain.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{HELP}");
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match ConsoleCommand::parse(&line) {
                    Ok(Some(ConsoleCommand::Quit)) => break,
                    Ok(Some(command)) => {
                        if let Err(e) = execute(command, &ac, &curtain).await {
                            println!("error: {e}");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{e}"),
                }
            }
            Ok(()) = ac_updates.changed() => {
                let snapshot = ac_updates.borrow_and_update().clone();
                log_air_conditioner(&snapshot);
            }
            Ok(()) = curtain_updates.changed() => {
                let snapshot = curtain_updates.borrow_and_update().clone();
                log_curtain(&snapshot);
            }
        }
    }

    tracing::info!("shutting down");
    ac.shutdown()?;
    curtain.shutdown()?;
    Ok(())
}

async fn execute(
    command: ConsoleCommand,
    ac: &PollHandle<AirConditioner>,
    curtain: &PollHandle<CurtainController>,
) -> anyhow::Result<()> {
    match command {
        ConsoleCommand::SetTemperature(value) => {
            ac.set_desired_temp(value).await?;
            println!("target temperature {value:.1} sent");
        }
        ConsoleCommand::SetCurtain(value) => {
            let applied = curtain.set_curtain_status(value).await?;
            println!("curtain position {applied:.1} sent");
        }
        ConsoleCommand::Simulation(active) => {
            curtain.set_simulation_mode(active)?;
            println!("curtain simulation {}", if active { "on" } else { "off" });
        }
        ConsoleCommand::Connect(Board::AirConditioner) => {
            ac.connect(None).await?;
            println!("air conditioner connected");
        }
        ConsoleCommand::Connect(Board::Curtain) => {
            curtain.connect(None).await?;
            println!("curtain board connected");
        }
        ConsoleCommand::Status => {
            print_json(&ac.latest())?;
            print_json(&curtain.latest())?;
        }
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn log_air_conditioner(snapshot: &DeviceSnapshot<AirConditionerState>) {
    let values = &snapshot.values;
    tracing::info!(
        health = ?snapshot.health_status,
        ambient = values.ambient_temperature,
        desired = values.desired_temperature,
        fan = values.fan_speed,
        "air conditioner"
    );
}

fn log_curtain(snapshot: &DeviceSnapshot<CurtainState>) {
    let values = &snapshot.values;
    tracing::info!(
        health = ?snapshot.health_status,
        simulated = values.simulation_active,
        position = values.curtain_position,
        temperature = values.outdoor_temperature,
        pressure = values.outdoor_pressure,
        light = values.light_intensity,
        "curtain"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn snapshot<S>(device: &'static str, values: S) -> DeviceSnapshot<S> {
        DeviceSnapshot {
            device,
            connection: ConnectionState::Connected,
            health_status: HealthStatus::Healthy,
            health: LinkHealth::default(),
            cycles: 1,
            last_cycle: None,
            values,
        }
    }

    /// Output of `log` under the console's default "info" filter
    fn logged_at_default_level(log: impl FnOnce()) -> String {
        let level = SystemConfig::default().log_level;
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(format!("homelink={level}"))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, log);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_readings_visible_at_default_level() {
        let ac = snapshot(
            "air_conditioner",
            AirConditionerState {
                ambient_temperature: 21.5,
                ..Default::default()
            },
        );
        let output = logged_at_default_level(|| log_air_conditioner(&ac));
        assert!(output.contains("ambient=21.5"), "{output}");

        let curtain = snapshot(
            "curtain",
            CurtainState {
                light_intensity: 640.0,
                ..Default::default()
            },
        );
        let output = logged_at_default_level(|| log_curtain(&curtain));
        assert!(output.contains("light=640"), "{output}");
    }
}
