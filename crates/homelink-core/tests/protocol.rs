mod common;

use common::{init_tracing, test_config, VirtualBoard};
use homelink_core::config::SimulationRanges;
use homelink_core::device::{AirConditioner, CurtainController, CycleSource};
use homelink_core::protocol::{ConnectionState, HealthStatus, ProtocolError};
use homelink_core::simulation::SensorSimulator;
use pretty_assertions::assert_eq;

fn port(board: &VirtualBoard) -> String {
    format!("tcp://{}", board.url())
}

fn air_conditioner(board: &VirtualBoard) -> AirConditioner {
    let mut ac = AirConditioner::new(test_config());
    ac.open(&port(board)).unwrap();
    ac
}

fn curtain() -> CurtainController {
    CurtainController::with_simulator(
        test_config(),
        SensorSimulator::seeded(1, SimulationRanges::default()),
    )
}

#[test]
fn test_air_conditioner_cycle_over_tcp() {
    init_tracing();
    let board = VirtualBoard::air_conditioner((24, 5), (21, 3), 12);
    let mut ac = air_conditioner(&board);
    assert_eq!(ac.connection_state(), ConnectionState::Connected);

    let report = ac.update();
    assert!(report.is_complete());
    assert_eq!(ac.desired_temperature(), 24.5);
    assert_eq!(ac.ambient_temperature(), 21.3);
    assert_eq!(ac.fan_speed(), 12);
    assert_eq!(ac.health().status(), HealthStatus::Healthy);
    assert_eq!(ac.health().rx_bytes, 5);
}

#[test]
fn test_desired_temperature_reconciles_from_board() {
    init_tracing();
    let board = VirtualBoard::air_conditioner((20, 0), (21, 0), 1);
    let mut ac = air_conditioner(&board);
    ac.update();
    assert_eq!(ac.desired_temperature(), 20.0);

    ac.set_desired_temp(23.7).unwrap();
    ac.update();
    assert_eq!(ac.desired_temperature(), 23.7);

    let memory = board.memory.lock().unwrap();
    assert_eq!(memory.set_bytes, vec![0x87, 0xD7]);
    assert_eq!(memory.setpoints, vec![23.7]);
}

#[test]
fn test_rejected_setpoint_sends_nothing() {
    init_tracing();
    let board = VirtualBoard::air_conditioner((20, 0), (21, 0), 1);
    let mut ac = air_conditioner(&board);

    for value in [5.0, 9.99, 50.01, 51.0] {
        let err = ac.set_desired_temp(value).unwrap_err();
        assert!(matches!(err, ProtocolError::Validation { .. }), "{}", value);
    }
    ac.set_desired_temp(49.9).unwrap();
    // A cycle afterwards proves every byte the board saw has been processed
    ac.update();

    let memory = board.memory.lock().unwrap();
    assert_eq!(memory.set_bytes, vec![0x89, 0xF1]);
}

#[test]
fn test_ambient_integer_timeout_keeps_cached_value() {
    init_tracing();
    let board = VirtualBoard::air_conditioner((22, 0), (19, 8), 4);
    let mut ac = air_conditioner(&board);
    ac.update();
    assert_eq!(ac.ambient_temperature(), 19.8);

    board.silence(0x04);
    board.set_register(0x03, 1);
    for _ in 0..2 {
        let report = ac.update();
        assert_eq!(report.stale, 1);
        assert_eq!(ac.ambient_temperature(), 19.8);
    }
    // Fan is queried after the silent register and still refreshes
    board.set_register(0x05, 6);
    ac.update();
    assert_eq!(ac.fan_speed(), 6);
    assert_eq!(ac.health().timeouts, 3);
}

#[test]
fn test_silent_board_degrades_without_error() {
    init_tracing();
    let board = VirtualBoard::air_conditioner((22, 0), (19, 8), 4);
    let mut ac = air_conditioner(&board);
    ac.update();

    for register in 0x01..=0x05 {
        board.silence(register);
    }
    let report = ac.update();
    assert_eq!(report.updated, 0);
    assert_eq!(report.stale, 3);
    assert_eq!(report.health, HealthStatus::Silent);
    assert_eq!(ac.desired_temperature(), 22.0);
    assert_eq!(ac.fan_speed(), 4);
}

#[test]
fn test_unplugged_board_reports_broken_link() {
    init_tracing();
    let board = VirtualBoard::air_conditioner((22, 0), (19, 8), 4);
    let mut ac = air_conditioner(&board);
    ac.update();

    board.unplug();
    let report = ac.update();
    assert_eq!(report.updated, 0);
    assert_eq!(ac.health().status(), HealthStatus::Broken);
    assert!(ac.health().last_fault.is_some());
    assert_eq!(ac.ambient_temperature(), 19.8);
}

#[test]
fn test_curtain_cycle_and_position_write() {
    init_tracing();
    let board = VirtualBoard::curtain([(10, 0), (18, 4), (60, 1), (33, 9)]);
    let mut curtain = curtain();
    curtain.open(&port(&board)).unwrap();

    curtain.update();
    assert_eq!(curtain.curtain_status(), 10.0);
    assert_eq!(curtain.outdoor_temperature(), 18.4);
    assert_eq!(curtain.outdoor_pressure(), 60.1);
    assert_eq!(curtain.light_intensity(), 33.9);

    assert_eq!(curtain.set_curtain_status(42.5), 42.5);
    curtain.update();
    assert_eq!(curtain.curtain_status(), 42.5);
}

#[test]
fn test_curtain_position_above_63_wraps_on_wire() {
    init_tracing();
    let board = VirtualBoard::curtain([(0, 0), (0, 0), (0, 0), (0, 0)]);
    let mut curtain = curtain();
    curtain.open(&port(&board)).unwrap();

    assert_eq!(curtain.set_curtain_status(150.0), 100.0);
    curtain.update();
    // 100 & 0x3F: the six-bit ceiling of the wire format
    assert_eq!(board.memory.lock().unwrap().set_bytes, vec![0x80, 0xC0 | 36]);
    assert_eq!(curtain.curtain_status(), 36.0);
}

#[test]
fn test_simulation_closes_link_and_stays_closed() {
    init_tracing();
    let board = VirtualBoard::curtain([(10, 0), (18, 4), (60, 1), (33, 9)]);
    let mut curtain = curtain();
    curtain.open(&port(&board)).unwrap();
    curtain.update();
    let queries_before = board.memory.lock().unwrap().queries.len();

    curtain.set_simulation_mode(true);
    assert_eq!(curtain.connection_state(), ConnectionState::Disconnected);
    for _ in 0..1000 {
        assert_eq!(curtain.update().source, CycleSource::Simulation);
        let t = curtain.outdoor_temperature();
        assert!((15.0..=30.0).contains(&t), "{}", t);
    }
    assert_eq!(curtain.curtain_status(), 10.0);

    curtain.set_simulation_mode(false);
    assert!(!curtain.is_connected());
    assert_eq!(curtain.update().source, CycleSource::Skipped);
    assert_eq!(board.memory.lock().unwrap().queries.len(), queries_before);
}
