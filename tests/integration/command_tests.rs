//! Console protocol: one JSON request line in, one JSON response line out.

use std::sync::Arc;

use serde_json::Value;

use tankflow::app::commands::{AppCommand, CommandResponse, execute, handle_line};
use tankflow::app::ports::Level;
use tankflow::config::MeasurementConfig;

use crate::mock_hw::{EchoScript, MockIo, SimClock};

fn rig(build: impl FnOnce(MockIo) -> MockIo) -> (MockIo, Arc<SimClock>) {
    let clock = Arc::new(SimClock::new());
    let io = build(MockIo::new(Arc::clone(&clock)));
    (io, clock)
}

fn respond(line: &str, io: &MockIo, clock: &SimClock) -> Value {
    let config = MeasurementConfig::default();
    serde_json::from_str(&handle_line(line, io, clock, &config)).unwrap()
}

#[test]
fn control_water_pump_reports_every_tank() {
    let (io, clock) = rig(|io| io.with_flow_pulses(26, 900));
    let line = r#"{"command":"control_water_pump",
        "main_tank":{"hardware":{"water_pump":18},"water_pump_duration":5},
        "tanks":[
            {"id":"a","hardware":{"waterflow_sensor":26,"solenoid_valve":23}},
            {"id":"b","hardware":{"solenoid_valve":24}}
        ]}"#
    .replace('\n', "");

    let body = respond(&line, &io, &clock);

    assert_eq!(body["message"], "Water pump controlled successfully");
    assert_eq!(body["status"], "completed");
    assert_eq!(body["pin"], 18);
    assert_eq!(body["duration"], 5.0);
    let tanks = body["tanks"].as_array().unwrap();
    assert_eq!(tanks.len(), 2);
    assert_eq!(tanks[0]["tank_id"], "a");
    assert_eq!(tanks[0]["pulses"], 900);
    assert_eq!(tanks[0]["liters_from_flow"], 2.0);
    assert_eq!(tanks[0]["error"], Value::Null);
    assert_eq!(tanks[1]["tank_id"], "b");
    assert_eq!(tanks[1]["error_kind"], "ConfigurationError");
    assert_eq!(io.writes_to(18), vec![Level::High, Level::Low]);
}

#[test]
fn legacy_single_tank_request_is_served() {
    let (io, clock) = rig(|io| io.with_flow_pulses(26, 45));
    let line = r#"{"command":"control_water_pump","main_tank":{"hardware":{"water_pump":18},"water_pump_duration":1},"tank":{"_id":"x","hardware":{"waterflow_sensor":26,"solenoid_valve":23}}}"#;

    let body = respond(line, &io, &clock);

    assert_eq!(body["tanks"][0]["tank_id"], "x");
    assert_eq!(body["tanks"][0]["liters_from_flow"], 0.1);
}

#[test]
fn empty_tank_list_is_a_configuration_error() {
    let (io, clock) = rig(|io| io);
    let line = r#"{"command":"control_water_pump","main_tank":{"hardware":{"water_pump":18},"water_pump_duration":5},"tanks":[]}"#;

    let body = respond(line, &io, &clock);

    assert_eq!(body["error_kind"], "ConfigurationError");
    assert!(body["error"].as_str().unwrap().contains("no tanks"));
    assert!(io.calls().is_empty());
}

#[test]
fn missing_pump_pin_is_a_configuration_error() {
    let (io, clock) = rig(|io| io);
    let line = r#"{"command":"control_water_pump","main_tank":{"water_pump_duration":5},"tanks":[{"id":"a"}]}"#;

    let body = respond(line, &io, &clock);

    assert_eq!(body["error_kind"], "ConfigurationError");
    assert!(body["error"].as_str().unwrap().contains("main_tank.hardware.water_pump"));
    assert!(io.calls().is_empty());
}

#[test]
fn calculate_tank_capacity_returns_level_report() {
    let (io, clock) = rig(|io| io.with_echo(6, EchoScript::steady(5, 2_332)));
    let line = r#"{"command":"calculate_tank_capacity","hardware":{"ultrasonic_sensor_trig":5,"ultrasonic_sensor_echo":6},"height":100,"radius":30}"#;

    let body = respond(line, &io, &clock);

    assert_eq!(body["average_distance_cm"], 39.99);
    assert_eq!(body["water_height_cm"], 60.01);
    assert_eq!(body["estimated_volume_liters"], 169.67);
    assert_eq!(body["readings"].as_array().unwrap().len(), 5);
}

#[test]
fn dead_level_sensor_reports_its_kind() {
    let (io, clock) = rig(|io| io.with_echo(6, EchoScript::stuck_low(5)));
    let line = r#"{"command":"calculate_tank_capacity","hardware":{"ultrasonic_sensor_trig":5,"ultrasonic_sensor_echo":6},"height":100,"radius":30}"#;

    let body = respond(line, &io, &clock);

    assert_eq!(body["error_kind"], "AllReadingsFailed");
}

#[test]
fn malformed_line_is_rejected_without_a_kind() {
    let (io, clock) = rig(|io| io);

    for line in ["not json", r#"{"command":"open_all_valves"}"#, "{}"] {
        let body = respond(line, &io, &clock);
        assert!(body["error"].as_str().unwrap().starts_with("malformed request"));
        assert_eq!(body["error_kind"], Value::Null);
    }
    assert!(io.calls().is_empty());
}

#[test]
fn execute_accepts_a_parsed_command() {
    let (io, clock) = rig(|io| io.with_echo(6, EchoScript::steady(5, 2_000)));
    let cmd: AppCommand = serde_json::from_str(
        r#"{"command":"calculate_tank_capacity","hardware":{"ultrasonic_sensor_trig":5,"ultrasonic_sensor_echo":6},"height":50,"radius":10}"#,
    )
    .unwrap();

    let response = execute(cmd, &io, clock.as_ref(), &MeasurementConfig::default()).unwrap();

    let CommandResponse::Level(report) = response else {
        panic!("expected a level report, got {response:?}");
    };
    assert_eq!(report.average_distance_cm, 34.3);
    assert_eq!(report.water_height_cm, 15.7);
}

#[test]
fn every_reply_is_a_json_object() {
    let (io, clock) = rig(|io| {
        io.with_flow_pulses(26, 45)
            .with_echo(6, EchoScript::steady(5, 2_000))
    });
    let config = MeasurementConfig::default();
    let lines = [
        r#"{"command":"control_water_pump","main_tank":{"hardware":{"water_pump":18},"water_pump_duration":1},"tanks":[{"id":"a","hardware":{"waterflow_sensor":26,"solenoid_valve":23}}]}"#,
        r#"{"command":"calculate_tank_capacity","hardware":{"ultrasonic_sensor_trig":5,"ultrasonic_sensor_echo":6},"height":50,"radius":10}"#,
        r#"{"command":"calculate_tank_capacity"}"#,
        "",
    ];

    for line in lines {
        let reply = handle_line(line, &io, clock.as_ref(), &config);
        assert_ne!(reply, "null", "null reply to {line:?}");
        let body: Value = serde_json::from_str(&reply).unwrap();
        assert!(body.is_object(), "non-object reply {reply:?}");
    }
}
