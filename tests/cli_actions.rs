mod common;

use common::{Script, Step};
use ttylink::{
    cli::{actions, build_command},
    CancelToken, Parity, SerialConfig, SerialPort,
};

#[test]
fn send_writes_decoded_hex() {
    let script = Script::new();
    let mut port = SerialPort::from_parts("ttyUSB0", SerialConfig::new(9600), script.connector(), script.sleeper());
    port.initialize().unwrap();

    let written = actions::send(&mut port, "0103").unwrap();
    assert_eq!(written, 2);
    assert_eq!(script.state().written, vec![0x01, 0x03]);
}

#[test]
fn send_rejects_invalid_hex() {
    let script = Script::new();
    let mut port = SerialPort::from_parts("ttyUSB0", SerialConfig::new(9600), script.connector(), script.sleeper());
    port.initialize().unwrap();

    assert!(actions::send(&mut port, "0g").is_err());
    assert!(script.state().written.is_empty());
}

#[test]
fn monitor_prints_one_line_per_chunk() {
    let script = Script::new();
    script
        .push_read(Step::Data(vec![0xde, 0xad]))
        .push_read(Step::Data(vec![0xbe, 0xef]));
    let cancel = CancelToken::new();
    script.state().cancel_when_drained = Some(cancel.clone());

    let mut port = SerialPort::from_parts("ttyUSB0", SerialConfig::new(9600), script.connector(), script.sleeper());
    port.initialize().unwrap();

    let mut out = Vec::new();
    actions::monitor_until(&mut port, &cancel, &mut out).unwrap();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(" dead"), "{text}");
    assert!(lines[1].ends_with(" beef"), "{text}");
}

#[test]
fn resolve_port_applies_flag_overrides() {
    let matches = build_command()
        .try_get_matches_from([
            "ttylink",
            "--port",
            "ttyACM0",
            "--baud",
            "57600",
            "--parity",
            "E",
            "--stop-bits",
            "2",
            "--reconnect-attempts",
            "5",
            "--monitor",
        ])
        .unwrap();

    let (name, config) = actions::resolve_port(&matches).unwrap();
    assert_eq!(name, "ttyACM0");
    assert_eq!(config.baud, 57600);
    assert_eq!(config.parity, Parity::Even);
    assert_eq!(config.stop_bits, 2);
    assert_eq!(config.data_bits, 8);
    assert_eq!(config.reconnect.max_attempts, Some(5));
}

#[test]
fn resolve_port_merges_profile() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("port.toml");
    std::fs::write(&path, "port_name = \"ttyUSB2\"\nbaud_rate = 19200\nparity = \"O\"\n").unwrap();

    let matches = build_command()
        .try_get_matches_from(["ttylink", "-c", path.to_str().unwrap(), "-b", "38400", "-m"])
        .unwrap();
    let (name, config) = actions::resolve_port(&matches).unwrap();
    assert_eq!(name, "ttyUSB2");
    assert_eq!(config.baud, 38400);
    assert_eq!(config.parity, Parity::Odd);
}

#[test]
fn resolve_port_requires_a_port() {
    let matches = build_command().try_get_matches_from(["ttylink", "-m"]).unwrap();
    assert!(actions::resolve_port(&matches).is_err());
}

#[test]
fn json_flag_requires_list_ports() {
    assert!(build_command().try_get_matches_from(["ttylink", "--json"]).is_err());
}
