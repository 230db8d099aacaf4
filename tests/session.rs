mod common;

use common::{FakeBeacon, Script};
use wspr_beacon_lib::serial::codec::Command;
use wspr_beacon_lib::serial::{FailureKind, SerialError};

#[tokio::test]
async fn test_send_command_writes_wire_and_decodes_reply() {
    let beacon = FakeBeacon::accepting(&["/dev/ttyUSB0"]);
    beacon.reply("DI,4,20\r\n");
    let mut session = beacon.connected_session();

    let command = Command::new("WS").param("TX").param("4").param("20");
    let reply = session.send_command(&command).await.unwrap();

    assert_eq!(beacon.written(), vec!["WSTX,4,20;"]);
    assert_eq!(reply.fields(), &["DI", "4", "20"]);
}

#[tokio::test]
async fn test_timeout_becomes_sentinel() {
    let beacon = FakeBeacon::accepting(&["/dev/ttyUSB0"]);
    beacon.push(Script::Timeout);
    let mut session = beacon.connected_session();

    let reply = session.send_command_or_sentinel(&Command::new("QT")).await;
    assert!(reply.is_sentinel());
    assert_eq!(reply.fields(), &["ER"]);
}

#[tokio::test]
async fn test_typed_errors_keep_their_cause() {
    let beacon = FakeBeacon::accepting(&["/dev/ttyUSB0"]);
    beacon.push(Script::IoError).reply("ER\r\n");
    let mut session = beacon.connected_session();

    let err = session.send_command(&Command::new("QT")).await.unwrap_err();
    assert!(matches!(err, SerialError::IoError(_)));
    assert_eq!(err.failure_kind(), FailureKind::TransportFailure);

    let err = session.query_status().await.unwrap_err();
    assert_eq!(err.failure_kind(), FailureKind::ProtocolFailure);
}

#[tokio::test]
async fn test_not_connected_is_reported() {
    let beacon = FakeBeacon::accepting(&["/dev/ttyUSB0"]);
    let mut session = beacon.session();

    let err = session.send_command(&Command::new("QH")).await.unwrap_err();
    assert!(matches!(err, SerialError::NotConnected));
    assert!(session.send_command_or_sentinel(&Command::new("QH")).await.is_sentinel());
    assert!(beacon.written().is_empty());
}

#[tokio::test]
async fn test_connect_failure_does_not_panic() {
    let beacon = FakeBeacon::accepting(&["/dev/ttyUSB0"]);
    let mut session = beacon.session();

    let err = session.connect("/dev/ttyACM9").unwrap_err();
    assert_eq!(err.failure_kind(), FailureKind::ConnectFailure);
    assert!(!session.is_connected());

    session.connect("/dev/ttyUSB0").unwrap();
    assert!(session.is_connected());
    assert_eq!(session.address(), Some("/dev/ttyUSB0"));

    session.close();
    assert!(!session.is_connected());
}

#[tokio::test]
async fn test_typed_beacon_commands() {
    let beacon = FakeBeacon::accepting(&["/dev/ttyUSB0"]);
    beacon
        .reply("1700000000\r\n")
        .reply("2\r\n")
        .reply("SM0FXK,JO89,23,-120\r\n")
        .reply("OK\r\n")
        .reply("OK\r\n");
    let mut session = beacon.connected_session();

    assert_eq!(session.query_time().await.unwrap(), 1_700_000_000);
    assert_eq!(
        session.query_hardware().await.unwrap().description(),
        "Arduino UNO with Si5351 and DS3231 real time clock"
    );

    let config = session.read_config().await.unwrap();
    assert_eq!(config.callsign, "SM0FXK");
    assert_eq!(config.power_dbm, 23);

    session.cancel_transmission().await.unwrap();
    session.tune(40).await.unwrap();

    assert_eq!(beacon.written(), vec!["QT;", "QH;", "QC;", "WSCA;", "TX2,40;"]);
}
