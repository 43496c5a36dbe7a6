use std::sync::{Arc, Mutex};

use vescwire::client::{
    mask, ClientConfig, ClientError, FaultCode, FirmwareVersion, Request, Response,
    TelemetrySnapshot, VescClient,
};
use vescwire::frame::{encode_frame, unpack_frame, FrameReceiver, ReceiveOutcome};
use vescwire::sim::{ReceivedCommand, SimulatedController};
use vescwire::transport::{ManualClock, MemoryPort};
use vescwire::Target;

type Session = (
    VescClient<MemoryPort, ManualClock>,
    Arc<Mutex<SimulatedController>>,
    MemoryPort,
    ManualClock,
);

fn session(device: SimulatedController) -> Session {
    let port = MemoryPort::new();
    let clock = ManualClock::with_step(1);
    let device = device.attach(&port);
    let client = VescClient::with_clock(port.clone(), clock.clone(), ClientConfig::default());
    (client, device, port, clock)
}

fn framed(payload: &[u8]) -> Vec<u8> {
    let mut out = bytes::BytesMut::new();
    encode_frame(payload, &mut out).expect("payload should fit a short frame");
    out.to_vec()
}

#[test]
fn keepalive_is_exact_wire_frame() {
    let (mut client, device, port, _) = session(SimulatedController::new());
    client.send_keepalive(Target::Local).unwrap();

    let tx = port.take_tx();
    assert_eq!(tx.len(), 6);
    assert_eq!(&tx[..3], &[0x02, 0x01, 0x1E]);
    assert_eq!(tx[5], 0x03);
    assert_eq!(device.lock().unwrap().keepalives(), 1);
}

#[test]
fn setpoints_reach_the_device_scaled() {
    let (mut client, device, _, _) = session(SimulatedController::new());

    client.set_current(Target::Local, 12.5).unwrap();
    client.set_brake_current(Target::Local, 3.0).unwrap();
    client.set_duty(Target::Local, -0.25).unwrap();
    client.set_rpm(Target::Can(4), 2_500.7).unwrap();
    client.set_pos(Target::Can(4), 45.9).unwrap();

    let device = device.lock().unwrap();
    assert_eq!(
        device.received(),
        &[
            ReceivedCommand {
                target: Target::Local,
                request: Request::SetCurrent(12.5)
            },
            ReceivedCommand {
                target: Target::Local,
                request: Request::SetBrakeCurrent(3.0)
            },
            ReceivedCommand {
                target: Target::Local,
                request: Request::SetDuty(-0.25)
            },
            ReceivedCommand {
                target: Target::Can(4),
                request: Request::SetRpm(2_500.0)
            },
            ReceivedCommand {
                target: Target::Can(4),
                request: Request::SetPos(45.0)
            },
        ]
    );
}

#[test]
fn blocking_queries_update_state() {
    let device = SimulatedController::with_telemetry(TelemetrySnapshot {
        temp_mosfet: 44.0,
        rpm: 7_777.0,
        input_voltage: 51.2,
        tachometer: 99,
        fault_code: 2,
        controller_id: 17,
        ..TelemetrySnapshot::default()
    });
    let (mut client, _, _, _) = session(device);

    assert_eq!(
        client.get_fw_version(Target::Local).unwrap(),
        FirmwareVersion::new(6, 2)
    );

    let values = *client.get_values(Target::Local).unwrap();
    assert_eq!(values.rpm, 7_777.0);
    assert!((values.input_voltage - 51.2).abs() < 0.11);
    assert_eq!(values.tachometer, 99);
    assert_eq!(values.fault(), FaultCode::UnderVoltage);
    assert_eq!(values.controller_id, 17);
    assert_eq!(*client.previous_values(), TelemetrySnapshot::default());
}

#[test]
fn selective_query_keeps_other_fields() {
    let device = SimulatedController::with_telemetry(TelemetrySnapshot {
        rpm: 1_000.0,
        temp_motor: 60.0,
        ..TelemetrySnapshot::default()
    });
    let (mut client, device, _, _) = session(device);
    client.get_values(Target::Local).unwrap();

    device.lock().unwrap().telemetry.rpm = 2_000.0;
    device.lock().unwrap().telemetry.temp_motor = 10.0;
    let values = *client.get_values_masked(Target::Local, mask::RPM).unwrap();

    assert_eq!(values.rpm, 2_000.0);
    assert_eq!(values.temp_motor, 60.0);
    assert_eq!(client.previous_values().rpm, 1_000.0);
}

#[test]
fn silent_device_times_out_without_touching_state() {
    let mut controller = SimulatedController::new();
    controller.silent = true;
    let (mut client, _, _, clock) = session(controller);

    let start = clock.peek();
    let err = client.get_values(Target::Local).unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)));
    assert!(clock.peek() - start >= 100);
    assert_eq!(*client.values(), TelemetrySnapshot::default());
    assert_eq!(client.fw_version(), None);
}

#[test]
fn non_blocking_exchange_with_device() {
    let device = SimulatedController::with_telemetry(TelemetrySnapshot {
        duty_cycle: 0.5,
        ..TelemetrySnapshot::default()
    });
    let (mut client, _, _, _) = session(device);

    client.request_values(Target::Local, mask::DUTY).unwrap();
    let response = client.poll().unwrap();
    assert_eq!(response, Some(Response::Values { mask: mask::DUTY }));
    assert_eq!(client.values().duty_cycle, 0.5);
    assert_eq!(client.poll().unwrap(), None);
}

#[test]
fn receiver_resyncs_after_noise() {
    let port = MemoryPort::new();
    let clock = ManualClock::with_step(1);
    let mut receiver = FrameReceiver::new();

    let mut wire = vec![0x55, 0xAA, 0x00];
    wire.extend(framed(&[0x00, 5, 2]));
    port.push_rx(&wire);

    let mut port_handle = port.clone();
    let outcome = receiver.receive_blocking(&mut port_handle, &clock).unwrap();
    let ReceiveOutcome::Frame(frame) = outcome else {
        panic!("expected a frame, got {outcome:?}");
    };
    assert_eq!(frame.payload.as_ref(), &[0x00, 5, 2]);
}

#[test]
fn corrupted_reply_is_reported_and_retry_succeeds() {
    let port = MemoryPort::new();
    let clock = ManualClock::with_step(1);
    let mut first = true;
    port.set_responder(move |request| {
        let payload = unpack_frame(request).ok()?;
        if payload != [0x00] {
            return None;
        }
        let mut reply = framed(&[0x00, 5, 2]);
        if std::mem::take(&mut first) {
            reply[4] ^= 0x01;
        }
        Some(reply)
    });
    let mut client = VescClient::with_clock(port, clock, ClientConfig::default());

    let err = client.get_fw_version(Target::Local).unwrap_err();
    assert!(matches!(err, ClientError::ChecksumMismatch { .. }));
    assert!(err.is_retryable());
    assert_eq!(
        client.get_fw_version(Target::Local).unwrap(),
        FirmwareVersion::new(5, 2)
    );
}

#[test]
fn long_frame_reply_is_not_misparsed() {
    let port = MemoryPort::new();
    port.set_responder(|_| Some(framed_long(300)));
    let mut client =
        VescClient::with_clock(port, ManualClock::with_step(1), ClientConfig::default());

    assert!(matches!(
        client.get_values(Target::Local),
        Err(ClientError::UnsupportedLongFrame { declared_len: 300 })
    ));
}

fn framed_long(len: usize) -> Vec<u8> {
    let mut payload = vec![0u8; len];
    payload[0] = 0x04;
    let mut out = bytes::BytesMut::new();
    encode_frame(&payload, &mut out).expect("long frames are encodable");
    out.to_vec()
}
