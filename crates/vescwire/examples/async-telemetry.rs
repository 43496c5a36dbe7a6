//! `VescCodec` over an in-memory async stream.
//!
//! Run with:
//!   cargo run -p vescwire --example async-telemetry --features async,logging

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio_util::codec::{Decoder, Encoder};
use vescwire::client::{mask, CommandId, Request, TelemetryHistory, TelemetrySnapshot};
use vescwire::frame::{Frame, PayloadCursor, ReceiveOutcome, VescCodec};
use vescwire::logging;
use vescwire::sim::SimulatedController;
use vescwire::Target;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

async fn read_outcome(
    stream: &mut DuplexStream,
    codec: &mut VescCodec,
    buf: &mut BytesMut,
) -> Result<Option<ReceiveOutcome>, BoxError> {
    loop {
        if let Some(outcome) = codec.decode(buf)? {
            return Ok(Some(outcome));
        }
        if stream.read_buf(buf).await? == 0 {
            return Ok(None);
        }
    }
}

async fn device(mut stream: DuplexStream) -> Result<(), BoxError> {
    let mut controller = SimulatedController::with_telemetry(TelemetrySnapshot {
        rpm: 2_400.0,
        input_voltage: 50.4,
        ..TelemetrySnapshot::default()
    });
    let mut codec = VescCodec::new();
    let mut rx = BytesMut::new();
    let mut tx = BytesMut::new();

    while let Some(outcome) = read_outcome(&mut stream, &mut codec, &mut rx).await? {
        let ReceiveOutcome::Frame(frame) = outcome else {
            continue;
        };
        if let Some(reply) = controller.handle(&frame.payload)? {
            tx.clear();
            codec.encode(Frame::new(reply), &mut tx)?;
            stream.write_all(&tx).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    logging::init_from_env();

    let (mut host, device_end) = tokio::io::duplex(256);
    let device = tokio::spawn(device(device_end));

    let mut codec = VescCodec::new();
    let mut rx = BytesMut::new();
    let mut tx = BytesMut::new();
    let mut history = TelemetryHistory::default();

    for _ in 0..3 {
        let payload = Request::GetValues { mask: mask::ALL }.to_payload(Target::Local)?;
        tx.clear();
        codec.encode(Frame::new(payload), &mut tx)?;
        host.write_all(&tx).await?;

        let outcome = tokio::time::timeout(
            Duration::from_millis(100),
            read_outcome(&mut host, &mut codec, &mut rx),
        )
        .await??;

        match outcome {
            Some(ReceiveOutcome::Frame(frame))
                if frame.command_id() == Some(u8::from(CommandId::GetValues)) =>
            {
                let mut cursor = PayloadCursor::new(&frame.payload[1..]);
                let snapshot = history.apply(mask::ALL, &mut cursor)?;
                eprintln!("rpm {} vin {}", snapshot.rpm, snapshot.input_voltage);
            }
            other => eprintln!("unexpected outcome: {other:?}"),
        }
    }

    drop(host);
    device.await??;
    Ok(())
}
