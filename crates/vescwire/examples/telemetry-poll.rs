//! Non-blocking telemetry polling against a simulated controller.
//!
//! Run with:
//!   VESCWIRE_LOG=debug cargo run -p vescwire --example telemetry-poll --features logging

use std::thread;
use std::time::Duration;

use vescwire::client::{mask, ClientError, Response};
use vescwire::logging;
use vescwire::sim::SimulatedController;
use vescwire::transport::MemoryPort;
use vescwire::{Target, VescClient};

fn main() -> Result<(), ClientError> {
    logging::init_from_env();

    let port = MemoryPort::new();
    let device = SimulatedController::new().attach(&port);
    let mut client = VescClient::new(port);

    for tick in 0..5u8 {
        {
            let mut device = device.lock().unwrap_or_else(|p| p.into_inner());
            device.telemetry.rpm = 1_000.0 * f32::from(tick);
            device.telemetry.input_voltage = 48.0 - 0.1 * f32::from(tick);
            device.telemetry.temp_mosfet = 30.0 + f32::from(tick);
        }

        let fields = mask::RPM | mask::INP_VOLTAGE | mask::TEMP_MOSFET;
        client.request_values(Target::Local, fields)?;

        // Stands in for an application loop doing other work between polls.
        loop {
            match client.poll() {
                Ok(Some(Response::Values { mask })) => {
                    eprintln!("tick {tick}: fields {mask:#x} updated");
                    break;
                }
                Ok(Some(other)) => eprintln!("tick {tick}: unexpected {other:?}"),
                Ok(None) => thread::sleep(Duration::from_millis(1)),
                Err(err) if err.is_retryable() => {
                    eprintln!("tick {tick}: {err}");
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        client.log_values();
        let (now, before) = (client.values(), client.previous_values());
        eprintln!("rpm {} -> {}", before.rpm, now.rpm);
    }

    Ok(())
}
