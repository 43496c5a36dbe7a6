//! Setpoints, keepalives and a CAN-forwarded query against a simulated controller.
//!
//! Run with:
//!   cargo run -p vescwire --example setpoints --features logging

use vescwire::client::ClientError;
use vescwire::logging::{self, LogFormat, LogLevel};
use vescwire::sim::SimulatedController;
use vescwire::transport::MemoryPort;
use vescwire::{Target, VescClient};

fn main() -> Result<(), ClientError> {
    logging::init_logging(LogFormat::Text, LogLevel::Debug);

    let port = MemoryPort::new();
    let device = SimulatedController::new().attach(&port);
    let mut client = VescClient::new(port);

    let version = client.get_fw_version(Target::Local)?;
    eprintln!("firmware {version}");

    client.set_duty(Target::Local, 0.15)?;
    client.set_current(Target::Local, 4.5)?;
    client.set_brake_current(Target::Local, 2.0)?;
    client.set_rpm(Target::Can(2), 3_000.0)?;
    client.set_pos(Target::Can(2), 90.0)?;
    client.send_keepalive(Target::Local)?;

    client.aux_input_mut().y = 200;
    client.aux_input_mut().upper_button = true;
    client.set_aux_input(Target::Local)?;

    let values = client.get_values(Target::Can(2))?;
    eprintln!("rpm {} pos {}", values.rpm, values.pid_pos);

    let device = device.lock().unwrap_or_else(|p| p.into_inner());
    for cmd in device.received() {
        eprintln!("{:?} <- {:?}", cmd.target, cmd.request);
    }
    eprintln!("keepalives: {}", device.keepalives());
    Ok(())
}
