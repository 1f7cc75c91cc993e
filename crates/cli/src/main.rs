//! A small binary wiring a real serial port to the driver and printing
//! notifications, grounded in the teacher's `packages/cli`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, Level};

use zwave_core::ids::{HomeId, NodeId};
use zwave_driver::driver::{Driver, Shared};
use zwave_serial::transport::SerialTransport;

fn main() -> Result<()> {
    zwave_logging::ChannelLogger::init(Level::Info);

    let path = std::env::args().nth(1).context("usage: cli <serial-port-path>")?;
    let transport = SerialTransport::open(&path, 115_200).context("failed to open serial port")?;

    // A real driver discovers these via GetControllerCapabilities/GetHomeId
    // during startup; hardcoded here since that exchange lives in the
    // not-yet-built startup handshake.
    let shared = Arc::new(Shared::new([0u8; 16], [0u8; 16]));
    shared.notifications.register(|notification| {
        info!("{notification:?}");
    });

    let mut driver = Driver::new(transport, shared, HomeId::new(0), NodeId::from(1u8));
    info!("driver starting on {path}");

    loop {
        driver.step();
        std::thread::sleep(Duration::from_millis(1));
    }
}
