//! Bring-up tool: drives a motor assembly through activate, a small
//! relative move, and deactivate, logging each ack/success as it arrives.
//! Equivalent in spirit to the original rig's `motor_test` maintenance
//! binary, kept here as a small `[[bin]]` target rather than a GUI tool.

use std::sync::Arc;

use anyhow::{Context, Result};

use officer_tracker::logging::TrackerLog;
use officer_tracker::motor::MotorDriver;
use officer_tracker::serial::{DeviceMux, SerialLink};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = std::env::args().nth(1).context("usage: officer-tracker-motor-test <serial-path> [baud]")?;
    let baud: u32 = std::env::args()
        .nth(2)
        .map(|s| s.parse())
        .transpose()
        .context("baud must be an integer")?
        .unwrap_or(115_200);

    let log = TrackerLog::default();
    let link = SerialLink::open(&path, baud).context("failed to open serial link")?;
    let mux = DeviceMux::new(link, log.clone());
    mux.start_gathering();

    let motor = MotorDriver::new(Arc::clone(&mux), log);

    tracing::info!("activating motors");
    motor.activate().await.context("activate failed")?;

    tracing::info!("issuing small relative move");
    motor.rel_move_sync(50, 0).await.context("rel_move_sync failed")?;

    tracing::info!("deactivating motors");
    motor.deactivate().await.context("deactivate failed")?;

    tracing::info!("faults seen during bring-up: {}", motor.faults_seen());

    mux.stop_gathering().await;
    Ok(())
}
