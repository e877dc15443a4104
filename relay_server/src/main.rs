use eyre::Result;
use relay_server::relay::spawn_relay;
use relay_server::simulator::RobotSimulator;
use servi_vr_lib::{init_tracing, RelayConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_tracing();

    tracing::info!("Starting Servi VR relay...");

    let config = RelayConfig::load()?;
    config.validate()?;

    let simulator = RobotSimulator::new(
        &config.robot_id,
        Duration::from_millis(config.tick_interval_ms),
    );
    simulator.start();
    tracing::info!(
        "Telemetry simulation running for {} at {} ms per tick",
        config.robot_id,
        config.tick_interval_ms
    );

    let handle = spawn_relay(&config, simulator).await?;
    tracing::info!("Ready on http://{}", handle.local_addr());

    handle.wait().await
}
