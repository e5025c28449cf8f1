use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info};
use vesta::driver::{DriverCommand, Evc04Driver};

#[tokio::main]
async fn main() -> Result<()> {
    // Create driver command channel
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<DriverCommand>();

    let mut driver = Evc04Driver::new(cmd_rx, cmd_tx.clone())
        .map_err(|e| anyhow::anyhow!("Failed to create driver: {}", e))?;

    info!("Vesta Vestel EVC04 EV Charger Driver starting up");

    match driver.run().await {
        Ok(()) => {
            info!("Driver shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Driver failed with error: {}", e);
            Err(anyhow::anyhow!("Driver error: {}", e))
        }
    }
}
