//! Core driver logic for Vesta
//!
//! Owns the periodic poll/commit loop around a `ChargerSession` and exports
//! each merged reading to the Venus OS D-Bus service. The charger core
//! holds no timer state; this module is the external scheduler the session
//! is driven by.

use crate::charger::link::RegisterLink;
use crate::charger::types::{DeviceIdentity, MergedReading};
use crate::charger::{ChargerSession, SessionState};
use crate::config::Config;
use crate::dbus::VenusService;
use crate::error::Result;
use crate::logging::{LogContext, get_logger_with_context};
use crate::modbus::ModbusClient;
use tokio::sync::mpsc;
use tokio::time::{Duration, interval};

/// Commands accepted by the driver from external components (D-Bus)
#[derive(Debug, Clone)]
pub enum DriverCommand {
    SetMaxCurrent(u16),
}

/// Main driver for Vesta
pub struct Evc04Driver<L: RegisterLink = ModbusClient> {
    /// Configuration
    config: Config,

    /// Charger session over the Modbus link
    session: ChargerSession<L>,

    /// D-Bus service; None when the bus is unavailable
    dbus: Option<VenusService>,

    /// Command receiver for external control
    commands_rx: mpsc::UnboundedReceiver<DriverCommand>,

    /// Command sender handed to the D-Bus service
    commands_tx: mpsc::UnboundedSender<DriverCommand>,

    /// Logger with context
    logger: crate::logging::StructuredLogger,

    /// Whether the real device identity has been exported to the bus
    identity_published: bool,
}

impl Evc04Driver {
    /// Create a new driver instance
    pub fn new(
        commands_rx: mpsc::UnboundedReceiver<DriverCommand>,
        commands_tx: mpsc::UnboundedSender<DriverCommand>,
    ) -> Result<Self> {
        let config = Config::load().inspect_err(|e| {
            eprintln!("Failed to load configuration: {}", e);
        })?;
        config.validate()?;

        // Initialize logging
        crate::logging::init_logging(&config.logging)?;

        let logger = get_logger_with_context(
            LogContext::new("driver").with_device_instance(config.device_instance),
        );
        logger.info("Initializing EVC04 charger driver");

        let session = ChargerSession::new(ModbusClient::new(&config.modbus));

        Ok(Self {
            config,
            session,
            dbus: None,
            commands_rx,
            commands_tx,
            logger,
            identity_published: false,
        })
    }
}

impl<L: RegisterLink> Evc04Driver<L> {
    /// Run the driver main loop
    pub async fn run(&mut self) -> Result<()> {
        self.logger.info("Starting EVC04 charger driver main loop");

        // First connect also reads the device identity. A failure here is
        // not fatal; the poll loop keeps retrying.
        if let Err(e) = self.session.connect().await {
            self.logger
                .warn(&format!("Initial connect failed, will retry: {}", e));
        }

        self.start_dbus().await;
        self.publish_static_paths().await;

        let poll_interval_ms = self.config.effective_poll_interval_ms();
        let mut poll_interval = interval(Duration::from_millis(poll_interval_ms));
        self.logger
            .info(&format!("Polling every {} ms", poll_interval_ms));

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    self.poll_cycle().await;
                }
                Some(cmd) = self.commands_rx.recv() => {
                    self.handle_command(cmd);
                }
                _ = tokio::signal::ctrl_c() => {
                    self.logger.info("Shutdown signal received");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Single polling cycle: read, export, write back
    async fn poll_cycle(&mut self) {
        match self.session.poll().await {
            Some(reading) => {
                if let Err(e) = self.export_reading(&reading).await {
                    self.logger.warn(&format!("D-Bus export failed: {}", e));
                }
            }
            None => {
                self.logger.debug("Will skip an update");
            }
        }

        // The identity becomes available on the first successful connect,
        // which may be long after the static paths were seeded.
        self.export_identity_if_new().await;

        self.session.commit().await;

        let connected = self.session.state() != SessionState::Disconnected;
        if let Some(dbus) = &mut self.dbus {
            let _ = dbus
                .update_path("/Connected", serde_json::json!(u8::from(connected)))
                .await;
        }
    }

    fn handle_command(&mut self, cmd: DriverCommand) {
        match cmd {
            DriverCommand::SetMaxCurrent(amps) => {
                self.logger
                    .info(&format!("Max current will be changed to {} A", amps));
                self.session.set_max_current(amps);
            }
        }
    }

    async fn start_dbus(&mut self) {
        let mut dbus = VenusService::new(self.config.device_instance, self.commands_tx.clone());
        match dbus.start().await {
            Ok(()) => self.dbus = Some(dbus),
            Err(e) => {
                // Keep polling; readings are still logged and the session
                // stays warm for when the bus comes back at next restart.
                self.logger
                    .error(&format!("D-Bus unavailable, running headless: {}", e));
            }
        }
    }

    fn identity_paths(identity: &DeviceIdentity) -> Vec<(String, serde_json::Value)> {
        vec![
            (
                "/FirmwareVersion".to_string(),
                serde_json::json!(identity.firmware_version),
            ),
            ("/Model".to_string(), serde_json::json!(identity.model)),
            (
                "/Serial".to_string(),
                serde_json::json!(identity.serial_number),
            ),
            (
                "/ChargePointId".to_string(),
                serde_json::json!(identity.charge_point_id),
            ),
        ]
    }

    /// Export the device identity once it becomes available.
    ///
    /// When the charger is unreachable at startup the static paths are
    /// seeded with placeholders; the first successful connect supplies the
    /// real values and this replaces them.
    async fn export_identity_if_new(&mut self) {
        if self.identity_published {
            return;
        }
        let Some(identity) = self.session.identity().cloned() else {
            return;
        };
        let Some(dbus) = &mut self.dbus else {
            return;
        };
        match dbus.update_paths(Self::identity_paths(&identity)).await {
            Ok(()) => {
                self.logger.info(&format!(
                    "Published device identity: serial={} model={}",
                    identity.serial_number, identity.model
                ));
                self.identity_published = true;
            }
            Err(e) => {
                self.logger
                    .warn(&format!("Identity export failed, will retry: {}", e));
            }
        }
    }

    /// Register the management and measurement paths with their defaults
    async fn publish_static_paths(&mut self) {
        let identity = self.session.identity().cloned();
        let conn_str = format!(
            "Modbus TCP at {}:{}",
            self.config.modbus.host, self.config.modbus.port
        );
        let Some(dbus) = &mut self.dbus else {
            return;
        };

        let _ = dbus
            .ensure_item("/Mgmt/ProcessName", serde_json::json!("vesta"), false)
            .await;
        let _ = dbus
            .ensure_item(
                "/Mgmt/ProcessVersion",
                serde_json::json!(env!("CARGO_PKG_VERSION")),
                false,
            )
            .await;
        let _ = dbus
            .ensure_item("/Mgmt/Connection", serde_json::json!(conn_str), false)
            .await;

        let _ = dbus
            .ensure_item(
                "/DeviceInstance",
                serde_json::json!(self.config.device_instance),
                false,
            )
            .await;
        let _ = dbus
            .ensure_item("/ProductId", serde_json::json!(0u32), false)
            .await;
        let _ = dbus
            .ensure_item("/ProductName", serde_json::json!("Vestel EVC04"), false)
            .await;
        let _ = dbus
            .ensure_item("/Connected", serde_json::json!(0u8), false)
            .await;

        match &identity {
            Some(id) => {
                for (path, value) in Self::identity_paths(id) {
                    let _ = dbus.ensure_item(&path, value, false).await;
                }
                self.identity_published = true;
            }
            None => {
                // Charger unreachable so far; placeholders until the first
                // successful connect supplies the real identity.
                for path in ["/FirmwareVersion", "/Model", "/Serial", "/ChargePointId"] {
                    let _ = dbus
                        .ensure_item(path, serde_json::json!("Unknown"), false)
                        .await;
                }
            }
        }

        // Measurement paths with initial values
        for path in [
            "/Ac/Power",
            "/Ac/L1/Power",
            "/Ac/L2/Power",
            "/Ac/L3/Power",
            "/Ac/Energy/Forward",
            "/ChargingTime",
            "/Current",
            "/MaxCurrent",
            "/Status",
        ] {
            let _ = dbus.ensure_item(path, serde_json::json!(0), false).await;
        }

        // Control and display paths the GX device expects
        let _ = dbus
            .ensure_item("/AutoStart", serde_json::json!(1u8), false)
            .await;
        let _ = dbus
            .ensure_item("/EnableDisplay", serde_json::json!(1u8), false)
            .await;
        let _ = dbus
            .ensure_item("/Mode", serde_json::json!(0u8), false)
            .await;
        let _ = dbus
            .ensure_item("/StartStop", serde_json::json!(1u8), false)
            .await;
        let _ = dbus
            .ensure_item("/Position", serde_json::json!(1u8), false)
            .await;
        let _ = dbus
            .ensure_item("/Role", serde_json::json!(0u8), false)
            .await;

        // The one writable path; forwarded as SetMaxCurrent
        let _ = dbus
            .ensure_item("/SetCurrent", serde_json::json!(0), true)
            .await;
    }

    /// Export one merged reading to the bus
    async fn export_reading(&mut self, reading: &MergedReading) -> Result<()> {
        self.logger.debug(&format!(
            "I=({},{},{})x0.1A P=({},{},{})W total={}W E={}Wh status={:?} max={}A",
            reading.power.current_l1,
            reading.power.current_l2,
            reading.power.current_l3,
            reading.power.power_l1,
            reading.power.power_l2,
            reading.power.power_l3,
            reading.power.power_total,
            reading.session.session_energy_wh,
            reading.status.map(|s| s.code()),
            reading.applied_max_current,
        ));

        let Some(dbus) = &mut self.dbus else {
            return Ok(());
        };

        let mut updates = vec![
            (
                "/Ac/Energy/Forward".to_string(),
                serde_json::json!(f64::from(reading.session.session_energy_wh) / 1000.0),
            ),
            (
                "/Ac/Power".to_string(),
                serde_json::json!(reading.power.power_total),
            ),
            (
                "/Ac/L1/Power".to_string(),
                serde_json::json!(reading.power.power_l1),
            ),
            (
                "/Ac/L2/Power".to_string(),
                serde_json::json!(reading.power.power_l2),
            ),
            (
                "/Ac/L3/Power".to_string(),
                serde_json::json!(reading.power.power_l3),
            ),
            (
                "/MaxCurrent".to_string(),
                serde_json::json!(reading.applied_max_current),
            ),
            (
                "/ChargingTime".to_string(),
                serde_json::json!(reading.session.session_duration_seconds),
            ),
            (
                "/Current".to_string(),
                serde_json::json!(reading.power.max_phase_current_amps()),
            ),
        ];
        // A withheld status is not published; the previous value stands
        if let Some(status) = reading.status {
            updates.push(("/Status".to_string(), serde_json::json!(status.code())));
        }

        dbus.update_paths(updates).await
    }

    async fn shutdown(&mut self) {
        self.logger.info("Shutting down driver");
        self.session.close().await;
        if let Some(mut dbus) = self.dbus.take() {
            let _ = dbus.stop().await;
        }
        self.logger.info("Driver shutdown complete");
    }
}
