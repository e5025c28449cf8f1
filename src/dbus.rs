//! Venus OS D-Bus integration
//!
//! Registers a `com.victronenergy.evcharger` service and exposes the merged
//! charger readings as VeDbus `BusItem` objects. The only writable path is
//! `/SetCurrent`, which is forwarded to the driver as a current-limit
//! command.

pub mod items;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use zbus::zvariant::OwnedObjectPath;
use zbus::{Connection, Result as ZbusResult, names::WellKnownName};

use crate::driver::DriverCommand;
use crate::error::{Result, VestaError};
use crate::logging::{LogContext, get_logger_with_context};
use items::{BusItem, format_text_value};

/// Path/value cache shared between the service and its BusItem objects
pub struct DbusSharedState {
    pub(crate) paths: HashMap<String, serde_json::Value>,
    pub(crate) writable: HashSet<String>,
    pub(crate) commands_tx: mpsc::UnboundedSender<DriverCommand>,
    pub(crate) connection: Option<Connection>,
}

impl DbusSharedState {
    pub fn new(commands_tx: mpsc::UnboundedSender<DriverCommand>) -> Self {
        Self {
            paths: HashMap::new(),
            writable: HashSet::new(),
            commands_tx,
            connection: None,
        }
    }
}

pub struct VenusService {
    logger: crate::logging::StructuredLogger,
    service_name: String,
    connection: Option<Connection>,
    pub(crate) shared: Arc<Mutex<DbusSharedState>>,
    registered_paths: HashSet<String>,
}

impl VenusService {
    pub fn new(device_instance: u32, commands_tx: mpsc::UnboundedSender<DriverCommand>) -> Self {
        let logger =
            get_logger_with_context(LogContext::new("dbus").with_device_instance(device_instance));
        let service_name = format!("com.victronenergy.evcharger.evc04_{:02}", device_instance);
        Self {
            logger,
            service_name,
            connection: None,
            shared: Arc::new(Mutex::new(DbusSharedState::new(commands_tx))),
            registered_paths: HashSet::new(),
        }
    }

    /// Connect to the bus and claim the service name. Prefers the system
    /// bus (Venus OS); falls back to the session bus for development.
    pub async fn start(&mut self) -> Result<()> {
        let connection = match Connection::system().await {
            Ok(c) => {
                self.logger.info("Connected to D-Bus: system bus");
                c
            }
            Err(e_sys) => match Connection::session().await {
                Ok(c) => {
                    self.logger.warn(&format!(
                        "System bus unavailable ({}); using session bus",
                        e_sys
                    ));
                    c
                }
                Err(e_sess) => {
                    return Err(VestaError::dbus(format!(
                        "DBus connect failed: system={} session={}",
                        e_sys, e_sess
                    )));
                }
            },
        };
        self.request_name(&connection)
            .await
            .map_err(|e| VestaError::dbus(format!("RequestName failed: {}", e)))?;
        self.logger
            .info(&format!("D-Bus service started: {}", self.service_name));

        self.connection = Some(connection);
        {
            let mut shared = self.shared.lock().unwrap();
            shared.connection = self.connection.clone();
        }
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.logger.info("Stopping D-Bus service");
        self.connection = None;
        {
            let mut shared = self.shared.lock().unwrap();
            shared.connection = None;
        }
        Ok(())
    }

    /// Register a BusItem at the path if not registered yet and seed its
    /// initial value.
    pub async fn ensure_item(
        &mut self,
        path: &str,
        initial_value: serde_json::Value,
        writable: bool,
    ) -> Result<()> {
        if !self.registered_paths.contains(path) {
            let obj_path = OwnedObjectPath::try_from(path).map_err(|e| {
                VestaError::dbus(format!("Invalid object path '{}': {}", path, e))
            })?;
            let item = BusItem::new(path.to_string(), Arc::clone(&self.shared));
            if let Some(conn) = &self.connection {
                conn.object_server().at(&obj_path, item).await.map_err(|e| {
                    VestaError::dbus(format!("Register BusItem failed for {}: {}", path, e))
                })?;
            }
            self.registered_paths.insert(path.to_string());
        }

        let mut shared = self.shared.lock().unwrap();
        if !shared.paths.contains_key(path) {
            shared.paths.insert(path.to_string(), initial_value);
        }
        if writable {
            shared.writable.insert(path.to_string());
        }
        Ok(())
    }

    pub async fn update_paths(
        &mut self,
        updates: impl IntoIterator<Item = (String, serde_json::Value)>,
    ) -> Result<()> {
        for (k, v) in updates {
            self.update_path(&k, v).await?;
        }
        Ok(())
    }

    pub async fn update_path(&mut self, path: &str, value: serde_json::Value) -> Result<()> {
        {
            let shared = self.shared.lock().unwrap();
            if let Some(old) = shared.paths.get(path)
                && old == &value
            {
                return Ok(());
            }
        }
        self.ensure_item(path, value.clone(), false).await?;
        {
            let mut shared = self.shared.lock().unwrap();
            shared.paths.insert(path.to_string(), value.clone());
        }
        if let Some(conn) = &self.connection {
            let item_ctx = zbus::object_server::SignalEmitter::new(
                conn,
                OwnedObjectPath::try_from(path).map_err(|e| {
                    VestaError::dbus(format!("Invalid object path '{}': {}", path, e))
                })?,
            )
            .map_err(|e| VestaError::dbus(format!("SignalEmitter new failed: {}", e)))?;
            let mut changes: HashMap<&str, zbus::zvariant::OwnedValue> = HashMap::new();
            changes.insert("Value", BusItem::serde_to_owned_value(&value));
            let text = format_text_value(&value);
            let text_ov = zbus::zvariant::OwnedValue::try_from(zbus::zvariant::Value::from(
                text.as_str(),
            ))
            .unwrap_or_else(|_| zbus::zvariant::OwnedValue::from(0i64));
            changes.insert("Text", text_ov);
            let _ = BusItem::properties_changed(&item_ctx, changes).await;
        }
        Ok(())
    }

    /// Cached value for a path, if any
    pub fn get(&self, path: &str) -> Option<serde_json::Value> {
        self.shared.lock().ok()?.paths.get(path).cloned()
    }

    async fn request_name(&self, connection: &Connection) -> ZbusResult<()> {
        use zbus::fdo::{DBusProxy, RequestNameFlags};
        let proxy = DBusProxy::new(connection).await?;
        let name = WellKnownName::try_from(self.service_name.as_str())?;
        let _ = proxy
            .request_name(name, RequestNameFlags::ReplaceExisting.into())
            .await?;
        Ok(())
    }
}
