use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use zbus::object_server::SignalEmitter;
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

use super::DbusSharedState;
use crate::driver::DriverCommand;

/// VeDbus-style BusItem implementing com.victronenergy.BusItem
pub struct BusItem {
    pub(crate) path: String,
    pub(crate) shared: Arc<Mutex<DbusSharedState>>,
}

impl BusItem {
    pub fn new(path: String, shared: Arc<Mutex<DbusSharedState>>) -> Self {
        Self { path, shared }
    }

    /// Parse an incoming /SetCurrent value into whole amperes.
    ///
    /// GUIs send numbers, some tools send numeric strings; anything else
    /// is rejected rather than written to the device.
    pub(crate) fn parse_set_current(value: &serde_json::Value) -> Option<u16> {
        let amps = match value {
            serde_json::Value::Number(n) => n
                .as_f64()
                .or_else(|| n.as_i64().map(|i| i as f64))
                .or_else(|| n.as_u64().map(|u| u as f64)),
            serde_json::Value::String(s) => {
                // Allow comma as decimal separator from some locales
                let normalized = s.trim().replace(',', ".");
                normalized.parse::<f64>().ok()
            }
            _ => None,
        }?;
        if !amps.is_finite() || amps < 0.0 || amps > f64::from(u16::MAX) {
            return None;
        }
        Some(amps.round() as u16)
    }

    fn dispatch_driver_command(&self, shared: &DbusSharedState, value: &serde_json::Value) {
        if self.path.as_str() == "/SetCurrent"
            && let Some(amps) = Self::parse_set_current(value)
        {
            let _ = shared.commands_tx.send(DriverCommand::SetMaxCurrent(amps));
        }
    }

    pub(crate) fn serde_to_owned_value(v: &serde_json::Value) -> OwnedValue {
        match v {
            serde_json::Value::Null => OwnedValue::from(0i64),
            serde_json::Value::Bool(b) => OwnedValue::from(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    OwnedValue::from(i)
                } else if let Some(u) = n.as_u64() {
                    OwnedValue::from(u)
                } else {
                    OwnedValue::from(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => OwnedValue::try_from(Value::from(s.as_str()))
                .unwrap_or_else(|_| OwnedValue::from(0i64)),
            _ => OwnedValue::from(0i64),
        }
    }

    pub(crate) fn owned_value_to_serde(v: &OwnedValue) -> serde_json::Value {
        if let Ok(b) = <bool as TryFrom<&OwnedValue>>::try_from(v) {
            return serde_json::json!(b);
        }
        if let Ok(i) = <i64 as TryFrom<&OwnedValue>>::try_from(v) {
            return serde_json::json!(i);
        }
        if let Ok(u) = <u64 as TryFrom<&OwnedValue>>::try_from(v) {
            return serde_json::json!(u);
        }
        if let Ok(f) = <f64 as TryFrom<&OwnedValue>>::try_from(v) {
            return serde_json::json!(f);
        }
        if let Ok(s) = <&str as TryFrom<&OwnedValue>>::try_from(v) {
            return serde_json::json!(s.to_string());
        }
        serde_json::json!(v.to_string())
    }
}

pub(crate) fn format_text_value(val: &serde_json::Value) -> String {
    match val {
        serde_json::Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                format!("{:.2}", f)
            } else {
                n.to_string()
            }
        }
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => val.to_string(),
    }
}

#[zbus::interface(name = "com.victronenergy.BusItem")]
impl BusItem {
    #[zbus(name = "GetValue")]
    async fn get_value(&self) -> OwnedValue {
        let val = {
            let shared = self.shared.lock().unwrap();
            shared
                .paths
                .get(&self.path)
                .cloned()
                .unwrap_or(serde_json::json!(0))
        };
        Self::serde_to_owned_value(&val)
    }

    #[zbus(name = "SetValue")]
    async fn set_value(&self, value: OwnedValue) -> i32 {
        let (conn_opt, sv) = {
            let mut shared = self.shared.lock().unwrap();
            if !shared.writable.contains(&self.path) {
                return 1;
            }
            let sv = Self::owned_value_to_serde(&value);
            shared.paths.insert(self.path.clone(), sv.clone());
            (shared.connection.clone(), sv)
        };

        if let Some(conn) = conn_opt
            && let Ok(obj_path) = OwnedObjectPath::try_from(self.path.as_str())
            && let Ok(item_ctx) = SignalEmitter::new(&conn, obj_path)
        {
            let mut changes: HashMap<&str, OwnedValue> = HashMap::new();
            changes.insert("Value", BusItem::serde_to_owned_value(&sv));
            let text = format_text_value(&sv);
            if let Ok(text_ov) = OwnedValue::try_from(Value::from(text.as_str())) {
                changes.insert("Text", text_ov);
            }
            let _ = BusItem::properties_changed(&item_ctx, changes).await;
        }

        let shared = self.shared.lock().unwrap();
        self.dispatch_driver_command(&shared, &sv);

        0
    }

    #[zbus(name = "GetText")]
    async fn get_text(&self) -> String {
        let val = {
            let shared = self.shared.lock().unwrap();
            shared
                .paths
                .get(&self.path)
                .cloned()
                .unwrap_or(serde_json::json!(0))
        };
        format_text_value(&val)
    }

    #[zbus(signal)]
    pub async fn properties_changed(
        ctxt: &SignalEmitter<'_>,
        changes: HashMap<&str, OwnedValue>,
    ) -> zbus::Result<()>;
}
