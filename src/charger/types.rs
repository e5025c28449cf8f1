//! Typed records assembled from EVC04 register blocks

use crate::charger::status::ChargerStatus;
use serde::Serialize;

/// Static device identification, read once at session start
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    pub serial_number: String,
    pub charge_point_id: String,
    pub brand: String,
    pub model: String,
    pub firmware_version: String,
}

/// Charge point and cable state as reported by the device
///
/// `charge_point_state`: 0 Available, 1 Preparing, 2 Charging,
/// 3 SuspendedEVSE, 4 SuspendedEV, 5 Finishing, 6 Reserved,
/// 7 Unavailable, 8 Faulted.
///
/// `cable_state`: 0 no cable, 1 cable connected, 2 vehicle connected,
/// 3 vehicle connected and cable locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChargeState {
    pub charge_point_state: u16,
    pub charging_active: bool,
    pub equipment_state: u16,
    pub cable_state: u16,
    pub fault_code: u16,
}

/// Per-phase electrical measurements
///
/// Currents are in 0.1 A units, voltages in volts, powers in watts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PowerReading {
    pub current_l1: u16,
    pub current_l2: u16,
    pub current_l3: u16,
    pub voltage_l1: u16,
    pub voltage_l2: u16,
    pub voltage_l3: u16,
    pub power_total: u32,
    pub power_l1: u32,
    pub power_l2: u32,
    pub power_l3: u32,
}

/// Charging session counters as reported by the device
///
/// Values may reset when a charging session ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReading {
    pub session_energy_wh: u32,
    pub session_start: String,
    pub session_duration_seconds: u32,
    pub session_end: String,
}

/// One fully consistent snapshot produced by a successful poll cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedReading {
    pub charge: ChargeState,
    pub power: PowerReading,
    pub session: SessionReading,

    /// Current limit the device reports as applied
    pub applied_max_current: u16,

    /// Composite status; `None` when a protocol violation withheld it
    pub status: Option<ChargerStatus>,
}

impl PowerReading {
    /// Highest per-phase current, in amperes
    pub fn max_phase_current_amps(&self) -> f64 {
        f64::from(
            self.current_l1
                .max(self.current_l2)
                .max(self.current_l3),
        ) / 10.0
    }
}
