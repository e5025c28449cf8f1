//! Composite status derivation
//!
//! The charger's protocol-level state only matters once a vehicle is
//! physically connected; cable presence gates interpretation of the charge
//! point state. This is the single place that encodes what each device
//! state means externally.

use crate::error::{Result, VestaError};
use serde::Serialize;

/// Externally reported charger status (Victron status codes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum ChargerStatus {
    Idle = 0,
    Preparing = 1,
    Charging = 2,
    Finishing = 3,
    Suspended = 6,
    Unavailable = 10,
    LowSoc = 20,
}

impl ChargerStatus {
    /// Numeric code published on the bus
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Derive the composite status from cable state and charge point state.
///
/// Cable states 0 (no cable) and 1 (cable without vehicle) are Idle no
/// matter what the charge point reports. With a vehicle connected (2 or 3),
/// the charge point state maps through a fixed table. Values outside the
/// protocol domain are violations: the error is surfaced so the caller can
/// withhold the status for this cycle instead of guessing.
pub fn derive_status(cable_state: u16, charge_point_state: u16) -> Result<ChargerStatus> {
    match cable_state {
        0 | 1 => Ok(ChargerStatus::Idle),
        2 | 3 => match charge_point_state {
            0 => Ok(ChargerStatus::Preparing),
            1 => Ok(ChargerStatus::Suspended),
            2 => Ok(ChargerStatus::Charging),
            3 => Ok(ChargerStatus::Suspended),
            4 => Ok(ChargerStatus::LowSoc),
            5 => Ok(ChargerStatus::Finishing),
            6 | 7 | 8 => Ok(ChargerStatus::Unavailable),
            other => Err(VestaError::protocol(
                "charge_point_state".to_string(),
                format!("value {} outside 0-8", other),
            )),
        },
        other => Err(VestaError::protocol(
            "cable_state".to_string(),
            format!("value {} outside 0-3", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_cable_or_no_vehicle_is_idle_for_every_charge_point_state() {
        for cable in [0u16, 1] {
            for cp in 0u16..=8 {
                assert_eq!(
                    derive_status(cable, cp).unwrap(),
                    ChargerStatus::Idle,
                    "cable={} cp={}",
                    cable,
                    cp
                );
            }
        }
    }

    #[test]
    fn vehicle_connected_maps_through_fixed_table() {
        let expected = [
            (0, ChargerStatus::Preparing),
            (1, ChargerStatus::Suspended),
            (2, ChargerStatus::Charging),
            (3, ChargerStatus::Suspended),
            (4, ChargerStatus::LowSoc),
            (5, ChargerStatus::Finishing),
            (6, ChargerStatus::Unavailable),
            (7, ChargerStatus::Unavailable),
            (8, ChargerStatus::Unavailable),
        ];
        for cable in [2u16, 3] {
            for (cp, status) in expected {
                assert_eq!(
                    derive_status(cable, cp).unwrap(),
                    status,
                    "cable={} cp={}",
                    cable,
                    cp
                );
            }
        }
    }

    #[test]
    fn each_unavailable_state_maps_individually() {
        // 6, 7 and 8 must each hit the Unavailable arm on their own
        assert_eq!(derive_status(2, 6).unwrap(), ChargerStatus::Unavailable);
        assert_eq!(derive_status(2, 7).unwrap(), ChargerStatus::Unavailable);
        assert_eq!(derive_status(2, 8).unwrap(), ChargerStatus::Unavailable);
    }

    #[test]
    fn out_of_domain_values_are_protocol_violations() {
        let err = derive_status(2, 9).unwrap_err();
        assert!(matches!(err, VestaError::Protocol { .. }));

        let err = derive_status(4, 2).unwrap_err();
        assert!(matches!(err, VestaError::Protocol { .. }));
    }

    #[test]
    fn status_codes_match_bus_values() {
        assert_eq!(ChargerStatus::Idle.code(), 0);
        assert_eq!(ChargerStatus::Preparing.code(), 1);
        assert_eq!(ChargerStatus::Charging.code(), 2);
        assert_eq!(ChargerStatus::Finishing.code(), 3);
        assert_eq!(ChargerStatus::Suspended.code(), 6);
        assert_eq!(ChargerStatus::Unavailable.code(), 10);
        assert_eq!(ChargerStatus::LowSoc.code(), 20);
    }
}
