//! EVC04 Modbus register map
//!
//! Fixed addresses and block lengths for the protocol version this driver
//! targets. Offsets inside a block are measured in registers.

/// A contiguous block of registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterBlock {
    /// First register address
    pub address: u16,
    /// Number of registers in the block
    pub count: u16,
}

// Identity blocks (input registers, text encoded)
pub const SERIAL_NUMBER: RegisterBlock = RegisterBlock { address: 100, count: 25 };
pub const CHARGEPOINT_ID: RegisterBlock = RegisterBlock { address: 130, count: 50 };
pub const BRAND: RegisterBlock = RegisterBlock { address: 199, count: 10 };
pub const MODEL: RegisterBlock = RegisterBlock { address: 210, count: 5 };
pub const FIRMWARE_VERSION: RegisterBlock = RegisterBlock { address: 230, count: 50 };

/// Charge state block: [state, chargingActive, equipmentState, -, cableState, -, faultCode]
pub const CHARGE_STATE: RegisterBlock = RegisterBlock { address: 1000, count: 7 };

/// Per-phase currents (0.1 A) at offsets 0/2/4, voltages (V) at 6/8/10
pub const PHASE_MEASUREMENTS: RegisterBlock = RegisterBlock { address: 1008, count: 11 };

/// Four u32 power values (W): total@0, L1@4, L2@8, L3@12
pub const PHASE_POWERS: RegisterBlock = RegisterBlock { address: 1020, count: 14 };

/// Session block: energy u32@0, start u32@2, duration u32@6, end u32@10
pub const SESSION_DATA: RegisterBlock = RegisterBlock { address: 1502, count: 12 };

/// Applied current limit (holding register, also the write target)
pub const MAX_CURRENT: RegisterBlock = RegisterBlock { address: 5004, count: 1 };

/// Liveness marker the firmware expects the controller to keep writing
pub const ALIVE_REGISTER: u16 = 6000;
pub const ALIVE_VALUE: u16 = 1;
