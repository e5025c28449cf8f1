//! Reading assemblers, one per logical register block
//!
//! Each assembler issues its fixed-address reads and builds a fresh typed
//! record. A failed or short read surfaces an error without touching any
//! previously committed state; the session decides what to do with it.

use crate::charger::decode::{decode_text, decode_time_of_day, decode_u32};
use crate::charger::link::RegisterLink;
use crate::charger::types::{ChargeState, DeviceIdentity, PowerReading, SessionReading};
use crate::error::{Result, VestaError};
use crate::registers;

fn check_block_len(name: &str, expected: u16, got: usize) -> Result<()> {
    if got < expected as usize {
        return Err(VestaError::modbus(format!(
            "Short {} block: expected {} registers, got {}",
            name, expected, got
        )));
    }
    Ok(())
}

/// Read the five identity text blocks. Run once per session.
pub async fn read_identity<L: RegisterLink + ?Sized>(link: &mut L) -> Result<DeviceIdentity> {
    let serial = link
        .read_input_registers(registers::SERIAL_NUMBER.address, registers::SERIAL_NUMBER.count)
        .await?;
    let chargepoint_id = link
        .read_input_registers(registers::CHARGEPOINT_ID.address, registers::CHARGEPOINT_ID.count)
        .await?;
    let brand = link
        .read_input_registers(registers::BRAND.address, registers::BRAND.count)
        .await?;
    let model = link
        .read_input_registers(registers::MODEL.address, registers::MODEL.count)
        .await?;
    let firmware = link
        .read_input_registers(
            registers::FIRMWARE_VERSION.address,
            registers::FIRMWARE_VERSION.count,
        )
        .await?;

    Ok(DeviceIdentity {
        serial_number: decode_text(&serial),
        charge_point_id: decode_text(&chargepoint_id),
        brand: decode_text(&brand),
        model: decode_text(&model),
        firmware_version: decode_text(&firmware),
    })
}

/// Read the charge state block
pub async fn read_charge_state<L: RegisterLink + ?Sized>(link: &mut L) -> Result<ChargeState> {
    let block = registers::CHARGE_STATE;
    let regs = link.read_input_registers(block.address, block.count).await?;
    check_block_len("charge state", block.count, regs.len())?;

    Ok(ChargeState {
        charge_point_state: regs[0],
        charging_active: regs[1] != 0,
        equipment_state: regs[2],
        cable_state: regs[4],
        fault_code: regs[6],
    })
}

/// Read phase currents/voltages and the four power counters
pub async fn read_power<L: RegisterLink + ?Sized>(link: &mut L) -> Result<PowerReading> {
    let meas_block = registers::PHASE_MEASUREMENTS;
    let meas = link
        .read_input_registers(meas_block.address, meas_block.count)
        .await?;
    check_block_len("phase measurements", meas_block.count, meas.len())?;

    let power_block = registers::PHASE_POWERS;
    let powers = link
        .read_input_registers(power_block.address, power_block.count)
        .await?;
    check_block_len("phase powers", power_block.count, powers.len())?;

    Ok(PowerReading {
        current_l1: meas[0],
        current_l2: meas[2],
        current_l3: meas[4],
        voltage_l1: meas[6],
        voltage_l2: meas[8],
        voltage_l3: meas[10],
        power_total: decode_u32(&powers, 0)?,
        power_l1: decode_u32(&powers, 4)?,
        power_l2: decode_u32(&powers, 8)?,
        power_l3: decode_u32(&powers, 12)?,
    })
}

/// Read the session counters block
pub async fn read_session<L: RegisterLink + ?Sized>(link: &mut L) -> Result<SessionReading> {
    let block = registers::SESSION_DATA;
    let regs = link.read_input_registers(block.address, block.count).await?;
    check_block_len("session", block.count, regs.len())?;

    Ok(SessionReading {
        session_energy_wh: decode_u32(&regs, 0)?,
        session_start: decode_time_of_day(decode_u32(&regs, 2)?),
        session_duration_seconds: decode_u32(&regs, 6)?,
        session_end: decode_time_of_day(decode_u32(&regs, 10)?),
    })
}

/// Read back the current limit the device reports as applied
pub async fn read_max_current<L: RegisterLink + ?Sized>(link: &mut L) -> Result<u16> {
    let block = registers::MAX_CURRENT;
    let regs = link
        .read_holding_registers(block.address, block.count)
        .await?;
    check_block_len("max current", block.count, regs.len())?;
    Ok(regs[0])
}
