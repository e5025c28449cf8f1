//! Pure decoders for raw EVC04 register blocks

use crate::error::{Result, VestaError};

/// Decode a text field from registers.
///
/// Each register carries one character code in its low byte. Zero registers
/// are padding and are skipped entirely, not treated as terminators, since
/// the device may intersperse them.
pub fn decode_text(registers: &[u16]) -> String {
    registers
        .iter()
        .filter(|&&reg| reg != 0)
        .map(|&reg| char::from((reg & 0xFF) as u8))
        .collect()
}

/// Decode a 32-bit unsigned integer spanning two registers, high word first.
///
/// The offset is measured in registers, not bytes.
pub fn decode_u32(registers: &[u16], offset: usize) -> Result<u32> {
    if registers.len() < offset + 2 {
        return Err(VestaError::modbus(format!(
            "Insufficient registers for u32 at offset {}: got {}",
            offset,
            registers.len()
        )));
    }
    Ok(((registers[offset] as u32) << 16) | registers[offset + 1] as u32)
}

/// Decode a decimal-packed time of day as reported by the device.
///
/// The encoding is `hour*10000 + minute*100 + second` in plain decimal,
/// not a timestamp; the device may report power-on time only and no
/// calendar validation is applied.
pub fn decode_time_of_day(packed: u32) -> String {
    let hour = packed / 10000;
    let minute = (packed / 100) % 100;
    let second = packed % 100;
    format!("{:02}:{:02}:{:02}", hour, minute, second)
}
