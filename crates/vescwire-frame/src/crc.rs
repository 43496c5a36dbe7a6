use crc::{Crc, CRC_16_XMODEM};

/// CRC-16/XMODEM: poly 0x1021, init 0x0000, no reflection, no final xor.
///
/// Fixed by the controller firmware.
pub const VESC_CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Checksum of a payload as carried in the frame trailer.
pub fn crc16(bytes: &[u8]) -> u16 {
    VESC_CRC16.checksum(bytes)
}
