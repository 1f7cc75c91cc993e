//! Checksums used by the Serial API frame format and the persisted cache.

use crc16::*;

/// Computes the XOR "checksum" of the given data, seeded with 0xff as the
/// Serial API frame format requires.
pub fn xor_sum(data: &[u8]) -> u8 {
    data.iter().fold(0xff, |acc, x| acc ^ x)
}

/// Computes the CRC16 checksum of the given data (CRC-16/AUG-CCITT).
pub fn crc16(data: &[u8]) -> u16 {
    State::<AUG_CCITT>::calculate(data)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_xor_sum() {
        let input = hex::decode("030002").unwrap();
        let expected = 0xfe;
        assert_eq!(xor_sum(&input), expected);
    }

    #[test]
    fn test_xor_sum_is_involution_like() {
        // XOR-summing the data plus its own checksum always yields 0
        let input = hex::decode("09001305020002250a").unwrap();
        let chk = xor_sum(&input);
        let mut with_chk = input.clone();
        with_chk.push(chk);
        assert_eq!(xor_sum(&with_chk), 0);
    }

    #[test]
    fn test_crc16() {
        assert_eq!(crc16(&[]), 0x1d0f);
        assert_eq!(crc16(b"123456789"), 0xe5cc);
    }
}
