//! Building blocks shared by the two RNC methods

pub mod bit_io;
pub mod crc16;
pub mod huffman;
pub mod match_finder;
pub mod ring_buffer;
pub mod window;

/// Rotate the encryption key right by one bit, the low bit carries into the top
pub fn rotate_key(key: u16) -> u16 {
    let carry = key & 1;
    (key >> 1) | (carry << 15)
}

#[test]
fn key_rotation() {
    assert_eq!(rotate_key(0x0001),0x8000);
    assert_eq!(rotate_key(0x1234),0x091a);
    assert_eq!(rotate_key(0),0);
}
