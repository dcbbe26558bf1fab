//! CRC-16 with the reflected polynomial 0xA001 (CRC-16/ARC), used for
//! both checksums in the RNC header.

const POLY: u16 = 0xA001;

const TABLE: [u16;256] = make_table();

const fn make_table() -> [u16;256] {
    let mut table = [0u16;256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            crc = match crc & 1 {
                1 => (crc >> 1) ^ POLY,
                _ => crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Running CRC, for checksums that are built up as bytes are produced
#[derive(Clone,Copy,Default)]
pub struct Crc16 {
    crc: u16
}

impl Crc16 {
    pub fn new() -> Self {
        Self { crc: 0 }
    }
    pub fn update_byte(&mut self,b: u8) {
        self.crc = TABLE[((self.crc ^ b as u16) & 0xff) as usize] ^ (self.crc >> 8);
    }
    pub fn update(&mut self,buf: &[u8]) {
        for b in buf {
            self.update_byte(*b);
        }
    }
    pub fn value(&self) -> u16 {
        self.crc
    }
}

/// CRC of a whole buffer
pub fn crc16(buf: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update(buf);
    crc.value()
}

#[test]
fn check_values() {
    assert_eq!(crc16(b""),0x0000);
    assert_eq!(crc16(b"123456789"),0xBB3D);
    assert_eq!(crc16(&[0;100]),0x0000);
}

#[test]
fn running_matches_whole() {
    let data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let mut crc = Crc16::new();
    for chunk in data.chunks(7) {
        crc.update(chunk);
    }
    assert_eq!(crc.value(),crc16(data));
}
