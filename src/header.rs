//! RNC archive header
//!
//! The header is 18 bytes, multi-byte fields are big endian:
//!
//! | offset | size | field |
//! |--------|------|-------|
//! | 0 | 3 | signature `RNC` |
//! | 3 | 1 | method, 1 or 2 |
//! | 4 | 4 | unpacked size |
//! | 8 | 4 | packed size, not counting the header |
//! | 12 | 2 | CRC of the unpacked data |
//! | 14 | 2 | CRC of the packed data |
//! | 16 | 1 | leeway |
//! | 17 | 1 | chunk count |
//!
//! Leeway is how far the decoder's output can run ahead of its input, which matters
//! when the packed data is unpacked in place.  Nothing in this crate depends on it.

use num_traits::FromPrimitive;
use crate::{Error,Method};

pub const SIGNATURE: [u8;3] = *b"RNC";
pub const HEADER_SIZE: usize = 18;
/// largest packed or unpacked size that will be accepted
pub const MAX_SIZE: usize = 0x1e00000;

#[derive(Clone,Debug,PartialEq,Eq)]
pub struct Header {
    pub method: Method,
    pub unpacked_size: u32,
    pub packed_size: u32,
    pub unpacked_crc: u16,
    pub packed_crc: u16,
    pub leeway: u8,
    pub chunk_count: u8
}

/// true if the buffer starts with the RNC signature
pub fn is_packed(buf: &[u8]) -> bool {
    buf.starts_with(&SIGNATURE)
}

fn be32(buf: &[u8]) -> u32 {
    u32::from_be_bytes([buf[0],buf[1],buf[2],buf[3]])
}

fn be16(buf: &[u8]) -> u16 {
    u16::from_be_bytes([buf[0],buf[1]])
}

impl Header {
    /// Parse the header at the start of `buf`.  This checks the signature and the
    /// method, the sizes are checked by `validate`.
    pub fn parse(buf: &[u8]) -> Result<Self,Error> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::TooSmall);
        }
        if !is_packed(buf) {
            return Err(Error::NotPacked);
        }
        let method = match Method::from_u8(buf[3]) {
            Some(m) => m,
            None => return Err(Error::UnknownMethod(buf[3]))
        };
        Ok(Self {
            method,
            unpacked_size: be32(&buf[4..]),
            packed_size: be32(&buf[8..]),
            unpacked_crc: be16(&buf[12..]),
            packed_crc: be16(&buf[14..]),
            leeway: buf[16],
            chunk_count: buf[17]
        })
    }
    /// Check the declared sizes against the hard limit and the data actually available
    pub fn validate(&self,available: usize) -> Result<(),Error> {
        if self.unpacked_size as usize > MAX_SIZE || self.packed_size as usize > MAX_SIZE {
            return Err(Error::TooLarge);
        }
        if self.total_size() > available {
            return Err(Error::Truncated);
        }
        Ok(())
    }
    /// header plus payload
    pub fn total_size(&self) -> usize {
        HEADER_SIZE + self.packed_size as usize
    }
    pub fn to_bytes(&self) -> [u8;HEADER_SIZE] {
        let mut ans = [0;HEADER_SIZE];
        ans[0..3].copy_from_slice(&SIGNATURE);
        ans[3] = self.method as u8;
        ans[4..8].copy_from_slice(&self.unpacked_size.to_be_bytes());
        ans[8..12].copy_from_slice(&self.packed_size.to_be_bytes());
        ans[12..14].copy_from_slice(&self.unpacked_crc.to_be_bytes());
        ans[14..16].copy_from_slice(&self.packed_crc.to_be_bytes());
        ans[16] = self.leeway;
        ans[17] = self.chunk_count;
        ans
    }
}

#[test]
fn parse_known_header() {
    let buf = hex::decode("524E4302000000640000000600009A540201").unwrap();
    let hdr = Header::parse(&buf).expect("parse failed");
    assert_eq!(hdr,Header {
        method: Method::Fast,
        unpacked_size: 100,
        packed_size: 6,
        unpacked_crc: 0,
        packed_crc: 0x9a54,
        leeway: 2,
        chunk_count: 1
    });
    assert_eq!(hdr.to_bytes().to_vec(),buf);
    assert!(hdr.validate(24).is_ok());
    assert!(matches!(hdr.validate(23),Err(Error::Truncated)));
}

#[test]
fn bad_headers() {
    let mut buf = hex::decode("524E4301000000640000000600009A540201").unwrap();
    assert!(matches!(Header::parse(&buf[0..17]),Err(Error::TooSmall)));
    buf[3] = 3;
    assert!(matches!(Header::parse(&buf),Err(Error::UnknownMethod(3))));
    buf[0] = b'X';
    assert!(matches!(Header::parse(&buf),Err(Error::NotPacked)));
    let hdr = Header {
        method: Method::Huffman,
        unpacked_size: MAX_SIZE as u32 + 1,
        packed_size: 6,
        unpacked_crc: 0,
        packed_crc: 0,
        leeway: 0,
        chunk_count: 1
    };
    assert!(matches!(hdr.validate(usize::MAX),Err(Error::TooLarge)));
}
