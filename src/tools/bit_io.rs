//! Bit streams with literal bytes interleaved.
//!
//! RNC payloads mix bit fields and whole bytes in one byte stream.  The slot for
//! a bit token is reserved when its first bit is written, and any literal bytes
//! that come along before the token fills up are placed after the slot.  The
//! decoder mirrors this by reading literals straight from its byte cursor.

use crate::Error;

/// Bit packing convention, selected by the compression method
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum BitOrder {
    /// 16 bit tokens, first bit in the LSB, stored low byte first (method 1)
    Lsb0,
    /// 8 bit tokens, first bit in the MSB (method 2)
    Msb0
}

impl BitOrder {
    fn width(&self) -> u32 {
        match self {
            BitOrder::Lsb0 => 16,
            BitOrder::Msb0 => 8
        }
    }
}

pub struct BitWriter {
    ord: BitOrder,
    buf: Vec<u8>,
    /// bytes written so far, including any the governor dropped
    len: usize,
    /// the governor commits bytes only while `len` is below this
    limit: Option<usize>,
    token: u16,
    count: u32,
    /// where the token being filled will be stored
    slot: usize
}

impl BitWriter {
    pub fn new(ord: BitOrder,limit: Option<usize>) -> Self {
        Self {
            ord,
            buf: Vec::new(),
            len: 0,
            limit,
            token: 0,
            count: 0,
            slot: 0
        }
    }
    fn push(&mut self,b: u8) {
        match self.limit {
            Some(lim) if self.len >= lim => {},
            _ => self.buf.push(b)
        }
        self.len += 1;
    }
    fn store(&mut self,pos: usize,b: u8) {
        if let Some(slot) = self.buf.get_mut(pos) {
            *slot = b;
        }
    }
    fn flush_token(&mut self) {
        match self.ord {
            BitOrder::Lsb0 => {
                let word = self.token >> (16 - self.count);
                self.store(self.slot,word as u8);
                self.store(self.slot+1,(word >> 8) as u8);
            },
            BitOrder::Msb0 => {
                let byte = (self.token << (8 - self.count)) as u8;
                self.store(self.slot,byte);
            }
        }
        self.token = 0;
        self.count = 0;
    }
    pub fn put_bit(&mut self,bit: bool) {
        if self.count == 0 {
            self.slot = self.len;
            for _i in 0..self.ord.width()/8 {
                self.push(0);
            }
        }
        // shift with the new bit as carry
        let carry = bit as u16;
        self.token = match self.ord {
            BitOrder::Lsb0 => (self.token >> 1) | (carry << 15),
            BitOrder::Msb0 => (self.token << 1) | carry
        };
        self.count += 1;
        if self.count == self.ord.width() {
            self.flush_token();
        }
    }
    /// write the low `num_bits` of `val`, in the order of the stream's convention
    pub fn put_bits(&mut self,num_bits: u32,val: u32) {
        match self.ord {
            BitOrder::Lsb0 => {
                for i in 0..num_bits {
                    self.put_bit((val >> i) & 1 == 1);
                }
            },
            BitOrder::Msb0 => {
                for i in (0..num_bits).rev() {
                    self.put_bit((val >> i) & 1 == 1);
                }
            }
        }
    }
    /// write a whole byte at the end of the stream
    pub fn put_byte(&mut self,b: u8) {
        self.push(b);
    }
    /// length of the stream as if nothing had been dropped
    pub fn len(&self) -> usize {
        self.len
    }
    /// true if the stream reached the governor's limit
    pub fn exceeded(&self) -> bool {
        matches!(self.limit,Some(lim) if self.len >= lim)
    }
    pub fn finish(mut self) -> Vec<u8> {
        if self.count > 0 {
            self.flush_token();
        }
        self.buf
    }
}

pub struct BitReader<'a> {
    ord: BitOrder,
    data: &'a [u8],
    /// byte cursor, for `Lsb0` this is where the prefetched word came from
    pos: usize,
    bits: u32,
    count: u32
}

impl<'a> BitReader<'a> {
    pub fn new(ord: BitOrder,data: &'a [u8]) -> Self {
        let mut ans = Self {
            ord,
            data,
            pos: 0,
            bits: 0,
            count: 0
        };
        if ord == BitOrder::Lsb0 {
            ans.bits = ans.word(0);
            ans.count = 16;
        }
        ans
    }
    /// little endian word, reading past the end gives zeros
    fn word(&self,pos: usize) -> u32 {
        let lo = self.data.get(pos).copied().unwrap_or(0) as u32;
        let hi = self.data.get(pos+1).copied().unwrap_or(0) as u32;
        lo | (hi << 8)
    }
    /// look at the next `num_bits` (at most 16) without consuming, `Lsb0` only
    pub fn peek(&self,num_bits: u32) -> u32 {
        self.bits & ((1 << num_bits) - 1)
    }
    /// consume `num_bits` (at most 16), `Lsb0` only
    pub fn advance(&mut self,num_bits: u32) {
        self.bits >>= num_bits;
        self.count -= num_bits;
        if self.count < 16 {
            self.pos += 2;
            self.bits |= self.word(self.pos) << self.count;
            self.count += 16;
        }
    }
    fn get_bit_msb(&mut self) -> u32 {
        if self.count == 0 {
            self.bits = self.data.get(self.pos).copied().unwrap_or(0) as u32;
            self.pos += 1;
            self.count = 8;
        }
        self.count -= 1;
        (self.bits >> self.count) & 1
    }
    pub fn get_bit(&mut self) -> bool {
        self.get_bits(1) == 1
    }
    pub fn get_bits(&mut self,num_bits: u32) -> u32 {
        match self.ord {
            BitOrder::Lsb0 => {
                let ans = self.peek(num_bits);
                self.advance(num_bits);
                ans
            },
            BitOrder::Msb0 => {
                let mut ans = 0;
                for _i in 0..num_bits {
                    ans = (ans << 1) | self.get_bit_msb();
                }
                ans
            }
        }
    }
    /// read a whole byte from the byte cursor
    pub fn get_byte(&mut self) -> Result<u8,Error> {
        match self.data.get(self.pos) {
            Some(b) => {
                self.pos += 1;
                Ok(*b)
            },
            None => Err(Error::Corrupt)
        }
    }
    /// After reading literals under `Lsb0`, drop the prefetched word
    /// and load the one that follows the literals.
    pub fn resync(&mut self) {
        self.count -= 16;
        self.bits &= (1 << self.count) - 1;
        self.bits |= self.word(self.pos) << self.count;
        self.count += 16;
    }
}

#[test]
fn lsb0_layout() {
    let mut w = BitWriter::new(BitOrder::Lsb0,None);
    w.put_bits(2,0b01);
    w.put_byte(0x55);
    assert_eq!(w.finish(),vec![0x01,0x00,0x55]);
}

#[test]
fn msb0_layout() {
    let mut w = BitWriter::new(BitOrder::Msb0,None);
    w.put_bits(3,0b101);
    w.put_byte(0xaa);
    w.put_bits(5,0b11111);
    w.put_bits(1,1);
    assert_eq!(w.finish(),vec![0xbf,0xaa,0x80]);
}

#[test]
fn interleaved_round_trip() {
    for ord in [BitOrder::Lsb0,BitOrder::Msb0] {
        let mut w = BitWriter::new(ord,None);
        for i in 0..50u32 {
            w.put_bits(i % 13 + 1,i * 37);
            if i % 3 == 0 {
                w.put_byte(i as u8);
                w.put_byte(0xff - i as u8);
            }
        }
        let buf = w.finish();
        let mut r = BitReader::new(ord,&buf);
        for i in 0..50u32 {
            let n = i % 13 + 1;
            assert_eq!(r.get_bits(n),(i * 37) & ((1 << n) - 1));
            if i % 3 == 0 {
                assert_eq!(r.get_byte().unwrap(),i as u8);
                assert_eq!(r.get_byte().unwrap(),0xff - i as u8);
                if ord == BitOrder::Lsb0 {
                    r.resync();
                }
            }
        }
    }
}

#[test]
fn governor_drops_bytes() {
    let mut w = BitWriter::new(BitOrder::Msb0,Some(2));
    w.put_byte(1);
    assert!(!w.exceeded());
    w.put_byte(2);
    w.put_byte(3);
    w.put_bits(8,0xff);
    assert!(w.exceeded());
    assert_eq!(w.len(),4);
    assert_eq!(w.finish(),vec![1,2]);
}
