//! Method 2: LZ77 with fixed prefix codes
//!
//! Bits are taken MSB first from 8 bit tokens.  The codes are
//!
//! * `0` + byte: one literal
//! * `10` + count + offset: match of 4 to 8 bytes
//! * `10111` + 4 bits n: run of `4n+12` literals
//! * `110` + byte: match of 2 bytes, the byte is the offset less 1
//! * `1110` + offset: match of 3 bytes
//! * `1111` + byte n + offset: match of `n+8` bytes, n > 0
//! * `1111` + byte 0 + bit: end of chunk, the bit is set if another chunk follows
//!
//! Offsets are coded as a variable length high nibble followed by a whole byte.

use crate::Error;
use crate::tools::rotate_key;
use crate::tools::bit_io::{BitReader,BitWriter};
use crate::tools::match_finder::Token;
use crate::tools::window::OutputWindow;

pub const MAX_DICT: usize = 0x1000;
pub const MAX_MATCH: usize = 255;
/// 2 byte matches store the offset in a single byte
pub const SHORT_REACH: usize = 256;
const MIN_RUN: usize = 12;
const MAX_RUN: usize = 72;

fn put_count(w: &mut BitWriter,n: usize) {
    match n {
        4 | 5 => w.put_bits(2,((n as u32) - 4) << 1),
        _ => w.put_bits(3,((((n as u32) >> 1) - 3) << 2) | 0b10 | (n as u32 & 1))
    }
}

fn put_offset(w: &mut BitWriter,offset: usize) {
    let hi = ((offset - 1) >> 8) as u32;
    match hi {
        0 => w.put_bits(1,0),
        1 => w.put_bits(3,0b110),
        2 | 3 => w.put_bits(4,0b1000 | (hi - 2)),
        4..=7 => w.put_bits(5,0b10101 | (((hi >> 1) & 1) << 3) | ((hi & 1) << 1)),
        _ => {
            let x = hi >> 1;
            w.put_bits(6,0b101000 | (((x >> 1) & 1) << 4) | ((x & 1) << 2) | (hi & 1))
        }
    }
    w.put_byte((offset - 1) as u8);
}

fn get_count(r: &mut BitReader) -> usize {
    let mut ans = 4 + r.get_bits(1) as usize;
    if r.get_bit() {
        ans = ((ans - 1) << 1) + r.get_bits(1) as usize;
    }
    ans
}

fn get_offset(r: &mut BitReader) -> Result<usize,Error> {
    let mut hi = 0;
    if r.get_bit() {
        hi = r.get_bits(1) as usize;
        if r.get_bit() {
            hi = ((hi << 1) | r.get_bits(1) as usize) | 4;
            if !r.get_bit() {
                hi = (hi << 1) | r.get_bits(1) as usize;
            }
        } else if hi == 0 {
            hi = r.get_bits(1) as usize + 2;
        }
    }
    Ok(((hi << 8) | r.get_byte()? as usize) + 1)
}

/// Encode the tokens covering `data[start..]` as one chunk, `last` selects the
/// end marker.  The key is updated as the literals are encrypted.
pub fn encode_chunk(w: &mut BitWriter,data: &[u8],start: usize,tokens: &[Token],key: &mut u16,last: bool) {
    let mut pos = start;
    for t in tokens {
        let lit = &data[pos..pos+t.run];
        let mut blocks = lit.len();
        let mut curs = 0;
        while blocks >= MIN_RUN {
            let n = usize::min(blocks,MAX_RUN) & !3;
            w.put_bits(2,0b10);
            put_count(w,9);
            w.put_bits(4,((n - MIN_RUN) >> 2) as u32);
            for b in &lit[curs..curs+n] {
                w.put_byte(b ^ *key as u8);
            }
            curs += n;
            blocks -= n;
        }
        for b in &lit[curs..] {
            w.put_bit(false);
            w.put_byte(b ^ *key as u8);
        }
        if t.run > 0 {
            *key = rotate_key(*key);
        }
        pos += t.run;
        if let Some(m) = t.copy {
            match m.len {
                2 => {
                    w.put_bits(3,0b110);
                    w.put_byte((m.offset - 1) as u8);
                },
                3 => {
                    w.put_bits(4,0b1110);
                    put_offset(w,m.offset);
                },
                4..=8 => {
                    w.put_bits(2,0b10);
                    put_count(w,m.len);
                    put_offset(w,m.offset);
                },
                _ => {
                    w.put_bits(4,0b1111);
                    w.put_byte((m.len - 8) as u8);
                    put_offset(w,m.offset);
                }
            }
            pos += m.len;
        }
    }
    w.put_bits(4,0b1111);
    w.put_byte(0);
    w.put_bit(!last);
}

/// Decode chunks until an end marker says there are no more, returns the number of chunks.
/// The key rotates when a match or end marker follows one or more literals.
pub fn decode(r: &mut BitReader,win: &mut OutputWindow,key: &mut u16) -> Result<usize,Error> {
    let mut chunks = 0;
    let mut rotate = false;
    loop {
        if !r.get_bit() {
            win.push(r.get_byte()? ^ *key as u8)?;
            rotate = true;
            continue;
        }
        let (offset,len) = if !r.get_bit() {
            let count = get_count(r);
            if count == 9 {
                let n = ((r.get_bits(4) as usize) << 2) + MIN_RUN;
                for _i in 0..n {
                    win.push(r.get_byte()? ^ *key as u8)?;
                }
                rotate = true;
                continue;
            }
            (get_offset(r)?,count)
        } else if !r.get_bit() {
            (r.get_byte()? as usize + 1,2)
        } else if !r.get_bit() {
            (get_offset(r)?,3)
        } else {
            let n = r.get_byte()? as usize;
            if n == 0 {
                if rotate {
                    *key = rotate_key(*key);
                    rotate = false;
                }
                chunks += 1;
                if !r.get_bit() {
                    return Ok(chunks);
                }
                log::trace!("chunk {} ends at {}",chunks,win.total());
                continue;
            }
            (get_offset(r)?,n + 8)
        };
        if rotate {
            *key = rotate_key(*key);
            rotate = false;
        }
        win.copy(offset,len)?;
    }
}

#[test]
fn count_codes() {
    use crate::tools::bit_io::BitOrder;
    let mut w = BitWriter::new(BitOrder::Msb0,None);
    for n in 4..=9 {
        put_count(&mut w,n);
    }
    // 00 10 010 011 110 111
    assert_eq!(w.finish(),vec![0b0010_0100,0b1111_0111]);
    let buf = [0b0010_0100,0b1111_0111];
    let mut r = BitReader::new(BitOrder::Msb0,&buf);
    for n in 4..=9 {
        assert_eq!(get_count(&mut r),n);
    }
}

#[test]
fn offsets_through_stream() {
    use crate::tools::bit_io::BitOrder;
    let offsets = [1,256,257,512,513,1024,1025,2048,2049,3000,4095,4096];
    let mut w = BitWriter::new(BitOrder::Msb0,None);
    for off in offsets {
        put_offset(&mut w,off);
    }
    let buf = w.finish();
    let mut r = BitReader::new(BitOrder::Msb0,&buf);
    for off in offsets {
        assert_eq!(get_offset(&mut r).expect("bad offset"),off);
    }
}

#[test]
fn known_chunk() {
    use crate::tools::bit_io::BitOrder;
    use crate::tools::match_finder::MatchFinder;
    // 100 zeros: a literal, a long match, and the end marker
    let data = vec![0;100];
    let mut finder = MatchFinder::new(MAX_DICT,MAX_MATCH,SHORT_REACH);
    let tokens = finder.parse_chunk(&data,0,100);
    let mut w = BitWriter::new(BitOrder::Msb0,None);
    w.put_bits(2,0);
    let mut key = 0;
    encode_chunk(&mut w,&data,0,&tokens,&mut key,true);
    let buf = w.finish();
    assert_eq!(hex::encode(&buf),"1e005b00f000");
    let mut r = BitReader::new(BitOrder::Msb0,&buf);
    assert_eq!(r.get_bits(2),0);
    let mut win = OutputWindow::new(MAX_DICT,100);
    assert_eq!(decode(&mut r,&mut win,&mut key).expect("decode failed"),1);
    assert_eq!(win.finish().0,data);
}

#[test]
fn runs_and_keys() {
    use crate::tools::bit_io::BitOrder;
    use crate::tools::match_finder::MatchFinder;
    let mut data: Vec<u8> = (0..200).map(|i| (i * 7 + i / 13) as u8).collect();
    data.extend_from_slice(&data[0..150].to_vec());
    data.extend((0..90).map(|i| (i * 31) as u8));
    let half = 260;
    let mut finder = MatchFinder::new(MAX_DICT,MAX_MATCH,SHORT_REACH);
    let mut w = BitWriter::new(BitOrder::Msb0,None);
    let mut key = 0xbeef;
    for (start,end) in [(0,half),(half,data.len())] {
        let tokens = finder.parse_chunk(&data,start,end);
        encode_chunk(&mut w,&data,start,&tokens,&mut key,end == data.len());
    }
    let buf = w.finish();
    let mut r = BitReader::new(BitOrder::Msb0,&buf);
    let mut win = OutputWindow::new(MAX_DICT,data.len());
    let mut key = 0xbeef;
    assert_eq!(decode(&mut r,&mut win,&mut key).expect("decode failed"),2);
    assert_eq!(win.finish().0,data);
}
