//! Method 1: LZ77 with Huffman tables built for every chunk
//!
//! A chunk starts with three tables, for literal run lengths, match offsets, and
//! match lengths, followed by a 16 bit count of tokens.  Each token is a literal
//! run and, unless it is the last token in the chunk, a match.  The literal bytes
//! themselves are stored whole, between the bit tokens.

use crate::Error;
use crate::tools::rotate_key;
use crate::tools::bit_io::{BitReader,BitWriter};
use crate::tools::huffman::{HuffTable,TABLE_SIZE,bucket};
use crate::tools::match_finder::Token;
use crate::tools::window::OutputWindow;

pub const MAX_DICT: usize = 0x8000;
pub const MAX_MATCH: usize = 0x1000;

/// Encode the tokens covering `data[start..]` as one chunk.
/// The key is updated as the literals are encrypted.
pub fn encode_chunk(w: &mut BitWriter,data: &[u8],start: usize,tokens: &[Token],key: &mut u16) {
    let mut run_freq = [0u32;TABLE_SIZE];
    let mut offset_freq = [0u32;TABLE_SIZE];
    let mut len_freq = [0u32;TABLE_SIZE];
    for t in tokens {
        run_freq[bucket(t.run as u32).0] += 1;
        if let Some(m) = t.copy {
            offset_freq[bucket(m.offset as u32 - 1).0] += 1;
            len_freq[bucket(m.len as u32 - 2).0] += 1;
        }
    }
    let runs = HuffTable::create(&run_freq);
    let offsets = HuffTable::create(&offset_freq);
    let lengths = HuffTable::create(&len_freq);
    runs.write(w);
    offsets.write(w);
    lengths.write(w);
    w.put_bits(16,tokens.len() as u32);
    let mut pos = start;
    for t in tokens {
        runs.encode(w,t.run as u32);
        if t.run > 0 {
            for b in &data[pos..pos+t.run] {
                w.put_byte(b ^ *key as u8);
            }
            *key = rotate_key(*key);
            pos += t.run;
        }
        if let Some(m) = t.copy {
            offsets.encode(w,m.offset as u32 - 1);
            lengths.encode(w,m.len as u32 - 2);
            pos += m.len;
        }
    }
}

/// Decode chunks until the window holds the declared size, returns the number of chunks
pub fn decode(r: &mut BitReader,win: &mut OutputWindow,key: &mut u16) -> Result<usize,Error> {
    let mut chunks = 0;
    while !win.is_full() {
        let runs = HuffTable::read(r)?;
        let offsets = HuffTable::read(r)?;
        let lengths = HuffTable::read(r)?;
        let mut count = r.get_bits(16);
        log::debug!("chunk {} has {} tokens",chunks,count);
        if count == 0 {
            return Err(Error::Corrupt);
        }
        let before = win.total();
        loop {
            let run = runs.decode(r)?;
            if run > 0 {
                for _i in 0..run {
                    let b = r.get_byte()?;
                    win.push(b ^ *key as u8)?;
                }
                r.resync();
                *key = rotate_key(*key);
            }
            count -= 1;
            if count == 0 {
                break;
            }
            let offset = offsets.decode(r)? + 1;
            let len = lengths.decode(r)? + 2;
            win.copy(offset as usize,len as usize)?;
        }
        if win.total() == before {
            log::debug!("chunk {} produced nothing",chunks);
            return Err(Error::Corrupt);
        }
        chunks += 1;
    }
    Ok(chunks)
}

#[cfg(test)]
fn round_trip(data: &[u8],key: u16) -> Vec<u8> {
    use crate::tools::bit_io::BitOrder;
    use crate::tools::match_finder::MatchFinder;
    let mut finder = MatchFinder::new(MAX_DICT,MAX_MATCH,usize::MAX);
    let mut w = BitWriter::new(BitOrder::Lsb0,None);
    let mut k = key;
    let half = data.len() / 2;
    for (start,end) in [(0,half),(half,data.len())] {
        let tokens = finder.parse_chunk(data,start,end);
        encode_chunk(&mut w,data,start,&tokens,&mut k);
    }
    let buf = w.finish();
    let mut r = BitReader::new(BitOrder::Lsb0,&buf);
    let mut win = OutputWindow::new(MAX_DICT,data.len());
    let mut k = key;
    assert_eq!(decode(&mut r,&mut win,&mut k).expect("decode failed"),2);
    win.finish().0
}

#[test]
fn chunks_round_trip() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".repeat(20);
    assert_eq!(round_trip(test_data.as_bytes(),0),test_data.as_bytes().to_vec());
    assert_eq!(round_trip(test_data.as_bytes(),0x9a3c),test_data.as_bytes().to_vec());
}

#[test]
fn key_changes_literals() {
    use crate::tools::bit_io::BitOrder;
    let data = "abcdefgh".as_bytes();
    let tokens = [Token { run: 8, copy: None }];
    let mut plain = BitWriter::new(BitOrder::Lsb0,None);
    let mut key = 0;
    encode_chunk(&mut plain,data,0,&tokens,&mut key);
    let mut secret = BitWriter::new(BitOrder::Lsb0,None);
    let mut key = 0x0101;
    encode_chunk(&mut secret,data,0,&tokens,&mut key);
    assert_eq!(key,0x8080);
    let (plain,secret) = (plain.finish(),secret.finish());
    assert_eq!(plain.len(),secret.len());
    assert_ne!(plain,secret);
}
