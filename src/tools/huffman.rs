//! Huffman tables for method 1.
//!
//! Each table codes at most 16 symbols.  A symbol is the bucket of a value,
//! i.e., its bit length, and the bits below the leading one follow the code
//! verbatim.  Only the bit depths are stored in the stream, the codes are
//! canonical so both sides can derive them from the depths.

use super::bit_io::{BitReader,BitWriter};
use crate::Error;

pub const TABLE_SIZE: usize = 16;

/// Return the bucket of `val` and how many extra bits follow its code
pub fn bucket(val: u32) -> (usize,u32) {
    match val {
        0 | 1 => (val as usize,0),
        _ => {
            let k = 32 - val.leading_zeros();
            (k as usize,k - 1)
        }
    }
}

/// reverse the order of the low `num_bits` of `code`
fn mirror(code: u16,num_bits: u8) -> u16 {
    code.reverse_bits() >> (16 - num_bits as u32)
}

#[derive(Clone,Copy,Default)]
struct Entry {
    freq: u32,
    /// next slot that was merged into this one while building the tree
    link: Option<usize>,
    /// canonical code, already mirrored for the LSB-first stream
    code: u16,
    depth: u8
}

pub struct HuffTable {
    entries: [Entry;TABLE_SIZE],
    /// number of symbols that are stored, trailing unused symbols are not
    count: usize
}

impl HuffTable {
    /// Build the table for the given symbol frequencies.
    pub fn create(freqs: &[u32;TABLE_SIZE]) -> Self {
        let mut entries = [Entry::default();TABLE_SIZE];
        for i in 0..TABLE_SIZE {
            entries[i].freq = freqs[i];
        }
        // Merge the two lowest nonzero slots until one is left.  Every slot that was
        // ever merged into either one sits one level deeper afterwards.
        loop {
            let mut lo: Option<usize> = None;
            let mut next: Option<usize> = None;
            for i in 0..TABLE_SIZE {
                let f = entries[i].freq;
                if f == 0 {
                    continue;
                }
                match (lo,next) {
                    (None,_) => lo = Some(i),
                    (Some(a),_) if f < entries[a].freq => {
                        next = lo;
                        lo = Some(i);
                    },
                    (_,None) => next = Some(i),
                    (_,Some(b)) if f < entries[b].freq => next = Some(i),
                    _ => {}
                }
            }
            let (a,b) = match (lo,next) {
                (Some(a),Some(b)) => (a,b),
                _ => break
            };
            entries[a].freq += entries[b].freq;
            entries[b].freq = 0;
            for start in [a,b] {
                let mut curs = Some(start);
                while let Some(i) = curs {
                    entries[i].depth += 1;
                    curs = entries[i].link;
                }
            }
            let mut tail = a;
            while let Some(i) = entries[tail].link {
                tail = i;
            }
            entries[tail].link = Some(b);
        }
        let used: Vec<usize> = (0..TABLE_SIZE).filter(|i| freqs[*i] > 0).collect();
        if used.len() == 1 {
            entries[used[0]].depth = 1;
        }
        Self::from_depths(entries)
    }
    fn from_depths(mut entries: [Entry;TABLE_SIZE]) -> Self {
        let count = match entries.iter().rposition(|e| e.depth > 0) {
            Some(i) => i + 1,
            None => 0
        };
        let mut code: u32 = 0;
        for depth in 1..TABLE_SIZE as u8 {
            for e in entries[0..count].iter_mut() {
                if e.depth == depth {
                    e.code = mirror(code as u16,depth);
                    code += 1;
                }
            }
            code <<= 1;
        }
        Self {
            entries,
            count
        }
    }
    /// Write the symbol count and the depths
    pub fn write(&self,w: &mut BitWriter) {
        w.put_bits(5,self.count as u32);
        for e in &self.entries[0..self.count] {
            w.put_bits(4,e.depth as u32);
        }
    }
    /// Read the symbol count and the depths, and rebuild the codes
    pub fn read(r: &mut BitReader) -> Result<Self,Error> {
        let count = r.get_bits(5) as usize;
        if count > TABLE_SIZE {
            return Err(Error::Corrupt);
        }
        let mut entries = [Entry::default();TABLE_SIZE];
        for e in entries[0..count].iter_mut() {
            e.depth = r.get_bits(4) as u8;
        }
        Ok(Self::from_depths(entries))
    }
    /// Write the code for the bucket of `val` followed by the extra bits
    pub fn encode(&self,w: &mut BitWriter,val: u32) {
        let (sym,extra) = bucket(val);
        let e = &self.entries[sym];
        debug_assert!(e.depth > 0,"value {} has no code",val);
        w.put_bits(e.depth as u32,e.code as u32);
        if extra > 0 {
            w.put_bits(extra,val - (1 << extra));
        }
    }
    /// Read a code and its extra bits and return the value
    pub fn decode(&self,r: &mut BitReader) -> Result<u32,Error> {
        for (sym,e) in self.entries[0..self.count].iter().enumerate() {
            if e.depth == 0 || r.peek(e.depth as u32) != e.code as u32 {
                continue;
            }
            r.advance(e.depth as u32);
            return Ok(match sym {
                0 | 1 => sym as u32,
                _ => (1 << (sym - 1)) | r.get_bits(sym as u32 - 1)
            });
        }
        log::debug!("no Huffman code matches {:016b}",r.peek(16));
        Err(Error::Corrupt)
    }
}

#[cfg(test)]
fn depths(table: &HuffTable) -> Vec<u8> {
    table.entries[0..table.count].iter().map(|e| e.depth).collect()
}

#[test]
fn buckets() {
    assert_eq!(bucket(0),(0,0));
    assert_eq!(bucket(1),(1,0));
    assert_eq!(bucket(2),(2,1));
    assert_eq!(bucket(3),(2,1));
    assert_eq!(bucket(4),(3,2));
    assert_eq!(bucket(0x7fff),(15,14));
}

#[test]
fn tree_depths() {
    let mut freqs = [0;TABLE_SIZE];
    freqs[0] = 5;
    freqs[1] = 1;
    freqs[2] = 1;
    freqs[4] = 2;
    let table = HuffTable::create(&freqs);
    assert_eq!(depths(&table),vec![1,3,3,0,2]);

    let mut freqs = [0;TABLE_SIZE];
    freqs[3] = 7;
    let table = HuffTable::create(&freqs);
    assert_eq!(depths(&table),vec![0,0,0,1]);

    let table = HuffTable::create(&[0;TABLE_SIZE]);
    assert_eq!(table.count,0);
}

#[test]
fn canonical_codes() {
    let mut freqs = [0;TABLE_SIZE];
    freqs[0] = 5;
    freqs[1] = 1;
    freqs[2] = 1;
    freqs[4] = 2;
    let table = HuffTable::create(&freqs);
    // depth 1: 0, depth 2: 10, depth 3: 110 and 111, all mirrored
    assert_eq!(table.entries[0].code,0b0);
    assert_eq!(table.entries[4].code,0b01);
    assert_eq!(table.entries[1].code,0b011);
    assert_eq!(table.entries[2].code,0b111);
}

#[test]
fn values_through_stream() {
    use super::bit_io::BitOrder;
    let vals = [0,1,2,3,7,8,100,4094,0x7fff,1,1,1,0,5];
    let mut freqs = [0;TABLE_SIZE];
    for v in vals {
        freqs[bucket(v).0] += 1;
    }
    let table = HuffTable::create(&freqs);
    let mut w = BitWriter::new(BitOrder::Lsb0,None);
    table.write(&mut w);
    for v in vals {
        table.encode(&mut w,v);
    }
    let buf = w.finish();
    let mut r = BitReader::new(BitOrder::Lsb0,&buf);
    let copy = HuffTable::read(&mut r).expect("bad table");
    assert_eq!(depths(&copy),depths(&table));
    for v in vals {
        assert_eq!(copy.decode(&mut r).expect("bad code"),v);
    }
}
