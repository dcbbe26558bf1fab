//! Pack, unpack, and search for RNC archives
//!
//! The slice functions do the work, the stream functions wrap them so that files
//! can be processed starting from an offset, in the manner of `std::fs::File`.
//!
//! Packing proceeds in chunks of 0x3000 bytes.  The match finder's window carries
//! over from one chunk to the next, but no match crosses a chunk boundary.

use std::io::{Cursor,Read,Write,Seek,SeekFrom};
use std::path::Path;
use crate::{Error,Method,Options};
use crate::header::{self,Header,HEADER_SIZE,MAX_SIZE};
use crate::tools::bit_io::{BitOrder,BitReader,BitWriter};
use crate::tools::crc16::crc16;
use crate::tools::match_finder::MatchFinder;
use crate::tools::window::OutputWindow;
use crate::{method1,method2};

const CHUNK_SIZE: usize = 0x3000;

/// An archive located by `search`
#[derive(Clone,Debug,PartialEq,Eq)]
pub struct Found {
    /// position of the signature in the searched buffer
    pub offset: usize,
    pub packed_size: usize,
    pub unpacked_size: usize,
    /// the unpacked data, if extraction was requested
    pub data: Option<Vec<u8>>
}

impl Found {
    /// header plus payload
    pub fn total_size(&self) -> usize {
        HEADER_SIZE + self.packed_size
    }
}

/// parameters that differ between the methods
struct Profile {
    ord: BitOrder,
    max_dict: usize,
    max_match: usize,
    short_reach: usize,
    leeway_bias: isize
}

fn profile(method: Method) -> Profile {
    match method {
        Method::Huffman => Profile {
            ord: BitOrder::Lsb0,
            max_dict: method1::MAX_DICT,
            max_match: method1::MAX_MATCH,
            short_reach: usize::MAX,
            leeway_bias: 0
        },
        Method::Fast => Profile {
            ord: BitOrder::Msb0,
            max_dict: method2::MAX_DICT,
            max_match: method2::MAX_MATCH,
            short_reach: method2::SHORT_REACH,
            leeway_bias: 2
        }
    }
}

/// Pack the whole buffer, offsets in `opt` are not used here
fn pack_buf(slice: &[u8],opt: &Options) -> Result<Vec<u8>,Error> {
    if slice.len() <= HEADER_SIZE {
        return Err(Error::TooSmall);
    }
    if slice.len() > MAX_SIZE {
        return Err(Error::TooLarge);
    }
    if header::is_packed(slice) {
        return Err(Error::AlreadyPacked);
    }
    let prof = profile(opt.method);
    let dict_size = match opt.dict_size {
        0 => prof.max_dict,
        n if n > prof.max_dict => prof.max_dict,
        n => n
    };
    log::debug!("pack {} bytes with {:?}, dictionary {}",slice.len(),opt.method,dict_size);
    let limit = match opt.strict_size {
        true => Some(slice.len() - HEADER_SIZE),
        false => None
    };
    let mut w = BitWriter::new(prof.ord,limit);
    w.put_bit(opt.lock);
    w.put_bit(opt.key != 0);
    let mut finder = MatchFinder::new(dict_size,prof.max_match,prof.short_reach);
    let mut key = opt.key;
    let mut pos = 0;
    let mut chunks: usize = 0;
    let mut max_gap: isize = 0;
    while pos < slice.len() {
        let end = usize::min(pos + CHUNK_SIZE,slice.len());
        let tokens = finder.parse_chunk(slice,pos,end);
        log::debug!("chunk {} at {} has {} tokens",chunks,pos,tokens.len());
        match opt.method {
            Method::Huffman => method1::encode_chunk(&mut w,slice,pos,&tokens,&mut key),
            Method::Fast => method2::encode_chunk(&mut w,slice,pos,&tokens,&mut key,end == slice.len())
        }
        pos = end;
        chunks += 1;
        max_gap = isize::max(max_gap,pos as isize - w.len() as isize);
        if w.exceeded() {
            log::warn!("packed data would not be smaller than {} bytes",slice.len());
            return Err(Error::NoGain);
        }
    }
    let payload = w.finish();
    let leeway = max_gap - (slice.len() as isize - payload.len() as isize) + prof.leeway_bias;
    let hdr = Header {
        method: opt.method,
        unpacked_size: slice.len() as u32,
        packed_size: payload.len() as u32,
        unpacked_crc: crc16(slice),
        packed_crc: crc16(&payload),
        leeway: leeway.clamp(0,255) as u8,
        chunk_count: (chunks & 0xff) as u8
    };
    log::debug!("packed into {} bytes, leeway {}, {} chunks",payload.len(),hdr.leeway,chunks);
    let mut ans = hdr.to_bytes().to_vec();
    ans.extend_from_slice(&payload);
    Ok(ans)
}

/// Unpack the archive at the start of the buffer, anything after the archive is ignored.
/// Offsets in `opt` are not used here.
fn unpack_buf(slice: &[u8],opt: &Options) -> Result<Vec<u8>,Error> {
    if slice.len() <= HEADER_SIZE {
        return Err(Error::TooSmall);
    }
    let hdr = Header::parse(slice)?;
    hdr.validate(slice.len())?;
    log::debug!("{:?} archive, {} bytes packed, {} unpacked",hdr.method,hdr.packed_size,hdr.unpacked_size);
    let payload = &slice[HEADER_SIZE..hdr.total_size()];
    let actual = crc16(payload);
    if actual != hdr.packed_crc {
        return Err(Error::PackedCrc { expected: hdr.packed_crc, actual });
    }
    let prof = profile(hdr.method);
    let mut r = BitReader::new(prof.ord,payload);
    if r.get_bit() {
        return Err(Error::Locked);
    }
    let mut key = match (r.get_bit(),opt.key) {
        (true,0) => return Err(Error::KeyRequired),
        (true,k) => k,
        (false,_) => 0
    };
    let mut win = OutputWindow::new(prof.max_dict,hdr.unpacked_size as usize);
    let chunks = match hdr.method {
        Method::Huffman => method1::decode(&mut r,&mut win,&mut key)?,
        Method::Fast => method2::decode(&mut r,&mut win,&mut key)?
    };
    if chunks & 0xff != hdr.chunk_count as usize {
        log::debug!("decoded {} chunks, header says {}",chunks,hdr.chunk_count);
    }
    let (ans,actual) = win.finish();
    if ans.len() != hdr.unpacked_size as usize {
        log::debug!("unpacked {} bytes, header says {}",ans.len(),hdr.unpacked_size);
        return Err(Error::Corrupt);
    }
    if actual != hdr.unpacked_crc {
        return Err(Error::UnpackedCrc { expected: hdr.unpacked_crc, actual });
    }
    Ok(ans)
}

fn read_from<R: Read + Seek>(src: &mut R,offset: u64) -> Result<Vec<u8>,Error> {
    let len = src.seek(SeekFrom::End(0))?;
    if offset > len {
        return Err(Error::BadOffset);
    }
    src.seek(SeekFrom::Start(offset))?;
    let mut ans = Vec::new();
    src.read_to_end(&mut ans)?;
    Ok(ans)
}

fn write_at<W: Write + Seek>(dst: &mut W,offset: u64,buf: &[u8]) -> Result<(),Error> {
    dst.seek(SeekFrom::Start(offset))?;
    dst.write_all(buf)?;
    dst.flush()?;
    Ok(())
}

/// Pack everything from `opt.in_offset` to the end of `unpacked_in`, writing
/// the archive at `opt.out_offset` in `packed_out`.
/// `unpacked_in` is usually `std::fs::File` or `std::io::Cursor<&[u8]>`.
/// `packed_out` is usually `std::fs::File` or `std::io::Cursor<Vec<u8>>`.
/// Returns (in_size,out_size).
pub fn pack<R,W>(unpacked_in: &mut R,packed_out: &mut W,opt: &Options) -> Result<(u64,u64),Error>
where R: Read + Seek, W: Write + Seek {
    let src = read_from(unpacked_in,opt.in_offset)?;
    let ans = pack_buf(&src,opt)?;
    write_at(packed_out,opt.out_offset,&ans)?;
    Ok((src.len() as u64,ans.len() as u64))
}

/// Unpack the archive found at `opt.in_offset` of `packed_in`, writing the data
/// at `opt.out_offset` in `unpacked_out`.
/// Returns (in_size,out_size), where in_size counts only the archive.
pub fn unpack<R,W>(packed_in: &mut R,unpacked_out: &mut W,opt: &Options) -> Result<(u64,u64),Error>
where R: Read + Seek, W: Write + Seek {
    let src = read_from(packed_in,opt.in_offset)?;
    let ans = unpack_buf(&src,opt)?;
    let in_size = Header::parse(&src)?.total_size();
    write_at(unpacked_out,opt.out_offset,&ans)?;
    Ok((in_size as u64,ans.len() as u64))
}

/// Scan `slice` from `opt.in_offset` for archives that unpack cleanly.
/// Overlapping candidates inside a good archive are skipped.
pub fn search(slice: &[u8],opt: &Options,extract: bool) -> Result<Vec<Found>,Error> {
    let mut ans = Vec::new();
    let mut pos = opt.in_offset as usize;
    if pos > slice.len() {
        return Err(Error::BadOffset);
    }
    while pos + HEADER_SIZE <= slice.len() {
        if !header::is_packed(&slice[pos..]) {
            pos += 1;
            continue;
        }
        match unpack_buf(&slice[pos..],opt) {
            Ok(dat) => {
                let hdr = Header::parse(&slice[pos..])?;
                let found = Found {
                    offset: pos,
                    packed_size: hdr.packed_size as usize,
                    unpacked_size: dat.len(),
                    data: match extract {
                        true => Some(dat),
                        false => None
                    }
                };
                log::debug!("archive at {:06X}, {} bytes",pos,found.total_size());
                pos += usize::max(found.total_size(),1);
                ans.push(found);
            },
            Err(e) => {
                log::warn!("candidate at {:06X} rejected: {}",pos,e);
                pos += 1;
            }
        }
    }
    match ans.len() {
        0 => Err(Error::NotFound),
        _ => Ok(ans)
    }
}

/// Pack `slice` starting from `opt.in_offset`, returning the archive preceded
/// by `opt.out_offset` zeros.
pub fn pack_slice(slice: &[u8],opt: &Options) -> Result<Vec<u8>,Error> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    pack(&mut src,&mut ans,opt)?;
    Ok(ans.into_inner())
}

/// Unpack the archive at `opt.in_offset` of `slice`, returning the data preceded
/// by `opt.out_offset` zeros.  The key in `opt` is used only if the archive is encrypted.
pub fn unpack_slice(slice: &[u8],opt: &Options) -> Result<Vec<u8>,Error> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    unpack(&mut src,&mut ans,opt)?;
    Ok(ans.into_inner())
}

/// Search and save each archive's data to `dir/data_{offset}.bin`, the offset in hex.
pub fn search_and_save(slice: &[u8],opt: &Options,dir: &Path) -> Result<Vec<Found>,Error> {
    let ans = search(slice,opt,true)?;
    for found in &ans {
        let path = dir.join(format!("data_{:06X}.bin",found.offset));
        let dat = found.data.as_deref().unwrap_or_default();
        if let Err(source) = std::fs::write(&path,dat) {
            return Err(Error::Extract { path: path.display().to_string(), source });
        }
    }
    Ok(ans)
}

#[cfg(test)]
const SAM: &str = "I am Sam. Sam I am. I do not like this Sam I am.\n";

#[test]
fn known_method2_zeros() {
    let opt = Options { method: Method::Fast, ..crate::STD_OPTIONS };
    let ans = pack_slice(&[0;100],&opt).expect("pack failed");
    assert_eq!(hex::encode(&ans),"524e4302000000640000000600009a5402011e005b00f000");
    assert_eq!(unpack_slice(&ans,&opt).expect("unpack failed"),vec![0;100]);
}

#[test]
fn known_method1_text() {
    let ans = pack_slice(SAM.as_bytes(),&crate::STD_OPTIONS).expect("pack failed");
    assert_eq!(hex::encode(&ans),
        "524e4301000000310000002e2727f6f2000118081010033031526602c40020774920616d205380172e202efa10646f206e6f74206c696b65207468697307000a");
    assert_eq!(unpack_slice(&ans,&crate::STD_OPTIONS).expect("unpack failed"),SAM.as_bytes().to_vec());
}

#[test]
fn known_method2_text() {
    let opt = Options { method: Method::Fast, ..crate::STD_OPTIONS };
    let ans = pack_slice(SAM.as_bytes(),&opt).expect("pack failed");
    assert_eq!(hex::encode(&ans),
        "524e43020000003100000028272764460201004920616d2053c8032e2004200d2ee505c7646f206e6f74206c696b652074686973cf021c0a0000");
    assert_eq!(unpack_slice(&ans,&opt).expect("unpack failed"),SAM.as_bytes().to_vec());
}

#[test]
fn stream_offsets() {
    let mut padded = vec![0xa5;10];
    padded.extend_from_slice(SAM.repeat(4).as_bytes());
    let direct = pack_slice(&padded[10..],&crate::STD_OPTIONS).expect("pack failed");
    let mut src = Cursor::new(&padded[..]);
    let mut out: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    let opt = Options { in_offset: 10, ..crate::STD_OPTIONS };
    assert_eq!(pack(&mut src,&mut out,&opt).expect("pack failed"),((SAM.len() * 4) as u64,direct.len() as u64));
    assert_eq!(out.into_inner(),direct);

    let mut src = Cursor::new(direct.clone());
    let mut out: Cursor<Vec<u8>> = Cursor::new(vec![0xff;3]);
    let opt = Options { out_offset: 3, ..crate::STD_OPTIONS };
    let (in_size,out_size) = unpack(&mut src,&mut out,&opt).expect("unpack failed");
    assert_eq!(in_size,direct.len() as u64);
    assert_eq!(out_size,(SAM.len() * 4) as u64);
    let out = out.into_inner();
    assert_eq!(&out[0..3],&[0xff,0xff,0xff]);
    assert_eq!(&out[3..],SAM.repeat(4).as_bytes());

    let opt = Options { in_offset: 1000, ..crate::STD_OPTIONS };
    let mut src = Cursor::new(&padded[..]);
    let mut out: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    assert!(matches!(pack(&mut src,&mut out,&opt),Err(Error::BadOffset)));
}

#[test]
fn slice_offsets() {
    let mut padded = vec![0xa5;10];
    padded.extend_from_slice(SAM.repeat(4).as_bytes());
    let direct = pack_slice(&padded[10..],&crate::STD_OPTIONS).expect("pack failed");
    let opt = Options { in_offset: 10, ..crate::STD_OPTIONS };
    assert_eq!(pack_slice(&padded,&opt).expect("pack failed"),direct);

    let opt = Options { out_offset: 5, ..crate::STD_OPTIONS };
    let shifted = pack_slice(&padded[10..],&opt).expect("pack failed");
    assert_eq!(&shifted[0..5],&[0;5]);
    assert_eq!(&shifted[5..],&direct[..]);

    // archive buried after 7 bytes, data wanted after 2
    let mut buried = vec![0x11;7];
    buried.extend_from_slice(&direct);
    let opt = Options { in_offset: 7, out_offset: 2, ..crate::STD_OPTIONS };
    let ans = unpack_slice(&buried,&opt).expect("unpack failed");
    assert_eq!(&ans[0..2],&[0,0]);
    assert_eq!(&ans[2..],SAM.repeat(4).as_bytes());

    let opt = Options { in_offset: padded.len() as u64 + 1, ..crate::STD_OPTIONS };
    assert!(matches!(pack_slice(&padded,&opt),Err(Error::BadOffset)));
    assert!(matches!(unpack_slice(&buried,&opt),Err(Error::BadOffset)));
}

#[test]
fn strict_size() {
    // bytes from a simple generator do not compress
    let mut x: u32 = 1;
    let noise: Vec<u8> = (0..1000).map(|_| {
        x = x.wrapping_mul(1103515245).wrapping_add(12345);
        (x >> 16) as u8
    }).collect();
    let opt = Options { strict_size: true, ..crate::STD_OPTIONS };
    assert!(matches!(pack_slice(&noise,&opt),Err(Error::NoGain)));
    let ans = pack_slice(&noise,&crate::STD_OPTIONS).expect("pack failed");
    assert!(ans.len() > noise.len());
    assert_eq!(unpack_slice(&ans,&crate::STD_OPTIONS).expect("unpack failed"),noise);
}
