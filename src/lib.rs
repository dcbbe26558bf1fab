//! # RNC ProPack archives
//!
//! Pack, unpack, and carve archives in the RNC ("Rob Northen Compression") format
//! used by many games of the 16-bit era.  An archive is an 18 byte header followed
//! by an LZ77 payload that is entropy coded in one of two ways:
//!
//! * Method 1 builds three small Huffman tables for every chunk of input
//! * Method 2 uses fixed prefix codes and a smaller dictionary
//!
//! Both methods can optionally XOR the literal bytes with a rotating 16 bit key.
//! All the work is done on buffers, see `rnc::pack_slice` and `rnc::unpack_slice`,
//! with `rnc::search` available to find archives embedded in some larger image.

mod tools;
mod method1;
mod method2;
pub mod header;
pub mod rnc;

/// Errors that can occur while packing, unpacking, or searching
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("input is too small for an RNC archive")]
    TooSmall,
    #[error("input is already RNC packed")]
    AlreadyPacked,
    #[error("input is not RNC packed")]
    NotPacked,
    #[error("unknown compression method {0}")]
    UnknownMethod(u8),
    #[error("size exceeds the {} byte limit",header::MAX_SIZE)]
    TooLarge,
    #[error("packed size exceeds the available data")]
    Truncated,
    #[error("packed CRC mismatch, header {expected:04X}, computed {actual:04X}")]
    PackedCrc { expected: u16, actual: u16 },
    #[error("unpacked CRC mismatch, header {expected:04X}, computed {actual:04X}")]
    UnpackedCrc { expected: u16, actual: u16 },
    #[error("archive is locked and cannot be unpacked")]
    Locked,
    #[error("archive is encrypted, key required")]
    KeyRequired,
    #[error("no RNC archives were found")]
    NotFound,
    #[error("packed data is corrupt")]
    Corrupt,
    #[error("packing did not reduce the size")]
    NoGain,
    #[error("offset is beyond the end of the input")]
    BadOffset,
    #[error("could not save {path}: {source}")]
    Extract { path: String, source: std::io::Error },
    #[error(transparent)]
    Io(#[from] std::io::Error)
}

/// Compression method, the value is the byte that follows the signature
#[derive(num_derive::FromPrimitive,Clone,Copy,Debug,PartialEq,Eq)]
pub enum Method {
    /// LZ77 with per-chunk Huffman tables
    Huffman = 1,
    /// LZ77 with fixed prefix codes
    Fast = 2
}

/// Options controlling packing and unpacking.
/// When unpacking, the method, dictionary size, and lock flag are taken
/// from the archive rather than from here.
#[derive(Clone,Debug)]
pub struct Options {
    /// compression method used when packing
    pub method: Method,
    /// dictionary size, 0 or anything over the method's maximum selects the maximum
    pub dict_size: usize,
    /// key for literal encryption, 0 means no encryption
    pub key: u16,
    /// mark the archive as locked, it can be depacked by a game but not by this crate
    pub lock: bool,
    /// fail with `Error::NoGain` rather than produce an archive larger than the input
    pub strict_size: bool,
    /// starting position in the input file
    pub in_offset: u64,
    /// starting position in the output file
    pub out_offset: u64
}

pub const STD_OPTIONS: Options = Options {
    method: Method::Huffman,
    dict_size: 0,
    key: 0,
    lock: false,
    strict_size: false,
    in_offset: 0,
    out_offset: 0
};
