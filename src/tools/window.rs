//! Output window for unpacking.
//!
//! Decoded bytes collect in a 64K window.  When it fills up, everything but the
//! last `dict_size` bytes moves to the final output, since matches cannot reach
//! farther back than that.  The CRC of the output is kept as bytes are produced.

use super::crc16::Crc16;
use crate::Error;

pub const WINDOW_SIZE: usize = 0x10000;

pub struct OutputWindow {
    buf: Vec<u8>,
    dict_size: usize,
    out: Vec<u8>,
    crc: Crc16,
    total: usize,
    /// declared size of the output, producing more is an error
    limit: usize
}

impl OutputWindow {
    pub fn new(dict_size: usize,limit: usize) -> Self {
        Self {
            buf: Vec::with_capacity(WINDOW_SIZE),
            dict_size,
            out: Vec::with_capacity(limit),
            crc: Crc16::new(),
            total: 0,
            limit
        }
    }
    /// number of bytes produced so far
    pub fn total(&self) -> usize {
        self.total
    }
    /// true once the declared size has been produced
    pub fn is_full(&self) -> bool {
        self.total >= self.limit
    }
    pub fn push(&mut self,b: u8) -> Result<(),Error> {
        if self.total >= self.limit {
            log::debug!("output overruns declared size {}",self.limit);
            return Err(Error::Corrupt);
        }
        if self.buf.len() == WINDOW_SIZE {
            let keep = WINDOW_SIZE - self.dict_size;
            self.out.extend(self.buf.drain(0..keep));
        }
        self.buf.push(b);
        self.crc.update_byte(b);
        self.total += 1;
        Ok(())
    }
    /// Copy `len` bytes starting `offset` bytes back, the source can overlap the copy
    pub fn copy(&mut self,offset: usize,len: usize) -> Result<(),Error> {
        if offset == 0 || offset > self.buf.len() {
            log::debug!("match offset {} reaches outside the window",offset);
            return Err(Error::Corrupt);
        }
        for _i in 0..len {
            let b = self.buf[self.buf.len() - offset];
            self.push(b)?;
        }
        Ok(())
    }
    /// Return the output and its CRC
    pub fn finish(mut self) -> (Vec<u8>,u16) {
        self.out.append(&mut self.buf);
        (self.out,self.crc.value())
    }
}

#[test]
fn overlapping_copy() {
    let mut win = OutputWindow::new(0x1000,9);
    win.push(b'a').unwrap();
    win.push(b'b').unwrap();
    win.copy(2,7).unwrap();
    assert!(win.copy(1,2).is_err());
    let (out,crc) = win.finish();
    assert_eq!(out,"ababababa".as_bytes().to_vec());
    assert_eq!(crc,super::crc16::crc16(&out));
}

#[test]
fn flushes_and_keeps_history() {
    let dict_size = 0x1000;
    let n = 3 * WINDOW_SIZE + 17;
    let mut win = OutputWindow::new(dict_size,n);
    for i in 0..dict_size {
        win.push((i % 251) as u8).unwrap();
    }
    // repeat the pattern with matches that span the flush points
    while win.total() < n {
        let len = usize::min(200,n - win.total());
        win.copy(dict_size,len).unwrap();
    }
    let (out,_) = win.finish();
    assert_eq!(out.len(),n);
    for i in 0..n {
        assert_eq!(out[i],((i % dict_size) % 251) as u8);
    }
}

#[test]
fn rejects_bad_offsets() {
    let mut win = OutputWindow::new(0x1000,100);
    assert!(win.copy(1,1).is_err());
    win.push(1).unwrap();
    assert!(win.copy(0,1).is_err());
    assert!(win.copy(2,1).is_err());
}
