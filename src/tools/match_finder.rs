//! Sliding window match finder.
//!
//! Every position in the window is linked into a chain of earlier positions that
//! start with the same two bytes.  The head of each chain is found by direct lookup
//! on those two bytes.  Links are kept in both directions so that the position
//! falling out of the window can be unlinked without walking its chain.

use super::ring_buffer::RingBuffer;

const NIL: u32 = u32::MAX;
const NUM_KEYS: usize = 0x10000;
/// most candidates examined for one position
const MAX_CHAIN: usize = 0x100;
/// a match this long ends the search, and is taken without looking one byte ahead
const NICE_LEN: usize = 64;
/// shortest match worth coding
pub const MIN_MATCH: usize = 2;

#[derive(Clone,Copy,Debug,Default,PartialEq,Eq)]
pub struct Match {
    /// distance back to the source of the copy, 1 is the previous byte
    pub offset: usize,
    pub len: usize
}

/// A run of literals, followed by a match unless this is the end of the chunk
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub struct Token {
    pub run: usize,
    pub copy: Option<Match>
}

pub struct MatchFinder {
    dict_size: usize,
    max_len: usize,
    /// largest offset a match of `MIN_MATCH` bytes can use
    short_reach: usize,
    /// most recent position for each 2 byte key
    head: Vec<u32>,
    /// for each position in the window, the previous position with the same key
    older: RingBuffer<u32>,
    /// for each position in the window, the next position with the same key
    newer: RingBuffer<u32>
}

fn key(data: &[u8],pos: usize) -> usize {
    ((data[pos] as usize) << 8) | data[pos+1] as usize
}

impl MatchFinder {
    pub fn new(dict_size: usize,max_len: usize,short_reach: usize) -> Self {
        Self {
            dict_size,
            max_len,
            short_reach,
            head: vec![NIL;NUM_KEYS],
            older: RingBuffer::create(NIL,dict_size),
            newer: RingBuffer::create(NIL,dict_size)
        }
    }
    /// Index position `pos`.  Positions must be inserted in order, without gaps.
    pub fn insert(&mut self,data: &[u8],pos: usize) {
        if pos + 1 >= data.len() {
            return;
        }
        if pos >= self.dict_size {
            // the oldest position is always the tail of its chain
            let tail = pos - self.dict_size;
            match self.newer.get(tail) {
                NIL => {
                    let k = key(data,tail);
                    if self.head[k] == tail as u32 {
                        self.head[k] = NIL;
                    }
                },
                next => self.older.set(next as usize,NIL)
            }
        }
        let k = key(data,pos);
        let prev = self.head[k];
        self.older.set(pos,prev);
        self.newer.set(pos,NIL);
        if prev != NIL {
            self.newer.set(prev as usize,pos as u32);
        }
        self.head[k] = pos as u32;
    }
    /// Find the longest match for the bytes at `pos`, not reaching `end` or beyond.
    /// Returns a match with `len` 0 if there is none.
    pub fn find(&self,data: &[u8],pos: usize,end: usize) -> Match {
        let mut best = Match::default();
        if pos + 1 >= end {
            return best;
        }
        let limit = usize::min(self.max_len,end - pos);
        let mut curs = self.head[key(data,pos)];
        let mut examined = 0;
        while curs != NIL && examined < MAX_CHAIN {
            let cand = curs as usize;
            let offset = pos - cand;
            if offset > self.dict_size {
                break;
            }
            let mut len = 0;
            while len < limit && data[cand+len] == data[pos+len] {
                len += 1;
            }
            if len > best.len && (len > MIN_MATCH || offset <= self.short_reach) {
                best = Match { offset, len };
                if len >= limit || len >= NICE_LEN {
                    break;
                }
            }
            curs = self.older.get(cand);
            examined += 1;
        }
        best
    }
    /// Split `data[start..end]` into tokens, using lazy matching: a match is
    /// deferred by one byte if the match at the next byte is longer.
    /// Matches of `NICE_LEN` or more are never deferred.
    pub fn parse_chunk(&mut self,data: &[u8],start: usize,end: usize) -> Vec<Token> {
        let mut ans = Vec::new();
        let mut pos = start;
        let mut run = 0;
        let mut pending: Option<Match> = None;
        while pos < end {
            let here = match pending.take() {
                Some(m) => m,
                None => self.find(data,pos,end)
            };
            self.insert(data,pos);
            if here.len < MIN_MATCH {
                pos += 1;
                run += 1;
                continue;
            }
            if pos + 1 < end && here.len < NICE_LEN {
                let ahead = self.find(data,pos+1,end);
                if ahead.len > here.len {
                    log::trace!("defer match of {} at {} for {}",here.len,pos,ahead.len);
                    pending = Some(ahead);
                    pos += 1;
                    run += 1;
                    continue;
                }
            }
            log::trace!("{} literals, then copy {} from {} back",run,here.len,here.offset);
            ans.push(Token { run, copy: Some(here) });
            run = 0;
            for p in pos+1..pos+here.len {
                self.insert(data,p);
            }
            pos += here.len;
        }
        ans.push(Token { run, copy: None });
        ans
    }
}

/// Rebuild the chunk from its tokens, for checking a parse
#[cfg(test)]
fn replay(data: &[u8],start: usize,tokens: &[Token]) -> Vec<u8> {
    let mut ans: Vec<u8> = data[0..start].to_vec();
    let mut pos = start;
    for t in tokens {
        ans.extend_from_slice(&data[pos..pos+t.run]);
        pos += t.run;
        if let Some(m) = t.copy {
            for _i in 0..m.len {
                ans.push(ans[ans.len()-m.offset]);
            }
            pos += m.len;
        }
    }
    ans[start..].to_vec()
}

#[test]
fn finds_repeats() {
    let data = "12345123456789123456789\n".as_bytes();
    let mut finder = MatchFinder::new(0x8000,0x1000,usize::MAX);
    let tokens = finder.parse_chunk(data,0,data.len());
    assert_eq!(tokens[0],Token { run: 5, copy: Some(Match { offset: 5, len: 5 }) });
    assert_eq!(tokens[1],Token { run: 4, copy: Some(Match { offset: 9, len: 9 }) });
    assert_eq!(tokens[2],Token { run: 1, copy: None });
    assert_eq!(replay(data,0,&tokens),data.to_vec());
}

#[test]
fn lazy_match() {
    // at "abcd" the best match is "ab" (2), one byte later "bcde" (4) is available
    let data = "abxxbcdeyyabcdezz".as_bytes();
    let mut finder = MatchFinder::new(0x8000,0x1000,usize::MAX);
    let tokens = finder.parse_chunk(data,0,data.len());
    assert_eq!(tokens[0],Token { run: 11, copy: Some(Match { offset: 7, len: 4 }) });
    assert_eq!(replay(data,0,&tokens),data.to_vec());
}

#[test]
fn window_eviction() {
    // period 7 pattern with a window of 4, no match can reach back far enough
    let data: Vec<u8> = (0..200).map(|i| (i % 7) as u8).collect();
    let mut finder = MatchFinder::new(4,0x1000,usize::MAX);
    let tokens = finder.parse_chunk(&data,0,data.len());
    assert_eq!(tokens.len(),1);
    assert_eq!(tokens[0].run,200);
    // window of 8 finds the period
    let mut finder = MatchFinder::new(8,0x1000,usize::MAX);
    let tokens = finder.parse_chunk(&data,0,data.len());
    assert_eq!(tokens[0],Token { run: 7, copy: Some(Match { offset: 7, len: 193 }) });
}

#[test]
fn short_match_reach() {
    // "qr" repeats 257 bytes later, every other byte pair is unique
    let mut data = vec![b'q',b'r'];
    data.extend((0..=255u8).filter(|b| *b != b'q' && *b != b'r'));
    data.extend_from_slice(&[0x00,b'q',b'r',b's']);
    let mut finder = MatchFinder::new(0x1000,255,256);
    let tokens = finder.parse_chunk(&data,0,data.len());
    assert_eq!(tokens.len(),1);
    let mut finder = MatchFinder::new(0x1000,255,usize::MAX);
    let tokens = finder.parse_chunk(&data,0,data.len());
    assert_eq!(tokens[0],Token { run: 257, copy: Some(Match { offset: 257, len: 2 }) });
}

#[test]
fn chunks_continue_window() {
    let data = "the cat sat on the mat, the cat sat on the hat".as_bytes();
    let mut finder = MatchFinder::new(0x8000,0x1000,usize::MAX);
    let first = finder.parse_chunk(data,0,20);
    let second = finder.parse_chunk(data,20,data.len());
    assert_eq!(replay(data,0,&first),data[0..20].to_vec());
    assert_eq!(replay(data,20,&second),data[20..].to_vec());
    assert!(second.iter().any(|t| t.copy.map_or(false,|m| m.len > 10)));
}

#[test]
fn low_entropy_chains() {
    // low entropy data fills every chain, the walk has to stop at MAX_CHAIN
    let mut x: u32 = 5;
    let data: Vec<u8> = (0..0x6000).map(|_| {
        x = x.wrapping_mul(1103515245).wrapping_add(12345);
        ((x >> 16) & 1) as u8
    }).collect();
    let mut finder = MatchFinder::new(0x8000,0x1000,usize::MAX);
    let mut start = 0;
    while start < data.len() {
        let end = usize::min(start + 0x3000,data.len());
        let tokens = finder.parse_chunk(&data,start,end);
        assert_eq!(replay(&data,start,&tokens),data[start..end].to_vec());
        start = end;
    }
}

#[test]
fn nice_match_not_deferred() {
    // "abcdefgh" repeated: the match at the second copy is long enough to take at once
    let data = "abcdefgh".repeat(20);
    let mut finder = MatchFinder::new(0x8000,0x1000,usize::MAX);
    let tokens = finder.parse_chunk(data.as_bytes(),0,data.len());
    assert_eq!(tokens[0],Token { run: 8, copy: Some(Match { offset: 8, len: 152 }) });
    assert_eq!(tokens[1],Token { run: 0, copy: None });
}
