//! Ring buffer addressed by absolute stream position.
//! The match finder keeps its chain links here, one slot per window position.
use num_traits::PrimInt;

pub struct RingBuffer<T: PrimInt> {
    buf: Vec<T>,
    n: usize
}

impl <T: PrimInt> RingBuffer<T> {
    pub fn create(fill: T,n: usize) -> Self {
        Self {
            buf: vec![fill;n],
            n
        }
    }
    /// value stored for absolute position `abs`
    pub fn get(&self,abs: usize) -> T {
        self.buf[abs % self.n]
    }
    /// store a value for absolute position `abs`, overwriting whatever
    /// position shared the slot one lap earlier
    pub fn set(&mut self,abs: usize,val: T) {
        self.buf[abs % self.n] = val;
    }
}

#[test]
fn wraps_by_position() {
    let mut ring: RingBuffer<u32> = RingBuffer::create(u32::MAX,4);
    ring.set(1,10);
    ring.set(6,60);
    assert_eq!(ring.get(1),10);
    assert_eq!(ring.get(5),10);
    assert_eq!(ring.get(2),60);
    ring.set(9,90);
    assert_eq!(ring.get(1),90);
    assert_eq!(ring.get(3),u32::MAX);
}
