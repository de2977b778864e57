//! Fixed-capacity buffer of candidate document ids
//!
//! Entry sources fill the buffer with a batch of ids; filter steps then walk
//! it with a read cursor and compact survivors towards the front with a write
//! cursor, in place. `finalize_filtering` shrinks the logical end to the
//! survivors.

#[derive(Debug)]
pub struct LongQueryBuffer {
    data: Vec<u64>,
    end: usize,
    read: usize,
    write: usize,
}

impl LongQueryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            end: 0,
            read: 0,
            write: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Empty the buffer for the next fill
    pub fn reset(&mut self) {
        self.end = 0;
        self.read = 0;
        self.write = 0;
    }

    pub fn len(&self) -> usize {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end == 0
    }

    pub fn is_full(&self) -> bool {
        self.end == self.data.len()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.data[..self.end]
    }

    pub fn copy_data(&self) -> Vec<u64> {
        self.as_slice().to_vec()
    }

    /// Append one value; returns false when the buffer is full
    #[inline]
    pub fn push(&mut self, value: u64) -> bool {
        if self.end >= self.data.len() {
            return false;
        }
        self.data[self.end] = value;
        self.end += 1;
        true
    }

    // -- filtering cursor --

    #[inline]
    pub fn has_more(&self) -> bool {
        self.read < self.end
    }

    #[inline]
    pub fn current_value(&self) -> u64 {
        self.data[self.read]
    }

    /// Keep the current value and advance
    #[inline]
    pub fn retain_and_advance(&mut self) -> bool {
        if self.read != self.write {
            self.data.swap(self.read, self.write);
        }
        self.write += 1;
        self.read += 1;
        self.read < self.end
    }

    /// Drop the current value and advance
    #[inline]
    pub fn reject_and_advance(&mut self) -> bool {
        self.read += 1;
        self.read < self.end
    }

    /// Keep every value not yet visited
    pub fn retain_all(&mut self) {
        while self.has_more() {
            self.retain_and_advance();
        }
    }

    /// Drop every value not yet visited
    pub fn reject_all(&mut self) {
        self.read = self.end;
    }

    /// Commit the survivors of the current filtering pass
    pub fn finalize_filtering(&mut self) {
        self.end = self.write;
        self.read = 0;
        self.write = 0;
    }

    /// Apply a predicate as one complete filtering pass
    pub fn retain_where(&mut self, mut keep: impl FnMut(u64) -> bool) {
        while self.has_more() {
            if keep(self.current_value()) {
                self.retain_and_advance();
            } else {
                self.reject_and_advance();
            }
        }
        self.finalize_filtering();
    }

    /// Sort and drop duplicates
    pub fn sort_unique(&mut self) {
        let slice = &mut self.data[..self.end];
        slice.sort_unstable();
        let mut w = 0;
        for r in 0..slice.len() {
            if r == 0 || slice[r] != slice[w - 1] {
                slice[w] = slice[r];
                w += 1;
            }
        }
        self.end = w;
        self.read = 0;
        self.write = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_pass() {
        let mut buf = LongQueryBuffer::new(8);
        for v in [1, 2, 3, 4, 5, 6] {
            assert!(buf.push(v));
        }
        buf.retain_where(|v| v % 2 == 0);
        assert_eq!(buf.as_slice(), &[2, 4, 6]);
    }

    #[test]
    fn test_capacity_bound() {
        let mut buf = LongQueryBuffer::new(2);
        assert!(buf.push(1));
        assert!(buf.push(2));
        assert!(!buf.push(3));
        assert!(buf.is_full());
        buf.reset();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_manual_cursor() {
        let mut buf = LongQueryBuffer::new(4);
        for v in [10, 20, 30, 40] {
            buf.push(v);
        }
        buf.reject_and_advance();
        buf.retain_and_advance();
        buf.retain_all();
        buf.finalize_filtering();
        assert_eq!(buf.as_slice(), &[20, 30, 40]);
    }

    #[test]
    fn test_sort_unique() {
        let mut buf = LongQueryBuffer::new(8);
        for v in [5, 1, 5, 3, 1] {
            buf.push(v);
        }
        buf.sort_unique();
        assert_eq!(buf.as_slice(), &[1, 3, 5]);
    }
}
