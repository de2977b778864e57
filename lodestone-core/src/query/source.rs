//! Entry sources: the producers of candidate document ids

use crate::structures::LongQueryBuffer;

/// A forward-only producer of ascending document ids.
///
/// Each call to [`EntrySource::read`] appends ids to the buffer until it is
/// full or the source is exhausted.
pub trait EntrySource: Send {
    fn read(&mut self, buffer: &mut LongQueryBuffer);

    fn has_more(&self) -> bool;

    /// Name of the index the source reads, for logging
    fn index_name(&self) -> &str;
}

impl EntrySource for Box<dyn EntrySource> {
    fn read(&mut self, buffer: &mut LongQueryBuffer) {
        (**self).read(buffer)
    }

    fn has_more(&self) -> bool {
        (**self).has_more()
    }

    fn index_name(&self) -> &str {
        (**self).index_name()
    }
}

/// Entry source over an in-memory id list
#[derive(Debug, Clone)]
pub struct VecEntrySource {
    ids: Vec<u64>,
    pos: usize,
}

impl VecEntrySource {
    /// `ids` is sorted and deduplicated on construction
    pub fn new(mut ids: Vec<u64>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self { ids, pos: 0 }
    }
}

impl EntrySource for VecEntrySource {
    fn read(&mut self, buffer: &mut LongQueryBuffer) {
        while self.pos < self.ids.len() && buffer.push(self.ids[self.pos]) {
            self.pos += 1;
        }
    }

    fn has_more(&self) -> bool {
        self.pos < self.ids.len()
    }

    fn index_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_source_batches() {
        let mut source = VecEntrySource::new(vec![5, 1, 3, 3, 9]);
        let mut buffer = LongQueryBuffer::new(3);
        source.read(&mut buffer);
        assert_eq!(buffer.as_slice(), &[1, 3, 5]);
        assert!(source.has_more());

        buffer.reset();
        source.read(&mut buffer);
        assert_eq!(buffer.as_slice(), &[9]);
        assert!(!source.has_more());
    }
}
