use bytes::{Buf, BytesMut};

/// Input bytes received but not yet consumed by a parse stage.
///
/// Chunks are appended as they arrive, so a header, length, mask key or
/// payload split across reads is reassembled here.
#[derive(Debug, Default)]
pub struct ByteAccumulator {
    buf: BytesMut,
}

impl ByteAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    pub fn available(&self) -> usize {
        self.buf.len()
    }

    /// Splits off exactly `n` bytes, or returns `None` and leaves the buffer
    /// untouched if fewer are available.
    pub fn take(&mut self, n: usize) -> Option<BytesMut> {
        if self.buf.len() < n {
            return None;
        }
        Some(self.buf.split_to(n))
    }

    pub fn take_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        if self.buf.len() < N {
            return None;
        }
        let mut out = [0u8; N];
        self.buf.copy_to_slice(&mut out);
        Some(out)
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_until_enough_bytes() {
        let mut acc = ByteAccumulator::new();
        acc.push(&[1, 2, 3]);
        assert_eq!(acc.take_array::<4>(), None);
        assert_eq!(acc.available(), 3);

        acc.push(&[4, 5]);
        assert_eq!(acc.take_array::<4>(), Some([1, 2, 3, 4]));
        assert_eq!(acc.available(), 1);
    }

    #[test]
    fn take_exact_and_remainder() {
        let mut acc = ByteAccumulator::new();
        acc.push(b"hello");
        acc.push(b"world");
        assert_eq!(acc.take(20), None);
        assert_eq!(&acc.take(7).unwrap()[..], b"hellowo");
        assert_eq!(&acc.take(3).unwrap()[..], b"rld");
        assert_eq!(acc.available(), 0);
        assert_eq!(acc.take(0).map(|b| b.len()), Some(0));
    }
}
