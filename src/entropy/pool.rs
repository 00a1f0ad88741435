use zeroize::Zeroize;

/// Buffer of not-yet-issued random bytes.
///
/// Only `EntropySource` owns one, behind a mutex. `take` removes bytes from
/// the front so a byte is handed out at most once.
pub(crate) struct RandomPool {
    bytes: Vec<u8>,
    capacity: usize,
}

impl RandomPool {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn free_space(&self) -> usize {
        self.capacity.saturating_sub(self.bytes.len())
    }

    /// Pop exactly `n` bytes, or nothing if the pool is short.
    pub(crate) fn take(&mut self, n: usize) -> Option<Vec<u8>> {
        if n > self.bytes.len() {
            return None;
        }
        Some(self.bytes.drain(..n).collect())
    }

    /// Append a fresh batch, discarding whatever does not fit.
    /// Returns the number of bytes kept.
    pub(crate) fn fill(&mut self, mut batch: Vec<u8>) -> usize {
        let keep = batch.len().min(self.free_space());
        self.bytes.extend_from_slice(&batch[..keep]);
        batch.zeroize();
        keep
    }

    pub(crate) fn clear(&mut self) {
        self.bytes.zeroize();
    }
}

impl Drop for RandomPool {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_is_exact_and_consuming() {
        let mut pool = RandomPool::new(8);
        pool.fill((0u8..8).collect());

        assert_eq!(pool.take(3), Some(vec![0, 1, 2]));
        assert_eq!(pool.take(3), Some(vec![3, 4, 5]));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_take_short_pool_leaves_it_untouched() {
        let mut pool = RandomPool::new(8);
        pool.fill(vec![7u8; 4]);

        assert!(pool.take(5).is_none());
        assert_eq!(pool.len(), 4);
    }

    #[test]
    fn test_fill_caps_at_capacity() {
        let mut pool = RandomPool::new(10);
        assert_eq!(pool.fill(vec![1u8; 6]), 6);
        assert_eq!(pool.fill(vec![2u8; 6]), 4);
        assert_eq!(pool.len(), 10);
        assert_eq!(pool.free_space(), 0);
    }

    #[test]
    fn test_clear() {
        let mut pool = RandomPool::new(4);
        pool.fill(vec![9u8; 4]);
        pool.clear();
        assert_eq!(pool.len(), 0);
        assert_eq!(pool.free_space(), 4);
    }
}
