/// Seeded xorshift64 generator used for row subsampling, so that training
/// the same dataset twice yields identical ensembles.
#[derive(Debug, Clone)]
pub(crate) struct DetRng {
    state: u64,
}

impl DetRng {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform value in `[0, bound)` via rejection sampling.
    pub(crate) fn next_below(&mut self, bound: usize) -> usize {
        debug_assert!(bound > 0);
        let bound = bound as u64;
        let threshold = u64::MAX - (u64::MAX % bound);
        loop {
            let value = self.next_u64();
            if value < threshold {
                return (value % bound) as usize;
            }
        }
    }

    /// In-bag mask with exactly `k` of `n` rows selected (partial Fisher-Yates).
    pub(crate) fn sample_mask(&mut self, n: usize, k: usize) -> Vec<bool> {
        let k = k.min(n);
        let mut indices: Vec<usize> = (0..n).collect();
        for i in 0..k {
            let j = i + self.next_below(n - i);
            indices.swap(i, j);
        }

        let mut mask = vec![false; n];
        for &index in &indices[..k] {
            mask[index] = true;
        }
        mask
    }
}
