//! Synthetic payload generation.

use alloy_primitives::{B256, Bytes, keccak256};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{TestParams, kb_to_bytes};

/// Random content and its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    bytes: Bytes,
    hash: B256,
}

impl Payload {
    /// Wraps content, computing its keccak-256 digest.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let hash = keccak256(&bytes);
        Self { bytes, hash }
    }

    /// Raw content.
    pub const fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Content digest.
    pub const fn hash(&self) -> B256 {
        self.hash
    }

    /// Content length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the content is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Produces payloads whose sizes are uniform over the configured KB range.
#[derive(Debug)]
pub struct WorkloadGenerator {
    count: usize,
    min_kb: u64,
    max_kb: u64,
    rng: ChaCha8Rng,
}

impl WorkloadGenerator {
    /// Creates a generator seeded from OS entropy.
    pub fn new(params: &TestParams) -> Self {
        Self::with_rng(params, ChaCha8Rng::from_rng(&mut rand::rng()))
    }

    /// Creates a reproducible generator.
    pub fn seeded(params: &TestParams, seed: u64) -> Self {
        Self::with_rng(params, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(params: &TestParams, rng: ChaCha8Rng) -> Self {
        Self { count: params.file_nb, min_kb: params.min_size, max_kb: params.max_size, rng }
    }

    /// Generates `file_nb` payloads.
    pub fn generate(&mut self) -> Vec<Payload> {
        (0..self.count).map(|_| self.next_payload()).collect()
    }

    fn next_payload(&mut self) -> Payload {
        let kb = self.rng.random_range(self.min_kb..=self.max_kb);
        let mut data = vec![0u8; kb_to_bytes(kb)];
        self.rng.fill_bytes(&mut data);
        Payload::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_stay_within_bounds() {
        let params = TestParams::default().with_file_nb(50).with_size_range(1, 8);
        let (min, max) = params.byte_range();
        let payloads = WorkloadGenerator::seeded(&params, 9).generate();
        assert_eq!(payloads.len(), 50);
        for payload in &payloads {
            assert!((min..=max).contains(&payload.len()), "size {} out of range", payload.len());
            assert_eq!(payload.len() % 1024, 0);
        }
    }

    #[test]
    fn fixed_size_range_yields_fixed_sizes() {
        let params = TestParams::default().with_file_nb(4).with_size_range(10, 10);
        for payload in WorkloadGenerator::seeded(&params, 1).generate() {
            assert_eq!(payload.len(), 10 * 1024);
        }
    }

    #[test]
    fn hash_is_deterministic() {
        let a = Payload::new(vec![1, 2, 3]);
        let b = Payload::new(vec![1, 2, 3]);
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash(), keccak256([1u8, 2, 3]));
    }

    #[test]
    fn random_payloads_have_distinct_hashes() {
        let params = TestParams::default().with_file_nb(20).with_size_range(1, 1);
        let payloads = WorkloadGenerator::new(&params).generate();
        let hashes: std::collections::HashSet<_> = payloads.iter().map(Payload::hash).collect();
        assert_eq!(hashes.len(), payloads.len());
    }
}
