//! Upload identifier generation
//!
//! Identifiers are 32 lowercase hex characters (16 random bytes), the
//! collision-resistant token format the listing order is defined over. The
//! generator only consumes its injected randomness source; apply-side code
//! never mints ids (determinism requirement).

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::UploadId;

/// Generates opaque upload identifiers from an injected RNG
pub struct UploadIdGenerator<R: Rng = StdRng> {
    rng: Mutex<R>,
}

impl UploadIdGenerator<StdRng> {
    /// Generator seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl<R: Rng> UploadIdGenerator<R> {
    /// Generator over a caller-supplied randomness source
    pub fn with_rng(rng: R) -> Self {
        UploadIdGenerator {
            rng: Mutex::new(rng),
        }
    }

    /// Mint a fresh upload id
    pub fn next_id(&self) -> UploadId {
        let mut bytes = [0u8; 16];
        self.rng.lock().fill(&mut bytes);
        UploadId::new(hex::encode(bytes))
    }
}

mod hex {
    use std::fmt::Write;

    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().fold(String::new(), |mut output, b| {
            let _ = write!(output, "{:02x}", b);
            output
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_format() {
        let gen = UploadIdGenerator::from_entropy();
        let id = gen.next_id();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id.as_str(), id.as_str().to_lowercase());
    }

    #[test]
    fn test_ids_are_distinct() {
        let gen = UploadIdGenerator::from_entropy();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(gen.next_id()));
        }
    }

    #[test]
    fn test_seeded_generator_is_reproducible() {
        let a = UploadIdGenerator::with_rng(StdRng::seed_from_u64(7));
        let b = UploadIdGenerator::with_rng(StdRng::seed_from_u64(7));
        for _ in 0..10 {
            assert_eq!(a.next_id(), b.next_id());
        }
    }
}
