//! Human-readable order numbers
//!
//! The format is cosmetic. Uniqueness is enforced by the order store, which
//! reports a collision as [`ShopError::Conflict`](crate::core::error::ShopError::Conflict);
//! the checkout engine then asks the generator for another number.

use chrono::Utc;
use rand::Rng;

/// Source of candidate order numbers
pub trait OrderNumberGenerator: Send + Sync {
    /// Produce a fresh candidate. Candidates are not required to be unique.
    fn next_number(&self) -> String;
}

const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// `ORD-YYYYMMDD-XXXXXX` with a random suffix drawn from an unambiguous alphabet
#[derive(Debug, Clone)]
pub struct RandomOrderNumbers {
    suffix_len: usize,
}

impl RandomOrderNumbers {
    pub fn new() -> Self {
        Self { suffix_len: 6 }
    }

    pub fn with_suffix_len(suffix_len: usize) -> Self {
        Self {
            suffix_len: suffix_len.max(1),
        }
    }
}

impl Default for RandomOrderNumbers {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderNumberGenerator for RandomOrderNumbers {
    fn next_number(&self) -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..self.suffix_len)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        format!("ORD-{}-{}", Utc::now().format("%Y%m%d"), suffix)
    }
}
