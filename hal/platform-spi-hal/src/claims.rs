//! Exclusive claim tracking for hosts and pins
//!
//! Both host slots and pin numbers are `u8`, so one fixed 256-bit set
//! covers every possible identifier.

/// Bitset of claimed `u8` identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimSet {
    words: [u32; 8],
}

impl ClaimSet {
    /// Create an empty set
    pub const fn new() -> Self {
        Self { words: [0; 8] }
    }

    fn slot(id: u8) -> (usize, u32) {
        ((id >> 5) as usize, 1 << (id & 0x1f))
    }

    /// Claim an identifier
    ///
    /// Returns false if it was already claimed.
    pub fn claim(&mut self, id: u8) -> bool {
        let (word, mask) = Self::slot(id);
        if self.words[word] & mask != 0 {
            return false;
        }
        self.words[word] |= mask;
        true
    }

    /// Claim every identifier or none of them
    pub fn claim_all(&mut self, ids: &[u8]) -> bool {
        if ids.iter().any(|&id| self.is_claimed(id)) {
            return false;
        }
        for &id in ids {
            self.claim(id);
        }
        true
    }

    /// Release an identifier
    pub fn release(&mut self, id: u8) {
        let (word, mask) = Self::slot(id);
        self.words[word] &= !mask;
    }

    /// Check if an identifier is claimed
    pub fn is_claimed(&self, id: u8) -> bool {
        let (word, mask) = Self::slot(id);
        self.words[word] & mask != 0
    }

    /// Number of claimed identifiers
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True when nothing is claimed
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_and_release() {
        let mut set = ClaimSet::new();
        assert!(set.claim(0));
        assert!(set.claim(31));
        assert!(set.claim(32));
        assert!(set.claim(255));
        assert!(!set.claim(31));
        assert_eq!(set.len(), 4);

        set.release(31);
        assert!(!set.is_claimed(31));
        assert!(set.claim(31));
    }

    #[test]
    fn test_claim_all_is_atomic() {
        let mut set = ClaimSet::new();
        set.claim(7);
        assert!(!set.claim_all(&[5, 6, 7]));
        assert!(!set.is_claimed(5));
        assert!(!set.is_claimed(6));

        assert!(set.claim_all(&[5, 6]));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_empty() {
        let mut set = ClaimSet::default();
        assert!(set.is_empty());
        set.claim(200);
        assert!(!set.is_empty());
        set.release(200);
        assert!(set.is_empty());
    }
}
