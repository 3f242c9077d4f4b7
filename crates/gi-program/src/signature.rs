//! Patch signatures
//!
//! Provides [`PatchSignature`], a 32-byte Blake3 digest of a patch's
//! canonical rendering. Used as the memo key by evaluation caches.

use std::fmt::{self, Display, Formatter};

/// A 32-byte digest of a canonical patch rendering (Blake3)
///
/// Structurally identical patches render identically and therefore share
/// one signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatchSignature([u8; 32]);

impl PatchSignature {
    /// Digest a canonical rendering
    #[inline]
    #[must_use]
    pub fn compute(rendering: &str) -> Self {
        Self(*blake3::hash(rendering.as_bytes()).as_bytes())
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for PatchSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
