//! Hash helpers used for content-addressed identifiers.

use crate::Hash;
use sha2::{Digest, Sha256};

/// Single SHA-256.
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Double SHA-256, the hash behind every derived identifier.
pub fn hash_double(data: &[u8]) -> Hash {
    sha256(&sha256(data))
}
