//! 32-byte transaction identities.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Serialize, Serializer};
use std::fmt;

/// Type alias for Blake2b with 256-bit output.
type Blake2b256 = Blake2b<U32>;

/// Hash length in bytes.
pub const HASH_LENGTH: usize = 32;

/// Compute the Blake2b-256 digest of `data`.
pub fn blake2b256(data: &[u8]) -> [u8; HASH_LENGTH] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; HASH_LENGTH];
    out.copy_from_slice(digest.as_slice());
    out
}

macro_rules! hash_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name([u8; HASH_LENGTH]);

        impl $name {
            /// All-zero hash.
            pub const ZERO: Self = Self([0u8; HASH_LENGTH]);

            /// Wrap raw hash bytes.
            pub const fn from_bytes(bytes: [u8; HASH_LENGTH]) -> Self {
                Self(bytes)
            }

            /// Hash `data` with Blake2b-256.
            pub fn hash(data: &[u8]) -> Self {
                Self(blake2b256(data))
            }

            /// Raw hash bytes.
            pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
                &self.0
            }

            /// Whether this is the all-zero hash.
            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; HASH_LENGTH]
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(self.0))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&hex::encode(self.0))
            }
        }
    };
}

hash_newtype!(
    /// Transaction identity: hash of the serialization without witness data.
    Txid
);

hash_newtype!(
    /// Witness identity: hash of the full serialization, witness data included.
    Wtxid
);

hash_newtype!(
    /// Block identity.
    BlockHash
);
