//! Fixed-width correlation identifiers.

use std::fmt;

use rand::{RngCore, rngs::OsRng};

use crate::core::{MESSAGE_ID_SIZE, SURB_ID_SIZE};

macro_rules! correlation_id {
    ($(#[$meta:meta])* $name:ident, $size:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name([u8; $size]);

        impl $name {
            /// Identifier width in bytes.
            pub const SIZE: usize = $size;

            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                let mut id = [0u8; $size];
                OsRng.fill_bytes(&mut id);
                Self(id)
            }

            /// Create from raw bytes.
            pub fn from_bytes(bytes: [u8; $size]) -> Self {
                Self(bytes)
            }

            /// Derive an identifier from a possibly longer wire identifier.
            ///
            /// Only the leading `SIZE` bytes are significant. Returns `None`
            /// if fewer bytes are available.
            pub fn truncate_from(bytes: &[u8]) -> Option<Self> {
                let head = bytes.get(..$size)?;
                let mut id = [0u8; $size];
                id.copy_from_slice(head);
                Some(Self(id))
            }

            /// Get the raw bytes.
            pub fn as_bytes(&self) -> &[u8; $size] {
                &self.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $size]> for $name {
            fn from(bytes: [u8; $size]) -> Self {
                Self::from_bytes(bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self)
            }
        }
    };
}

correlation_id!(
    /// Identifier of the single-use reply block attached to a send.
    ///
    /// The acknowledgment for a send carries the same identifier.
    SurbId,
    SURB_ID_SIZE
);

correlation_id!(
    /// Identifier of a message, used to match service replies to queries.
    MessageId,
    MESSAGE_ID_SIZE
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_random() {
        assert_ne!(SurbId::generate(), SurbId::generate());
        assert_ne!(MessageId::generate(), MessageId::generate());
    }

    #[test]
    fn test_truncate_from_longer_id() {
        let mut wire = vec![0u8; 32];
        wire[0] = 0xAB;
        wire[MESSAGE_ID_SIZE] = 0xFF;

        let id = MessageId::truncate_from(&wire).unwrap();
        assert_eq!(id.as_bytes()[0], 0xAB);
        assert_eq!(id, MessageId::truncate_from(&wire[..MESSAGE_ID_SIZE]).unwrap());
    }

    #[test]
    fn test_truncate_from_short_id() {
        assert!(SurbId::truncate_from(&[1, 2, 3]).is_none());
        assert!(SurbId::truncate_from(&[]).is_none());
    }

    #[test]
    fn test_display_is_hex() {
        let id = SurbId::from_bytes([0x0f; SURB_ID_SIZE]);
        assert_eq!(id.to_string(), "0f".repeat(SURB_ID_SIZE));
        assert!(format!("{:?}", id).starts_with("SurbId("));
    }
}
