//! Protocol and session constants.
//!
//! Identifier widths are fixed by the mix-network wire format and MUST NOT be
//! changed. Timing values are defaults; see [`SessionConfig`](crate::client::SessionConfig).

use std::time::Duration;

// =============================================================================
// KEY MATERIAL
// =============================================================================

/// X25519 public key size.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// X25519 private key size.
pub const PRIVATE_KEY_SIZE: usize = 32;

// =============================================================================
// CORRELATION IDENTIFIERS
// =============================================================================

/// SURB identifier size, used to correlate acknowledgments with sends.
pub const SURB_ID_SIZE: usize = 16;

/// Message identifier size, used to correlate service replies with queries.
pub const MESSAGE_ID_SIZE: usize = 16;

// =============================================================================
// PAYLOAD SIZES
// =============================================================================

/// Fixed ciphertext block length that outgoing payloads are padded to.
pub const DEFAULT_BLOCK_LENGTH: usize = 50 * 1024;

// =============================================================================
// TIMING
// =============================================================================

/// How long `query_key` waits for a provider reply.
pub const KEY_QUERY_TIMEOUT: Duration = Duration::from_secs(120);

/// Age after which an unclaimed acknowledgment key is discarded.
pub const DEFAULT_ACK_TTL: Duration = Duration::from_secs(600);

/// Interval of the dispatcher's expiry sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
