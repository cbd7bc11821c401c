//! Discovery identifier generation and classification.
//!
//! Two ID schemes coexist:
//!
//! - **Current** (`sgd-XXXXXX`): six symbols from a 32-symbol uppercase
//!   alphabet, derived deterministically from a backing v4 GUID. The same
//!   GUID always derives the same ID.
//! - **Legacy** (`sg-xxxxxx`): six random lowercase alphanumerics with no
//!   backing GUID. Still recognized on disk; records in this format are
//!   migrated to the current scheme on first load.

use crate::{Error, Result};
use rand::RngCore;
use uuid::Uuid;

/// Prefix for legacy-format IDs.
pub const LEGACY_PREFIX: &str = "sg-";

/// Prefix for current-format IDs.
pub const CURRENT_PREFIX: &str = "sgd-";

/// Number of symbols after the prefix, in both formats.
pub const SHORT_ID_LEN: usize = 6;

/// Legacy alphabet: lowercase alphanumerics.
const LEGACY_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Current alphabet: 32 uppercase symbols, visually ambiguous ones
/// (`0`, `O`, `1`, `I`) excluded. Size must stay 32: the derivation below
/// is mixed-radix base-32.
const CURRENT_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Largest multiple of the legacy alphabet size that fits in a byte.
/// Bytes at or above this are redrawn so `byte % 36` stays uniform.
const LEGACY_REJECT_LIMIT: u8 = (u8::MAX as usize / LEGACY_ALPHABET.len() * LEGACY_ALPHABET.len()) as u8;

/// Which ID family an identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// Random lowercase alphanumeric, no backing GUID.
    Legacy,
    /// Deterministically derived from a GUID.
    Current,
}

/// Generate a new random v4 GUID string.
pub fn generate_guid() -> String {
    Uuid::new_v4().to_string()
}

/// Derive the current-format short ID for a GUID.
///
/// The first 8 bytes of the GUID form a big-endian u64 seed; six rounds of
/// `seed % 32` index the current alphabet, dividing the seed by 32 each
/// round. Pure: the same GUID always yields the same ID.
pub fn derive_short_id(guid: &str) -> Result<String> {
    let uuid = Uuid::parse_str(guid)
        .map_err(|e| Error::InvalidId(format!("malformed GUID '{}': {}", guid, e)))?;

    let bytes = uuid.as_bytes();
    let mut seed = u64::from_be_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]);

    let mut id = String::with_capacity(CURRENT_PREFIX.len() + SHORT_ID_LEN);
    id.push_str(CURRENT_PREFIX);
    for _ in 0..SHORT_ID_LEN {
        id.push(CURRENT_ALPHABET[(seed % 32) as usize] as char);
        seed /= 32;
    }
    Ok(id)
}

/// Generate a fresh `(guid, short_id)` pair. The pair agrees by
/// construction: the ID is derived from the GUID.
pub fn generate_id() -> Result<(String, String)> {
    let guid = generate_guid();
    let short_id = derive_short_id(&guid)?;
    Ok((guid, short_id))
}

/// Generate a legacy-format ID (`sg-` + 6 random lowercase alphanumerics).
///
/// Uses rejection sampling: 256 is not a multiple of 36, so a plain
/// `byte % 36` would skew toward low symbols. Bytes >= 252 are redrawn.
pub fn generate_legacy_id() -> String {
    let mut rng = rand::thread_rng();
    let mut id = String::with_capacity(LEGACY_PREFIX.len() + SHORT_ID_LEN);
    id.push_str(LEGACY_PREFIX);
    for _ in 0..SHORT_ID_LEN {
        let byte = loop {
            let b = (rng.next_u32() & 0xff) as u8;
            if b < LEGACY_REJECT_LIMIT {
                break b;
            }
        };
        id.push(LEGACY_ALPHABET[(byte as usize) % LEGACY_ALPHABET.len()] as char);
    }
    id
}

/// Classify an ID string, or `None` if it matches neither family.
pub fn classify(id: &str) -> Option<IdKind> {
    // Check the longer prefix first: "sgd-" also starts with "sg".
    if let Some(suffix) = id.strip_prefix(CURRENT_PREFIX) {
        if suffix.len() == SHORT_ID_LEN && suffix.bytes().all(|b| CURRENT_ALPHABET.contains(&b)) {
            return Some(IdKind::Current);
        }
        return None;
    }
    if let Some(suffix) = id.strip_prefix(LEGACY_PREFIX) {
        if suffix.len() == SHORT_ID_LEN
            && suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Some(IdKind::Legacy);
        }
        return None;
    }
    None
}

/// Validate that an ID matches one of the recognized formats.
pub fn validate(id: &str) -> Result<IdKind> {
    classify(id).ok_or_else(|| {
        Error::InvalidId(format!(
            "ID must be '{}' or '{}' followed by {} symbols, got: {}",
            LEGACY_PREFIX, CURRENT_PREFIX, SHORT_ID_LEN, id
        ))
    })
}
