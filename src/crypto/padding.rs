//! # Padding Codec
//!
//! Pads plaintext into fixed-size buckets before encryption so ciphertext
//! length reveals only which bucket a message fell into, not its true size.
//!
//! Layout of a padded blob:
//!
//! ```text
//! ┌──────────────┬───────────────────────┬──────────────────────────┐
//! │ header (12B) │ plaintext             │ random filler            │
//! │ "VPAD" + len │                       │ to the bucket boundary   │
//! └──────────────┴───────────────────────┴──────────────────────────┘
//! ```
//!
//! The header encodes the exact plaintext length as 8 zero-padded decimal
//! digits; total length always equals one of [`BUCKET_SIZES`].
//!
//! [`unpad`] never fails: blobs carrying the legacy `PAD:` header are decoded
//! with its rules, and anything without a recognized header is returned as-is
//! (pre-padding clients sent raw content).

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{Error, Result};

/// Allowed padded-message lengths, in bytes.
///
/// Both sides of a conversation must agree on this table byte-for-byte. The
/// final bucket is capped below 64 KiB to respect the relay transport's
/// maximum frame size.
pub const BUCKET_SIZES: [usize; 12] = [
    32, 64, 128, 256, 512, 1024, 2048, 4096, 8192, 16384, 32768, 65000,
];

/// Header length: 4-byte marker + 8 decimal digits.
pub const HEADER_LEN: usize = 12;

/// Largest plaintext that fits in the top bucket alongside the header.
pub const MAX_PLAINTEXT_LEN: usize = BUCKET_SIZES[BUCKET_SIZES.len() - 1] - HEADER_LEN;

const MARKER: &[u8; 4] = b"VPAD";

/// Legacy fixed-width header: 4-byte marker + 6 decimal digits, zero filler.
const LEGACY_MARKER: &[u8; 4] = b"PAD:";
const LEGACY_HEADER_LEN: usize = 10;

/// Smallest bucket that holds `n` bytes, or the largest bucket if none does.
pub fn bucket_size(n: usize) -> usize {
    BUCKET_SIZES
        .iter()
        .find(|&&bucket| bucket >= n)
        .copied()
        .unwrap_or(BUCKET_SIZES[BUCKET_SIZES.len() - 1])
}

/// Pad `plaintext` into its bucket.
///
/// Returns [`Error::PayloadTooLarge`] when the content plus header overhead
/// exceeds the largest bucket; content is rejected, never truncated.
pub fn pad(plaintext: &[u8]) -> Result<Vec<u8>> {
    if plaintext.len() > MAX_PLAINTEXT_LEN {
        return Err(Error::PayloadTooLarge {
            size: plaintext.len(),
            max: MAX_PLAINTEXT_LEN,
        });
    }

    let unpadded_len = HEADER_LEN + plaintext.len();
    let total = bucket_size(unpadded_len);

    let mut padded = Vec::with_capacity(total);
    padded.extend_from_slice(MARKER);
    padded.extend_from_slice(format!("{:08}", plaintext.len()).as_bytes());
    padded.extend_from_slice(plaintext);

    // Random filler keeps the tail indistinguishable from ciphertext.
    let mut filler = vec![0u8; total - unpadded_len];
    OsRng.fill_bytes(&mut filler);
    padded.extend_from_slice(&filler);

    Ok(padded)
}

/// Recover the original content from a padded blob.
///
/// Accepts the current format, the legacy `PAD:` format, and completely
/// unpadded content (returned unchanged). Never fails: a missing or garbled
/// header means "treat as unpadded", not an error.
pub fn unpad(blob: &[u8]) -> Vec<u8> {
    if let Some(content) = decode_header(blob, MARKER, HEADER_LEN) {
        return content;
    }
    if let Some(content) = decode_header(blob, LEGACY_MARKER, LEGACY_HEADER_LEN) {
        return content;
    }
    blob.to_vec()
}

/// Decode a `marker` + decimal-digits header, returning the declared content
/// slice when the header is well-formed and the length fits the blob.
fn decode_header(blob: &[u8], marker: &[u8; 4], header_len: usize) -> Option<Vec<u8>> {
    if blob.len() < header_len || &blob[..4] != marker {
        return None;
    }

    let digits = &blob[4..header_len];
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let declared: usize = digits
        .iter()
        .fold(0usize, |acc, &d| acc * 10 + (d - b'0') as usize);

    if header_len + declared > blob.len() {
        return None;
    }
    Some(blob[header_len..header_len + declared].to_vec())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        for (i, &size) in BUCKET_SIZES.iter().enumerate() {
            // A padded length of exactly `size` maps to `size`
            assert_eq!(bucket_size(size), size);
            // One byte more maps to the next bucket (or stays capped)
            let expected_next = if i + 1 < BUCKET_SIZES.len() {
                BUCKET_SIZES[i + 1]
            } else {
                size
            };
            assert_eq!(bucket_size(size + 1), expected_next);
        }
    }

    #[test]
    fn test_padded_length_is_always_a_bucket() {
        for len in [0usize, 1, 19, 20, 21, 100, 500, 501, 5000, 60000] {
            let padded = pad(&vec![0xabu8; len]).unwrap();
            assert!(
                BUCKET_SIZES.contains(&padded.len()),
                "padded length {} for plaintext length {} is not a bucket",
                padded.len(),
                len
            );
        }
    }

    #[test]
    fn test_boundary_between_512_and_1024() {
        // 500 bytes + 12-byte header = 512 exactly; 501 spills to 1024
        assert_eq!(pad(&[0u8; 500]).unwrap().len(), 512);
        assert_eq!(pad(&[0u8; 501]).unwrap().len(), 1024);
    }

    #[test]
    fn test_pad_unpad_round_trip() {
        let plaintext = b"Hello, secure world!";
        let padded = pad(plaintext).unwrap();
        assert_eq!(unpad(&padded), plaintext);
    }

    #[test]
    fn test_empty_plaintext_round_trip() {
        let padded = pad(b"").unwrap();
        assert_eq!(padded.len(), 32);
        assert!(unpad(&padded).is_empty());
    }

    #[test]
    fn test_oversized_content_rejected() {
        let huge = vec![0u8; MAX_PLAINTEXT_LEN + 1];
        assert!(matches!(
            pad(&huge),
            Err(Error::PayloadTooLarge { .. })
        ));
        // The maximum itself still fits
        assert_eq!(pad(&vec![0u8; MAX_PLAINTEXT_LEN]).unwrap().len(), 65000);
    }

    #[test]
    fn test_legacy_format_decodes() {
        // Old clients: "PAD:" + 6-digit length + content + zero filler
        let content = b"legacy message";
        let mut blob = Vec::new();
        blob.extend_from_slice(b"PAD:");
        blob.extend_from_slice(format!("{:06}", content.len()).as_bytes());
        blob.extend_from_slice(content);
        blob.extend_from_slice(&[0u8; 42]);

        assert_eq!(unpad(&blob), content);
    }

    #[test]
    fn test_unpadded_content_passes_through() {
        let raw = b"no header at all, just bytes";
        assert_eq!(unpad(raw), raw);

        let empty: &[u8] = b"";
        assert_eq!(unpad(empty), empty);
    }

    #[test]
    fn test_garbled_header_treated_as_unpadded() {
        // Right marker, non-digit length field: not a valid header
        let blob = b"VPADxxxxxxxxsome content";
        assert_eq!(unpad(blob), blob);

        // Declared length larger than the blob: not a valid header
        let blob = b"VPAD99999999short";
        assert_eq!(unpad(blob), blob);
    }

    #[test]
    fn test_filler_is_ignored() {
        let plaintext = b"payload";
        let padded1 = pad(plaintext).unwrap();
        let padded2 = pad(plaintext).unwrap();
        // Random filler makes padded blobs differ...
        assert_ne!(padded1, padded2);
        // ...but both decode identically
        assert_eq!(unpad(&padded1), unpad(&padded2));
    }
}
