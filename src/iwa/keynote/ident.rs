//! Stable identifiers and content digests

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::iwa::archive::ArchiveId;

/// Revision text used in the identifier seed when the package has none
pub const MISSING_REVISION: &str = "None";

/// Derive the stable external id of a slide
///
/// URL-safe base64 (unpadded) of the first 16 bytes of
/// SHA-256(document id + revision + slide id). The result only depends on
/// its three inputs; a new revision yields new ids.
pub fn stable_slide_id(document_id: &str, revision: Option<&str>, slide_id: ArchiveId) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(revision.unwrap_or(MISSING_REVISION).as_bytes());
    hasher.update(slide_id.to_string().as_bytes());
    let digest = hasher.finalize();
    URL_SAFE_NO_PAD.encode(&digest[..16])
}

/// Render a stored asset digest as standard padded base64
pub fn encode_digest(digest: &[u8]) -> String {
    STANDARD.encode(digest)
}

/// Make a base64 digest safe to embed in a file name or URL
pub fn safe_hash(digest: &str) -> String {
    digest
        .chars()
        .filter(|c| *c != '=')
        .map(|c| match c {
            '/' => '_',
            '+' => '-',
            other => other,
        })
        .collect()
}

/// Lowercase hyphenated form of a UUID string; other text is only trimmed
pub fn normalize_uuid(text: &str) -> String {
    let trimmed = text.trim();
    match Uuid::parse_str(trimmed) {
        Ok(uuid) => uuid.hyphenated().to_string(),
        Err(_) => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "9f1c2f0e-7d1a-4e6b-8c55-3b2a1d0e9f10";
    const REV: &str = "2b7e1516-28ae-4d2a-a6d2-abf7158809cf";

    #[test]
    fn test_stable_slide_id_vector() {
        assert_eq!(stable_slide_id(DOC, Some(REV), 1234), "9aGy0rVkM9MVwPAqxfV52A");
        assert_eq!(stable_slide_id(DOC, None, 1234), "W4wYBXKT1z21GdQ-KSCaZA");
    }

    #[test]
    fn test_revision_changes_id() {
        let other = "3c6e0b8a-9c15-4a7f-b8e3-2d4f6a8c0e1b";
        assert_eq!(stable_slide_id(DOC, Some(other), 1234), "QNeGF2Tv3_plyvxns1fRVA");
        assert_ne!(stable_slide_id(DOC, Some(REV), 1234), stable_slide_id(DOC, Some(other), 1234));
    }

    #[test]
    fn test_digest_rendering() {
        let digest = encode_digest(&[0xFB, 0xFF, 0xFE, 0x01, 0x02]);
        assert_eq!(digest, "+//+AQI=");
        assert_eq!(safe_hash(&digest), "-__-AQI");
    }

    #[test]
    fn test_normalize_uuid() {
        assert_eq!(normalize_uuid(" 9F1C2F0E7D1A4E6B8C553B2A1D0E9F10\n"), DOC);
        assert_eq!(normalize_uuid("not-a-uuid "), "not-a-uuid");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            #[test]
            fn prop_stable_id_is_url_safe(
                document in "[0-9a-f-]{1,40}",
                revision in proptest::option::of("[0-9a-f-]{1,40}"),
                slide in any::<u64>(),
            ) {
                let id = stable_slide_id(&document, revision.as_deref(), slide);
                prop_assert_eq!(id.len(), 22);
                prop_assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
                prop_assert_eq!(&id, &stable_slide_id(&document, revision.as_deref(), slide));
            }

            #[test]
            fn prop_safe_hash_has_no_path_characters(digest in prop::collection::vec(any::<u8>(), 0..64)) {
                let hash = safe_hash(&encode_digest(&digest));
                prop_assert!(!hash.contains(['/', '+', '=']));
            }
        }
    }
}
