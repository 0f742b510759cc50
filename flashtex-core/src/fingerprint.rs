//! Content fingerprint: SHA-256 over a flashcard's front and back source.
//!
//! The same digest gates updates and names the generated media files, so
//! unchanged content always maps to byte-identical filenames.
//!
//! Each side is framed by its byte length (little-endian `u64`) before its
//! bytes are fed to the hasher. Without framing `("ab", "c")` and
//! `("a", "bc")` would collide.

use sha2::{Digest, Sha256};

use crate::types::ContentFingerprint;

/// Compute the fingerprint of a `(front, back)` pair.
///
/// Exact bytes matter: whitespace and line endings are not normalised.
pub fn fingerprint(front: &str, back: &str) -> ContentFingerprint {
    let mut hasher = Sha256::new();
    for side in [front, back] {
        hasher.update((side.len() as u64).to_le_bytes());
        hasher.update(side.as_bytes());
    }
    ContentFingerprint(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn same_input_same_fingerprint() {
        let a = fingerprint("$x^2$", "$y^2$");
        let b = fingerprint("$x^2$", "$y^2$");
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_is_64_lowercase_hex_chars() {
        let fp = fingerprint("front", "back");
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn known_vector_is_stable() {
        // Empty sides still contribute their length prefixes.
        let fp = fingerprint("", "");
        let mut hasher = Sha256::new();
        hasher.update(0u64.to_le_bytes());
        hasher.update(0u64.to_le_bytes());
        assert_eq!(fp.as_str(), hex::encode(hasher.finalize()));
    }

    #[rstest]
    #[case("ab", "c", "a", "bc")]
    #[case("", "x", "x", "")]
    #[case("front", "back", "back", "front")]
    #[case("a\n", "b", "a", "\nb")]
    fn boundary_shifts_change_fingerprint(
        #[case] front: &str,
        #[case] back: &str,
        #[case] front2: &str,
        #[case] back2: &str,
    ) {
        assert_ne!(fingerprint(front, back), fingerprint(front2, back2));
    }

    #[rstest]
    #[case("x ", "x")]
    #[case("x\r\n", "x\n")]
    #[case("X", "x")]
    fn whitespace_and_case_are_significant(#[case] a: &str, #[case] b: &str) {
        assert_ne!(fingerprint(a, "back"), fingerprint(b, "back"));
        assert_ne!(fingerprint("front", a), fingerprint("front", b));
    }
}
