//! C2 Hasher: content hashes for change detection, dedup, and id derivation.
//!
//! MD5 (non-security) for project/file id derivation, SHA-256 for content
//! hashes used to detect "unchanged" state during incremental re-index.

use md5::Md5;
use sha2::{Digest, Sha256};

/// 128-bit MD5 digest of `bytes`, hex-encoded. Used for project ids derived
/// from an absolute path — collision resistance against adversarial input is
/// not a requirement here, only stability and speed.
pub fn md5_hex(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// SHA-256 digest of `bytes`, hex-encoded. Used for chunk/file content hashes
/// so incremental re-index can skip files whose content is unchanged.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Deterministic project id: MD5 of the canonical absolute path. Stable
/// across re-indexes per spec §3's `Project` invariant.
pub fn project_id(absolute_path: &str) -> String {
    md5_hex(absolute_path.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_is_deterministic() {
        assert_eq!(md5_hex(b"hello"), md5_hex(b"hello"));
        assert_ne!(md5_hex(b"hello"), md5_hex(b"world"));
    }

    #[test]
    fn sha256_is_deterministic() {
        assert_eq!(sha256_hex(b"hello"), sha256_hex(b"hello"));
        assert_ne!(sha256_hex(b"hello"), sha256_hex(b"world"));
    }

    #[test]
    fn project_id_is_stable_for_same_path() {
        let a = project_id("/home/user/repo");
        let b = project_id("/home/user/repo");
        assert_eq!(a, b);
    }

    #[test]
    fn project_id_differs_by_path() {
        assert_ne!(project_id("/a"), project_id("/b"));
    }
}
