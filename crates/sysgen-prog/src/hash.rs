//! Content revisions for generated artifacts.
//!
//! A revision is the SHA-256 of the serialized data-definition bytes. It is
//! embedded in both artifacts produced for a target so the executor and the
//! data definitions can be matched up at run time.

use sha2::{Digest, Sha256};

/// A content revision (SHA-256 lowercase hex digest).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
    /// Compute the revision of the given bytes.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Revision(hex_encode(&hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(Revision::compute(b"syscalls"), Revision::compute(b"syscalls"));
    }

    #[test]
    fn sensitive_to_content() {
        assert_ne!(Revision::compute(b"__NR_open = 2"), Revision::compute(b"__NR_open = 56"));
    }

    #[test]
    fn hex_format() {
        let rev = Revision::compute(b"");
        assert_eq!(rev.as_str().len(), 64);
        assert_eq!(
            rev.to_string(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
