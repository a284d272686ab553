//! Trust anchor loading

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::RootCertStore;
use rustls_pki_types::CertificateDer;
use rustls_pki_types::pem::PemObject;

use crate::core::TransportError;

/// Root store built from a single PEM file
///
/// The store contains the certificates from that file and nothing else. The
/// platform trust store is never consulted.
#[derive(Clone)]
pub struct TrustAnchor {
    path: PathBuf,
    roots: Arc<RootCertStore>,
}

impl TrustAnchor {
    /// Read and parse the PEM file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|e| TransportError::CertificateReadFailure {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_pem(path, &pem)
    }

    /// Parse PEM bytes; `origin` is only used in errors
    pub fn from_pem(origin: impl AsRef<Path>, pem: &[u8]) -> Result<Self, TransportError> {
        let path = origin.as_ref().to_path_buf();
        let read_failure = |reason: &str| TransportError::CertificateReadFailure {
            path: path.clone(),
            reason: reason.to_string(),
        };

        // pem::Error can quote the offending line, so its text is dropped.
        let certificates = CertificateDer::pem_slice_iter(pem)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| read_failure("content is not valid PEM"))?;
        if certificates.is_empty() {
            return Err(read_failure("no CERTIFICATE block found"));
        }

        let mut roots = RootCertStore::empty();
        for (index, certificate) in certificates.into_iter().enumerate() {
            roots
                .add(certificate)
                .map_err(|e| TransportError::CertificateParseFailure {
                    path: path.clone(),
                    reason: format!("certificate #{} is malformed: {e}", index + 1),
                })?;
        }

        Ok(Self {
            path,
            roots: Arc::new(roots),
        })
    }

    /// File the anchor was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of trusted roots
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether the store is empty (never true for a loaded anchor)
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Shared root store for building a TLS client
    pub fn roots(&self) -> Arc<RootCertStore> {
        Arc::clone(&self.roots)
    }
}

impl fmt::Debug for TrustAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustAnchor")
            .field("path", &self.path)
            .field("roots", &self.roots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn test_load_valid_anchor() {
        let anchor = TrustAnchor::load(fixture("federation-ca.pem")).unwrap();
        assert_eq!(anchor.len(), 1);
        assert!(!anchor.is_empty());
        assert_eq!(anchor.path(), fixture("federation-ca.pem"));
    }

    #[test]
    fn test_missing_file_is_read_failure() {
        let err = TrustAnchor::load(fixture("does-not-exist.pem")).unwrap_err();
        assert!(matches!(err, TransportError::CertificateReadFailure { .. }));
    }

    #[test]
    fn test_text_file_is_read_failure() {
        let err = TrustAnchor::load(fixture("not-pem.txt")).unwrap_err();
        assert!(matches!(err, TransportError::CertificateReadFailure { .. }));
    }

    #[test]
    fn test_corrupt_certificate_is_parse_failure() {
        let err = TrustAnchor::load(fixture("corrupt-ca.pem")).unwrap_err();
        assert!(
            matches!(err, TransportError::CertificateParseFailure { .. }),
            "unexpected error: {err:?}"
        );
        assert!(err.to_string().contains("certificate #1"));
    }

    #[test]
    fn test_bundle_with_two_roots() {
        let pem = std::fs::read(fixture("federation-ca.pem")).unwrap();
        let mut bundle = tempfile::NamedTempFile::new().unwrap();
        bundle.write_all(&pem).unwrap();
        bundle.write_all(&pem).unwrap();

        let anchor = TrustAnchor::load(bundle.path()).unwrap();
        // RootCertStore keeps duplicates
        assert_eq!(anchor.len(), 2);
    }
}
