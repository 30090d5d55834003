//! Agent identity/CSR generation: a keypair plus a PKCS#10 CSR, written
//! through [`crate::plumbing::atomic_file`] at the modes §6 specifies.
//!
//! Actually terminating TLS with the resulting material is the excluded
//! "TLS key/certificate file helpers" collaborator; this module only
//! produces the key and the CSR to hand to that collaborator (or to the
//! controller, which signs it into `agent.crt`).

use std::path::Path;

use rcgen::{Certificate, CertificateParams, DistinguishedName, DnType};

use super::atomic_file::{self, AtomicWriteError};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("failed to generate keypair/CSR: {0}")]
    Generate(#[from] rcgen::RcgenError),
    #[error(transparent)]
    Write(#[from] AtomicWriteError),
}

pub struct Identity {
    certificate: Certificate,
}

impl Identity {
    /// Generates a fresh self-signed identity for `common_name`.
    pub fn generate(common_name: &str) -> Result<Self, IdentityError> {
        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, common_name);
        params.distinguished_name = dn;
        let certificate = Certificate::from_params(params)?;
        Ok(Self { certificate })
    }

    pub fn private_key_pem(&self) -> String {
        self.certificate.serialize_private_key_pem()
    }

    pub fn csr_pem(&self) -> Result<String, IdentityError> {
        Ok(self.certificate.serialize_request_pem()?)
    }

    /// Writes `<data_dir>/certificates/agent.key` at mode 0600, matching
    /// the persisted state layout in §6.
    pub fn write_key(&self, data_dir: &Path) -> Result<(), IdentityError> {
        let path = data_dir.join("certificates").join("agent.key");
        atomic_file::write_atomic(&path, self.private_key_pem().as_bytes(), 0o600)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_a_private_key_and_csr() {
        let identity = Identity::generate("rack-agent.maas").unwrap();
        assert!(identity.private_key_pem().contains("PRIVATE KEY"));
        assert!(identity.csr_pem().unwrap().contains("CERTIFICATE REQUEST"));
    }

    #[test]
    fn writes_key_at_restrictive_mode() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("certificates")).unwrap();
        let identity = Identity::generate("rack-agent.maas").unwrap();
        identity.write_key(dir.path()).unwrap();

        let path = dir.path().join("certificates").join("agent.key");
        assert!(path.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }
    }
}
