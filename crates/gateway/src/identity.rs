//! Client identity used to derive transaction ids.
//!
//! An identity is the MSP id plus the X.509 certificate bytes of the caller.
//! The certificate is read verbatim from `CERT_PATH`; it is not parsed or
//! validated here.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Length of the random nonce mixed into every transaction id.
const NONCE_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    msp_id: String,
    certificate: Vec<u8>,
}

impl Identity {
    pub fn new(msp_id: impl Into<String>, certificate: Vec<u8>) -> Self {
        Self {
            msp_id: msp_id.into(),
            certificate,
        }
    }

    /// Build the identity, reading the certificate when a path is given.
    pub fn load(msp_id: &str, cert_path: Option<&Path>) -> std::io::Result<Self> {
        let certificate = match cert_path {
            Some(path) => {
                let pem = std::fs::read(path)?;
                tracing::info!(
                    msp_id,
                    cert_path = %path.display(),
                    cert_len = pem.len(),
                    "Loaded client certificate"
                );
                pem
            }
            None => {
                tracing::warn!(msp_id, "CERT_PATH not set, using an anonymous certificate");
                Vec::new()
            }
        };
        Ok(Self::new(msp_id, certificate))
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    /// Serialized creator: MSP id followed by the certificate bytes.
    pub fn creator(&self) -> Vec<u8> {
        let mut creator = Vec::with_capacity(self.msp_id.len() + self.certificate.len());
        creator.extend_from_slice(self.msp_id.as_bytes());
        creator.extend_from_slice(&self.certificate);
        creator
    }

    /// Fresh transaction id: `hex(sha256(nonce || creator))`.
    pub fn new_tx_id(&self) -> String {
        let nonce: [u8; NONCE_LEN] = rand::random();
        tx_id_for(&nonce, &self.creator())
    }
}

fn tx_id_for(nonce: &[u8], creator: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce);
    hasher.update(creator);
    hex::encode(hasher.finalize())
}
