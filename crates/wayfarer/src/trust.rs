//! Trust verification for the native parser binary
//!
//! The parser is distributed as a prebuilt shared library signed by its
//! publisher. Nothing gets loaded into the process before the detached
//! signature checks out against the publisher's key, and the key itself is
//! pinned by fingerprint. The verification mechanism sits behind a trait so
//! the key source can change without touching loader control flow.
//!
//! TODO: support a bundled key file as an alternative to the HTTPS fetch.

use anyhow::{bail, ensure, Context};
use ed25519_dalek::{Signature, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH};
use log::*;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::io::Read;
use wayfarer_utils::AnyResult;

/// Where the publisher's signing key lives.
pub const PUBLISHER_KEY_URL: &str =
    "https://releases.wayfarer.tools/keys/journey_model_parser.pub";

/// SHA-256 of the publisher's key bytes. A downloaded key that hashes to
/// anything else is rejected outright.
pub const PUBLISHER_KEY_FINGERPRINT: &str =
    "9b1de1d5a0c6e02b9c07d7e2a74e1f35c4ad89356b4e8d1c0a92f6de815c3b7a";

/// Verifies that a parser binary was produced by its publisher.
pub trait TrustVerifier {
    /// Checks `signature` (detached) over `binary`. Returns `Err` on *any*
    /// doubt; there is no partial trust.
    fn verify(&self, binary: &[u8], signature: &[u8]) -> AnyResult;
}

/// [`TrustVerifier`] that fetches the publisher key over HTTPS and pins it
/// by SHA-256 fingerprint before checking the Ed25519 signature.
pub struct HttpKeyVerifier {
    key_url: String,
    expected_fingerprint: String,
}

impl Default for HttpKeyVerifier {
    fn default() -> Self {
        Self {
            key_url: PUBLISHER_KEY_URL.to_owned(),
            expected_fingerprint: PUBLISHER_KEY_FINGERPRINT.to_owned(),
        }
    }
}

impl HttpKeyVerifier {
    pub fn new(key_url: impl Into<String>, expected_fingerprint: impl Into<String>) -> Self {
        Self {
            key_url: key_url.into(),
            expected_fingerprint: expected_fingerprint.into(),
        }
    }

    fn fetch_key(&self) -> AnyResult<VerifyingKey> {
        debug!("Fetching publisher key from {}", self.key_url);
        let response = ureq::get(&self.key_url)
            .call()
            .context("couldn't fetch the publisher key")?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(1024)
            .read_to_end(&mut bytes)
            .context("couldn't read the publisher key response")?;

        let fingerprint = sha256_hex(&bytes);
        ensure!(
            fingerprint == self.expected_fingerprint,
            "publisher key fingerprint mismatch (got {fingerprint})",
        );

        let Ok(raw) = <[u8; PUBLIC_KEY_LENGTH]>::try_from(bytes.as_slice()) else {
            bail!("publisher key has invalid length {}", bytes.len());
        };
        VerifyingKey::from_bytes(&raw).context("couldn't import the publisher key")
    }
}

impl TrustVerifier for HttpKeyVerifier {
    fn verify(&self, binary: &[u8], signature: &[u8]) -> AnyResult {
        let key = self.fetch_key()?;
        let signature =
            Signature::from_slice(signature).context("malformed detached signature")?;
        key.verify(binary, &signature)
            .context("signature verification failed")?;

        info!("Parser binary signature verified");
        wayfarer_utils::ok()
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .fold(String::with_capacity(64), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
}
