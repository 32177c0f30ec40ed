//! Detached Ed25519 signatures over artifact files.
//!
//! Signing only happens when both the key and its passphrase are present and non-blank.
//! Otherwise the outcome is [`SigningOutcome::Unsigned`], which is not an error; whether an
//! unsigned publication is acceptable is decided per target by the publisher.

mod key;

pub use key::ScopedKey;

use crate::artifact::{ArtifactFile, ArtifactKind, ArtifactSet};
use crate::credentials::SigningCredentials;
use crate::error::{Result, SigningError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

/// Suffix appended to the signed file name
pub const SIGNATURE_EXTENSION: &str = ".sig";

/// Signature file for one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedSignature {
    /// Name of the signed file
    pub subject: String,
    /// The `<subject>.sig` file
    pub file: ArtifactFile,
}

/// Result of the signing stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningOutcome {
    /// One detached signature per signable artifact
    Signed(Vec<DetachedSignature>),
    /// No signing credentials were supplied
    Unsigned,
}

impl SigningOutcome {
    /// Whether signatures were produced
    pub fn is_signed(&self) -> bool {
        matches!(self, SigningOutcome::Signed(_))
    }

    /// Produced signatures, empty when unsigned
    pub fn signatures(&self) -> &[DetachedSignature] {
        match self {
            SigningOutcome::Signed(signatures) => signatures,
            SigningOutcome::Unsigned => &[],
        }
    }
}

/// Signs artifact sets with the key from [`SigningCredentials`]
pub struct Signer;

impl Signer {
    /// Sign every signable file in `artifacts`.
    ///
    /// The key lives in a [`ScopedKey`] for the duration of this call only and is
    /// released before returning, on success and on every error path.
    pub fn sign(
        artifacts: &ArtifactSet,
        credentials: &SigningCredentials,
    ) -> Result<SigningOutcome> {
        let Some((pem, passphrase)) = credentials.signing() else {
            log::info!("Signing credentials not set, artifacts stay unsigned");
            return Ok(SigningOutcome::Unsigned);
        };

        let mut key = ScopedKey::load(pem, passphrase)?;
        let signatures = Self::sign_scoped(&mut key, artifacts, verify)?;
        log::info!("Signed {} artifact file(s)", signatures.len());
        Ok(SigningOutcome::Signed(signatures))
    }

    /// Sign with `key`, checking each signature with `check`, then release the key
    /// whatever the outcome
    pub(crate) fn sign_scoped<V>(
        key: &mut ScopedKey,
        artifacts: &ArtifactSet,
        check: V,
    ) -> Result<Vec<DetachedSignature>>
    where
        V: Fn(&VerifyingKey, &str, &[u8], &Signature) -> Result<()>,
    {
        let result = Self::sign_with(key, artifacts, check);
        key.release();
        result
    }

    fn sign_with<V>(
        key: &ScopedKey,
        artifacts: &ArtifactSet,
        check: V,
    ) -> Result<Vec<DetachedSignature>>
    where
        V: Fn(&VerifyingKey, &str, &[u8], &Signature) -> Result<()>,
    {
        let verifying_key = key.verifying_key()?;
        artifacts
            .signable()
            .map(|file| {
                let signature = key.sign(&file.content)?;
                check(&verifying_key, file.file_name.as_str(), &file.content[..], &signature)?;
                log::debug!("Signed {}", file.file_name);
                Ok(DetachedSignature {
                    subject: file.file_name.clone(),
                    file: ArtifactFile::new(
                        format!("{}{}", file.file_name, SIGNATURE_EXTENSION),
                        ArtifactKind::Signature,
                        STANDARD.encode(signature.to_bytes()),
                    ),
                })
            })
            .collect()
    }
}

/// Check a detached signature file against `content`
pub fn verify_detached(
    verifying_key: &VerifyingKey,
    subject: &str,
    content: &[u8],
    signature_file: &[u8],
) -> Result<()> {
    let failed = || SigningError::VerificationFailed {
        file: subject.to_string(),
    };
    let raw = STANDARD.decode(signature_file).map_err(|_| failed())?;
    let bytes: [u8; 64] = raw.as_slice().try_into().map_err(|_| failed())?;
    verify(verifying_key, subject, content, &Signature::from_bytes(&bytes))
}

fn verify(
    verifying_key: &VerifyingKey,
    subject: &str,
    content: &[u8],
    signature: &Signature,
) -> Result<()> {
    verifying_key.verify(content, signature).map_err(|_| {
        SigningError::VerificationFailed {
            file: subject.to_string(),
        }
        .into()
    })
}
