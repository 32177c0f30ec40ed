//! Repository checksum files (`.md5`, `.sha1`, `.sha256`, `.sha512`).

use super::{ArtifactFile, ArtifactKind};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

/// Checksum algorithms uploaded next to every file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl Algorithm {
    /// All algorithms in upload order
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Md5,
        Algorithm::Sha1,
        Algorithm::Sha256,
        Algorithm::Sha512,
    ];

    /// File extension without the dot
    pub fn extension(self) -> &'static str {
        match self {
            Algorithm::Md5 => "md5",
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha512 => "sha512",
        }
    }

    /// Lowercase hex digest of `data`
    pub fn digest(self, data: &[u8]) -> String {
        match self {
            Algorithm::Md5 => format!("{:x}", md5::compute(data)),
            Algorithm::Sha1 => hex::encode(Sha1::digest(data)),
            Algorithm::Sha256 => hex::encode(Sha256::digest(data)),
            Algorithm::Sha512 => hex::encode(Sha512::digest(data)),
        }
    }
}

/// Checksum files for `file`
pub fn checksums(file: &ArtifactFile) -> Vec<ArtifactFile> {
    Algorithm::ALL
        .iter()
        .map(|algorithm| {
            ArtifactFile::new(
                format!("{}.{}", file.file_name, algorithm.extension()),
                ArtifactKind::Checksum,
                algorithm.digest(&file.content),
            )
        })
        .collect()
}
