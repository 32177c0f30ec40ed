//! Artifact set collection and upload ordering.
//!
//! A module publication consists of the primary artifact, optional sources and javadoc
//! archives and the rendered POM. Checksums and detached signatures are derived from
//! those files right before upload.

pub mod checksum;

use crate::descriptor::ModuleDescriptor;
use crate::error::{BuildError, Result};
use crate::signing::DetachedSignature;
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use walkdir::WalkDir;

/// Role of a file inside a publication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Primary compiled artifact
    Primary,
    /// Sources archive
    Sources,
    /// Documentation archive
    Javadoc,
    /// Rendered POM
    Descriptor,
    /// Checksum of another file
    Checksum,
    /// Detached signature of another file
    Signature,
}

/// One file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    /// File name inside the version directory
    pub file_name: String,
    /// Role in the publication
    pub kind: ArtifactKind,
    /// File content
    pub content: Bytes,
}

impl ArtifactFile {
    /// Create an artifact file
    pub fn new(file_name: impl Into<String>, kind: ArtifactKind, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            kind,
            content: content.into(),
        }
    }

    /// Whether this file is signed and checksummed (everything but derived files)
    pub fn is_signable(&self) -> bool {
        !matches!(self.kind, ArtifactKind::Checksum | ArtifactKind::Signature)
    }
}

/// Files making up one module publication
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet {
    files: Vec<ArtifactFile>,
}

impl ArtifactSet {
    /// Build a set from already loaded files
    pub fn from_files(files: Vec<ArtifactFile>) -> Self {
        Self { files }
    }

    /// Collect `<artifact>-<version>.<packaging>` plus optional `-sources.jar` and
    /// `-javadoc.jar` from `dir`. The primary artifact is required.
    pub async fn collect(descriptor: &ModuleDescriptor, version: &str, dir: &Path) -> Result<Self> {
        let stem = descriptor.file_stem(version);
        let wanted = [
            (format!("{}.{}", stem, descriptor.packaging), ArtifactKind::Primary),
            (format!("{}-sources.jar", stem), ArtifactKind::Sources),
            (format!("{}-javadoc.jar", stem), ArtifactKind::Javadoc),
        ];

        let found: HashMap<String, std::path::PathBuf> = WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                Some((name, entry.into_path()))
            })
            .collect();

        let mut files = Vec::with_capacity(wanted.len() + 1);
        for (file_name, kind) in wanted {
            match found.get(&file_name) {
                Some(path) => {
                    let content = tokio::fs::read(path).await?;
                    log::debug!("Collected {} ({} bytes)", file_name, content.len());
                    files.push(ArtifactFile::new(file_name, kind, content));
                }
                None if kind == ArtifactKind::Primary => {
                    return Err(BuildError::MissingArtifact {
                        file: file_name,
                        dir: dir.to_path_buf(),
                    }
                    .into());
                }
                None => log::info!("No {:?} artifact {} in {}", kind, file_name, dir.display()),
            }
        }

        Ok(Self { files })
    }

    /// Add the rendered POM
    pub fn with_descriptor(mut self, descriptor: &ModuleDescriptor, version: &str, pom: String) -> Self {
        self.files.push(ArtifactFile::new(
            format!("{}.pom", descriptor.file_stem(version)),
            ArtifactKind::Descriptor,
            pom,
        ));
        self
    }

    /// Files that receive a detached signature
    pub fn signable(&self) -> impl Iterator<Item = &ArtifactFile> {
        self.files.iter().filter(|f| f.is_signable())
    }

    /// All files in the set
    pub fn files(&self) -> &[ArtifactFile] {
        &self.files
    }

    /// Whether the set has no files
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Full upload list: every file, its signature (if any) and checksums of both.
    ///
    /// The descriptor and its derived files come last so a publication never carries a
    /// POM for binaries that are not uploaded yet.
    pub fn upload_plan(&self, signatures: &[DetachedSignature]) -> Vec<ArtifactFile> {
        let by_subject: HashMap<&str, &ArtifactFile> = signatures
            .iter()
            .map(|sig| (sig.subject.as_str(), &sig.file))
            .collect();

        let (descriptors, others): (Vec<&ArtifactFile>, Vec<&ArtifactFile>) = self
            .files
            .iter()
            .partition(|f| f.kind == ArtifactKind::Descriptor);

        let mut plan = Vec::new();
        for file in others.into_iter().chain(descriptors) {
            plan.push(file.clone());
            plan.extend(checksum::checksums(file));
            if let Some(sig) = by_subject.get(file.file_name.as_str()) {
                plan.push((*sig).clone());
                plan.extend(checksum::checksums(sig));
            }
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::tests::{module, project};

    fn descriptor() -> ModuleDescriptor {
        ModuleDescriptor::build(&project(), &module("quark-context")).expect("descriptor")
    }

    #[tokio::test]
    async fn test_collect_requires_primary_artifact() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("quark-context-1.0.0-sources.jar"), b"src")
            .expect("write");

        let err = ArtifactSet::collect(&descriptor(), "1.0.0", dir.path())
            .await
            .expect_err("primary missing");
        assert!(err.to_string().contains("quark-context-1.0.0.jar"));
    }

    #[tokio::test]
    async fn test_collect_picks_matching_files_only() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("quark-context-1.0.0.jar"), b"jar").expect("write");
        std::fs::write(dir.path().join("quark-context-1.0.0-javadoc.jar"), b"doc")
            .expect("write");
        std::fs::write(dir.path().join("quark-context-0.9.0.jar"), b"old").expect("write");

        let set = ArtifactSet::collect(&descriptor(), "1.0.0", dir.path())
            .await
            .expect("collect");
        let names: Vec<&str> = set.files().iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["quark-context-1.0.0.jar", "quark-context-1.0.0-javadoc.jar"]);
        assert_eq!(set.files()[0].kind, ArtifactKind::Primary);
    }

    #[test]
    fn test_upload_plan_puts_descriptor_last() {
        let d = descriptor();
        let set = ArtifactSet::from_files(vec![ArtifactFile::new(
            "quark-context-1.0.0.jar",
            ArtifactKind::Primary,
            &b"jar"[..],
        )])
        .with_descriptor(&d, "1.0.0", "<project/>".to_string());

        let signature = |subject: &str| DetachedSignature {
            subject: subject.to_string(),
            file: ArtifactFile::new(format!("{}.sig", subject), ArtifactKind::Signature, &b"sig"[..]),
        };
        let signatures = vec![
            signature("quark-context-1.0.0.jar"),
            signature("quark-context-1.0.0.pom"),
        ];
        let plan = set.upload_plan(&signatures);

        // 2 files + 2 signatures, each with 4 checksums
        assert_eq!(plan.len(), 4 * 5);
        assert_eq!(plan[0].file_name, "quark-context-1.0.0.jar");
        assert_eq!(plan[5].file_name, "quark-context-1.0.0.jar.sig");
        assert_eq!(plan[10].file_name, "quark-context-1.0.0.pom");
        assert!(plan[11..].iter().all(|f| f.file_name.starts_with("quark-context-1.0.0.pom")));
    }

    #[test]
    fn test_upload_plan_without_signatures() {
        let set = ArtifactSet::from_files(vec![ArtifactFile::new(
            "a-1.0.0.jar",
            ArtifactKind::Primary,
            &b"jar"[..],
        )]);
        let plan = set.upload_plan(&[]);
        assert_eq!(plan.len(), 5);
        assert!(plan.iter().all(|f| f.kind != ArtifactKind::Signature));
    }
}
