//! On-disk form of the index/metadata pair.
//!
//! Both files are written to temp siblings, synced, and renamed into place
//! only after the whole build has succeeded. The index header carries the
//! SHA-256 of the metadata bytes, so a pair from two different builds is
//! rejected at load instead of silently misaligning results.
//!
//! The metadata being replaced is parked at `<metadata>.prev` until the new
//! index is in place. A failed commit puts it back; a crash mid-commit leaves
//! it for `load` to pair with the untouched old index.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use sha2::{Digest, Sha256};

use super::flat::{FlatL2Index, MetadataDigest};
use super::PersistedIndex;
use crate::catalog::ProductMetadata;
use crate::core::config::{AppPaths, RagSettings};
use crate::core::errors::RagError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub index_path: PathBuf,
    pub metadata_path: PathBuf,
}

impl ArtifactPaths {
    pub fn new(index_path: impl Into<PathBuf>, metadata_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            metadata_path: metadata_path.into(),
        }
    }

    pub fn from_settings(paths: &AppPaths, settings: &RagSettings) -> Self {
        Self::new(
            paths.resolve(&settings.paths.index_file),
            paths.resolve(&settings.paths.metadata_file),
        )
    }

    fn lock_path(&self) -> PathBuf {
        sibling(&self.index_path, ".lock")
    }

    fn previous_metadata_path(&self) -> PathBuf {
        sibling(&self.metadata_path, ".prev")
    }
}

/// Exclusive advisory lock held for the duration of a rebuild.
pub struct BuildLock {
    file: File,
    path: PathBuf,
}

impl BuildLock {
    pub fn acquire(paths: &ArtifactPaths) -> Result<Self, RagError> {
        let path = paths.lock_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        file.try_lock_exclusive().map_err(|_| {
            RagError::Config(format!(
                "another build holds {}; refusing to run concurrently",
                path.display()
            ))
        })?;
        Ok(Self { file, path })
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            tracing::warn!("Failed to release build lock {}: {}", self.path.display(), err);
        }
    }
}

/// Writes the pair, replacing any previous artifacts.
///
/// On failure the previous pair is left loadable and no temp files remain.
pub fn persist(built: &PersistedIndex, paths: &ArtifactPaths) -> Result<(), RagError> {
    persist_with(built, paths, |from, to| fs::rename(from, to))
}

fn persist_with<R>(built: &PersistedIndex, paths: &ArtifactPaths, rename: R) -> Result<(), RagError>
where
    R: Fn(&Path, &Path) -> io::Result<()>,
{
    if built.metadata.len() != built.index.count() {
        return Err(RagError::Artifact(format!(
            "refusing to persist misaligned pair: {} metadata entries, {} vectors",
            built.metadata.len(),
            built.index.count()
        )));
    }

    let metadata_bytes = serde_json::to_vec_pretty(&built.metadata)
        .map_err(|e| RagError::Artifact(format!("failed to serialize metadata: {}", e)))?;
    let digest = digest_of(&metadata_bytes);

    let metadata_tmp = write_temp(&paths.metadata_path, |writer| {
        writer.write_all(&metadata_bytes)?;
        Ok(())
    })?;
    let index_tmp = match write_temp(&paths.index_path, |writer| built.index.write_to(writer, &digest)) {
        Ok(path) => path,
        Err(err) => {
            let _ = fs::remove_file(&metadata_tmp);
            return Err(err);
        }
    };

    if let Err(err) = commit(&metadata_tmp, &index_tmp, paths, &rename) {
        let _ = fs::remove_file(&metadata_tmp);
        let _ = fs::remove_file(&index_tmp);
        tracing::warn!(
            "Persisting {} failed, previous artifacts kept: {}",
            paths.index_path.display(),
            err
        );
        return Err(err);
    }

    tracing::info!(
        "Persisted {} vectors to {} (metadata {}, sha256 {})",
        built.index.count(),
        paths.index_path.display(),
        paths.metadata_path.display(),
        hex::encode(digest)
    );
    Ok(())
}

/// Swaps both temp files into place, restoring the old metadata if the
/// index cannot follow it.
fn commit<R>(
    metadata_tmp: &Path,
    index_tmp: &Path,
    paths: &ArtifactPaths,
    rename: &R,
) -> Result<(), RagError>
where
    R: Fn(&Path, &Path) -> io::Result<()>,
{
    let previous = paths.previous_metadata_path();
    let had_previous = paths.metadata_path.exists();
    if had_previous {
        rename(&paths.metadata_path, &previous)?;
    }

    let swapped = rename(metadata_tmp, &paths.metadata_path)
        .and_then(|()| rename(index_tmp, &paths.index_path));
    if let Err(err) = swapped {
        let restored = if had_previous {
            fs::rename(&previous, &paths.metadata_path)
        } else {
            match fs::remove_file(&paths.metadata_path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            }
        };
        if let Err(restore_err) = restored {
            tracing::error!(
                "Could not restore previous metadata {}: {}",
                paths.metadata_path.display(),
                restore_err
            );
        }
        return Err(err.into());
    }

    match fs::remove_file(&previous) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => {
            tracing::warn!("Failed to remove {}: {}", previous.display(), err);
        }
        _ => {}
    }
    Ok(())
}

/// Reads and cross-checks the pair. Every failure is an artifact error.
///
/// When the current metadata does not match the index but the parked
/// previous metadata does, the previous pair is returned.
pub fn load(paths: &ArtifactPaths) -> Result<PersistedIndex, RagError> {
    let err = match load_pair(&paths.index_path, &paths.metadata_path) {
        Ok(persisted) => return Ok(persisted),
        Err(err) => err,
    };

    let previous = paths.previous_metadata_path();
    if !previous.exists() {
        return Err(err);
    }
    match load_pair(&paths.index_path, &previous) {
        Ok(persisted) => {
            tracing::warn!(
                "{} ({}); serving the previous pair from {}",
                paths.metadata_path.display(),
                err,
                previous.display()
            );
            Ok(persisted)
        }
        Err(_) => Err(err),
    }
}

fn load_pair(index_path: &Path, metadata_path: &Path) -> Result<PersistedIndex, RagError> {
    let metadata_bytes = fs::read(metadata_path).map_err(|e| {
        RagError::Artifact(format!(
            "cannot read metadata {}: {}",
            metadata_path.display(),
            e
        ))
    })?;
    let metadata: Vec<ProductMetadata> = serde_json::from_slice(&metadata_bytes).map_err(|e| {
        RagError::Artifact(format!(
            "metadata {} is not a valid product array: {}",
            metadata_path.display(),
            e
        ))
    })?;

    let file = File::open(index_path).map_err(|e| {
        RagError::Artifact(format!(
            "cannot open index {}: {}",
            index_path.display(),
            e
        ))
    })?;
    let (index, recorded_digest) = FlatL2Index::read_from(&mut BufReader::new(file))?;

    if index.count() != metadata.len() {
        return Err(RagError::Artifact(format!(
            "index holds {} vectors but metadata has {} entries",
            index.count(),
            metadata.len()
        )));
    }
    let actual_digest = digest_of(&metadata_bytes);
    if actual_digest != recorded_digest {
        return Err(RagError::Artifact(format!(
            "metadata digest {} does not match index (expected {})",
            hex::encode(actual_digest),
            hex::encode(recorded_digest)
        )));
    }

    tracing::debug!(
        "Loaded index with {} vectors of dimension {}",
        index.count(),
        index.dim()
    );
    Ok(PersistedIndex { index, metadata })
}

fn digest_of(bytes: &[u8]) -> MetadataDigest {
    Sha256::digest(bytes).into()
}

fn write_temp<F>(destination: &Path, write: F) -> Result<PathBuf, RagError>
where
    F: FnOnce(&mut BufWriter<&File>) -> Result<(), RagError>,
{
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = sibling(destination, &format!(".tmp-{}", uuid::Uuid::new_v4()));

    match write_and_sync(&tmp_path, write) {
        Ok(()) => Ok(tmp_path),
        Err(err) => {
            let _ = fs::remove_file(&tmp_path);
            Err(err)
        }
    }
}

fn write_and_sync<F>(path: &Path, write: F) -> Result<(), RagError>
where
    F: FnOnce(&mut BufWriter<&File>) -> Result<(), RagError>,
{
    let file = File::create(path)?;
    {
        let mut writer = BufWriter::new(&file);
        write(&mut writer)?;
        writer.flush()?;
    }
    file.sync_all()?;
    Ok(())
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}
