use super::flat::FlatL2Index;
use super::{IndexEntry, PersistedIndex};
use crate::catalog::ProductMetadata;
use crate::core::errors::RagError;

/// Accumulates `(vector, metadata)` pairs in lockstep.
///
/// The index dimension is fixed by the first vector added. Vectors and
/// metadata only ever grow together, so `metadata[i]` always describes
/// `index.vector(i)`.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    index: Option<FlatL2Index>,
    metadata: Vec<ProductMetadata>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    pub fn dim(&self) -> Option<usize> {
        self.index.as_ref().map(FlatL2Index::dim)
    }

    pub fn add(&mut self, entry: IndexEntry) -> Result<(), RagError> {
        if self.index.is_none() {
            self.index = Some(FlatL2Index::new(entry.vector.len())?);
        }
        let Some(index) = self.index.as_mut() else {
            return Err(RagError::NoVectors);
        };
        index.add(&entry.vector).map_err(|err| match err {
            RagError::DimensionMismatch { expected, actual } => RagError::Config(format!(
                "embedding dimension changed mid-build: expected {}, got {} for '{}'",
                expected, actual, entry.metadata.title
            )),
            other => other,
        })?;
        self.metadata.push(entry.metadata);
        Ok(())
    }

    pub fn extend<I>(&mut self, entries: I) -> Result<(), RagError>
    where
        I: IntoIterator<Item = IndexEntry>,
    {
        for entry in entries {
            self.add(entry)?;
        }
        Ok(())
    }

    /// Finalizes the aligned pair. Fails with `NoVectors` if nothing was
    /// added.
    pub fn finish(self) -> Result<PersistedIndex, RagError> {
        let index = self.index.ok_or(RagError::NoVectors)?;
        debug_assert_eq!(index.count(), self.metadata.len());
        Ok(PersistedIndex {
            index,
            metadata: self.metadata,
        })
    }
}
