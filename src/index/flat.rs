use std::cmp::Ordering;
use std::io::{Read, Write};

use ndarray::{ArrayView1, ArrayView2, Axis};
use serde::Serialize;

use crate::core::errors::RagError;

const MAGIC: &[u8; 4] = b"PRIX";
const FORMAT_VERSION: u32 = 1;

/// SHA-256 of the metadata file the index was written alongside.
pub type MetadataDigest = [u8; 32];

/// A search hit: position in the index and squared L2 distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// Exhaustive squared-L2 index over fixed-dimension vectors, stored
/// row-major in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dim: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dim: usize) -> Result<Self, RagError> {
        if dim == 0 {
            return Err(RagError::Config("index dimension must be positive".to_string()));
        }
        Ok(Self {
            dim,
            data: Vec::new(),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn count(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn add(&mut self, vector: &[f32]) -> Result<(), RagError> {
        self.check_dim(vector.len())?;
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// The vector stored at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dim)?;
        let end = start.checked_add(self.dim)?;
        self.data.get(start..end)
    }

    /// Returns up to `k` nearest vectors, closest first. Equal distances
    /// are ordered by position.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, RagError> {
        self.check_dim(query.len())?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let rows = ArrayView2::from_shape((self.count(), self.dim), &self.data)
            .map_err(|e| RagError::Artifact(format!("index storage is inconsistent: {}", e)))?;
        let query = ArrayView1::from(query);
        let diff = &rows - &query.insert_axis(Axis(0));
        let distances = diff.mapv(|x| x * x).sum_axis(Axis(1));

        let mut neighbors: Vec<Neighbor> = distances
            .iter()
            .enumerate()
            .map(|(position, &distance)| Neighbor { position, distance })
            .collect();
        neighbors.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.position.cmp(&b.position))
        });
        neighbors.truncate(k);

        Ok(neighbors)
    }

    /// Writes the index with `digest` bound into its header.
    pub fn write_to<W: Write>(&self, writer: &mut W, digest: &MetadataDigest) -> Result<(), RagError> {
        let dim = u32::try_from(self.dim)
            .map_err(|_| RagError::Config(format!("dimension {} too large", self.dim)))?;

        writer.write_all(MAGIC)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
        writer.write_all(&dim.to_le_bytes())?;
        writer.write_all(&(self.count() as u64).to_le_bytes())?;
        writer.write_all(digest)?;
        for value in &self.data {
            writer.write_all(&value.to_le_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads an index and the metadata digest recorded with it.
    ///
    /// Any structural problem, including trailing bytes, is an artifact
    /// error.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<(Self, MetadataDigest), RagError> {
        let mut magic = [0u8; 4];
        read_exact(reader, &mut magic, "magic")?;
        if &magic != MAGIC {
            return Err(RagError::Artifact("index file has an unknown format".to_string()));
        }

        let mut buf4 = [0u8; 4];
        let mut buf8 = [0u8; 8];

        read_exact(reader, &mut buf4, "version")?;
        let version = u32::from_le_bytes(buf4);
        if version != FORMAT_VERSION {
            return Err(RagError::Artifact(format!(
                "unsupported index version: {}",
                version
            )));
        }

        read_exact(reader, &mut buf4, "dimension")?;
        let dim = u32::from_le_bytes(buf4) as usize;
        if dim == 0 {
            return Err(RagError::Artifact("index dimension is zero".to_string()));
        }

        read_exact(reader, &mut buf8, "count")?;
        let count = usize::try_from(u64::from_le_bytes(buf8))
            .map_err(|_| RagError::Artifact("index count overflows".to_string()))?;

        let mut digest = [0u8; 32];
        read_exact(reader, &mut digest, "metadata digest")?;

        let byte_len = count
            .checked_mul(dim)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| RagError::Artifact("index size overflows".to_string()))?;
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| RagError::Artifact(format!("index body unreadable: {}", e)))?;
        if bytes.len() != byte_len {
            return Err(RagError::Artifact(format!(
                "index body is {} bytes, expected {} for {} vectors of dimension {}",
                bytes.len(),
                byte_len,
                count,
                dim
            )));
        }

        let data = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Ok((Self { dim, data }, digest))
    }

    fn check_dim(&self, actual: usize) -> Result<(), RagError> {
        if actual != self.dim {
            return Err(RagError::DimensionMismatch {
                expected: self.dim,
                actual,
            });
        }
        Ok(())
    }
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], field: &str) -> Result<(), RagError> {
    reader
        .read_exact(buf)
        .map_err(|e| RagError::Artifact(format!("index file truncated at {}: {}", field, e)))
}
