//! Exact inner-product vector index persisted as a flat file.
//!
//! Rows are stored in insertion order; a row's position is its identity and
//! lines up with the `position` column of the metadata table. With
//! L2-normalized rows and queries the inner product is cosine similarity.
//!
//! # File Layout
//!
//! ```text
//! "PRIX"  u32 version  u32 dims  u64 count  count × dims × f32
//! ```
//!
//! All integers and floats are little-endian.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"PRIX";
const VERSION: u32 = 1;

/// Position returned for unfilled result slots.
pub const EMPTY_SLOT: i64 = -1;

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn encode_f32(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatIpIndex {
    dims: usize,
    data: Vec<f32>,
}

impl FlatIpIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            data: Vec::new(),
        }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        if self.dims == 0 {
            0
        } else {
            self.data.len() / self.dims
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one row. Its position is the previous `len()`.
    pub fn add(&mut self, row: &[f32]) -> Result<()> {
        if row.len() != self.dims {
            bail!(
                "vector has {} dims, index expects {}",
                row.len(),
                self.dims
            );
        }
        if row.iter().any(|v| !v.is_finite()) {
            bail!("vector contains a non-finite component");
        }
        self.data.extend_from_slice(row);
        Ok(())
    }

    fn row(&self, position: usize) -> &[f32] {
        &self.data[position * self.dims..(position + 1) * self.dims]
    }

    /// Exhaustive top-k search.
    ///
    /// Always returns exactly `top_k` pairs sorted by descending score (ties
    /// by ascending position). When the index holds fewer than `top_k` rows
    /// the tail is padded with `(EMPTY_SLOT, f32::NEG_INFINITY)`.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(i64, f32)>> {
        if query.len() != self.dims {
            bail!(
                "query has {} dims, index expects {}",
                query.len(),
                self.dims
            );
        }

        let mut scored: Vec<(i64, f32)> = (0..self.len())
            .map(|pos| (pos as i64, dot(self.row(pos), query)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(top_k);
        scored.resize(top_k, (EMPTY_SLOT, f32::NEG_INFINITY));

        Ok(scored)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create index file {}", path.display()))?;
        let mut out = BufWriter::new(file);

        out.write_all(MAGIC)?;
        out.write_all(&VERSION.to_le_bytes())?;
        out.write_all(&(self.dims as u32).to_le_bytes())?;
        out.write_all(&(self.len() as u64).to_le_bytes())?;
        out.write_all(&encode_f32(&self.data))?;
        out.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open index file {}", path.display()))?;
        let mut input = BufReader::new(file);

        let mut magic = [0u8; 4];
        input
            .read_exact(&mut magic)
            .with_context(|| format!("Truncated index file {}", path.display()))?;
        if &magic != MAGIC {
            bail!("{} is not a vector index file", path.display());
        }

        let mut word = [0u8; 4];
        input.read_exact(&mut word)?;
        let version = u32::from_le_bytes(word);
        if version != VERSION {
            bail!(
                "unsupported index version {} in {}",
                version,
                path.display()
            );
        }

        input.read_exact(&mut word)?;
        let dims = u32::from_le_bytes(word) as usize;

        let mut long = [0u8; 8];
        input.read_exact(&mut long)?;
        let count = u64::from_le_bytes(long) as usize;

        let mut body = Vec::new();
        input.read_to_end(&mut body)?;
        let Some(expected) = count.checked_mul(dims).and_then(|n| n.checked_mul(4)) else {
            bail!(
                "index file {} is corrupt: header claims {} vectors of {} dims",
                path.display(),
                count,
                dims
            );
        };
        if body.len() != expected {
            bail!(
                "index file {} is corrupt: expected {} bytes of vectors, found {}",
                path.display(),
                expected,
                body.len()
            );
        }

        Ok(Self {
            dims,
            data: decode_f32(&body),
        })
    }
}
