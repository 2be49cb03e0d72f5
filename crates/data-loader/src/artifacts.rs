//! Persistence for the catalog/similarity artifact pair.
//!
//! Layout of an artifact directory:
//! - `catalog.json`: JSON array of `{ "id": .., "title": .. }`
//! - `similarity.bin`: `SIMM` magic, format version (u32 LE), N (u64 LE),
//!   then N*N little-endian f32 values in row-major order
//!
//! The two files are only ever written and read together. `save` stages
//! both under temporary names and renames them into place only once both
//! are fully written, so a failed save leaves the previous pair untouched.

use crate::error::{DataLoadError, Result};
use crate::types::{Catalog, SimilarityMatrix};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

pub const CATALOG_FILE: &str = "catalog.json";
pub const SIMILARITY_FILE: &str = "similarity.bin";

const MAGIC: &[u8; 4] = b"SIMM";
const FORMAT_VERSION: u32 = 1;
const STAGING_SUFFIX: &str = ".partial";
/// Values reserved up front; the rest grows as bytes actually arrive
const MAX_PREALLOCATED: usize = 1 << 20;

/// Reads and writes artifacts under one directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.dir.join(CATALOG_FILE)
    }

    pub fn similarity_path(&self) -> PathBuf {
        self.dir.join(SIMILARITY_FILE)
    }

    fn staging_path(path: &Path) -> PathBuf {
        let mut staged = path.as_os_str().to_owned();
        staged.push(STAGING_SUFFIX);
        PathBuf::from(staged)
    }

    /// Persist a matched catalog/matrix pair.
    ///
    /// Refuses to write anything if the two disagree on N. Both files are
    /// written to staging names first; nothing visible changes unless both
    /// writes succeed.
    #[instrument(skip(self, catalog, matrix), fields(dir = %self.dir.display()))]
    pub fn save(&self, catalog: &Catalog, matrix: &SimilarityMatrix) -> Result<()> {
        check_aligned(catalog, matrix)?;
        fs::create_dir_all(&self.dir)?;

        let catalog_path = self.catalog_path();
        let similarity_path = self.similarity_path();
        let staged_catalog = Self::staging_path(&catalog_path);
        let staged_similarity = Self::staging_path(&similarity_path);

        let staged = write_file(&staged_catalog, |w| Ok(serde_json::to_writer(w, catalog)?))
            .and_then(|()| write_file(&staged_similarity, |w| write_matrix(w, matrix)));
        if let Err(e) = staged {
            discard(&staged_catalog);
            discard(&staged_similarity);
            return Err(e);
        }

        // Matrix first: once the catalog moves, the new pair is complete
        if let Err(e) = fs::rename(&staged_similarity, &similarity_path) {
            discard(&staged_catalog);
            discard(&staged_similarity);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&staged_catalog, &catalog_path) {
            // The old catalog must not pair with the new matrix
            warn!("Removing stale catalog after failed rename: {}", e);
            discard(&catalog_path);
            discard(&staged_catalog);
            return Err(e.into());
        }

        info!(
            "Saved catalog ({} movies) and {}x{} similarity matrix",
            catalog.len(),
            matrix.dim(),
            matrix.dim()
        );
        Ok(())
    }

    /// Load the pair, failing if either half is absent, malformed, or they
    /// disagree on N
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub fn load(&self) -> Result<(Catalog, SimilarityMatrix)> {
        let catalog_path = self.catalog_path();
        let similarity_path = self.similarity_path();
        for path in [&catalog_path, &similarity_path] {
            if !path.is_file() {
                return Err(DataLoadError::ArtifactMissing {
                    path: path.display().to_string(),
                });
            }
        }

        let catalog: Catalog = serde_json::from_reader(BufReader::new(File::open(&catalog_path)?))?;
        debug!("Read {} catalog entries", catalog.len());

        let matrix = read_matrix(&mut BufReader::new(File::open(&similarity_path)?))?;
        check_aligned(&catalog, &matrix)?;

        info!("Loaded artifacts for {} movies", catalog.len());
        Ok((catalog, matrix))
    }
}

fn write_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    write(&mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

fn discard(path: &Path) {
    if path.is_file() {
        let _ = fs::remove_file(path);
    }
}

/// Error unless the catalog and the matrix describe the same N movies
pub fn check_aligned(catalog: &Catalog, matrix: &SimilarityMatrix) -> Result<()> {
    if catalog.len() != matrix.dim() {
        return Err(DataLoadError::ArtifactMismatch {
            catalog_len: catalog.len(),
            matrix_len: matrix.dim(),
        });
    }
    Ok(())
}

pub fn write_matrix<W: Write>(writer: &mut W, matrix: &SimilarityMatrix) -> Result<()> {
    writer.write_all(MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    writer.write_all(&(matrix.dim() as u64).to_le_bytes())?;
    for value in matrix.as_slice() {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

/// Decode a matrix, rejecting bad headers, short or long bodies, and any
/// value that is not a finite cosine
pub fn read_matrix<R: Read>(reader: &mut R) -> Result<SimilarityMatrix> {
    let mut magic = [0u8; 4];
    read_exact(reader, &mut magic, "header")?;
    if &magic != MAGIC {
        return Err(DataLoadError::InvalidArtifact(
            "similarity file has an unknown header".to_string(),
        ));
    }

    let mut word = [0u8; 4];
    read_exact(reader, &mut word, "format version")?;
    let version = u32::from_le_bytes(word);
    if version != FORMAT_VERSION {
        return Err(DataLoadError::InvalidArtifact(format!(
            "unsupported similarity format version {}",
            version
        )));
    }

    let mut dword = [0u8; 8];
    read_exact(reader, &mut dword, "dimension")?;
    let too_large = |dim| DataLoadError::InvalidArtifact(format!("dimension {} is too large", dim));
    let raw_dim = u64::from_le_bytes(dword);
    let dim = usize::try_from(raw_dim).map_err(|_| too_large(raw_dim))?;
    let count = dim
        .checked_mul(dim)
        .filter(|count| count.checked_mul(4).is_some())
        .ok_or_else(|| too_large(raw_dim))?;

    // The header is untrusted; never reserve more than a bounded amount
    let mut values = Vec::with_capacity(count.min(MAX_PREALLOCATED));
    for _ in 0..count {
        read_exact(reader, &mut word, "matrix values")?;
        values.push(f32::from_le_bytes(word));
    }

    let mut trailing = [0u8; 1];
    if reader.read(&mut trailing)? != 0 {
        return Err(DataLoadError::InvalidArtifact(
            "similarity file has trailing bytes".to_string(),
        ));
    }

    let matrix = SimilarityMatrix::from_row_major(dim, values)?;
    matrix.check_scores()?;
    Ok(matrix)
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => {
            DataLoadError::InvalidArtifact(format!("similarity file truncated in {}", what))
        }
        _ => DataLoadError::IoError(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CatalogEntry;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn scratch_dir() -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "data-loader-artifacts-{}-{}",
            std::process::id(),
            n
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn sample() -> (Catalog, SimilarityMatrix) {
        let catalog = Catalog::new(vec![
            CatalogEntry {
                id: 1,
                title: "Alien".to_string(),
            },
            CatalogEntry {
                id: 2,
                title: "Aliens".to_string(),
            },
        ]);
        let matrix = SimilarityMatrix::from_row_major(2, vec![1.0, 0.5, 0.5, 1.0]).unwrap();
        (catalog, matrix)
    }

    #[test]
    fn test_save_then_load() {
        let dir = scratch_dir();
        let store = ArtifactStore::new(&dir);
        let (catalog, matrix) = sample();

        store.save(&catalog, &matrix).unwrap();
        let (loaded_catalog, loaded_matrix) = store.load().unwrap();

        assert_eq!(loaded_catalog, catalog);
        assert_eq!(loaded_matrix, matrix);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_load_without_matrix_is_missing() {
        let dir = scratch_dir();
        let store = ArtifactStore::new(&dir);
        let (catalog, matrix) = sample();
        store.save(&catalog, &matrix).unwrap();
        fs::remove_file(store.similarity_path()).unwrap();

        let result = store.load();
        assert!(matches!(result, Err(DataLoadError::ArtifactMissing { .. })));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_load_with_mismatched_sizes_fails() {
        let dir = scratch_dir();
        let store = ArtifactStore::new(&dir);
        let (catalog, matrix) = sample();
        store.save(&catalog, &matrix).unwrap();

        let shorter = Catalog::new(catalog.entries()[..1].to_vec());
        fs::write(store.catalog_path(), serde_json::to_vec(&shorter).unwrap()).unwrap();

        let result = store.load();
        assert!(matches!(
            result,
            Err(DataLoadError::ArtifactMismatch {
                catalog_len: 1,
                matrix_len: 2
            })
        ));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_save_refuses_mismatched_pair() {
        let store = ArtifactStore::new(scratch_dir());
        let (catalog, _) = sample();
        let matrix = SimilarityMatrix::from_row_major(1, vec![1.0]).unwrap();

        assert!(store.save(&catalog, &matrix).is_err());
        assert!(!store.catalog_path().exists());
    }

    #[test]
    fn test_truncated_matrix_is_invalid() {
        let (_, matrix) = sample();
        let mut bytes = Vec::new();
        write_matrix(&mut bytes, &matrix).unwrap();
        bytes.truncate(bytes.len() - 2);

        let result = read_matrix(&mut bytes.as_slice());
        assert!(matches!(result, Err(DataLoadError::InvalidArtifact(_))));
    }

    fn header(magic: &[u8; 4], version: u32, dim: u64) -> Vec<u8> {
        let mut bytes = magic.to_vec();
        bytes.extend_from_slice(&version.to_le_bytes());
        bytes.extend_from_slice(&dim.to_le_bytes());
        bytes
    }

    #[test]
    fn test_oversized_dimension_is_invalid() {
        for dim in [1u64 << 31, u64::MAX] {
            let bytes = header(MAGIC, FORMAT_VERSION, dim);
            let result = read_matrix(&mut bytes.as_slice());
            assert!(matches!(result, Err(DataLoadError::InvalidArtifact(_))));
        }
    }

    #[test]
    fn test_bad_header_is_invalid() {
        let bad_magic = header(b"MISS", FORMAT_VERSION, 0);
        assert!(matches!(
            read_matrix(&mut bad_magic.as_slice()),
            Err(DataLoadError::InvalidArtifact(_))
        ));

        let bad_version = header(MAGIC, FORMAT_VERSION + 1, 0);
        assert!(matches!(
            read_matrix(&mut bad_version.as_slice()),
            Err(DataLoadError::InvalidArtifact(_))
        ));
    }

    #[test]
    fn test_non_finite_value_is_invalid() {
        let mut bytes = header(MAGIC, FORMAT_VERSION, 2);
        for value in [1.0f32, f32::NAN, 0.5, 1.0] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        let result = read_matrix(&mut bytes.as_slice());
        assert!(matches!(result, Err(DataLoadError::InvalidArtifact(_))));
    }

    #[test]
    fn test_failed_save_keeps_previous_pair() {
        let dir = scratch_dir();
        let store = ArtifactStore::new(&dir);
        let (catalog, matrix) = sample();
        store.save(&catalog, &matrix).unwrap();

        // A directory in the way makes the matrix write fail
        let blocker = ArtifactStore::staging_path(&store.similarity_path());
        fs::create_dir_all(&blocker).unwrap();

        let renamed = Catalog::new(vec![
            CatalogEntry {
                id: 7,
                title: "Heat".to_string(),
            },
            CatalogEntry {
                id: 8,
                title: "Ronin".to_string(),
            },
        ]);
        assert!(store.save(&renamed, &matrix).is_err());
        assert!(!ArtifactStore::staging_path(&store.catalog_path()).exists());

        let (loaded_catalog, loaded_matrix) = store.load().unwrap();
        assert_eq!(loaded_catalog, catalog);
        assert_eq!(loaded_matrix, matrix);
        let _ = fs::remove_dir_all(dir);
    }
}
