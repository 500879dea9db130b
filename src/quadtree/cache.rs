use crate::{
    error::{TerrainError, TerrainResult},
    quadtree::{ChunkIndex, TreeLayout},
};
use bevy::log::{debug, info};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    ffi::OsString,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// The current version of the cache file format.
pub const CACHE_VERSION: u32 = 1;

/// The persisted geometric errors of all chunks of a quadtree.
///
/// Estimating the geometric errors makes up nearly all of the time spent building a quadtree.
/// The cache stores the result of that pass, so that subsequent builds of the same terrain
/// can skip it. The layout of the tree the errors belong to is stored alongside,
/// so that caches of a different terrain configuration are rejected instead of silently used.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometricErrorCache {
    pub version: u32,
    pub layout: TreeLayout,
    pub errors: BTreeMap<ChunkIndex, f32>,
}

impl GeometricErrorCache {
    pub fn new(layout: TreeLayout, errors: BTreeMap<ChunkIndex, f32>) -> Self {
        Self {
            version: CACHE_VERSION,
            layout,
            errors,
        }
    }

    /// Writes the cache atomically.
    ///
    /// The data is written to a temporary file next to the destination first, which then
    /// replaces the destination, so that an interrupted write never leaves a partial cache.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> TerrainResult<()> {
        let path = path.as_ref();
        let temp_path = temp_path(path);

        let encoded = ron::ser::to_string_pretty(self, PrettyConfig::default())
            .map_err(TerrainError::serialize(path))?;

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(TerrainError::io(parent))?;
        }

        if let Err(error) = write_then_rename(&temp_path, path, encoded.as_bytes()) {
            // the destination is untouched, only the partial temporary file has to go
            let _ = fs::remove_file(&temp_path);
            return Err(error);
        }

        info!(
            "Saved the geometric errors of {} chunks to {:?}.",
            self.errors.len(),
            path
        );

        Ok(())
    }

    /// Reads a cache written by [`save`](Self::save).
    ///
    /// Whether it matches a terrain is checked separately by [`validate`](Self::validate).
    pub fn load<P: AsRef<Path>>(path: P) -> TerrainResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(TerrainError::MissingCache(path.to_path_buf()));
        }

        let encoded = fs::read_to_string(path).map_err(TerrainError::io(path))?;
        let cache: Self = ron::from_str(&encoded).map_err(TerrainError::parse(path))?;

        if cache.version != CACHE_VERSION {
            return Err(TerrainError::StaleCache(format!(
                "{path:?} has version {}, but version {CACHE_VERSION} is required",
                cache.version
            )));
        }

        debug!(
            "Loaded the geometric errors of {} chunks from {:?}.",
            cache.errors.len(),
            path
        );

        Ok(cache)
    }

    /// Checks that the cache was created for a quadtree with the expected layout
    /// and contains exactly one error per chunk.
    pub fn validate(&self, expected: &TreeLayout) -> TerrainResult<()> {
        if self.layout != *expected {
            return Err(TerrainError::StaleCache(format!(
                "it was created for {:?}, but the terrain requires {:?}",
                self.layout, expected
            )));
        }

        if self.errors.len() != expected.chunk_count as usize {
            return Err(TerrainError::StaleCache(format!(
                "it contains {} errors, but the terrain has {} chunks",
                self.errors.len(),
                expected.chunk_count
            )));
        }

        // the keys are sorted and unique, so this checks for the dense range 0..chunk_count
        if let Some(index) = self
            .errors
            .keys()
            .zip(0..)
            .find_map(|(&index, position)| (index != position).then_some(index))
        {
            return Err(TerrainError::StaleCache(format!(
                "chunk index {index} is outside of the range 0..{}",
                expected.chunk_count
            )));
        }

        if let Some((index, error)) = self
            .errors
            .iter()
            .find(|(_, error)| !error.is_finite() || **error < 0.0)
        {
            return Err(TerrainError::StaleCache(format!(
                "chunk {index} has the invalid error {error}"
            )));
        }

        Ok(())
    }
}

fn write_then_rename(temp_path: &Path, path: &Path, data: &[u8]) -> TerrainResult<()> {
    let file = File::create(temp_path).map_err(TerrainError::io(temp_path))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(data).map_err(TerrainError::io(temp_path))?;

    let file = writer
        .into_inner()
        .map_err(|error| TerrainError::io(temp_path)(error.into_error()))?;
    file.sync_all().map_err(TerrainError::io(temp_path))?;

    fs::rename(temp_path, path).map_err(TerrainError::io(path))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut temp_path = OsString::from(path.as_os_str());
    temp_path.push(".tmp");
    temp_path.into()
}
