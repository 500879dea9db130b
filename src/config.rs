use crate::error::{TerrainError, TerrainResult};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::{
    f32::consts::FRAC_PI_4,
    fs,
    path::{Path, PathBuf},
};

/// The configuration of a terrain.
///
/// Everything the quadtree builder and the chunk selection depend on lives in here,
/// so that a terrain can be rebuilt deterministically from its config and heightmap.
/// It is stored next to the terrain data as a `*.lod.ron` file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Half the side length of the square terrain footprint, centered at the origin.
    pub terrain_extent: f32,
    /// The height of a heightmap sample with the value one.
    pub max_height: f32,
    /// The number of cells per side of the common grid every chunk is rendered with.
    pub grid_size: u32,
    /// The largest screen space error in pixels that is tolerated before a chunk is refined.
    pub max_screen_space_error: f32,
    /// The height of the viewport in pixels.
    pub viewport_height: f32,
    /// The vertical field of view of the viewer in radians.
    pub vertical_fov: f32,
    /// Whether the geometric errors are recomputed (and the cache rewritten),
    /// or loaded from the cache.
    pub do_preprocessing: bool,
    /// The location of the geometric error cache.
    pub cache_path: Option<PathBuf>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            terrain_extent: 1024.0,
            max_height: 256.0,
            grid_size: 16,
            max_screen_space_error: 0.075,
            viewport_height: 768.0,
            vertical_fov: FRAC_PI_4,
            do_preprocessing: true,
            cache_path: None,
        }
    }
}

impl TerrainConfig {
    /// Checks that all values are in their valid range.
    pub fn validate(&self) -> TerrainResult<()> {
        fn positive(name: &str, value: f32) -> TerrainResult<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(TerrainError::InvalidConfig(format!(
                    "{name} has to be positive and finite, but is {value}"
                )))
            }
        }

        positive("terrain_extent", self.terrain_extent)?;
        positive("max_height", self.max_height)?;
        positive("max_screen_space_error", self.max_screen_space_error)?;
        positive("viewport_height", self.viewport_height)?;
        positive("vertical_fov", self.vertical_fov)?;

        if self.vertical_fov >= std::f32::consts::PI {
            return Err(TerrainError::InvalidConfig(format!(
                "vertical_fov has to be smaller than pi, but is {}",
                self.vertical_fov
            )));
        }
        if self.grid_size == 0 {
            return Err(TerrainError::InvalidConfig(
                "grid_size has to be at least one".to_string(),
            ));
        }

        Ok(())
    }

    /// Converts a world space error at a distance of one into pixels.
    #[inline]
    pub fn perspective_scaling_factor(&self) -> f32 {
        self.viewport_height / (2.0 * (self.vertical_fov / 2.0).tan())
    }

    pub fn load_file<P: AsRef<Path>>(path: P) -> TerrainResult<Self> {
        let path = path.as_ref();
        let encoded = fs::read_to_string(path).map_err(TerrainError::io(path))?;

        let config: Self = ron::from_str(&encoded).map_err(TerrainError::parse(path))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_file<P: AsRef<Path>>(&self, path: P) -> TerrainResult<()> {
        let path = path.as_ref();
        let encoded = ron::ser::to_string_pretty(self, PrettyConfig::default())
            .map_err(TerrainError::serialize(path))?;

        fs::write(path, encoded).map_err(TerrainError::io(path))
    }
}
