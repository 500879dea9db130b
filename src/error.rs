use std::{io, path::PathBuf};
use thiserror::Error;

/// Everything that can prevent a terrain from being built.
///
/// Once a [`TerrainQuadtree`](crate::quadtree::TerrainQuadtree) exists, selecting and culling
/// its chunks can not fail anymore.
#[derive(Error, Debug)]
pub enum TerrainError {
    #[error("invalid terrain config: {0}")]
    InvalidConfig(String),
    #[error(
        "a heightmap of {width}x{height} texels can not be subdivided with a grid size of {grid_size}: {reason}"
    )]
    ResolutionMismatch {
        width: u32,
        height: u32,
        grid_size: u32,
        reason: &'static str,
    },
    #[error("no geometric error cache found at {0:?}, enable preprocessing to create one")]
    MissingCache(PathBuf),
    #[error("the geometric error cache is stale: {0}")]
    StaleCache(String),
    #[error("failed to parse {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("failed to serialize {path:?}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: ron::Error,
    },
    #[error("failed to access {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unsupported heightmap: {0}")]
    UnsupportedHeightmap(String),
    #[error("failed to decode the heightmap image")]
    Image(#[from] image::ImageError),
    #[error("failed to decode the heightmap tiff")]
    Tiff(#[from] tiff::TiffError),
}

impl TerrainError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>) -> impl FnOnce(ron::error::SpannedError) -> Self {
        let path = path.into();
        move |source| Self::Parse { path, source }
    }

    pub(crate) fn serialize(path: impl Into<PathBuf>) -> impl FnOnce(ron::Error) -> Self {
        let path = path.into();
        move |source| Self::Serialize { path, source }
    }
}

pub type TerrainResult<T> = Result<T, TerrainError>;
