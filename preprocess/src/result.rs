use bevy_terrain_lod::prelude::TerrainError;
use rayon::ThreadPoolBuildError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("no output path given and the config has no cache_path")]
    MissingOutput,
    #[error("{0:?} already exists, pass --overwrite to replace it")]
    OutputExists(PathBuf),
    #[error("failed to create the thread pool")]
    ThreadPool(#[from] ThreadPoolBuildError),
    #[error(transparent)]
    Terrain(#[from] TerrainError),
}

pub type PreprocessResult<T> = Result<T, PreprocessError>;
