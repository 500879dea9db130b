mod cli;
mod result;

use crate::cli::PreprocessBar;
use bevy_terrain_lod::prelude::*;
use std::{path::PathBuf, time::Instant};

pub mod prelude {
    pub use crate::{
        PreprocessContext, PreprocessSummary,
        cli::Cli,
        preprocess,
        result::{PreprocessError, PreprocessResult},
    };
}

pub use crate::result::{PreprocessError, PreprocessResult};

/// Everything needed to preprocess a terrain, resolved from the command line.
#[derive(Clone, Debug)]
pub struct PreprocessContext {
    pub heightmap_path: PathBuf,
    pub config: TerrainConfig,
    pub cache_path: PathBuf,
    pub overwrite: bool,
    pub threads: Option<usize>,
}

impl PreprocessContext {
    pub fn from_cli(args: cli::Cli) -> PreprocessResult<Self> {
        let config = TerrainConfig::load_file(&args.config_path)?;

        let cache_path = args
            .output
            .or_else(|| config.cache_path.clone())
            .ok_or(PreprocessError::MissingOutput)?;

        Ok(Self {
            heightmap_path: args.heightmap_path,
            config,
            cache_path,
            overwrite: args.overwrite,
            threads: args.threads,
        })
    }
}

/// What a preprocessing run produced.
#[derive(Clone, Copy, Debug)]
pub struct PreprocessSummary {
    pub chunk_count: u32,
    pub depth: u32,
    pub max_error: f32,
}

/// Estimates the geometric errors of all chunks in parallel and writes them to the cache.
pub fn preprocess(context: &PreprocessContext) -> PreprocessResult<PreprocessSummary> {
    if context.cache_path.exists() && !context.overwrite {
        return Err(PreprocessError::OutputExists(context.cache_path.clone()));
    }

    let start_preprocessing = Instant::now();

    let heightmap = Heightmap::load_file(&context.heightmap_path)?;
    let builder = QuadtreeBuilder::new(&context.config, &heightmap)?;

    println!(
        "Preprocessing a {0}x{0} heightmap into {1} chunks with a depth of {2}.",
        builder.layout().heightmap_size,
        builder.layout().chunk_count,
        builder.layout().depth
    );

    let mut pool = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = context.threads {
        pool = pool.num_threads(threads);
    }
    let pool = pool.build()?;

    let progress_bar = PreprocessBar::new("Estimating errors".to_string());
    let quadtree = pool.install(|| {
        builder.build_with_progress(ErrorSource::Compute, progress_bar.callback())
    })?;
    progress_bar.finish();

    quadtree.error_cache().save(&context.cache_path)?;

    println!(
        "Preprocessing took: {:?}, the cache was written to {:?}.",
        start_preprocessing.elapsed(),
        context.cache_path
    );

    Ok(PreprocessSummary {
        chunk_count: quadtree.chunk_count(),
        depth: quadtree.depth(),
        max_error: quadtree.root().geometric_error(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use image::{ImageBuffer, Luma};
    use std::ffi::OsStr;

    fn write_terrain(dir: &std::path::Path) -> (PathBuf, PathBuf) {
        let heightmap_path = dir.join("heightmap.png");
        let image: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_fn(64, 64, |x, y| {
            Luma([((x * 997 + y * 131) % 1024) as u16 * 64])
        });
        image.save(&heightmap_path).unwrap();

        let config_path = dir.join("terrain.lod.ron");
        let config = TerrainConfig {
            grid_size: 8,
            cache_path: Some(dir.join("chunks.ron")),
            ..Default::default()
        };
        config.save_file(&config_path).unwrap();

        (heightmap_path, config_path)
    }

    #[test]
    fn writes_a_usable_cache() {
        let dir = tempfile::tempdir().unwrap();
        let (heightmap_path, config_path) = write_terrain(dir.path());

        let args = Cli::parse_from([
            OsStr::new("btlod"),
            heightmap_path.as_os_str(),
            config_path.as_os_str(),
            OsStr::new("--threads"),
            OsStr::new("2"),
        ]);
        let context = PreprocessContext::from_cli(args).unwrap();
        assert_eq!(context.cache_path, dir.path().join("chunks.ron"));

        let summary = preprocess(&context).unwrap();
        assert_eq!(summary.chunk_count, 1 + 4 + 16 + 64);
        assert_eq!(summary.depth, 3);
        assert!(summary.max_error > 0.0);

        // the terrain can now be built without preprocessing
        let config = TerrainConfig {
            do_preprocessing: false,
            ..TerrainConfig::load_file(&config_path).unwrap()
        };
        let heightmap = Heightmap::load_file(&heightmap_path).unwrap();
        let quadtree = TerrainQuadtree::build(&config, &heightmap).unwrap();
        assert_eq!(quadtree.root().geometric_error(), summary.max_error);

        // existing caches are kept unless overwriting is requested
        assert!(matches!(
            preprocess(&context),
            Err(PreprocessError::OutputExists(_))
        ));
        let context = PreprocessContext {
            overwrite: true,
            ..context
        };
        assert!(preprocess(&context).is_ok());
    }

    #[test]
    fn requires_an_output() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("terrain.lod.ron");
        TerrainConfig::default().save_file(&config_path).unwrap();

        let args = Cli::parse_from(["btlod", "heightmap.png", config_path.to_str().unwrap()]);
        assert!(matches!(
            PreprocessContext::from_cli(args),
            Err(PreprocessError::MissingOutput)
        ));
    }
}
