use bevy_terrain_lod_preprocess::prelude::*;
use clap::Parser;

fn main() -> PreprocessResult<()> {
    let args = Cli::parse();
    let context = PreprocessContext::from_cli(args)?;

    preprocess(&context)?;

    Ok(())
}
