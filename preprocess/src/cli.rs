use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

const BAR_SIZE: u64 = 10000;

/// Estimates the geometric errors of a terrain and writes them to its cache.
#[derive(Parser, Debug)]
#[command(name = "btlod", author, version, about)]
pub struct Cli {
    /// The heightmap, a grayscale image or a tiff elevation model.
    #[arg(required = true)]
    pub heightmap_path: PathBuf,
    /// The terrain config (`*.lod.ron`).
    #[arg(required = true)]
    pub config_path: PathBuf,
    /// Where to write the cache, defaults to the `cache_path` of the config.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[arg(short = 'f', long, default_value_t = false)]
    pub overwrite: bool,
    /// The number of worker threads, all cores are used by default.
    #[arg(short, long)]
    pub threads: Option<usize>,
}

pub(crate) struct PreprocessBar {
    name: String,
    bar: ProgressBar,
}

impl PreprocessBar {
    pub(crate) fn new(name: String) -> Self {
        let style = ProgressStyle::with_template(
            &(name.clone() + ": {wide_bar} {percent} % [{elapsed}/{duration}]"),
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());

        Self {
            name,
            bar: ProgressBar::new(BAR_SIZE).with_style(style),
        }
    }

    pub(crate) fn callback(&self) -> impl Fn(f64) + Sync {
        let progress_bar = self.bar.clone();

        move |completion| progress_bar.set_position((completion * BAR_SIZE as f64) as u64)
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
        println!("{} took: {:?}", self.name, self.bar.elapsed());
    }
}
