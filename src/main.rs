//! media-downloader - audio and video downloads through yt-dlp

use clap::Parser;
use eyre::Result;
use media_downloader_lib::cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    media_downloader_lib::run(Cli::parse())
}
