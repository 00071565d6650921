pub mod cli;
pub mod downloader;

use std::io;
use std::sync::Arc;

use eyre::{Context, Result};

use cli::{Cli, Commands};
use downloader::backends::YtDlpFetcher;
use downloader::tools::{format_tool_report, ToolManager};
use downloader::{ConsoleProgress, Downloader, DownloaderConfig, MediaRequest, RenderStyle};

/// Dispatch a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    tracing::debug!(?cli, "parsed arguments");
    let config = DownloaderConfig::from(&cli.global);

    match cli.command {
        Commands::Tools(args) => {
            let tools = ToolManager::new()
                .with_ytdlp_override(config.ytdlp_path.clone())
                .get_all_tools();

            if args.json {
                println!("{}", serde_json::to_string_pretty(&tools)?);
            } else {
                println!("{}", format_tool_report(&tools));
            }
            Ok(())
        }
        Commands::Audio(args) => {
            let (url, request) = args
                .resolve(&mut io::stdin().lock(), &mut io::stdout())
                .wrap_err("failed to read input")?;
            execute(config, &url, request)
        }
        Commands::Video(args) => {
            let (url, request) = args
                .resolve(&mut io::stdin().lock(), &mut io::stdout())
                .wrap_err("failed to read input")?;
            execute(config, &url, request)
        }
    }
}

fn execute(config: DownloaderConfig, url: &str, request: MediaRequest) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to start async runtime")?;

    let fetcher = YtDlpFetcher::new(&config);
    tracing::debug!(ytdlp = %fetcher.ytdlp_path().display(), "using yt-dlp");

    let downloader = Downloader::new(Box::new(fetcher), config);
    let listener = Arc::new(ConsoleProgress::stdout(RenderStyle::from(&request)));

    runtime
        .block_on(downloader.run(url, &request, listener))
        .wrap_err_with(|| format!("download failed for {url:?}"))?;

    Ok(())
}
