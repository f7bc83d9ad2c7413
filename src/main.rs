use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser as _;

use mangagrab::cli::{ChaptersArgs, Cli, Command, CrawlArgs, ImagesArgs};
use mangagrab::config::Timing;
use mangagrab::crawl::Crawler;
use mangagrab::http::HttpConnector;
use mangagrab::mirror::MirrorResolver;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    mangagrab::logging::init().context("init logging")?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        Command::Crawl(args) => crawl(args).await.context("crawl")?,
        Command::Chapters(args) => chapters(args).await.context("chapters")?,
        Command::Images(args) => images(args).await.context("images")?,
    }

    Ok(())
}

async fn crawl(args: CrawlArgs) -> anyhow::Result<()> {
    let crawler = Crawler::with_http(args.site.profile(), args.config());
    if crawler.crawl().await?.is_none() {
        tracing::warn!("no chapters found; no manifest written");
    }
    Ok(())
}

async fn chapters(args: ChaptersArgs) -> anyhow::Result<()> {
    let mut config = mangagrab::config::CrawlConfig::new(".");
    config.timing.probe_delay = Duration::from_millis(args.probe_delay_ms);
    let crawler = Crawler::with_http(args.site.profile(), config);

    for chapter in crawler.discover().await {
        println!(
            "{}",
            serde_json::to_string(&chapter).context("serialize chapter")?
        );
    }
    Ok(())
}

async fn images(args: ImagesArgs) -> anyhow::Result<()> {
    let site = args.site.profile();
    let connector = HttpConnector::new();
    let images = MirrorResolver::new(&site, &connector, Timing::default())
        .resolve_chapter_images(args.slot)
        .await;
    if images.is_empty() {
        anyhow::bail!("no images found for slot {}", args.slot);
    }

    for image in images {
        println!("{}", image.url);
    }
    Ok(())
}
