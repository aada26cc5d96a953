mod cli;
mod progress;
mod settings;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use archiver_engine::{
    ArchivePipeline, ArchiveSettings, BatchReport, ExtractorFactory, FsRootProvider, MediaFetcher,
    PageDocument, PostExtractor, PostRecord, StorageCoordinator,
};
use engine_logging::{engine_info, engine_warn, LogDestination};
use log::LevelFilter;

use cli::{ArchiveArgs, Command};
use progress::LogProgressSink;

const LOG_FILE: &str = "./archiver.log";

fn main() -> anyhow::Result<()> {
    match cli::parse(std::env::args().skip(1))? {
        Command::Help => {
            println!("{}", cli::USAGE);
            Ok(())
        }
        Command::InitSettings { settings } => {
            engine_logging::initialize(LogDestination::Terminal, LevelFilter::Info);
            settings::save_settings(&settings, &ArchiveSettings::default())?;
            println!("Wrote default settings to {}", settings.display());
            Ok(())
        }
        Command::Archive(args) => {
            let level = if args.verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            };
            engine_logging::initialize(LogDestination::Both(PathBuf::from(LOG_FILE)), level);
            run(args)
        }
    }
}

fn run(args: ArchiveArgs) -> anyhow::Result<()> {
    let mut settings = settings::load_settings(&args.settings);
    if let Some(root) = args.storage_root.clone() {
        settings.storage_root = Some(root);
    }

    let records = extract_posts(&args)?;
    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No posts found in {}", args.page.display());
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    let storage = StorageCoordinator::new(Arc::new(FsRootProvider::new(
        settings.storage_root.clone(),
    )));
    let pipeline = ArchivePipeline::new(storage, MediaFetcher::default())
        .with_sink(Arc::new(LogProgressSink));
    let report = runtime.block_on(pipeline.archive_many(&records, &settings.archive_options()));

    print_report(&records, &report);
    if report.summary.succeeded == 0 {
        bail!("none of the {} post(s) could be archived", report.summary.total);
    }
    Ok(())
}

fn extract_posts(args: &ArchiveArgs) -> anyhow::Result<Vec<PostRecord>> {
    let bytes =
        fs::read(&args.page).with_context(|| format!("failed to read {}", args.page.display()))?;
    let page = PageDocument::from_bytes(&bytes, None, args.url.as_deref())
        .with_context(|| format!("failed to load {}", args.page.display()))?;

    let platform = match args.platform.or_else(|| page.platform()) {
        Some(platform) => platform,
        None => bail!(
            "{} is not a supported platform; pass --platform",
            page.url()
        ),
    };
    engine_info!(
        "Reading {} page {} ({})",
        platform,
        page.url(),
        page.encoding_label()
    );

    let extractor = ExtractorFactory::new().extractor_for(platform)?;
    let records = extractor.enumerate(&page);
    if records.is_empty() {
        engine_warn!("No {} posts found on {}", platform, page.url());
    }
    Ok(records)
}

fn print_report(records: &[PostRecord], report: &BatchReport) {
    for (record, result) in records.iter().zip(&report.results) {
        match result {
            Ok(outcome) if outcome.media_failed > 0 => println!(
                "archived  {} -> {} ({} attachment(s), {} media item(s) missing)",
                record.id,
                outcome.final_path,
                outcome.attachments.len(),
                outcome.media_failed
            ),
            Ok(outcome) => println!(
                "archived  {} -> {} ({} attachment(s))",
                record.id,
                outcome.final_path,
                outcome.attachments.len()
            ),
            Err(err) => println!("failed    {}: {}", record.id, err),
        }
    }
    println!(
        "{} of {} post(s) archived, {} failed",
        report.summary.succeeded, report.summary.total, report.summary.failed
    );
}
