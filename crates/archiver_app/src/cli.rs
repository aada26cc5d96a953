//! Command line parsing for the archiver front end.
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use archiver_engine::Platform;

pub const DEFAULT_SETTINGS_PATH: &str = "./archiver_settings.ron";

pub const USAGE: &str = "\
Usage:
  archiver_app <page.html> [options]
  archiver_app --init-settings [--settings <file>]

Options:
  --settings <file>    settings file (default ./archiver_settings.ron)
  --root <dir>         storage root, overrides the settings file
  --url <url>          address the page was saved from
  --platform <name>    facebook, linkedin, twitter or reddit
  --dry-run            print the extracted posts as JSON, write nothing
  --verbose            debug logging
  --help               show this text";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    InitSettings { settings: PathBuf },
    Archive(ArchiveArgs),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveArgs {
    pub page: PathBuf,
    pub settings: PathBuf,
    pub storage_root: Option<PathBuf>,
    pub url: Option<String>,
    pub platform: Option<Platform>,
    pub dry_run: bool,
    pub verbose: bool,
}

pub fn parse(args: impl IntoIterator<Item = String>) -> anyhow::Result<Command> {
    let mut args = args.into_iter();
    let mut page = None;
    let mut settings = PathBuf::from(DEFAULT_SETTINGS_PATH);
    let mut storage_root = None;
    let mut url = None;
    let mut platform = None;
    let mut dry_run = false;
    let mut verbose = false;
    let mut init_settings = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--settings" => settings = PathBuf::from(value_for(&arg, args.next())?),
            "--root" => storage_root = Some(PathBuf::from(value_for(&arg, args.next())?)),
            "--url" => url = Some(value_for(&arg, args.next())?),
            "--platform" => {
                let name = value_for(&arg, args.next())?;
                platform = Some(
                    Platform::from_name(&name)
                        .ok_or_else(|| anyhow!("unknown platform {name:?}"))?,
                );
            }
            "--dry-run" => dry_run = true,
            "-v" | "--verbose" => verbose = true,
            "--init-settings" => init_settings = true,
            flag if flag.starts_with("--") => bail!("unknown option {flag}"),
            _ if page.is_none() => page = Some(PathBuf::from(&arg)),
            _ => bail!("unexpected argument {arg:?}"),
        }
    }

    if init_settings {
        return Ok(Command::InitSettings { settings });
    }
    let page = page.context("missing the saved page to archive")?;
    Ok(Command::Archive(ArchiveArgs {
        page,
        settings,
        storage_root,
        url,
        platform,
        dry_run,
        verbose,
    }))
}

fn value_for(flag: &str, value: Option<String>) -> anyhow::Result<String> {
    match value {
        Some(value) if !value.starts_with("--") => Ok(value),
        _ => bail!("{flag} needs a value"),
    }
}
