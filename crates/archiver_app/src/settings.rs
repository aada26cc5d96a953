use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use archiver_engine::ArchiveSettings;
use engine_logging::{engine_info, engine_warn};
use tempfile::NamedTempFile;

/// Settings from `path`. A missing or unreadable file yields the defaults.
pub(crate) fn load_settings(path: &Path) -> ArchiveSettings {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            engine_warn!("No settings file at {:?}, using defaults", path);
            return ArchiveSettings::default();
        }
        Err(err) => {
            engine_warn!("Failed to read settings from {:?}: {}", path, err);
            return ArchiveSettings::default();
        }
    };

    match ron::from_str(&content) {
        Ok(settings) => {
            engine_info!("Loaded settings from {:?}", path);
            settings
        }
        Err(err) => {
            engine_warn!("Failed to parse settings from {:?}: {}", path, err);
            ArchiveSettings::default()
        }
    }
}

pub(crate) fn save_settings(path: &Path, settings: &ArchiveSettings) -> anyhow::Result<()> {
    let pretty = ron::ser::PrettyConfig::new();
    let content =
        ron::ser::to_string_pretty(settings, pretty).context("failed to serialize settings")?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create a temp file in {}", dir.display()))?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path)
        .with_context(|| format!("failed to write settings to {}", path.display()))?;
    engine_info!("Saved settings to {:?}", path);
    Ok(())
}
