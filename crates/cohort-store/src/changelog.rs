//! Changelog file access.
//!
//! The changelog is read once at run start (the head entry carries the
//! current version) and rewritten with one new entry prepended after a
//! commit.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

use cohort_model::{ChangelogEntry, Version, parse_head_version};

#[derive(Debug)]
pub struct Changelog {
    path: PathBuf,
    contents: String,
    version: Version,
}

impl Changelog {
    pub fn version(&self) -> Version {
        self.version
    }

    /// Prepend one entry and rewrite the file.
    pub fn prepend(&self, entry: &ChangelogEntry) -> Result<()> {
        let updated = format!("{}{}", entry.render(), self.contents);
        fs::write(&self.path, updated)
            .with_context(|| format!("write changelog {}", self.path.display()))?;
        debug!(
            path = %self.path.display(),
            version = %entry.version,
            "changelog entry prepended"
        );
        Ok(())
    }
}

/// Read the changelog and parse the current version from its head entry.
///
/// A missing, empty or malformed changelog is a fatal startup error; runs
/// never guess a version.
pub fn read_changelog(path: &Path) -> Result<Changelog> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read changelog {}", path.display()))?;
    let version = parse_head_version(&contents)
        .with_context(|| format!("parse changelog head in {}", path.display()))?;
    Ok(Changelog {
        path: path.to_path_buf(),
        contents,
        version,
    })
}

/// Seed a fresh changelog at version 0.0.0. Refuses to overwrite.
pub fn init_changelog(path: &Path) -> Result<Version> {
    if path.exists() {
        bail!("changelog {} already exists", path.display());
    }
    let entry = ChangelogEntry {
        version: Version::new(0, 0, 0),
        records_committed: 0,
        records_quarantined: 0,
    };
    fs::write(path, entry.render())
        .with_context(|| format!("write changelog {}", path.display()))?;
    Ok(entry.version)
}
