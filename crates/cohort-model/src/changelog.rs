//! Changelog entry rendering and head-version parsing.
//!
//! The changelog is a reverse-chronological markdown file. Each successful
//! run that commits new cleansed rows prepends one entry:
//!
//! ```markdown
//! ## 0.0.4
//! ### Added
//! - 12 new records committed to the cleansed table
//! - 2 new records quarantined
//! ```
//!
//! The current version is read from the first line at the start of a run.

use crate::error::CohortError;
use crate::version::Version;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
    pub version: Version,
    pub records_committed: usize,
    pub records_quarantined: usize,
}

impl ChangelogEntry {
    pub fn render(&self) -> String {
        format!(
            "## {}\n### Added\n- {} new records committed to the cleansed table\n- {} new records quarantined\n\n",
            self.version, self.records_committed, self.records_quarantined
        )
    }
}

/// Parse the version from the head entry of a changelog.
///
/// An empty or malformed changelog is a fatal startup error: the pipeline
/// refuses to guess a version.
pub fn parse_head_version(contents: &str) -> Result<Version, CohortError> {
    let head = contents
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| CohortError::MalformedChangelog("no entries".to_string()))?;
    let raw = head
        .trim()
        .strip_prefix("## ")
        .ok_or_else(|| CohortError::MalformedChangelog(format!("unexpected head line '{head}'")))?;
    raw.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_entry() {
        let entry = ChangelogEntry {
            version: Version::new(0, 0, 4),
            records_committed: 12,
            records_quarantined: 2,
        };
        let rendered = entry.render();
        assert!(rendered.starts_with("## 0.0.4\n### Added\n"));
        assert!(rendered.contains("- 12 new records committed"));
        assert!(rendered.contains("- 2 new records quarantined"));
    }

    #[test]
    fn parses_head_version_from_rendered_entry() {
        let entry = ChangelogEntry {
            version: Version::new(0, 0, 7),
            records_committed: 1,
            records_quarantined: 0,
        };
        let contents = format!("{}## 0.0.6\n### Added\n", entry.render());
        let version = parse_head_version(&contents).expect("parse head");
        assert_eq!(version, Version::new(0, 0, 7));
    }

    #[test]
    fn empty_changelog_is_fatal() {
        assert!(matches!(
            parse_head_version(""),
            Err(CohortError::MalformedChangelog(_))
        ));
        assert!(matches!(
            parse_head_version("not a header\n"),
            Err(CohortError::MalformedChangelog(_))
        ));
    }
}
