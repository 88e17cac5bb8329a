//! Tag classification.
//!
//! Aurora images are tagged following a fixed scheme; the category of a tag
//! tells what the tag points at:
//! - `SNAPSHOT-feature-x-20180102.092832-15-b1.5.5-...` → build of a snapshot
//! - `feature-x-SNAPSHOT` → moving snapshot tag
//! - `4.2.4`, `4.2`, `4` → bugfix, minor and major tags
//! - `latest`
//! - `4b071d3` → abbreviated commit hash
//! - anything else → a full Aurora version

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Semantic category of an image tag.
///
/// Variants are declared in classification precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TagCategory {
    /// Timestamped snapshot build carrying a `bN.N.N` build marker.
    AuroraSnapshotVersion,
    /// Moving snapshot tag ending in `-SNAPSHOT`.
    Snapshot,
    /// `MAJOR.MINOR.PATCH`.
    Bugfix,
    /// `MAJOR.MINOR`.
    Minor,
    /// `MAJOR`.
    Major,
    /// The literal `latest`.
    Latest,
    /// Seven hexadecimal characters.
    CommitHash,
    /// Anything else.
    AuroraVersion,
}

impl TagCategory {
    /// All categories, in precedence order.
    pub const ALL: [Self; 8] = [
        Self::AuroraSnapshotVersion,
        Self::Snapshot,
        Self::Bugfix,
        Self::Minor,
        Self::Major,
        Self::Latest,
        Self::CommitHash,
        Self::AuroraVersion,
    ];

    /// Returns the category name, e.g. `AURORA_SNAPSHOT_VERSION`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuroraSnapshotVersion => "AURORA_SNAPSHOT_VERSION",
            Self::Snapshot => "SNAPSHOT",
            Self::Bugfix => "BUGFIX",
            Self::Minor => "MINOR",
            Self::Major => "MAJOR",
            Self::Latest => "LATEST",
            Self::CommitHash => "COMMIT_HASH",
            Self::AuroraVersion => "AURORA_VERSION",
        }
    }

    /// Classifies a tag. Every string has a category.
    ///
    /// # Examples
    ///
    /// ```
    /// use cantus_core::TagCategory;
    ///
    /// assert_eq!(TagCategory::classify("4.2.4"), TagCategory::Bugfix);
    /// assert_eq!(TagCategory::classify("latest"), TagCategory::Latest);
    /// assert_eq!(TagCategory::classify("weirdness"), TagCategory::AuroraVersion);
    /// ```
    #[must_use]
    pub fn classify(tag: &str) -> Self {
        if snapshot_build_regex().is_match(tag) {
            Self::AuroraSnapshotVersion
        } else if tag.ends_with("-SNAPSHOT") {
            Self::Snapshot
        } else if is_numeric_version(tag, 3) {
            Self::Bugfix
        } else if is_numeric_version(tag, 2) {
            Self::Minor
        } else if is_numeric_version(tag, 1) {
            Self::Major
        } else if tag == "latest" {
            Self::Latest
        } else if tag.len() == 7 && tag.chars().all(|c| c.is_ascii_hexdigit()) {
            Self::CommitHash
        } else {
            Self::AuroraVersion
        }
    }
}

impl fmt::Display for TagCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `SNAPSHOT-<branch>-<yyyyMMdd.HHmmss>-<build>-b<N.N.N>[-<extra>]`
fn snapshot_build_regex() -> &'static Regex {
    static SNAPSHOT_BUILD: OnceLock<Regex> = OnceLock::new();
    SNAPSHOT_BUILD.get_or_init(|| {
        Regex::new(r"^SNAPSHOT-.+-\d{8}\.\d{6}-\d+-b\d+\.\d+\.\d+(-.+)?$")
            .expect("Valid regex pattern")
    })
}

/// True if `tag` is exactly `parts` dot-separated decimal numbers.
fn is_numeric_version(tag: &str, parts: usize) -> bool {
    let mut count = 0;
    for part in tag.split('.') {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        count += 1;
    }
    count == parts
}

/// Groups tags by category, keeping input order within each group.
///
/// # Examples
///
/// ```
/// use cantus_core::{group_tags, TagCategory};
///
/// let groups = group_tags(["4.2.4", "4.2", "latest", "4.2.3"]);
/// assert_eq!(groups[&TagCategory::Bugfix], vec!["4.2.4", "4.2.3"]);
/// assert_eq!(groups[&TagCategory::Minor], vec!["4.2"]);
/// ```
pub fn group_tags<I, S>(tags: I) -> BTreeMap<TagCategory, Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut groups: BTreeMap<TagCategory, Vec<String>> = BTreeMap::new();
    for tag in tags {
        let tag = tag.into();
        groups.entry(TagCategory::classify(&tag)).or_default().push(tag);
    }
    groups
}
