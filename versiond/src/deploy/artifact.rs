//! Artifact names, versions and selection
//!
//! Artifacts follow `<base>-<major>.<minor>.<patch>[-<classifier>].<ext>`.
//! Versions compare as integer triples, so `1.10.0` sorts above `1.2.0`.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::errors::VersiondError;
use crate::filesys::dir::Dir;

static ARTIFACT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)-(\d+)\.(\d+)\.(\d+)(?:-(.+?))?\.([^.]+)$")
        .expect("constant regex pattern is valid")
});

/// A dotted numeric version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionTag {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl VersionTag {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `1`, `1.2` or `1.2.3`; missing positions are 0
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split('.');
        let mut next = || -> Option<u64> {
            match parts.next() {
                Some(p) => p.parse().ok(),
                None => Some(0),
            }
        };
        let tag = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return None;
        }
        Some(tag)
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A parsed artifact file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub file_name: String,
    pub base: String,
    pub version: VersionTag,
    pub classifier: Option<String>,
    pub extension: String,
}

impl ArtifactName {
    pub fn parse(file_name: &str) -> Option<Self> {
        let caps = ARTIFACT_NAME.captures(file_name)?;
        let number = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());

        Some(Self {
            file_name: file_name.to_string(),
            base: caps.get(1)?.as_str().to_string(),
            version: VersionTag::new(number(2)?, number(3)?, number(4)?),
            classifier: caps.get(5).map(|m| m.as_str().to_string()),
            extension: caps.get(6)?.as_str().to_string(),
        })
    }

    pub fn has_extension(&self, extension: &str) -> bool {
        self.extension.eq_ignore_ascii_case(extension)
    }

    /// True when both names deploy the same component
    pub fn same_component(&self, other: &ArtifactName) -> bool {
        self.base == other.base && self.extension.eq_ignore_ascii_case(&other.extension)
    }
}

/// Pick the highest version per base name, in first-seen order of bases.
///
/// Names that do not parse or carry another extension are skipped; equal
/// versions keep the earliest name.
pub fn select_latest<'a, I>(names: I, extension: &str) -> Vec<ArtifactName>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut selected: Vec<ArtifactName> = Vec::new();

    for name in names {
        let Some(parsed) = ArtifactName::parse(name) else {
            continue;
        };
        if !parsed.has_extension(extension) {
            continue;
        }

        match selected.iter_mut().find(|s| s.base == parsed.base) {
            Some(current) => {
                if parsed.version.cmp(&current.version) == Ordering::Greater {
                    *current = parsed;
                }
            }
            None => selected.push(parsed),
        }
    }

    selected
}

/// Select the newest artifact per base name in a build output directory.
///
/// A missing directory yields no artifacts.
pub async fn find_artifacts(output_dir: &Path, extension: &str) -> Result<Vec<PathBuf>, VersiondError> {
    let dir = Dir::new(output_dir);
    if !dir.exists().await {
        debug!("Build output directory {} does not exist", output_dir.display());
        return Ok(Vec::new());
    }

    let names = dir.file_names().await?;
    let selected = select_latest(names.iter().map(String::as_str), extension);

    Ok(selected
        .into_iter()
        .map(|a| output_dir.join(a.file_name))
        .collect())
}

/// Highest deployed version per base name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployedIndex {
    /// Files carrying the artifact extension, parsed or not
    pub count: usize,
    pub versions: BTreeMap<String, VersionTag>,
}

impl DeployedIndex {
    pub fn version_strings(&self) -> BTreeMap<String, String> {
        self.versions
            .iter()
            .map(|(name, version)| (name.clone(), version.to_string()))
            .collect()
    }
}

/// Scan a deployment directory
pub async fn scan_deployed(dir: &Path, extension: &str) -> Result<DeployedIndex, VersiondError> {
    let names = Dir::new(dir).file_names().await?;
    let suffix = format!(".{}", extension.to_ascii_lowercase());

    let mut index = DeployedIndex::default();
    for name in &names {
        if !name.to_ascii_lowercase().ends_with(&suffix) {
            continue;
        }
        index.count += 1;

        let Some(parsed) = ArtifactName::parse(name) else {
            continue;
        };
        index
            .versions
            .entry(parsed.base)
            .and_modify(|v| {
                if parsed.version > *v {
                    *v = parsed.version;
                }
            })
            .or_insert(parsed.version);
    }

    Ok(index)
}
