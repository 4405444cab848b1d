//! Build target identity used to namespace scratch output

use libstage_errors::StagingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A build target of the form `//base/path:short_name`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BuildTarget {
    base_path: String,
    short_name: String,
}

impl BuildTarget {
    /// Parse `//base/path:name`. The leading `//` is optional.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the name part is missing or if any path
    /// segment would escape the scratch root.
    pub fn parse(target: &str) -> Result<Self, StagingError> {
        let trimmed = target.trim();
        let without_prefix = trimmed.strip_prefix("//").unwrap_or(trimmed);
        let (base_path, short_name) = without_prefix.split_once(':').ok_or_else(|| {
            StagingError::invalid_request(format!("build target `{target}` has no `:name` part"))
        })?;

        if short_name.is_empty() || short_name.contains(['/', ':']) {
            return Err(StagingError::invalid_request(format!(
                "build target `{target}` has an invalid short name"
            )));
        }
        if short_name == "." || short_name == ".." {
            return Err(StagingError::invalid_request(format!(
                "build target `{target}` has an invalid short name"
            )));
        }
        if base_path
            .split('/')
            .any(|segment| segment == ".." || segment == ".")
            || base_path.starts_with('/')
        {
            return Err(StagingError::invalid_request(format!(
                "build target `{target}` has an invalid base path"
            )));
        }

        Ok(Self {
            base_path: base_path.trim_end_matches('/').to_string(),
            short_name: short_name.to_string(),
        })
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[must_use]
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// Scratch directory for this target: `<root>/<base_path>/<format>`
    /// where every `%s` in `format` is replaced by the short name
    #[must_use]
    pub fn scratch_path(&self, root: &Path, format: &str) -> PathBuf {
        let mut path = root.to_path_buf();
        for segment in self.base_path.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.push(format.replace("%s", &self.short_name));
        path
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//{}:{}", self.base_path, self.short_name)
    }
}

impl FromStr for BuildTarget {
    type Err = StagingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BuildTarget {
    type Error = StagingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BuildTarget> for String {
    fn from(target: BuildTarget) -> Self {
        target.to_string()
    }
}
