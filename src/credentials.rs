//! RFID allow-list

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::info;

/// Errors that can occur while loading the allow-list
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to read credential file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Immutable set of RFID identifiers allowed to unlock the door
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSet {
    ids: HashSet<String>,
}

impl CredentialSet {
    /// Load the allow-list from a file with one identifier per line
    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CredentialError::Read {
            path: path.to_owned(),
            source,
        })?;

        let set = Self::parse(&contents);
        info!(?path, count = set.len(), "credentials loaded");
        Ok(set)
    }

    /// Build a set from line-oriented text; surrounding whitespace and
    /// blank lines are ignored
    pub fn parse(contents: &str) -> Self {
        contents.lines().collect()
    }

    /// Check whether a scanned identifier is allowed
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for CredentialSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let ids = iter
            .into_iter()
            .map(|id| id.as_ref().trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        Self { ids }
    }
}
